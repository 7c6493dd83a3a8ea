use axum::{
    extract::{Query as QueryString, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap,
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use super::params::parse_request;
use super::AppState;
use crate::metrics::{record_failure, record_request};
use crate::models::OutputFormat;
use crate::Result;

type Pairs = QueryString<Vec<(String, String)>>;

pub async fn chart_svg(State(state): State<AppState>, QueryString(pairs): Pairs, headers: HeaderMap) -> Result<Response> {
    chart(state, OutputFormat::Svg, pairs, headers).await
}

pub async fn chart_png(State(state): State<AppState>, QueryString(pairs): Pairs, headers: HeaderMap) -> Result<Response> {
    chart(state, OutputFormat::Png, pairs, headers).await
}

async fn chart(
    state: AppState,
    format: OutputFormat,
    pairs: Vec<(String, String)>,
    headers: HeaderMap,
) -> Result<Response> {
    record_request(format.extension());

    match build(&state, format, &pairs, &headers).await {
        Ok(bytes) => Ok(([(CONTENT_TYPE, format.mime())], bytes).into_response()),
        Err(e) => {
            record_failure(&e);
            warn!(%format, kind = e.kind(), error = %e, "Chart request failed");
            Err(e)
        }
    }
}

async fn build(
    state: &AppState,
    format: OutputFormat,
    pairs: &[(String, String)],
    headers: &HeaderMap,
) -> Result<Vec<u8>> {
    let (spec, options) = parse_request(pairs, format, Utc::now())?;
    info!(query = %spec.query, step = spec.step_seconds, %format, "Rendering chart");

    // Configured credential first, otherwise pass the caller's through.
    let inbound = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let credential = state.credential.as_deref().or(inbound);

    state.charts.render(&spec, &options, credential).await
}
