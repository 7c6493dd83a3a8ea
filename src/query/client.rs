use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, StatusCode};
use tracing::debug;

use super::response::{into_matrix, QueryRangeResponse};
use super::Query;
use crate::metrics::StageTimer;
use crate::models::{QuerySpec, Series};
use crate::{ChartError, Result};

/// Range-query client for a Prometheus-compatible HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/v1/query_range", self.base_url)
    }
}

#[async_trait]
impl Query for PrometheusClient {
    async fn fetch(&self, spec: &QuerySpec, credential: Option<&str>) -> Result<Vec<Series>> {
        let _timer = StageTimer::new("query");
        debug!(
            query = %spec.query,
            start = spec.start.timestamp(),
            end = spec.end.timestamp(),
            step = spec.step_seconds,
            "Querying upstream"
        );

        let form = [
            ("query", spec.query.clone()),
            ("start", spec.start.timestamp().to_string()),
            ("end", spec.end.timestamp().to_string()),
            ("step", spec.step_seconds.to_string()),
        ];

        let mut request = self.http.post(self.endpoint()).form(&form);
        if let Some(credential) = credential {
            request = request.header(AUTHORIZATION, credential);
        }

        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ChartError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        // Body read failures surface as transport errors, bad JSON as decode.
        let envelope: QueryRangeResponse = response.json().await?;
        into_matrix(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
        Form, Router,
    };
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;
    use tokio_test::assert_ok;

    #[derive(Clone, Default)]
    struct Captured {
        forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
        auth: Arc<Mutex<Vec<Option<String>>>>,
    }

    const MATRIX: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[
        {"metric":{"__name__":"up","job":"node"},"values":[[1700000000,"1"],[1700000060,"1"]]}]}}"#;

    async fn stub_backend(status: AxumStatus, body: &'static str) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/api/v1/query_range",
                post(
                    move |State(c): State<Captured>,
                          headers: HeaderMap,
                          Form(form): Form<HashMap<String, String>>| async move {
                        c.forms.lock().await.push(form);
                        c.auth.lock().await.push(
                            headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                        );
                        (status, body)
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/", addr), captured)
    }

    fn spec() -> QuerySpec {
        QuerySpec {
            query: "up{job=\"node\"}".to_string(),
            start: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            end: DateTime::from_timestamp(1_700_003_600, 0).unwrap(),
            step_seconds: 12,
        }
    }

    #[tokio::test]
    async fn test_fetch_posts_form_and_credential() {
        let (base, captured) = stub_backend(AxumStatus::OK, MATRIX).await;
        let client = PrometheusClient::new(base);

        let series = assert_ok!(client.fetch(&spec(), Some("Bearer abc")).await);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 2);

        let forms = captured.forms.lock().await;
        assert_eq!(forms[0]["query"], "up{job=\"node\"}");
        assert_eq!(forms[0]["start"], "1700000000");
        assert_eq!(forms[0]["end"], "1700003600");
        assert_eq!(forms[0]["step"], "12");
        assert_eq!(
            captured.auth.lock().await[0].as_deref(),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn test_fetch_without_credential_sends_no_header() {
        let (base, captured) = stub_backend(AxumStatus::OK, MATRIX).await;
        let client = PrometheusClient::new(base);

        assert_ok!(client.fetch(&spec(), None).await);
        assert_eq!(captured.auth.lock().await[0], None);
    }

    #[tokio::test]
    async fn test_non_200_is_backend_error() {
        let (base, _) = stub_backend(AxumStatus::UNPROCESSABLE_ENTITY, "parse error at char 3").await;
        let client = PrometheusClient::new(base);

        match client.fetch(&spec(), None).await {
            Err(ChartError::Backend { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "parse error at char 3");
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let (base, _) = stub_backend(AxumStatus::OK, "<html>bad gateway</html>").await;
        let client = PrometheusClient::new(base);

        assert!(matches!(
            client.fetch(&spec(), None).await,
            Err(ChartError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_vector_result_is_shape_error() {
        let (base, _) = stub_backend(
            AxumStatus::OK,
            r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#,
        )
        .await;
        let client = PrometheusClient::new(base);

        match client.fetch(&spec(), None).await {
            Err(ChartError::Shape(kind)) => assert_eq!(kind, "vector"),
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PrometheusClient::new(format!("http://{}", addr));
        assert!(matches!(
            client.fetch(&spec(), None).await,
            Err(ChartError::Transport(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = PrometheusClient::new("http://prom:9090///");
        assert_eq!(client.endpoint(), "http://prom:9090/api/v1/query_range");
    }
}
