use chrono::DateTime;
use serde::Deserialize;

use crate::models::{Datapoint, LabelSet, Series};
use crate::{ChartError, Result};

#[derive(Debug, Deserialize)]
pub struct QueryRangeResponse {
    pub status: String,
    pub data: QueryRangeData,
}

#[derive(Debug, Deserialize)]
pub struct QueryRangeData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<MatrixSeries>,
}

#[derive(Debug, Deserialize)]
pub struct MatrixSeries {
    #[serde(default)]
    pub metric: LabelSet,
    #[serde(default)]
    pub values: Vec<(f64, String)>, // (timestamp, value)
}

/// Decodes a `/api/v1/query_range` body into series, in backend order.
///
/// A sample whose value string does not parse becomes `0`. Non-finite values
/// are kept here; dropping those series is the normalizer's job.
pub fn parse_query_range(body: &[u8]) -> Result<Vec<Series>> {
    let response: QueryRangeResponse = serde_json::from_slice(body)?;
    into_matrix(response)
}

/// Checks the result shape of an already decoded envelope.
pub fn into_matrix(response: QueryRangeResponse) -> Result<Vec<Series>> {
    if response.data.result_type != "matrix" {
        return Err(ChartError::Shape(response.data.result_type));
    }

    if response.data.result.is_empty() {
        return Err(ChartError::Empty);
    }

    response
        .data
        .result
        .into_iter()
        .map(into_series)
        .collect()
}

fn into_series(row: MatrixSeries) -> Result<Series> {
    let points = row
        .values
        .into_iter()
        .map(|(timestamp, raw)| {
            let millis = (timestamp * 1000.0).round() as i64;
            let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                ChartError::Decode(format!("timestamp out of range: {}", timestamp))
            })?;
            let value = raw.trim().parse::<f64>().unwrap_or(0.0);
            Ok(Datapoint::new(timestamp, value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Series::new(row.metric, points))
}
