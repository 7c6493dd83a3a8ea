use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to reach upstream: {0}")]
    Transport(String),

    #[error("received {status} response from upstream: {body}")]
    Backend { status: u16, body: String },

    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    #[error("result type isn't of type matrix: {0}")]
    Shape(String),

    #[error("no data")]
    Empty,

    #[error("render error: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChartError {
    /// Short, stable name used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::Validation(_) => "validation",
            ChartError::Transport(_) => "transport",
            ChartError::Backend { .. } => "backend",
            ChartError::Decode(_) => "decode",
            ChartError::Shape(_) => "shape",
            ChartError::Empty => "empty",
            ChartError::Render(_) => "render",
            ChartError::Config(_) => "config",
            ChartError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ChartError::Config(_) | ChartError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<reqwest::Error> for ChartError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChartError::Decode(err.to_string())
        } else {
            ChartError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        ChartError::Decode(err.to_string())
    }
}

impl IntoResponse for ChartError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = ChartError::Validation("Expected ?query=... parameter".to_string());
        assert_eq!(err.to_string(), "Expected ?query=... parameter");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_error_carries_status_and_body() {
        let err = ChartError::Backend {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "received 503 response from upstream: overloaded"
        );
        assert_eq!(err.kind(), "backend");
    }

    #[test]
    fn test_pipeline_errors_map_to_bad_request() {
        for err in [
            ChartError::Transport("refused".into()),
            ChartError::Decode("eof".into()),
            ChartError::Shape("vector".into()),
            ChartError::Empty,
            ChartError::Render("no points".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", err);
        }
        assert_eq!(
            ChartError::Internal("bind".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
