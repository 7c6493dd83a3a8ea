//! Access to the metrics backend.
//!
//! The rest of the pipeline only sees the [`Query`] capability so the HTTP
//! layer can be exercised against a stub backend.

pub mod client;
pub mod response;

use async_trait::async_trait;

use crate::models::{QuerySpec, Series};
use crate::Result;

pub use self::client::PrometheusClient;

#[async_trait]
pub trait Query: Send + Sync {
    /// Runs a range query. `credential` is forwarded verbatim when present.
    async fn fetch(&self, spec: &QuerySpec, credential: Option<&str>) -> Result<Vec<Series>>;
}
