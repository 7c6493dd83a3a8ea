use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::{ChartError, Result};

pub const DEFAULT_LISTEN_ADDR: &str = ":8142";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const USAGE: &str = "usage: promchart <backend-url> [listen-addr]";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend base URL without a trailing slash.
    pub backend: String,
    pub listen_addr: SocketAddr,
    pub static_dir: PathBuf,
    /// Value for the upstream `Authorization` header, from `AUTH`.
    pub credential: Option<String>,
}

impl Config {
    /// Positional arguments (program name excluded) plus `AUTH` and
    /// `CHARTSRV_STATICDIR` from the environment.
    pub fn from_env<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        Self::build(
            args,
            env::var("AUTH").ok(),
            env::var("CHARTSRV_STATICDIR").ok(),
        )
    }

    pub fn build<I>(args: I, auth: Option<String>, static_dir: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let backend = args
            .next()
            .map(|b| b.trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ChartError::Config(USAGE.to_string()))?;

        let listen = args.next().unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = parse_listen_addr(&listen)?;

        Ok(Self {
            backend,
            listen_addr,
            static_dir: PathBuf::from(
                static_dir
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            ),
            credential: auth.filter(|a| !a.is_empty()),
        })
    }
}

/// Accepts `host:port` as well as a bare `:port`, which binds every interface.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    full.parse()
        .map_err(|e| ChartError::Config(format!("invalid listen address {:?}: {}", addr, e)))
}
