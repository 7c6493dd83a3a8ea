use std::env;

use tracing_subscriber::{
    fmt,
    EnvFilter,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "promchart=info,tower_http=info";

/// Sets up the logging subscriber for the application.
///
/// The filter comes from `RUST_LOG` when present. Setting
/// `CHARTSRV_LOG_FORMAT=json` switches to structured JSON lines.
/// Calling this more than once is harmless.
pub fn init_logger() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = env::var("CHARTSRV_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .compact(),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("logger already initialised: {}", e);
    }
}
