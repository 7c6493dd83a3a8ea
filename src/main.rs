use std::env;
use std::process;

use tracing::error;

use promchart::{api, config::Config, logging, metrics};

#[tokio::main]
async fn main() {
    logging::init_logger();

    let config = match Config::from_env(env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    metrics::init_metrics();

    if let Err(e) = api::serve(config).await {
        error!(error = %e, "Chart server stopped");
        process::exit(1);
    }
}
