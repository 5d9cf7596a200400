use std::sync::Arc;
use tracing::error;

use nowplaying_proxy::config::{load_config, print_schema};
use nowplaying_proxy::startup;
use nowplaying_proxy::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    if std::env::args().skip(1).any(|arg| arg == "--schema") {
        print_schema();
        return;
    }

    let config = Arc::new(load_config());
    init_logging(&config.logging);

    if let Err(e) = startup::run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
