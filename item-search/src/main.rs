//! Item Search Main Entry Point
//!
//! Connects to the configured search cluster, makes sure the item index exists
//! and runs the demonstration scenarios, logging their results.

use dotenv::dotenv;
use item_search::{DemoError, DemoRunner, Dependencies};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("item_search=info,item_search_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();

        info!(
            service_name = "item-search",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();

        info!(
            service_name = "item-search",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), DemoError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting item search demo");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let runner = DemoRunner::new(deps.repository);
    match runner.run().await {
        Ok(()) => {
            info!("Item search demo completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Item search demo failed");
            Err(e)
        }
    }
}
