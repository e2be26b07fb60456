use std::process::ExitCode;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use replicate_designer::{default_registry, serve, Config, Dispatcher, ReplicateProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // stdout is the protocol channel; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut provider = ReplicateProvider::new(config.api_token);
    if let Some(url) = config.base_url {
        provider = provider.with_base_url(url);
    }

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(default_registry()),
        Arc::new(provider),
    ));

    info!("replicate-designer bridge started");

    match serve(dispatcher, tokio::io::stdin(), tokio::io::stdout()).await {
        Ok(()) => {
            info!("input stream closed, shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
