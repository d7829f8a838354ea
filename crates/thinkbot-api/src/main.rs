mod catalog;
mod competitors;
mod config;
mod document;
mod enhancer;
mod error;
mod model;
mod pipeline;
mod server;
mod validator;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use thinkbot_common::gateway::{Gateway, GatewayConfig};

use catalog::Catalog;
use config::Config;
use document::Normalizer;
use pipeline::Pipeline;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(false)
        .init();

    info!("starting thinkbot api");

    let config = Config::from_env()?;
    info!(
        listen_addr = %config.listen_addr,
        cors_origins = ?config.cors_origins,
        max_upload_bytes = config.max_upload_bytes,
        "configuration loaded"
    );

    let gateway_config = GatewayConfig::from_env();
    info!(
        base_url = %gateway_config.base_url,
        model = %gateway_config.model,
        timeout_ms = gateway_config.default_timeout.as_millis(),
        max_retries = gateway_config.max_retries,
        "llm gateway configured"
    );
    let gateway = Arc::new(Gateway::new(gateway_config)?);

    let catalog = match &config.catalog_path {
        Some(path) => {
            let catalog = Catalog::from_file(path)?;
            info!(path = %path.display(), categories = catalog.categories.len(), "catalog loaded");
            catalog
        }
        None => Catalog::builtin(),
    };

    let pipeline = Pipeline::new(gateway, Arc::new(catalog), Arc::new(Normalizer::new()));
    let app = server::router(AppState::new(pipeline), &config);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "http server listening");
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "http server error");
    })?;

    info!("http server shut down");
    Ok(())
}
