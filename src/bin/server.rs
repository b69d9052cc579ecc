use anyhow::Context;
use audience_select::http::{self, AppState};
use audience_select::utils::{logger, validation::Validate};
use audience_select::{AudienceSelector, RestStore, Settings};
use std::sync::Arc;

/// Usage: `server [settings.toml]`. Without a file, settings come from the environment.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_cli_logger(false);

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Settings::from_env().context("reading settings from environment")?,
    };
    settings.validate()?;

    let store = Arc::new(RestStore::new(&settings)?);
    let state = AppState {
        selector: Arc::new(AudienceSelector::new(store, settings.selector_options())),
        strict_status_codes: settings.server.strict_status_codes,
    };
    let app = http::router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        exclusion = ?settings.selection.exclusion,
        "Starting HTTP server"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
