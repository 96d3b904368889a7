//! Binary entrypoint for the Watch2Give API server.
use std::path::PathBuf;

use w2g_api::{logging, run, AppState};
use w2g_core::load_config;

fn main() -> anyhow::Result<()> {
    // Config file defaults to ./w2g.toml; W2G_ADDR overrides the listen address.
    let config_path = std::env::var("W2G_CONFIG").unwrap_or_else(|_| "w2g.toml".to_string());
    let mut config = load_config(&PathBuf::from(config_path))?;
    if let Ok(addr) = std::env::var("W2G_ADDR") {
        config.server.addr = addr;
    }

    let _log_guard = logging::init(&config.logging)?;

    // The model client is blocking: it has to be built and dropped outside the
    // async runtime, so `state` outlives `runtime`.
    let state = AppState::from_config(&config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(&config.server.addr, state.clone()))
}
