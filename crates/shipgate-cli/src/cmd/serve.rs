use anyhow::Context;
use shipgate_server::AppState;
use std::path::Path;

pub fn run(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    for w in config.validate() {
        tracing::warn!("config: {}", w.message);
    }
    let port = port.unwrap_or(config.server.port);

    let rt = super::runtime()?;
    rt.block_on(async {
        let state = AppState::from_config(&config).context("failed to wire collaborators")?;
        tracing::info!(
            timeout_minutes = config.approval.timeout_minutes,
            audit = %config.audit.path.display(),
            "starting shipgate"
        );
        shipgate_server::serve(state, port).await
    })
}
