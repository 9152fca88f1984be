use anyhow::Result;
use api::{start_server_with_config, AppState};
use tracing::info;

use super::Context;

pub async fn execute(ctx: Context, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut api_config = ctx.config.api.clone();
    if let Some(host) = host {
        api_config = api_config.with_host(host);
    }
    if let Some(port) = port {
        api_config = api_config.with_port(port);
    }

    let state = AppState::new(
        ctx.db.clone(),
        ctx.config.service_config(),
        ctx.config.sessions.clone(),
    );

    let purged = ctx.sessions.cleanup_expired().await?;
    if purged > 0 {
        info!("Removed {} expired sessions", purged);
    }

    start_server_with_config(state, api_config).await?;
    ctx.db.close().await;
    Ok(())
}
