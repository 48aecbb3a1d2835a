//! Health command - service reachability probe

use anyhow::Result;
use sentry_client::SentryClient;

use crate::output::OutputContext;

/// Check service health
pub async fn health(client: &SentryClient, ctx: &OutputContext) -> Result<()> {
    match client.health().await {
        Ok(status) => {
            let message = status.message.unwrap_or_else(|| "-".to_string());
            ctx.print_kv(&[("Status", status.status), ("Message", message)]);
        }
        Err(e) => ctx.error(&format!("Service unreachable: {}", e)),
    }

    Ok(())
}
