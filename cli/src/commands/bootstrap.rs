use anyhow::Result;
use colored::*;
use serde_json::json;

use super::{print_json, Context, OutputFormat};

/// Create the first administrator and hand back a bearer token for it.
pub async fn execute(ctx: &Context, display_name: &str, format: OutputFormat) -> Result<()> {
    let (actor, role) = ctx.service.bootstrap_admin(display_name).await?;
    let session = ctx.sessions.create_session(actor.id).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "actor": actor,
            "role": role.system,
            "token": session.token,
            "expiresAt": session.expires_at,
        }))?,
        OutputFormat::Text => {
            println!(
                "{} {} (actor {}) as {}",
                "Created".green().bold(),
                actor.display_name,
                actor.id,
                role.system
            );
            println!("Token: {}", session.token);
            println!("Expires: {}", session.expires_at.to_rfc3339());
        }
    }

    Ok(())
}
