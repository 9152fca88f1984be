use anyhow::{bail, Result};
use colored::*;

use super::{print_json, Context, OutputFormat};

/// Recompute the hash chain; fails when any link is broken.
pub async fn verify(ctx: &Context) -> Result<()> {
    let audit = ctx.service.audit();
    let count = audit.count().await?;

    if !audit.verify_chain().await? {
        bail!("audit chain is broken ({} records checked)", count);
    }

    println!("{} audit chain intact ({} records)", "✓".green().bold(), count);
    Ok(())
}

pub async fn list(
    ctx: &Context,
    actee: Option<String>,
    limit: i64,
    format: OutputFormat,
) -> Result<()> {
    let records = ctx.service.audit().list(actee.as_deref(), limit).await?;

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Text => {
            for record in &records {
                let acting = record
                    .actor_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "system".to_string());
                println!(
                    "{:>5}  {}  {:<18} by {:<6} on actor {}  {}",
                    record.seq,
                    record.logged_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
                    record.action.to_string().bold(),
                    acting,
                    record.acted_actor_id,
                    record.details.to_string().dimmed()
                );
            }
        }
    }

    Ok(())
}
