use anyhow::Result;
use colored::*;

use super::{print_json, Context, OutputFormat};

/// Print the role catalog
pub async fn list(ctx: &Context, format: OutputFormat) -> Result<()> {
    let roles = ctx.service.roles().list().await?;

    match format {
        OutputFormat::Json => print_json(&roles)?,
        OutputFormat::Text => {
            for role in roles {
                println!(
                    "{:>3}  {:<10} {}",
                    role.id,
                    role.system.bold(),
                    role.name.dimmed()
                );
                println!("     {}", role.verbs.join(", "));
            }
        }
    }

    Ok(())
}
