use ::assignments::Revocation;
use anyhow::{bail, Result};
use colored::*;
use entities::{Actor, AssignmentView, QueryOptions};
use serde_json::json;

use super::{print_json, Context, OutputFormat, TargetArgs};

pub struct ListOptions {
    pub role: Option<String>,
    pub extended: bool,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

fn actor_line(actor: &Actor) -> String {
    format!("{} {} ({})", actor.id, actor.display_name, actor.kind)
}

/// Assignments on the target, or the actors holding one role there.
pub async fn list(
    ctx: &Context,
    acting: Option<i64>,
    target: &TargetArgs,
    options: ListOptions,
    format: OutputFormat,
) -> Result<()> {
    let auth = ctx.acting(acting).await?;
    let actee = target.actee();

    if let Some(role) = options.role {
        let actors = ctx
            .service
            .list_assignments_by_role(&auth, &actee, &role)
            .await?;
        return match format {
            OutputFormat::Json => print_json(&actors),
            OutputFormat::Text => {
                println!("{} on {}", role.bold(), actee);
                for actor in &actors {
                    println!("  {}", actor_line(actor));
                }
                Ok(())
            }
        };
    }

    let query = QueryOptions {
        extended: options.extended,
        offset: options.offset,
        limit: options.limit,
    };
    let views = ctx.service.list_assignments(&auth, &actee, query).await?;

    match format {
        OutputFormat::Json => print_json(&views)?,
        OutputFormat::Text => {
            println!("Assignments on {}", actee.to_string().bold());
            for view in &views {
                match view {
                    AssignmentView::Minimal { actor_id, role_id } => {
                        println!("  role {:>3}  actor {}", role_id, actor_id)
                    }
                    AssignmentView::Extended(extended) => {
                        println!(
                            "  role {:>3}  {}",
                            extended.role_id,
                            actor_line(&extended.actor)
                        )
                    }
                }
            }
        }
    }

    Ok(())
}

pub async fn grant(
    ctx: &Context,
    acting: Option<i64>,
    target: &TargetArgs,
    role: &str,
    actor: &str,
    format: OutputFormat,
) -> Result<()> {
    let auth = ctx.acting(acting).await?;
    let actee = target.actee();
    let outcome = ctx.service.grant_role(&auth, &actee, role, actor).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "success": true,
            "created": outcome.created,
            "assignment": outcome.assignment,
        }))?,
        OutputFormat::Text => {
            let note = if outcome.created { "" } else { " (already held)" };
            println!(
                "{} role {} to actor {} on {}{}",
                "Granted".green().bold(),
                outcome.assignment.role_id,
                outcome.assignment.actor_id,
                actee,
                note
            );
        }
    }

    Ok(())
}

pub async fn revoke(
    ctx: &Context,
    acting: Option<i64>,
    target: &TargetArgs,
    role: &str,
    actor: &str,
    format: OutputFormat,
) -> Result<()> {
    let auth = ctx.acting(acting).await?;
    let actee = target.actee();

    match ctx.service.revoke_role(&auth, &actee, role, actor).await? {
        Revocation::Revoked => match format {
            OutputFormat::Json => print_json(&json!({ "success": true })),
            OutputFormat::Text => {
                println!(
                    "{} role {} from actor {} on {}",
                    "Revoked".green().bold(),
                    role,
                    actor,
                    actee
                );
                Ok(())
            }
        },
        Revocation::NotAssigned => {
            bail!("actor {} does not hold role {} on {}", actor, role, actee)
        }
    }
}

/// Per-form roll-up for a project.
pub async fn summary(
    ctx: &Context,
    acting: Option<i64>,
    project_id: i64,
    role: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let auth = ctx.acting(acting).await?;

    match role {
        Some(role) => {
            let summaries = ctx
                .service
                .form_summaries_for_role(&auth, project_id, &role)
                .await?;
            match format {
                OutputFormat::Json => print_json(&summaries)?,
                OutputFormat::Text => {
                    for summary in &summaries {
                        println!("{}", summary.xml_form_id.bold());
                        for actor in &summary.actors {
                            println!("  {}", actor_line(actor));
                        }
                    }
                }
            }
        }
        None => {
            let summaries = ctx.service.form_summaries(&auth, project_id).await?;
            match format {
                OutputFormat::Json => print_json(&summaries)?,
                OutputFormat::Text => {
                    for summary in &summaries {
                        println!("{}", summary.xml_form_id.bold());
                        for (role_id, actors) in &summary.roles {
                            println!("  role {}", role_id);
                            for actor in actors {
                                println!("    {}", actor_line(actor));
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
