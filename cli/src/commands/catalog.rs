//! Minimal catalog management so a fresh database can be populated.

use anyhow::Result;
use entities::ActorKind;

use super::{print_json, Context, OutputFormat};

pub async fn create_actor(
    ctx: &Context,
    kind: ActorKind,
    display_name: &str,
    format: OutputFormat,
) -> Result<()> {
    let actor = ctx.service.catalog().create_actor(kind, display_name).await?;
    match format {
        OutputFormat::Json => print_json(&actor)?,
        OutputFormat::Text => println!("Created actor {} ({})", actor.id, actor.kind),
    }
    Ok(())
}

pub async fn create_session(ctx: &Context, actor_id: i64, format: OutputFormat) -> Result<()> {
    let session = ctx.sessions.create_session(actor_id).await?;
    match format {
        OutputFormat::Json => print_json(&session)?,
        OutputFormat::Text => println!("{}", session.token),
    }
    Ok(())
}

pub async fn create_project(ctx: &Context, name: &str, format: OutputFormat) -> Result<()> {
    let project = ctx.service.catalog().create_project(name).await?;
    match format {
        OutputFormat::Json => print_json(&project)?,
        OutputFormat::Text => println!("Created project {} ({})", project.id, project.name),
    }
    Ok(())
}

pub async fn create_form(
    ctx: &Context,
    project_id: i64,
    xml_form_id: &str,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let form = ctx
        .service
        .catalog()
        .create_form(project_id, xml_form_id, name.unwrap_or(xml_form_id))
        .await?;
    match format {
        OutputFormat::Json => print_json(&form)?,
        OutputFormat::Text => println!(
            "Created form {} in project {}",
            form.xml_form_id, form.project_id
        ),
    }
    Ok(())
}

/// Live forms of a project, ordered by xmlFormId.
pub async fn list_forms(ctx: &Context, project_id: i64, format: OutputFormat) -> Result<()> {
    let forms = ctx.service.catalog().list_forms(project_id).await?;
    match format {
        OutputFormat::Json => print_json(&forms)?,
        OutputFormat::Text => {
            for form in &forms {
                println!("{}  {}", form.xml_form_id, form.name);
            }
        }
    }
    Ok(())
}
