pub mod assignments;
pub mod audit;
pub mod bootstrap;
pub mod catalog;
pub mod roles;
pub mod serve;

use ::assignments::{ActeeRef, AssignmentService, Auth};
use anyhow::{anyhow, Context as _, Result};
use clap::{Args, ValueEnum};
use database::{initialize_database, Database};
use serde::Serialize;
use std::sync::Arc;
use user::SessionStore;

use crate::config::StewardConfig;
use crate::utils::env_paths::EnvPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Which resource a command addresses; the root when neither flag is given.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Project id
    #[arg(long)]
    pub project: Option<i64>,

    /// Form xmlFormId within the project
    #[arg(long, requires = "project")]
    pub form: Option<String>,
}

impl TargetArgs {
    pub fn actee(&self) -> ActeeRef {
        match (self.project, &self.form) {
            (Some(project_id), Some(xml_form_id)) => {
                ActeeRef::form(project_id, xml_form_id.clone())
            }
            (Some(project_id), None) => ActeeRef::project(project_id),
            _ => ActeeRef::root(),
        }
    }
}

/// Everything a command needs once the database is open.
pub struct Context {
    pub config: StewardConfig,
    pub db: Arc<Database>,
    pub service: AssignmentService,
    pub sessions: SessionStore,
}

impl Context {
    pub async fn open(paths: &EnvPaths, config: StewardConfig) -> Result<Self> {
        let db_config = config.database_config(paths);
        let db = initialize_database(db_config.clone())
            .await
            .with_context(|| format!("Failed to open {}", db_config.database_path.display()))?;

        Ok(Self {
            service: AssignmentService::new(db.clone(), config.service_config()),
            sessions: SessionStore::new(db.clone(), config.sessions.clone()),
            config,
            db,
        })
    }

    /// Authorization context for the actor named with `--as`.
    pub async fn acting(&self, actor_id: Option<i64>) -> Result<Auth> {
        let actor_id = actor_id.ok_or_else(|| anyhow!("this command needs --as <ACTOR_ID>"))?;
        let actor = self
            .service
            .catalog()
            .get_actor(actor_id)
            .await?
            .ok_or_else(|| anyhow!("acting actor {} not found", actor_id))?;
        Ok(self.service.auth_for(actor))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_selects_actee() {
        let root = TargetArgs {
            project: None,
            form: None,
        };
        assert_eq!(root.actee(), ActeeRef::root());

        let form = TargetArgs {
            project: Some(4),
            form: Some("household".to_string()),
        };
        assert_eq!(form.actee(), ActeeRef::form(4, "household"));
    }
}
