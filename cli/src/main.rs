use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use entities::ActorKind;
use std::path::PathBuf;

mod commands;
mod config;
mod logging;
mod utils;

use commands::{
    assignments::{self, ListOptions},
    audit, bootstrap, catalog, roles, serve, Context, OutputFormat, TargetArgs,
};
use config::StewardConfig;
use utils::env_paths::EnvPaths;

/// Steward - role assignment and authorization for projects and forms
#[derive(Parser)]
#[command(name = "stw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database file (overrides configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Actor performing the operation
    #[arg(long = "as", value_name = "ACTOR_ID", global = true)]
    acting: Option<i64>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show the role catalog
    Roles,

    /// List assignments on the root, a project or a form
    List {
        #[command(flatten)]
        target: TargetArgs,

        /// Only actors holding this role (id or system name)
        #[arg(long)]
        role: Option<String>,

        /// Include full actor records
        #[arg(long)]
        extended: bool,

        #[arg(long)]
        offset: Option<i64>,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Grant a role to an actor
    Grant {
        #[command(flatten)]
        target: TargetArgs,

        /// Role id or system name
        role: String,

        /// Actor receiving the role
        actor: String,
    },

    /// Revoke a role from an actor
    Revoke {
        #[command(flatten)]
        target: TargetArgs,

        /// Role id or system name
        role: String,

        /// Actor losing the role
        actor: String,
    },

    /// Per-form assignments for a project
    Summary {
        project: i64,

        /// Only this role (id or system name)
        #[arg(long)]
        role: Option<String>,
    },

    /// Audit trail commands
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },

    /// Create the first administrator and print a session token
    Bootstrap {
        /// Display name of the administrator
        name: String,
    },

    /// Actor management
    Actor {
        #[command(subcommand)]
        action: ActorAction,
    },

    /// Project management
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Form management
    Form {
        #[command(subcommand)]
        action: FormAction,
    },
}

#[derive(Subcommand)]
enum AuditAction {
    /// Check the hash chain
    Verify,

    /// Show recent audit records, newest first
    List {
        /// Only records for this actee id
        #[arg(long)]
        actee: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum ActorAction {
    /// Create an actor
    Create {
        name: String,

        /// user, field_key, public_link or single_use
        #[arg(long, default_value = "user")]
        kind: ActorKind,
    },

    /// Issue a session token for an actor
    Token { actor: i64 },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Create { name: String },
}

#[derive(Subcommand)]
enum FormAction {
    /// Create a form in a project
    Create {
        project: i64,
        xml_form_id: String,
        #[arg(long)]
        name: Option<String>,
    },

    /// List the live forms of a project
    List { project: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = EnvPaths::load()?;
    let mut config = StewardConfig::load(&paths)?;
    if let Some(database) = cli.database {
        config.database.path = Some(database);
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let _guard = logging::init_logging(&paths, &config.logging.level)?;

    let ctx = Context::open(&paths, config).await?;
    let format = cli.format;
    let acting = cli.acting;

    match cli.command {
        Commands::Serve { host, port } => serve::execute(ctx, host, port).await?,
        Commands::Roles => roles::list(&ctx, format).await?,
        Commands::List {
            target,
            role,
            extended,
            offset,
            limit,
        } => {
            let options = ListOptions {
                role,
                extended,
                offset,
                limit,
            };
            assignments::list(&ctx, acting, &target, options, format).await?
        }
        Commands::Grant {
            target,
            role,
            actor,
        } => assignments::grant(&ctx, acting, &target, &role, &actor, format).await?,
        Commands::Revoke {
            target,
            role,
            actor,
        } => assignments::revoke(&ctx, acting, &target, &role, &actor, format).await?,
        Commands::Summary { project, role } => {
            assignments::summary(&ctx, acting, project, role, format).await?
        }
        Commands::Audit { action } => match action {
            AuditAction::Verify => audit::verify(&ctx).await?,
            AuditAction::List { actee, limit } => audit::list(&ctx, actee, limit, format).await?,
        },
        Commands::Bootstrap { name } => bootstrap::execute(&ctx, &name, format).await?,
        Commands::Actor { action } => match action {
            ActorAction::Create { name, kind } => {
                catalog::create_actor(&ctx, kind, &name, format).await?
            }
            ActorAction::Token { actor } => catalog::create_session(&ctx, actor, format).await?,
        },
        Commands::Project { action } => match action {
            ProjectAction::Create { name } => catalog::create_project(&ctx, &name, format).await?,
        },
        Commands::Form { action } => match action {
            FormAction::Create {
                project,
                xml_form_id,
                name,
            } => {
                catalog::create_form(&ctx, project, &xml_form_id, name.as_deref(), format).await?
            }
            FormAction::List { project } => catalog::list_forms(&ctx, project, format).await?,
        },
    }

    Ok(())
}
