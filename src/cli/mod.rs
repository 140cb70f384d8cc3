pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::policy::Role;

#[derive(Parser)]
#[command(name = "gatectl")]
#[command(about = "Inspect the team-hours route policy and access decisions")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List public routes, protected areas and their allow-lists")]
    Routes,

    #[command(about = "Classify a path and check whether a role may open it")]
    Check {
        #[arg(help = "Request path, e.g. /admin/users")]
        path: String,
        #[arg(long, help = "Role of the signed-in caller (omit for no role)")]
        role: Option<Role>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Routes => commands::routes::handle(output_format),
        Commands::Check { path, role } => commands::check::handle(&path, role, output_format),
    }
}
