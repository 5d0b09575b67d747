//! NoteMaster CLI - Command-line client for the NoteMaster notes service
//!
//! Signs in against the remote API, keeps the access token in the OS
//! keychain per profile, and lists, shows, creates, edits and deletes notes.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::List {
            search,
            sort,
            limit,
            json,
        } => run_list(search.as_deref(), sort.into(), limit, json, profile).await?,
        Commands::Show { id, json } => run_show(&id, json, profile).await?,
        Commands::Add { title, content } => run_add(title, content, profile).await?,
        Commands::Edit { id, title, content } => run_edit(&id, title, content, profile).await?,
        Commands::Delete { id, yes } => run_delete(&id, yes, profile).await?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
    }

    Ok(())
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "notemaster=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
