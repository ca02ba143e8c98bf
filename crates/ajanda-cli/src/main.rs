//! Ajanda CLI - agenda reminders from the command line
//!
//! Lists and edits reminders on the agenda backend and keeps their alarms
//! armed while `ajanda watch` runs.

mod cli;
mod commands;
mod config_profiles;
mod error;
mod keychain;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::calendar::run_calendar;
use crate::commands::common::CommandContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::{run_list, ListOptions};
use crate::commands::note::run_note;
use crate::commands::star::run_star;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        if let Some(hint) = error.hint() {
            eprintln!("hint: {hint}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "ajanda=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();
    let data_dir = cli.data_dir.as_deref();

    let Some(command) = cli.command else {
        Cli::command().print_help().map_err(CliError::Io)?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile, data_dir).await?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
        command => {
            let context = CommandContext::load(profile, data_dir)?;
            run_with_context(command, &context).await?;
        }
    }

    Ok(())
}

async fn run_with_context(command: Commands, context: &CommandContext) -> Result<(), CliError> {
    match command {
        Commands::List {
            name,
            from,
            to,
            user,
            status,
            limit,
            json,
            users,
        } => {
            let options = ListOptions {
                name,
                from,
                to,
                user,
                status,
                limit,
                json,
                users,
            };
            run_list(&options, context).await
        }
        Commands::Add(args) => run_add(args, context).await,
        Commands::Edit { id, changes } => run_edit(id, changes, context).await,
        Commands::Delete { id } => run_delete(id, context).await,
        Commands::Star { id } => run_star(id, context).await,
        Commands::Note { command } => run_note(command, context).await,
        Commands::Calendar { day } => run_calendar(day.as_deref(), context).await,
        Commands::Watch { interval } => run_watch(interval, context).await,
        Commands::Config { .. } | Commands::Auth { .. } | Commands::Completions { .. } => Ok(()),
    }
}
