//! Xnote CLI - terminal front-end for the session-gated note client.

mod cli;
mod commands;
mod error;
mod session;

#[cfg(test)]
mod tests;

use std::io;

use clap::Parser;
use xnote_core::config::ClientConfig;

use crate::cli::{Cli, Commands};
use crate::commands::analyze::run_analyze;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::Context;
use crate::commands::edit::{run_add, run_delete, run_edit};
use crate::commands::notes::{run_list, run_show};
use crate::error::CliError;
use crate::session::resolve_token_path;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        if !error.is_session_stop() {
            eprintln!("Error: {}", error.user_message());
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(parse_directive("xnote=warn")?)
        .add_directive(parse_directive("xnote_core=warn")?);
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.gateway_url.as_deref() {
        config = config.with_gateway_url(url)?;
    }
    let token_path = resolve_token_path(cli.token_path, &config)?;
    let context = Context::new(&config, token_path)?;

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Auth { command } => run_auth(command, &context, &mut out).await?,
        Commands::List { search, json } => {
            run_list(&context, search.as_deref(), json, &mut out).await?;
        }
        Commands::Show { id } => run_show(&context, id, &mut out).await?,
        Commands::Add { title, content } => run_add(&context, &title, &content, &mut out).await?,
        Commands::Edit { id, title, content } => {
            run_edit(&context, id, title.as_deref(), content.as_deref(), &mut out).await?;
        }
        Commands::Delete { id } => run_delete(&context, id, &mut out).await?,
        Commands::Analyze { id } => run_analyze(&context, id, &mut out).await?,
    }

    Ok(())
}

fn parse_directive(
    directive: &str,
) -> Result<tracing_subscriber::filter::Directive, CliError> {
    directive
        .parse()
        .map_err(|error| CliError::Config(format!("invalid log directive `{directive}`: {error}")))
}
