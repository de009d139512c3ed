use std::io::{self, BufRead, Write};

use chrono::DateTime;
use xnote_core::auth::Credentials;

use crate::cli::AuthCommands;
use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_auth(
    command: AuthCommands,
    context: &Context,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            if password.is_empty() {
                return Err(CliError::EmptyPassword);
            }
            let credentials = Credentials::new(username.trim(), password);
            if !context.session.login(context.api.as_ref(), &credentials).await {
                return Err(CliError::LoginFailed);
            }
            writeln!(out, "Signed in as {}", credentials.username)?;
        }
        AuthCommands::Logout => {
            context.session.logout();
            writeln!(out, "Signed out")?;
        }
        AuthCommands::Status => {
            if context.session.is_authenticated() {
                let expires = context
                    .session
                    .expires_at()
                    .and_then(|exp| DateTime::from_timestamp(exp, 0))
                    .map_or_else(|| "unknown".to_string(), |at| at.to_rfc3339());
                writeln!(out, "Signed in (session expires at {expires})")?;
            } else if context.session.token().is_some() {
                writeln!(out, "Session expired. Run `xnote auth login` to sign in again.")?;
            } else {
                writeln!(out, "Not signed in.")?;
            }
        }
    }
    Ok(())
}

fn read_password() -> Result<String, CliError> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
