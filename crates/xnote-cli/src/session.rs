use std::path::PathBuf;

use xnote_core::auth::LoginNavigator;
use xnote_core::config::ClientConfig;

use crate::error::CliError;

const CONFIG_DIR_NAME: &str = "xnote";
const TOKEN_FILE_NAME: &str = "session.json";

/// Login "redirect" for a terminal: point the user at `xnote auth login`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNavigator;

impl LoginNavigator for TerminalNavigator {
    fn redirect_to_login(&self) {
        eprintln!("Your session is missing or has expired. Run `xnote auth login` to sign in.");
    }
}

pub fn default_token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(TOKEN_FILE_NAME))
}

/// Pick the token file: explicit flag, then `XNOTE_TOKEN_PATH`, then the
/// per-user config directory.
pub fn resolve_token_path(
    flag: Option<PathBuf>,
    config: &ClientConfig,
) -> Result<PathBuf, CliError> {
    flag.or_else(|| config.token_path.clone())
        .or_else(default_token_path)
        .ok_or_else(|| {
            CliError::Config(
                "Could not determine a config directory; pass --token-path".to_string(),
            )
        })
}
