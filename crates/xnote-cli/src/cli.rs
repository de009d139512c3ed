use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xnote_core::NoteId;

#[derive(Parser)]
#[command(name = "xnote")]
#[command(about = "Write, browse, and sentiment-analyze notes from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Gateway base URL (overrides XNOTE_GATEWAY_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub gateway_url: Option<String>,

    /// Path to the session token file (overrides XNOTE_TOKEN_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub token_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, sign out, or inspect the current session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List notes
    #[command(alias = "ls")]
    List {
        /// Only show notes whose title or content contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one note
    Show {
        /// Note ID
        id: NoteId,
    },
    /// Create a new note
    #[command(alias = "new")]
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        content: String,
    },
    /// Edit an existing note
    Edit {
        /// Note ID
        id: NoteId,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a note
    #[command(alias = "rm")]
    Delete {
        /// Note ID
        id: NoteId,
    },
    /// Run sentiment analysis on a note
    Analyze {
        /// Note ID
        id: NoteId,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Exchange username and password for a session token
    Login {
        #[arg(short, long)]
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show whether a valid session is stored
    Status,
}
