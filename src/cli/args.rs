//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lexchat - talk to the legal assistant from your terminal
#[derive(Parser, Debug)]
#[command(name = "lexchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Backend base URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// State file holding the session and credentials
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Keep state in memory for this run only
    #[arg(long, global = true, conflicts_with = "state_file")]
    pub in_memory: bool,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat (default)
    Chat {
        /// Continue an existing chat
        #[arg(long)]
        chat: Option<String>,
    },

    /// Send a single message and print the answer
    Send {
        /// Send into an existing chat
        #[arg(long)]
        chat: Option<String>,

        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Log in with email and password
    Login {
        /// Account email
        #[arg(short, long)]
        username: String,

        /// Password (prompted for when omitted)
        #[arg(long, env = "LEXCHAT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: String,

        /// Password (prompted for when omitted)
        #[arg(long, env = "LEXCHAT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget stored credentials
    Logout,

    /// Show session, usage, and health
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List your chats
    Chats,

    /// Print the messages of a chat
    History {
        chat_id: String,
    },

    /// Open a shared chat and continue it
    Shared {
        chat_id: String,
    },
}
