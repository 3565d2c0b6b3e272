use std::path::PathBuf;

use clap::{Parser, Subcommand};
use newsfeed_client::config::BASE_URL_ENV;

#[derive(Parser)]
#[command(name = "newsfeed")]
#[command(version)]
#[command(about = "Client for the AI newsfeed and chat assistant API")]
pub struct Cli {
    /// API base URL, overriding the config file
    #[arg(long, global = true, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Signs in and stores the credential pair
    Signin { username: String, password: String },
    /// Creates an account; it must be activated by email
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Revokes the session and clears stored credentials
    Logout,
    /// Sends a password reset email
    ResetPassword { email: String },
    /// Shows backend health
    Status,
    /// Lists what the assistant can do
    Capabilities,
    /// Chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Sends a message to the assistant
    Chat {
        message: String,
        /// Continue an existing session
        #[arg(long, value_name = "SESSION_ID")]
        session: Option<String>,
    },
    /// Shows trending hashtags
    Hashtags,
    /// Knowledge store of saved items
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
    /// Video transcripts and summaries
    Video {
        #[command(subcommand)]
        command: VideoCommands,
    },
    /// Polls an API path and prints each payload
    Poll {
        /// API path, e.g. /api/chat/status/
        path: String,
        /// Seconds between polls (defaults to the configured interval)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Lists sessions, most recent first
    List {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Starts a new session
    New,
    /// Shows the messages of a session
    History {
        #[arg(value_name = "SESSION_ID")]
        id: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Archives a session
    Archive {
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
    /// Drops the current session and gets a fresh id
    Reset {
        #[arg(value_name = "SESSION_ID")]
        id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum KnowledgeCommands {
    /// Saves a feed item
    Add {
        content_id: String,
        user_id: String,
        platform: String,
        summary: String,
        /// Unix seconds (defaults to now)
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Searches saved items by meaning
    Query {
        user_id: String,
        query: String,
        #[arg(long, default_value_t = 3)]
        top_k: u32,
        /// Only items saved at or after this unix time
        #[arg(long, value_name = "UNIX_SECS")]
        since: Option<i64>,
        #[arg(long)]
        platform: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum VideoCommands {
    /// Uploads a video for transcription and summary
    Analyze { file: PathBuf },
    /// Lists previous analyses
    History,
}
