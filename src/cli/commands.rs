use clap::{Parser, Subcommand};
use pbot::session::MessageRole;

/// `pbot` - durable per-session conversation memory for chat responders.
#[derive(Parser, Debug)]
#[command(name = "pbot")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and drive the conversation memory store.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a freshly generated session id
    NewSession,

    /// Append one message to a session
    Append {
        /// Session identifier
        session_id: String,

        /// Message author (user, assistant)
        role: MessageRole,

        /// Message text (cut at the configured limit)
        content: String,

        /// Reference to an externally stored attachment
        #[arg(long)]
        image_ref: Option<String>,
    },

    /// Print the formatted recent history of a session
    History {
        session_id: String,

        /// Number of trailing messages to render (default: memory.history_max_messages)
        #[arg(short, long)]
        max_messages: Option<usize>,
    },

    /// Print the bounded context window for a new message
    Context {
        session_id: String,

        /// The incoming message
        message: String,

        /// Minimum user turns to keep (default: memory.context_turns)
        #[arg(long)]
        max_turns: Option<usize>,

        /// Character ceiling once the turn floor is met (default: memory.context_char_limit)
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Administer stored sessions
    #[command(subcommand)]
    Sessions(SessionCommands),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List all sessions with message counts
    List,
    /// Show one session's full transcript as JSON
    Show { session_id: String },
    /// Remove all messages but keep the session
    Clear { session_id: String },
    /// Delete a session and its stored record
    Delete { session_id: String },
}
