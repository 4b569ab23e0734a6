use crate::cli::commands::{Cli, Commands, SessionCommands};
use anyhow::{Context, Result};
use pbot::Config;
use pbot::session::{
    ConversationManager, LogOptions, Message, MessageLog, SessionAdmin, build_context_window,
    format_history,
};
use tracing::info;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let storage_dir = config.storage_dir();
    let log = MessageLog::open_dir(&storage_dir, LogOptions::from(&config.memory))
        .await
        .with_context(|| format!("Failed to open session store at {}", storage_dir.display()))?;

    let result = run(cli.command, &log, &config).await;

    let reconciled = log.flush().await;
    if reconciled > 0 {
        info!(reconciled, "pending session writes flushed");
    }
    result
}

async fn run(command: Commands, log: &MessageLog, config: &Config) -> Result<()> {
    match command {
        Commands::NewSession => {
            println!("{}", ConversationManager::new_session_id());
        }
        Commands::Append {
            session_id,
            role,
            content,
            image_ref,
        } => {
            let mut message = Message::new(role, content);
            if let Some(image_ref) = image_ref {
                message = message.with_image_ref(image_ref);
            }
            let stored = log.try_append(&session_id, message).await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Commands::History {
            session_id,
            max_messages,
        } => {
            let max_messages = max_messages.unwrap_or(config.memory.history_max_messages);
            print!("{}", format_history(log, &session_id, max_messages).await);
        }
        Commands::Context {
            session_id,
            message,
            max_turns,
            max_chars,
        } => {
            let window = build_context_window(
                log,
                &session_id,
                &message,
                max_turns.unwrap_or(config.memory.context_turns),
                max_chars.unwrap_or(config.memory.context_char_limit),
            )
            .await;
            println!("{window}");
        }
        Commands::Sessions(command) => run_sessions(command, &SessionAdmin::new(log)).await?,
    }
    Ok(())
}

async fn run_sessions(command: SessionCommands, admin: &SessionAdmin<'_>) -> Result<()> {
    match command {
        SessionCommands::List => {
            let sessions = admin.list().await?;
            if sessions.is_empty() {
                println!("No sessions.");
            }
            for summary in sessions {
                println!(
                    "{}  messages={}  created={}  updated={}",
                    summary.session_id,
                    summary.message_count,
                    summary.created_at.to_rfc3339(),
                    summary.last_updated.to_rfc3339()
                );
            }
        }
        SessionCommands::Show { session_id } => {
            let session = admin.get(&session_id).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionCommands::Clear { session_id } => {
            admin.clear(&session_id).await?;
            println!("Messages for session {session_id} cleared");
        }
        SessionCommands::Delete { session_id } => {
            admin.delete(&session_id).await?;
            println!("Session {session_id} deleted");
        }
    }
    Ok(())
}
