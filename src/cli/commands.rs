//! CLI commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::bot::Bot;
use crate::config::Config;
use crate::core::AppState;
use crate::db::{Database, SessionStore, StoreError};
use crate::session::ConversationId;
use crate::transport::console::{parse_line, ConsoleLine};
use crate::transport::ConsoleTransport;

#[derive(Parser)]
#[command(name = "trainwatch")]
#[command(about = "Train ticket search wizard with price monitoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.trainwatch/config.yml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Database path, overrides the config file
    #[arg(long, global = true)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the bot on the console
    Chat {
        /// Conversation to act as
        #[arg(long, default_value = "1")]
        conversation: i64,
    },

    /// List stored conversations
    Sessions,

    /// Print one stored session as JSON
    Show {
        /// Conversation ID
        conversation: i64,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    let db_path = match cli.database {
        Some(path) => PathBuf::from(path),
        None => config.resolve_db_path()?,
    };
    let db = Database::new(&db_path)?;

    // Create a multi-threaded runtime for CLI operations
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        match cli.command {
            Commands::Chat { conversation } => {
                let transport = Arc::new(ConsoleTransport::new());
                let state = AppState::from_config(&config, db, transport)?;
                let timeout = config.monitor.shutdown_timeout();
                chat(&state, ConversationId(conversation), timeout).await
            }

            Commands::Sessions => {
                let store = SessionStore::new(db);
                let ids = store.list_ids().await?;

                if ids.is_empty() {
                    println!("No sessions found");
                }
                for id in ids {
                    match store.read(id).await {
                        Ok(session) => {
                            let watching =
                                session.forms_status.iter().filter(|s| s.watching).count();
                            println!(
                                "[{}] {} (step {}) - {} forms, {} watched",
                                id,
                                session.command.as_str(),
                                session.step.name(),
                                session.complete_forms().count(),
                                watching
                            );
                        }
                        Err(e @ StoreError::Corrupt { .. }) => {
                            println!("[{}] unreadable: {}", id, e)
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(())
            }

            Commands::Show { conversation } => {
                let store = SessionStore::new(db);
                let session = store
                    .read(ConversationId(conversation))
                    .await
                    .with_context(|| format!("Failed to read session {}", conversation))?;

                println!("{}", serde_json::to_string_pretty(&session)?);
                Ok(())
            }
        }
    })
}

/// Console loop: one stdin line per inbound update
async fn chat(
    state: &AppState,
    conversation: ConversationId,
    shutdown_timeout: Duration,
) -> Result<()> {
    let resumed = state.watchers.resume().await?;
    info!(conversation = %conversation, resumed, "Chat started, type /help");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                dispatch(&state.bot, conversation, &line).await?;
            }
        }
    }

    state.watchers.shutdown(shutdown_timeout).await;
    Ok(())
}

async fn dispatch(bot: &Bot, conversation: ConversationId, line: &str) -> Result<()> {
    match parse_line(line) {
        ConsoleLine::Command { name, args } => bot.on_command(conversation, &name, &args).await?,
        ConsoleLine::Text(text) => bot.on_free_text(conversation, &text).await?,
        ConsoleLine::Choice(token) => bot.on_choice_selected(conversation, &token).await?,
        ConsoleLine::Date(date) => bot.on_date_selected(conversation, date).await?,
        ConsoleLine::Invalid(hint) => eprintln!("{}", hint),
        ConsoleLine::Empty => {}
    }
    Ok(())
}
