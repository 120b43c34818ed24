//! Line-oriented console transport for driving the bot locally

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use super::{Outbound, Transport, TransportError};
use crate::session::ConversationId;

/// Prints every outbound message to stdout
pub struct ConsoleTransport {
    out: Mutex<Stdout>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a message the way the console shows it
pub fn render(to: ConversationId, message: &Outbound) -> String {
    match message {
        Outbound::Text(text) => format!("[{}] {}\n", to, text),
        Outbound::Choices { prompt, options } => {
            let mut rendered = format!("[{}] {}\n", to, prompt);
            for option in options {
                rendered.push_str(&format!("    !pick {:<16} {}\n", option.token, option.label));
            }
            rendered
        }
        Outbound::DatePicker { prompt } => format!("[{}] {}\n    !date YYYY-MM-DD\n", to, prompt),
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, to: ConversationId, message: Outbound) -> Result<(), TransportError> {
        let mut out = self.out.lock().await;
        out.write_all(render(to, &message).as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}

/// One line typed on the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Command { name: String, args: String },
    Text(String),
    Choice(String),
    Date(NaiveDate),
    Invalid(String),
    Empty,
}

pub fn parse_line(line: &str) -> ConsoleLine {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleLine::Empty;
    }

    if let Some(rest) = line.strip_prefix('/') {
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return ConsoleLine::Command {
            name: name.to_lowercase(),
            args: args.trim().to_string(),
        };
    }

    if let Some(token) = line.strip_prefix("!pick") {
        let token = token.trim();
        if token.is_empty() {
            return ConsoleLine::Invalid("usage: !pick <token>".to_string());
        }
        return ConsoleLine::Choice(token.to_string());
    }

    if let Some(date) = line.strip_prefix("!date") {
        return match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
            Ok(date) => ConsoleLine::Date(date),
            Err(_) => ConsoleLine::Invalid("usage: !date YYYY-MM-DD".to_string()),
        };
    }

    ConsoleLine::Text(line.to_string())
}
