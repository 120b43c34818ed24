//! Chat transport boundary
//!
//! The bot only ever sends [`Outbound`] messages. A choice or date picker is
//! answered later through `Bot::on_choice_selected` / `Bot::on_date_selected`.

pub mod console;

use async_trait::async_trait;

use crate::session::ConversationId;

pub use console::ConsoleTransport;

/// One button of a choice prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Text shown on the button
    pub label: String,
    /// Value sent back when the button is pressed
    pub token: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }

    /// Button whose label doubles as its token
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            token: value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Choices {
        prompt: String,
        options: Vec<ChoiceOption>,
    },
    DatePicker {
        prompt: String,
    },
}

impl Outbound {
    pub fn text(text: impl Into<String>) -> Self {
        Outbound::Text(text.into())
    }

    pub fn choices(prompt: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Outbound::Choices {
            prompt: prompt.into(),
            options,
        }
    }

    pub fn date_picker(prompt: impl Into<String>) -> Self {
        Outbound::DatePicker {
            prompt: prompt.into(),
        }
    }

    /// The text part of the message
    pub fn body(&self) -> &str {
        match self {
            Outbound::Text(text) => text,
            Outbound::Choices { prompt, .. } | Outbound::DatePicker { prompt } => prompt,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound half of the chat network
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, to: ConversationId, message: Outbound) -> Result<(), TransportError>;
}
