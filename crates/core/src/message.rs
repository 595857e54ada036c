//! Conversation turn types.
//!
//! Raw history enters the pipeline as a structured, versioned turn list.
//! Turns are ephemeral: they only feed query contextualization and are
//! never persisted by the pipeline.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Current wire version of [`TurnHistory`].
pub const TURN_HISTORY_VERSION: u32 = 1;

/// The role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

impl Role {
    /// Label used when rendering turns into a prompt.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single exchange message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An ordered list of the most recent turns, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnHistory {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub turns: Vec<ConversationTurn>,
}

fn default_version() -> u32 {
    TURN_HISTORY_VERSION
}

impl TurnHistory {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self {
            version: TURN_HISTORY_VERSION,
            turns,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// The last `n` turns, in chronological order.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// Reject payloads written for a format this build does not understand.
    pub fn validate(&self) -> Result<(), Error> {
        if self.version != TURN_HISTORY_VERSION {
            return Err(Error::InvalidInput(format!(
                "unsupported turn history version {} (expected {})",
                self.version, TURN_HISTORY_VERSION
            )));
        }
        Ok(())
    }
}

impl Default for TurnHistory {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<ConversationTurn>> for TurnHistory {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self::new(turns)
    }
}
