//! Compressed conversational memory.
//!
//! Instead of storing transcripts, the caller persists a single bounded,
//! model-readable string between turns. The pipeline only ever consumes one
//! value and produces a new one; it never mutates memory in place.

use serde::{Deserialize, Serialize};

/// The fixed sections a compressed memory snapshot is organised into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySection {
    ProfileSummary,
    ActiveGoals,
    ConversationHighlights,
    AdviceGiven,
    ActionItems,
    KeyNumbers,
}

impl MemorySection {
    /// All sections, in the order they appear in a snapshot.
    pub const ALL: [MemorySection; 6] = [
        MemorySection::ProfileSummary,
        MemorySection::ActiveGoals,
        MemorySection::ConversationHighlights,
        MemorySection::AdviceGiven,
        MemorySection::ActionItems,
        MemorySection::KeyNumbers,
    ];

    /// The bold header the section is introduced with.
    pub fn header(self) -> &'static str {
        match self {
            MemorySection::ProfileSummary => "**PROFILE SUMMARY**",
            MemorySection::ActiveGoals => "**ACTIVE GOALS**",
            MemorySection::ConversationHighlights => "**CONVERSATION HIGHLIGHTS**",
            MemorySection::AdviceGiven => "**ADVICE GIVEN**",
            MemorySection::ActionItems => "**ACTION ITEMS**",
            MemorySection::KeyNumbers => "**KEY NUMBERS**",
        }
    }

    /// What the model should put in the section.
    pub fn guidance(self) -> &'static str {
        match self {
            MemorySection::ProfileSummary => {
                "Key financial facts: income, savings rate, risk profile, debt ratio, employment, dependents."
            }
            MemorySection::ActiveGoals => {
                "What financial goals the user is working toward, their status, and any gaps identified."
            }
            MemorySection::ConversationHighlights => {
                "The most important topics discussed across all exchanges: questions asked, concerns raised, and key insights shared."
            }
            MemorySection::AdviceGiven => {
                "Specific actionable recommendations that were provided to the user."
            }
            MemorySection::ActionItems => {
                "Any next steps the user should take based on the conversation."
            }
            MemorySection::KeyNumbers => {
                "Important financial figures referenced (amounts, rates, percentages, dates)."
            }
        }
    }
}

/// An opaque memory blob owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompressedMemory(String);

impl CompressedMemory {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank memory (only whitespace) counts as no memory at all.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Approximate word count, used for logging the soft size bound.
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }
}

impl std::fmt::Display for CompressedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CompressedMemory {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CompressedMemory {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
