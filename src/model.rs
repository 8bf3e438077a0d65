//! Core data model.
//!
//! A transcript decomposes into [`Turn`]s; analysis condenses them into a
//! [`StyleSignature`] and a [`PersonaReport`]. All enum fields repair to a
//! documented default when a provider hands back something out of set.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// One timestamped utterance by one speaker, possibly spanning multiple
/// source lines (continuation lines are folded in with `\n`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Free-form timestamp as it appeared in the export. Not guaranteed to
    /// parse to a calendar type; turns are ordered by file appearance.
    pub timestamp: String,
    pub speaker: String,
    pub text: String,
    /// Source line of the turn's first line, for traceability only.
    pub source_line: usize,
}

// ---------------------------------------------------------------------------
// Style signature
// ---------------------------------------------------------------------------

/// Unsupervised fingerprint of how a speaker writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSignature {
    /// Mean message length in characters, truncated to an integer.
    pub average_length: usize,
    /// Most frequent sentence endings (last 1-2 characters), at most 5.
    pub top_endings: Vec<String>,
    /// Most frequent tokens, at most 6.
    pub top_tokens: Vec<String>,
}

// ---------------------------------------------------------------------------
// Persona profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HonorificLevel {
    Informal,
    Polite,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmojiUsage {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Punctuation {
    Short,
    #[default]
    Normal,
    Many,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// How the speaker phrases things: endings, formality, emoji, punctuation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechStyle {
    #[serde(default)]
    pub endings: Vec<String>,
    #[serde(default)]
    pub honorific_level: HonorificLevel,
    #[serde(default)]
    pub emoji_usage: EmojiUsage,
    #[serde(default)]
    pub punctuation: Punctuation,
}

/// A synthetic example exchange the model proposed for few-shot priming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub user: String,
    pub persona: String,
}

/// The full persona profile used to condition generated replies.
///
/// Every list holds only strings and every enum holds an in-set value;
/// [`crate::persona::normalize_report`] guarantees this on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaProfile {
    #[serde(default)]
    pub nickname_rules: Vec<String>,
    #[serde(default)]
    pub speech_style: SpeechStyle,
    #[serde(default)]
    pub favorite_topics: Vec<String>,
    #[serde(default)]
    pub taboo_topics: Vec<String>,
    #[serde(default)]
    pub response_length: ResponseLength,
    #[serde(default)]
    pub typical_patterns: Vec<String>,
    #[serde(default)]
    pub few_shot_examples: Vec<FewShotExample>,
}

/// Output of the persona-build phase: a prose summary plus the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaReport {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub profile: PersonaProfile,
}

// ---------------------------------------------------------------------------
// Style mode
// ---------------------------------------------------------------------------

/// Which signals condition a reply: the persona prompt, retrieved context,
/// or both. Unknown selector strings fall back to hybrid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    Prompt,
    Rag,
    #[default]
    Hybrid,
}

impl StyleMode {
    /// Parse a mode selector, falling back to [`StyleMode::Hybrid`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prompt" => StyleMode::Prompt,
            "rag" => StyleMode::Rag,
            _ => StyleMode::Hybrid,
        }
    }

    pub fn uses_retrieval(self) -> bool {
        matches!(self, StyleMode::Rag | StyleMode::Hybrid)
    }

    pub fn uses_persona_prompt(self) -> bool {
        matches!(self, StyleMode::Prompt | StyleMode::Hybrid)
    }
}

impl std::fmt::Display for StyleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StyleMode::Prompt => "prompt",
            StyleMode::Rag => "rag",
            StyleMode::Hybrid => "hybrid",
        };
        write!(f, "{s}")
    }
}
