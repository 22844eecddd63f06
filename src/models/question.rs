use std::fmt;

use serde::{Deserialize, Serialize};

use super::GroupId;

/// Time budget used when a question does not carry its own.
pub const DEFAULT_TIMING_SECS: u32 = 10;

/// Identifier of a question as handed out by the question service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for QuestionId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Key of one answer option ("1", "2", "a", "alt3", ...).
///
/// Keys keep the spelling they arrived with; comparisons go through
/// [`AnswerKey::canonical`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(String);

impl AnswerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trimmed, lower-cased form with an `alt` prefix removed when it is
    /// followed by digits only, so `" ALT2 "`, `"alt2"` and `2` all agree.
    pub fn canonical(&self) -> String {
        let lowered = self.0.trim().to_lowercase();
        match lowered.strip_prefix("alt") {
            Some(rest) if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) => {
                rest.to_string()
            }
            _ => lowered,
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnswerKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for AnswerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<u32> for AnswerKey {
    fn from(key: u32) -> Self {
        Self(key.to_string())
    }
}

impl From<u64> for AnswerKey {
    fn from(key: u64) -> Self {
        Self(key.to_string())
    }
}

impl From<usize> for AnswerKey {
    fn from(key: usize) -> Self {
        Self(key.to_string())
    }
}

/// A single labelled answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: AnswerKey,
    pub text: String,
}

impl AnswerOption {
    pub fn new(key: impl Into<AnswerKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// One quiz question, already normalized by the source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub options: Vec<AnswerOption>,
    /// Key of the correct entry in `options`.
    pub correct: AnswerKey,
    #[serde(default = "default_timing")]
    pub timing: u32,
    #[serde(default)]
    pub group: Option<GroupId>,
}

fn default_timing() -> u32 {
    DEFAULT_TIMING_SECS
}

impl Question {
    /// Effective time budget in seconds; never zero.
    pub fn timing(&self) -> u32 {
        if self.timing == 0 {
            DEFAULT_TIMING_SECS
        } else {
            self.timing
        }
    }

    /// Look up an option by key, tolerating format differences.
    pub fn option(&self, key: &AnswerKey) -> Option<&AnswerOption> {
        let wanted = key.canonical();
        self.options.iter().find(|option| option.key.canonical() == wanted)
    }

    pub fn correct_text(&self) -> Option<&str> {
        self.option(&self.correct).map(|option| option.text.as_str())
    }
}
