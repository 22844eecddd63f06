use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StorageError;
use crate::models::{AnswerKey, GroupId, QuestionId, Summary};

use super::kv::KeyValueStore;

/// Key under which the whole summary is stored as one JSON value.
pub const SUMMARY_KEY: &str = "quizSummary";

/// Per-field keys written by earlier clients. Read as a fallback and removed
/// on clear.
pub const LEGACY_CORRECT_KEY: &str = "totalCorretas";
pub const LEGACY_TOTAL_KEY: &str = "totalQuestoes";
pub const LEGACY_ANSWERS_KEY: &str = "respostasQuiz";
pub const LEGACY_CORRECTNESS_KEY: &str = "respostasCertas";

/// Owned by the group selection screen; only read here.
pub const SELECTED_GROUP_KEY: &str = "turmaSelecionada";

const SESSION_KEYS: [&str; 5] = [
    SUMMARY_KEY,
    LEGACY_CORRECT_KEY,
    LEGACY_TOTAL_KEY,
    LEGACY_ANSWERS_KEY,
    LEGACY_CORRECTNESS_KEY,
];

/// Stores the finalized summary so the results screen can read it back.
#[derive(Clone)]
pub struct ResultStore {
    store: Arc<dyn KeyValueStore>,
}

impl ResultStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Save the summary. Saving the same summary again stores the same value.
    pub async fn save(&self, summary: &Summary) -> Result<(), StorageError> {
        let json = serde_json::to_string(summary)?;
        self.store.set(SUMMARY_KEY, json).await
    }

    pub async fn load(&self) -> Result<Option<Summary>, StorageError> {
        match self.store.get(SUMMARY_KEY).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|err| StorageError::Corrupt(format!("{SUMMARY_KEY}: {err}"))),
            None => self.load_legacy().await,
        }
    }

    async fn load_legacy(&self) -> Result<Option<Summary>, StorageError> {
        let (Some(correct), Some(total)) = (
            self.store.get(LEGACY_CORRECT_KEY).await?,
            self.store.get(LEGACY_TOTAL_KEY).await?,
        ) else {
            return Ok(None);
        };

        let answers: BTreeMap<QuestionId, AnswerKey> = match self.store.get(LEGACY_ANSWERS_KEY).await? {
            Some(json) => serde_json::from_str(&json)?,
            None => BTreeMap::new(),
        };
        let correctness: BTreeMap<QuestionId, bool> =
            match self.store.get(LEGACY_CORRECTNESS_KEY).await? {
                Some(json) => serde_json::from_str(&json)?,
                None => BTreeMap::new(),
            };

        Ok(Some(Summary {
            correct: parse_count(LEGACY_CORRECT_KEY, &correct)?,
            total: parse_count(LEGACY_TOTAL_KEY, &total)?,
            answers,
            correctness,
        }))
    }

    /// Remove every session-scoped key. Safe when nothing is stored.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&SESSION_KEYS).await
    }

    pub async fn selected_group(&self) -> Result<Option<GroupId>, StorageError> {
        Ok(self
            .store
            .get(SELECTED_GROUP_KEY)
            .await?
            .map(|raw| raw.trim().trim_matches('"').to_string())
            .filter(|raw| !raw.is_empty())
            .map(GroupId::new))
    }

    pub async fn remember_group(&self, group: &GroupId) -> Result<(), StorageError> {
        self.store
            .set(SELECTED_GROUP_KEY, group.as_str().to_string())
            .await
    }
}

fn parse_count(key: &str, raw: &str) -> Result<u32, StorageError> {
    raw.trim()
        .trim_matches('"')
        .parse()
        .map_err(|err| StorageError::Corrupt(format!("{key}: {raw:?}: {err}")))
}
