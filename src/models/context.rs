use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the student taking the quiz.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a class group ("turma").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is playing, handed to the session at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: UserId,
    pub group_id: Option<GroupId>,
}

impl SessionContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            group_id: None,
        }
    }

    pub fn with_group(mut self, group_id: Option<GroupId>) -> Self {
        self.group_id = group_id;
        self
    }
}
