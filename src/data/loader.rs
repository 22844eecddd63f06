use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::{Question, SessionContext};

use super::normalize::questions_from_value;
use super::source::QuestionSource;

/// Parse a question list in any of the shapes the question service uses.
pub fn parse_questions(json: &str) -> Result<Vec<Question>, SourceError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    questions_from_value(value)
}

pub fn load_questions_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Question>, SourceError> {
    let content = std::fs::read_to_string(path)?;
    parse_questions(&content)
}

/// Questions read from a local JSON file, for offline runs.
///
/// The file is re-read on every fetch so it can be filled in while the
/// session is waiting.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuestionSource for JsonFileSource {
    async fn fetch(&self, _context: &SessionContext) -> Result<Vec<Question>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_questions(&content)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::UserId;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quiz-session-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_parse_questions_file_format() {
        let json = r#"{
            "1": {"title": "Largest organ", "alternativas": {"1": "Brain", "2": "Skin"}, "correta": 2, "timing": 10},
            "2": {"title": "Red planet", "alternativas": {"1": "Mars", "2": "Venus"}, "correta": 1}
        }"#;
        let questions = parse_questions(json).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_text(), Some("Skin"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(parse_questions("{not json"), Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn test_file_source_reads_on_every_fetch() {
        let path = scratch_file("questions.json");
        std::fs::write(&path, "").unwrap();

        let source = JsonFileSource::new(&path);
        let context = SessionContext::new(UserId::new("1"));
        assert!(source.fetch(&context).await.unwrap().is_empty());

        std::fs::write(
            &path,
            r#"[{"id": 1, "title": "t", "options": ["a", "b"], "correct": "a"}]"#,
        )
        .unwrap();
        let questions = source.fetch(&context).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct.as_str(), "1");

        assert_eq!(load_questions_from_json(&path).unwrap(), questions);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let source = JsonFileSource::new(scratch_file("missing.json"));
        let context = SessionContext::new(UserId::new("1"));
        assert!(matches!(source.fetch(&context).await, Err(SourceError::Io(_))));
    }
}
