//! HTTP client for the school quiz service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ScoreError, SourceError};
use crate::models::{Question, SessionContext, UserId};

use super::normalize::questions_from_value;
use super::source::{QuestionSource, ScoreService};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ScoreUpdate {
    pontuacao: u32,
}

/// Question and scoring endpoints behind one base URL.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    base_url: String,
}

impl HttpQuizApi {
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn questions_url(&self, user_id: &UserId) -> String {
        format!("{}/aluno/{}/questoes", self.base_url, user_id)
    }

    fn score_url(&self, user_id: &UserId) -> String {
        format!("{}/aluno/{}/pontuacao", self.base_url, user_id)
    }
}

#[async_trait]
impl QuestionSource for HttpQuizApi {
    async fn fetch(&self, context: &SessionContext) -> Result<Vec<Question>, SourceError> {
        let url = self.questions_url(&context.user_id);
        debug!(%url, "fetching questions");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status));
        }

        let body: Value = response.json().await?;
        questions_from_value(body)
    }
}

#[async_trait]
impl ScoreService for HttpQuizApi {
    async fn update_score(&self, user_id: &UserId, score: u32) -> Result<(), ScoreError> {
        let response = self
            .client
            .put(self.score_url(user_id))
            .json(&ScoreUpdate { pontuacao: score })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScoreError::HttpStatus(status));
        }

        // Some deployments answer 200 with an error code in the body.
        let body: Value = response.json().await.unwrap_or(Value::Null);
        check_score_body(&body)?;

        info!(%user_id, score, "score submitted");
        Ok(())
    }
}

fn check_score_body(body: &Value) -> Result<(), ScoreError> {
    let Some(code) = body.get("status_code").and_then(Value::as_u64) else {
        return Ok(());
    };
    if (200..300).contains(&code) {
        return Ok(());
    }
    let message = ["message", "messege", "error"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .unwrap_or("no message")
        .to_string();
    Err(ScoreError::Rejected(format!("{code}: {message}")))
}
