//! PostgREST client for the hosted session store.

use chrono::Utc;
use reqwest::Method;
use sonda_core::{AnswerRecord, SessionRecord};
use tracing::debug;

use crate::{SessionStore, StoreError};

const SESSIONS_TABLE: &str = "discovery_sessions";
const ANSWERS_TABLE: &str = "discovery_responses";

/// Talks to the hosted backend over its REST surface.
///
/// The key is sent both as `apikey` and as a bearer token, which is how
/// PostgREST deployments behind an API gateway expect it.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// `base_url` is the project root, like `https://example.supabase.co`
    /// (no trailing slash); the `/rest/v1` prefix is appended here.
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn upsert_answer_url(&self) -> String {
        format!(
            "{}?on_conflict=session_id,question_id",
            self.table_url(ANSWERS_TABLE)
        )
    }

    fn list_answers_url(&self, session_id: &str) -> String {
        format!(
            "{}?session_id=eq.{}&order=question_id.asc",
            self.table_url(ANSWERS_TABLE),
            session_id
        )
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

async fn into_server_error(resp: reqwest::Response) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Server { status, body }
}

fn single<T>(rows: Vec<T>, operation: &str) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or_else(|| StoreError::Server {
        status: 200,
        body: format!("{operation}: empty representation"),
    })
}

#[async_trait::async_trait]
impl SessionStore for RestStore {
    async fn create_session(&self, session: &SessionRecord) -> Result<SessionRecord, StoreError> {
        let url = self.table_url(SESSIONS_TABLE);
        debug!(id = %session.id, "creating session");
        let resp = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(session)
            .send()
            .await?;
        if resp.status().as_u16() == 409 {
            return Err(StoreError::Duplicate(session.id.clone()));
        }
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        let rows: Vec<SessionRecord> = serde_json::from_str(&resp.text().await?)?;
        single(rows, "create_session")
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let url = format!(
            "{}?id=eq.{}&limit=1",
            self.table_url(SESSIONS_TABLE),
            session_id
        );
        let resp = self.request(Method::GET, &url).send().await?;
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        let rows: Vec<SessionRecord> = serde_json::from_str(&resp.text().await?)?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_answer(&self, answer: &AnswerRecord) -> Result<AnswerRecord, StoreError> {
        let url = self.upsert_answer_url();
        debug!(
            session = %answer.session_id,
            question = answer.question_id,
            "upserting answer"
        );
        let resp = self
            .request(Method::POST, &url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(answer)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        let rows: Vec<AnswerRecord> = serde_json::from_str(&resp.text().await?)?;
        single(rows, "upsert_answer")
    }

    async fn list_answers(&self, session_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        let url = self.list_answers_url(session_id);
        let resp = self.request(Method::GET, &url).send().await?;
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        Ok(serde_json::from_str(&resp.text().await?)?)
    }

    async fn get_answer(
        &self,
        session_id: &str,
        question_id: u32,
    ) -> Result<Option<AnswerRecord>, StoreError> {
        let url = format!(
            "{}?session_id=eq.{}&question_id=eq.{}&limit=1",
            self.table_url(ANSWERS_TABLE),
            session_id,
            question_id
        );
        let resp = self.request(Method::GET, &url).send().await?;
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        let rows: Vec<AnswerRecord> = serde_json::from_str(&resp.text().await?)?;
        Ok(rows.into_iter().next())
    }

    async fn update_progress(
        &self,
        session_id: &str,
        current_section: u32,
        completion: u8,
    ) -> Result<(), StoreError> {
        let url = format!(
            "{}?id=eq.{}",
            self.table_url(SESSIONS_TABLE),
            session_id
        );
        let resp = self
            .request(Method::PATCH, &url)
            .json(&serde_json::json!({
                "current_section": current_section,
                "completion_percentage": completion,
                "updated_at": Utc::now(),
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        Ok(())
    }

    async fn mark_completed(&self, session_id: &str) -> Result<(), StoreError> {
        let url = format!(
            "{}?id=eq.{}",
            self.table_url(SESSIONS_TABLE),
            session_id
        );
        let resp = self
            .request(Method::PATCH, &url)
            .json(&serde_json::json!({
                "is_completed": true,
                "completion_percentage": 100,
                "updated_at": Utc::now(),
            }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(into_server_error(resp).await);
        }
        Ok(())
    }
}
