//! In-memory store for offline runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sonda_core::{AnswerRecord, SessionRecord};
use tokio::sync::Mutex;

use crate::{SessionStore, StoreError};

/// Keeps the hosted backend's observable semantics: duplicate creates are
/// rejected, upserts replace, listings come back ordered by question id.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    sessions: BTreeMap<String, SessionRecord>,
    // Keyed by (session_id, question_id); the key order gives listings
    // their question-id order for free.
    answers: BTreeMap<(String, u32), AnswerRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &SessionRecord) -> Result<SessionRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate(session.id.clone()));
        }
        let now = Utc::now();
        let mut stored = session.clone();
        stored.created_at = Some(now);
        stored.updated_at = Some(now);
        inner.sessions.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.get(session_id).cloned())
    }

    async fn upsert_answer(&self, answer: &AnswerRecord) -> Result<AnswerRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        let key = (answer.session_id.clone(), answer.question_id);
        let now = Utc::now();
        let mut stored = answer.clone();
        stored.created_at = inner
            .answers
            .get(&key)
            .and_then(|prev| prev.created_at)
            .or(Some(now));
        stored.updated_at = Some(now);
        inner.answers.insert(key, stored.clone());
        Ok(stored)
    }

    async fn list_answers(&self, session_id: &str) -> Result<Vec<AnswerRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn get_answer(
        &self,
        session_id: &str,
        question_id: u32,
    ) -> Result<Option<AnswerRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .answers
            .get(&(session_id.to_string(), question_id))
            .cloned())
    }

    /// Unknown session ids are a no-op, like a PATCH matching zero rows.
    async fn update_progress(
        &self,
        session_id: &str,
        current_section: u32,
        completion: u8,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.sessions.get_mut(session_id) {
            session.current_section = current_section;
            session.completion_percentage = completion;
            session.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_completed(&self, session_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.sessions.get_mut(session_id) {
            session.is_completed = true;
            session.completion_percentage = 100;
            session.updated_at = Some(Utc::now());
        }
        Ok(())
    }
}
