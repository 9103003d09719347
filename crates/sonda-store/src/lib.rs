//! Session persistence: the hosted PostgREST backend and an in-memory
//! stand-in with the same observable semantics.

use async_trait::async_trait;
use sonda_core::{AnswerRecord, SessionRecord};

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryStore;

mod rest;
pub use rest::RestStore;

/// The persistence contract the auto-save engine writes through.
///
/// Answers are keyed by `(session_id, question_id)`; `upsert_answer` must
/// replace rather than duplicate, which is what makes concurrent and
/// repeated flushes safe.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session row. Creating an id that already exists is a
    /// [`StoreError::Duplicate`].
    async fn create_session(&self, session: &SessionRecord) -> Result<SessionRecord, StoreError>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Update-or-insert, keyed on `(session_id, question_id)`.
    async fn upsert_answer(&self, answer: &AnswerRecord) -> Result<AnswerRecord, StoreError>;

    /// All answers for a session, ordered by question id.
    async fn list_answers(&self, session_id: &str) -> Result<Vec<AnswerRecord>, StoreError>;

    async fn get_answer(
        &self,
        session_id: &str,
        question_id: u32,
    ) -> Result<Option<AnswerRecord>, StoreError>;

    /// Heartbeat write: current section plus completion percentage.
    async fn update_progress(
        &self,
        session_id: &str,
        current_section: u32,
        completion: u8,
    ) -> Result<(), StoreError>;

    /// Marks the session finished and pins completion at 100.
    async fn mark_completed(&self, session_id: &str) -> Result<(), StoreError>;
}
