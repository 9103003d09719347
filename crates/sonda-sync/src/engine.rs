//! The auto-save engine.
//!
//! Holds the in-memory answer state for one questionnaire session and keeps
//! the store eventually consistent with it: mutations schedule a debounced
//! flush, every mutation fires a progress heartbeat, and completion runs a
//! final flush before the session is marked finished. Store failures on the
//! background paths are logged and never surface to the caller; only
//! [`SessionSync::complete`] reports its error, so the respondent can retry.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sonda_core::{Answer, AnswerRecord, AnswerValue, Catalog, CompanyRecord, SessionRecord};
use sonda_store::{SessionStore, StoreError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Quiet window after the last mutation before answers are flushed.
    pub debounce: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(1),
        }
    }
}

/// Where session creation currently stands.
///
/// `Ready` means "stop holding writes back", not "the row exists": a failed
/// creation also lands here so answers are never silently discarded while
/// the store is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Uninitialized,
    CreationPending,
    Ready,
}

/// Point-in-time view of the engine, for status displays and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub creation: CreationState,
    pub answers_loaded: bool,
    pub answer_count: usize,
    pub completion_percent: u8,
    pub current_section: u32,
    pub last_saved: Option<DateTime<Utc>>,
    pub completed: bool,
}

/// Auto-save engine for a single session.
///
/// Cheap to clone; all clones share the same state and the same session id.
#[derive(Clone)]
pub struct SessionSync {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn SessionStore>,
    catalog: Catalog,
    session_id: String,
    seed: SessionRecord,
    debounce: Duration,
    state: Mutex<State>,
}

struct State {
    creation: CreationState,
    answers: BTreeMap<u32, Answer>,
    answers_loaded: bool,
    current_section: u32,
    last_saved: Option<DateTime<Utc>>,
    completed: bool,
    pending_flush: Option<JoinHandle<()>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            creation: CreationState::Uninitialized,
            answers: BTreeMap::new(),
            answers_loaded: false,
            current_section: 1,
            last_saved: None,
            completed: false,
            pending_flush: None,
        }
    }
}

/// Ids that structurally look real (UUIDs, slugs with separators) are reused
/// verbatim so a respondent can rejoin an existing session; anything else,
/// like a bare timestamp, is replaced with a fresh UUID.
fn adopt_session_id(supplied: &str) -> String {
    if supplied.contains('-') {
        supplied.to_string()
    } else {
        Uuid::new_v4().to_string()
    }
}

impl SessionSync {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Catalog,
        supplied_id: &str,
        company: &CompanyRecord,
        config: SyncConfig,
    ) -> Self {
        let session_id = adopt_session_id(supplied_id);
        let seed = SessionRecord::seeded(session_id.clone(), company);
        Self {
            inner: Arc::new(Inner {
                store,
                catalog,
                session_id,
                seed,
                debounce: config.debounce,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// The id this engine writes under, fixed at construction.
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Creates the session row. Runs creation at most once; concurrent and
    /// repeated calls are no-ops. Both outcomes transition to
    /// [`CreationState::Ready`] — a creation failure is logged and the
    /// session keeps collecting answers.
    pub async fn start(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if state.creation != CreationState::Uninitialized {
                return;
            }
            state.creation = CreationState::CreationPending;
        }
        match self.inner.store.create_session(&self.inner.seed).await {
            Ok(_) => info!(session = %self.inner.session_id, "session created"),
            Err(StoreError::Duplicate(_)) => {
                debug!(session = %self.inner.session_id, "session already exists, resuming")
            }
            Err(err) => {
                warn!(session = %self.inner.session_id, error = %err, "session creation failed, continuing")
            }
        }
        let mut state = self.inner.state.lock().await;
        state.creation = CreationState::Ready;
    }

    /// Pulls previously saved answers and merges them into memory, but only
    /// when nothing has been answered locally yet: local state wins whole,
    /// never field by field. A fetch failure counts as "no prior answers".
    pub async fn load_existing(&self) {
        let rows = match self.inner.store.list_answers(&self.inner.session_id).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(session = %self.inner.session_id, error = %err, "loading existing answers failed");
                Vec::new()
            }
        };
        {
            let mut state = self.inner.state.lock().await;
            if state.answers.is_empty() {
                for row in rows {
                    state.answers.insert(
                        row.question_id,
                        Answer {
                            question: row.question_id,
                            value: row.value,
                            observations: row.observations,
                            annotation: row.annotation,
                        },
                    );
                }
            } else if !rows.is_empty() {
                debug!(
                    session = %self.inner.session_id,
                    "local answers present, ignoring stored rows"
                );
            }
            state.answers_loaded = true;
        }
        self.spawn_heartbeat();
    }

    /// Records an answer, restarts the debounce window, and fires the
    /// progress heartbeat.
    pub async fn set_answer(&self, question: u32, value: AnswerValue) {
        {
            let mut state = self.inner.state.lock().await;
            match state.answers.entry(question) {
                Entry::Occupied(mut entry) => entry.get_mut().value = value,
                Entry::Vacant(entry) => {
                    entry.insert(Answer::new(question, value));
                }
            }
        }
        self.schedule_flush().await;
        self.spawn_heartbeat();
    }

    /// Attaches free-form observations to a question, independently of its
    /// value. An answer entry is created if none exists yet; it stays out
    /// of flushes until the value itself is non-empty.
    pub async fn set_observations(&self, question: u32, text: &str) {
        {
            let mut state = self.inner.state.lock().await;
            let answer = state
                .answers
                .entry(question)
                .or_insert_with(|| Answer::new(question, ""));
            answer.observations = if text.trim().is_empty() {
                None
            } else {
                Some(text.to_string())
            };
        }
        self.schedule_flush().await;
        self.spawn_heartbeat();
    }

    /// Tracks which section the respondent is on and heartbeats it out.
    pub async fn set_section(&self, section: u32) {
        {
            let mut state = self.inner.state.lock().await;
            state.current_section = section;
        }
        self.spawn_heartbeat();
    }

    /// Flushes immediately, cancelling any pending debounced flush.
    pub async fn flush_now(&self) {
        {
            let mut state = self.inner.state.lock().await;
            if let Some(handle) = state.pending_flush.take() {
                handle.abort();
            }
        }
        self.inner.flush().await;
    }

    /// Final flush, then marks the session completed. Monotonic: once the
    /// store accepted the completion, later calls are no-ops. The store
    /// error is returned so the caller can retry.
    pub async fn complete(&self) -> Result<(), StoreError> {
        {
            let state = self.inner.state.lock().await;
            if state.completed {
                return Ok(());
            }
        }
        self.flush_now().await;
        self.inner
            .store
            .mark_completed(&self.inner.session_id)
            .await?;
        info!(session = %self.inner.session_id, "session completed");
        let mut state = self.inner.state.lock().await;
        state.completed = true;
        Ok(())
    }

    pub async fn status(&self) -> SyncStatus {
        let state = self.inner.state.lock().await;
        SyncStatus {
            creation: state.creation,
            answers_loaded: state.answers_loaded,
            answer_count: state.answers.len(),
            completion_percent: self.inner.catalog.completion_percent(&state.answers),
            current_section: state.current_section,
            last_saved: state.last_saved,
            completed: state.completed,
        }
    }

    /// Cancel-old-schedule-new: the window restarts on every mutation, so a
    /// burst of edits produces a single flush after the burst goes quiet.
    async fn schedule_flush(&self) {
        let inner = self.inner.clone();
        let mut state = self.inner.state.lock().await;
        if let Some(handle) = state.pending_flush.take() {
            handle.abort();
        }
        let debounce = self.inner.debounce;
        state.pending_flush = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            inner.flush().await;
        }));
    }

    fn spawn_heartbeat(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.heartbeat().await;
        });
    }
}

impl Inner {
    /// Writes every non-empty answer to the store, one upsert per entry so
    /// a single failure cannot sink the batch. `last_saved` moves only when
    /// the whole batch went through.
    async fn flush(&self) {
        let batch: Vec<AnswerRecord> = {
            let state = self.state.lock().await;
            if state.creation != CreationState::Ready {
                return;
            }
            state
                .answers
                .values()
                .filter(|answer| !answer.value.is_empty())
                .map(|answer| self.record_for(answer))
                .collect()
        };
        if batch.is_empty() {
            return;
        }

        let mut clean = true;
        for record in &batch {
            if let Err(err) = self.store.upsert_answer(record).await {
                warn!(
                    session = %self.session_id,
                    question = record.question_id,
                    error = %err,
                    "saving answer failed"
                );
                clean = false;
            }
        }
        if clean {
            let mut state = self.state.lock().await;
            state.last_saved = Some(Utc::now());
            debug!(session = %self.session_id, saved = batch.len(), "answers flushed");
        }
    }

    /// Recomputes completion and pushes it with the current section.
    /// Fire-and-forget: a failure is logged, never retried.
    async fn heartbeat(&self) {
        let (section, percent) = {
            let state = self.state.lock().await;
            (
                state.current_section,
                self.catalog.completion_percent(&state.answers),
            )
        };
        if let Err(err) = self
            .store
            .update_progress(&self.session_id, section, percent)
            .await
        {
            warn!(session = %self.session_id, error = %err, "progress update failed");
        }
    }

    fn record_for(&self, answer: &Answer) -> AnswerRecord {
        AnswerRecord {
            session_id: self.session_id.clone(),
            question_id: answer.question,
            // Unknown question ids keep section 0.
            section_id: self
                .catalog
                .question(answer.question)
                .map(|q| q.section)
                .unwrap_or(0),
            value: answer.value.clone(),
            observations: answer.observations.clone(),
            annotation: answer.annotation.clone(),
            created_at: None,
            updated_at: None,
        }
    }
}
