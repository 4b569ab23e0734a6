use super::store::{JsonDirBackend, SessionBackend, validate_session_id};
use super::types::{MAX_MESSAGE_CHARS, Message, Session, SessionSummary};
use crate::config::MemoryConfig;
use crate::error::SessionError;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Default bounded wait for the index lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2_000);

type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// How long an operation waits for the index lock before degrading.
    pub lock_timeout: Duration,
    /// Content longer than this is cut at ingestion.
    pub max_message_chars: usize,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_message_chars: MAX_MESSAGE_CHARS,
        }
    }
}

impl From<&MemoryConfig> for LogOptions {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            max_message_chars: config.max_message_chars,
        }
    }
}

#[derive(Default)]
struct SessionIndex {
    sessions: HashMap<String, Session>,
    /// Sessions whose last durable write failed.
    dirty: HashSet<String>,
    /// Ids whose unreadable record is still in place. Never recreated, so the
    /// original bytes are not overwritten.
    blocked: HashSet<String>,
}

/// Durable, concurrency-safe store of per-session message logs.
///
/// All sessions live in one in-memory index guarded by a single lock; every
/// mutation is written through to the backend before the call returns.
///
/// Each operation comes in two forms. `try_*` reports faults as
/// [`SessionError`]; the plain form never fails and instead degrades to a safe
/// default (empty session, empty list, no-op) after logging a warning.
pub struct MessageLog {
    backend: Arc<dyn SessionBackend>,
    index: Mutex<SessionIndex>,
    options: LogOptions,
}

impl MessageLog {
    /// Load every stored session eagerly. Records that fail to load are moved
    /// aside by the backend; if that fails too, their id is blocked until
    /// deleted. Only a failure to enumerate the backend is fatal.
    pub async fn open(backend: Arc<dyn SessionBackend>, options: LogOptions) -> SessionResult<Self> {
        let records = backend
            .load_all()
            .await
            .map_err(|error| SessionError::Storage(format!("{error:#}")))?;

        let mut index = SessionIndex::default();
        for (session_id, loaded) in records {
            match loaded {
                Ok(session) => {
                    index.sessions.insert(session_id, session);
                }
                Err(error) => {
                    tracing::warn!(%session_id, "skipping unreadable session record: {error:#}");
                    if let Err(error) = backend.quarantine(&session_id).await {
                        tracing::warn!(%session_id, "blocking session id: {error:#}");
                        index.blocked.insert(session_id);
                    }
                }
            }
        }

        tracing::info!(sessions = index.sessions.len(), "message log opened");
        Ok(Self {
            backend,
            index: Mutex::new(index),
            options,
        })
    }

    /// Open a log backed by JSON files in `dir`.
    pub async fn open_dir(dir: &Path, options: LogOptions) -> anyhow::Result<Self> {
        let backend = JsonDirBackend::open(dir).await?;
        Ok(Self::open(Arc::new(backend), options).await?)
    }

    async fn lock(&self) -> SessionResult<MutexGuard<'_, SessionIndex>> {
        tokio::time::timeout(self.options.lock_timeout, self.index.lock())
            .await
            .map_err(|_| SessionError::LockTimeout {
                waited_ms: u64::try_from(self.options.lock_timeout.as_millis()).unwrap_or(u64::MAX),
            })
    }

    // ── get_or_create ───────────────────────────────────────────────────

    pub async fn try_get_or_create(&self, session_id: &str) -> SessionResult<Session> {
        validate_session_id(session_id)?;
        let mut index = self.lock().await?;
        let SessionIndex {
            sessions,
            dirty,
            blocked,
        } = &mut *index;
        let session =
            ensure_session(self.backend.as_ref(), sessions, dirty, blocked, session_id).await?;
        Ok(session.clone())
    }

    /// Existing session, or a newly persisted empty one. On fault returns a
    /// transient empty session that is not stored anywhere.
    pub async fn get_or_create(&self, session_id: &str) -> Session {
        match self.try_get_or_create(session_id).await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%session_id, "returning transient session: {error}");
                Session::new(session_id)
            }
        }
    }

    // ── append ──────────────────────────────────────────────────────────

    /// Append one message and write the session through. Returns the message
    /// as stored, after ingestion truncation.
    pub async fn try_append(&self, session_id: &str, message: Message) -> SessionResult<Message> {
        validate_session_id(session_id)?;
        let message = message.truncated(self.options.max_message_chars);

        let mut index = self.lock().await?;
        let SessionIndex {
            sessions,
            dirty,
            blocked,
        } = &mut *index;
        let session =
            ensure_session(self.backend.as_ref(), sessions, dirty, blocked, session_id).await?;
        session.push(message.clone());
        write_through(self.backend.as_ref(), session, dirty).await;
        Ok(message)
    }

    pub async fn append(&self, session_id: &str, message: Message) {
        if let Err(error) = self.try_append(session_id, message).await {
            tracing::warn!(%session_id, "message not appended: {error}");
        }
    }

    // ── read ────────────────────────────────────────────────────────────

    /// Full history, or the last `limit` messages, in chronological order.
    /// Creates the session if it does not exist yet.
    pub async fn try_read(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> SessionResult<Vec<Message>> {
        validate_session_id(session_id)?;
        let mut index = self.lock().await?;
        let SessionIndex {
            sessions,
            dirty,
            blocked,
        } = &mut *index;
        let session =
            ensure_session(self.backend.as_ref(), sessions, dirty, blocked, session_id).await?;
        Ok(session.tail(limit).to_vec())
    }

    pub async fn read(&self, session_id: &str, limit: Option<usize>) -> Vec<Message> {
        self.try_read(session_id, limit).await.unwrap_or_else(|error| {
            tracing::warn!(%session_id, "returning empty history: {error}");
            Vec::new()
        })
    }

    /// Like [`Self::try_read`] but never creates the session; `None` when it
    /// is unknown.
    pub async fn try_peek(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> SessionResult<Option<Vec<Message>>> {
        let index = self.lock().await?;
        Ok(index
            .sessions
            .get(session_id)
            .map(|session| session.tail(limit).to_vec()))
    }

    /// Snapshot of one session including its messages, without creating it.
    pub async fn try_session(&self, session_id: &str) -> SessionResult<Option<Session>> {
        let index = self.lock().await?;
        Ok(index.sessions.get(session_id).cloned())
    }

    pub async fn try_contains(&self, session_id: &str) -> SessionResult<bool> {
        let index = self.lock().await?;
        Ok(index.sessions.contains_key(session_id))
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.try_contains(session_id).await.unwrap_or_else(|error| {
            tracing::warn!(%session_id, "membership check failed: {error}");
            false
        })
    }

    /// Most recent attachment reference among the last `lookback` messages.
    pub async fn try_last_image_ref(
        &self,
        session_id: &str,
        lookback: usize,
    ) -> SessionResult<Option<String>> {
        let index = self.lock().await?;
        Ok(index.sessions.get(session_id).and_then(|session| {
            session
                .tail(Some(lookback))
                .iter()
                .rev()
                .find_map(|message| message.image_ref.clone())
        }))
    }

    pub async fn last_image_ref(&self, session_id: &str, lookback: usize) -> Option<String> {
        self.try_last_image_ref(session_id, lookback)
            .await
            .unwrap_or_else(|error| {
                tracing::warn!(%session_id, "image lookup failed: {error}");
                None
            })
    }

    // ── clear / delete ──────────────────────────────────────────────────

    /// Drop all messages but keep the session record. Returns whether the
    /// session existed; clearing an unknown session is a no-op.
    pub async fn try_clear(&self, session_id: &str) -> SessionResult<bool> {
        let mut index = self.lock().await?;
        let SessionIndex { sessions, dirty, .. } = &mut *index;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(false);
        };
        session.clear_messages();
        write_through(self.backend.as_ref(), session, dirty).await;
        Ok(true)
    }

    pub async fn clear(&self, session_id: &str) {
        if let Err(error) = self.try_clear(session_id).await {
            tracing::warn!(%session_id, "session not cleared: {error}");
        }
    }

    /// Remove the session from the index and from durable storage. Returns
    /// whether it was known; deleting an unknown session is a no-op. Also
    /// discards an unreadable record that blocked the id.
    pub async fn try_delete(&self, session_id: &str) -> SessionResult<bool> {
        let mut index = self.lock().await?;
        let existed = index.sessions.remove(session_id).is_some();
        index.dirty.remove(session_id);
        index.blocked.remove(session_id);

        if validate_session_id(session_id).is_ok() {
            if let Err(error) = self.backend.remove(session_id).await {
                tracing::warn!(%session_id, "session record not removed from storage: {error:#}");
            }
        }
        Ok(existed)
    }

    pub async fn delete(&self, session_id: &str) {
        if let Err(error) = self.try_delete(session_id).await {
            tracing::warn!(%session_id, "session not deleted: {error}");
        }
    }

    // ── listing ─────────────────────────────────────────────────────────

    /// Metadata for every known session, ordered by id.
    pub async fn try_list_sessions(&self) -> SessionResult<Vec<SessionSummary>> {
        let index = self.lock().await?;
        let mut summaries: Vec<_> = index.sessions.values().map(Session::summary).collect();
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(summaries)
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.try_list_sessions().await.unwrap_or_else(|error| {
            tracing::warn!("returning empty session list: {error}");
            Vec::new()
        })
    }

    // ── lifecycle ───────────────────────────────────────────────────────

    /// Number of sessions whose in-memory state is ahead of storage.
    pub async fn try_pending_writes(&self) -> SessionResult<usize> {
        Ok(self.lock().await?.dirty.len())
    }

    /// Rewrite every session whose last write failed. Returns how many were
    /// reconciled.
    pub async fn try_flush(&self) -> SessionResult<usize> {
        let mut index = self.lock().await?;
        let SessionIndex { sessions, dirty, .. } = &mut *index;
        let pending: Vec<String> = dirty.iter().cloned().collect();

        let mut reconciled = 0;
        for session_id in pending {
            let Some(session) = sessions.get(&session_id) else {
                dirty.remove(&session_id);
                continue;
            };
            if write_through(self.backend.as_ref(), session, dirty).await {
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }

    pub async fn flush(&self) -> usize {
        self.try_flush().await.unwrap_or_else(|error| {
            tracing::warn!("flush skipped: {error}");
            0
        })
    }
}

async fn ensure_session<'a>(
    backend: &dyn SessionBackend,
    sessions: &'a mut HashMap<String, Session>,
    dirty: &mut HashSet<String>,
    blocked: &HashSet<String>,
    session_id: &str,
) -> SessionResult<&'a mut Session> {
    match sessions.entry(session_id.to_string()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(_) if blocked.contains(session_id) => Err(SessionError::Storage(format!(
            "stored record for session {session_id} is unreadable; delete it to start over"
        ))),
        Entry::Vacant(entry) => {
            let session = entry.insert(Session::new(session_id));
            write_through(backend, session, dirty).await;
            Ok(session)
        }
    }
}

/// Persist `session`; failures are logged and leave the session marked dirty.
async fn write_through(
    backend: &dyn SessionBackend,
    session: &Session,
    dirty: &mut HashSet<String>,
) -> bool {
    match backend.save(session).await {
        Ok(()) => {
            dirty.remove(&session.id);
            true
        }
        Err(error) => {
            tracing::warn!(session_id = %session.id, "durable write failed: {error:#}");
            dirty.insert(session.id.clone());
            false
        }
    }
}
