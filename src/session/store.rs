use super::types::{Message, Session, deserialize_timestamp};
use crate::error::SessionError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;

/// Longest session id accepted as a durable key, in bytes.
pub const MAX_SESSION_ID_LEN: usize = 128;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable storage contract: one independent record per session.
pub trait SessionBackend: Send + Sync {
    /// Enumerate every stored record. Each record is read independently so a
    /// corrupt file only costs its own session.
    fn load_all<'a>(&'a self) -> BackendFuture<'a, Vec<(String, Result<Session>)>>;

    fn load<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, Option<Session>>;

    /// Create or fully overwrite the record for `session.id`.
    fn save<'a>(&'a self, session: &'a Session) -> BackendFuture<'a, ()>;

    /// Returns whether a record existed.
    fn remove<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, bool>;

    /// Move an unreadable record out of the way so a fresh session can take
    /// its id. The original bytes must survive.
    fn quarantine<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, ()>;
}

/// Reject ids that cannot serve as a file stem.
pub fn validate_session_id(session_id: &str) -> std::result::Result<(), SessionError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id != "."
        && session_id != ".."
        && !session_id.starts_with('.')
        && !session_id
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidId(session_id.to_string()))
    }
}

#[derive(Serialize)]
struct RecordRef<'a> {
    created_at: &'a DateTime<Utc>,
    last_updated: &'a DateTime<Utc>,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct StoredRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    last_updated: DateTime<Utc>,
    #[serde(default)]
    messages: Vec<Message>,
}

impl StoredRecord {
    fn into_session(self, session_id: &str) -> Session {
        Session {
            id: session_id.to_string(),
            created_at: self.created_at,
            last_updated: self.last_updated,
            messages: self.messages,
        }
    }
}

/// JSON files under one directory, `<dir>/<session_id>.json`.
pub struct JsonDirBackend {
    dir: PathBuf,
}

impl JsonDirBackend {
    pub async fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed creating session dir: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn record_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// `<id>.json.corrupt-<stamp>`; never matches the `.json` extension.
    fn quarantine_path(&self, session_id: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f");
        self.dir.join(format!("{session_id}.json.corrupt-{stamp}"))
    }

    async fn read_record(path: &Path, session_id: &str) -> Result<Session> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed reading session record: {}", path.display()))?;
        let record: StoredRecord = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing session record: {}", path.display()))?;
        Ok(record.into_session(session_id))
    }

    async fn write_atomic(path: &Path, content: &str) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .await
            .with_context(|| format!("failed writing temp record: {}", temp_path.display()))?;

        if let Err(rename_error) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(rename_error).with_context(|| {
                format!("failed replacing session record atomically: {}", path.display())
            });
        }

        Ok(())
    }
}

impl SessionBackend for JsonDirBackend {
    fn load_all<'a>(&'a self) -> BackendFuture<'a, Vec<(String, Result<Session>)>> {
        Box::pin(async move {
            let mut records = Vec::new();
            let mut dir = fs::read_dir(&self.dir)
                .await
                .with_context(|| format!("failed listing session dir: {}", self.dir.display()))?;

            while let Some(entry) = dir.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(session_id) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if validate_session_id(session_id).is_err() {
                    tracing::warn!(path = %path.display(), "skipping record with unusable name");
                    continue;
                }
                let loaded = Self::read_record(&path, session_id).await;
                records.push((session_id.to_string(), loaded));
            }

            Ok(records)
        })
    }

    fn load<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, Option<Session>> {
        Box::pin(async move {
            validate_session_id(session_id)?;
            let path = self.record_path(session_id);
            if !fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(None);
            }
            Self::read_record(&path, session_id).await.map(Some)
        })
    }

    fn save<'a>(&'a self, session: &'a Session) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            validate_session_id(&session.id)?;
            let record = RecordRef {
                created_at: &session.created_at,
                last_updated: &session.last_updated,
                messages: &session.messages,
            };
            let json = serde_json::to_string_pretty(&record)?;
            let path = self.record_path(&session.id);
            Self::write_atomic(&path, &json).await?;
            tracing::debug!(session_id = %session.id, messages = session.messages.len(), "session persisted");
            Ok(())
        })
    }

    fn remove<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            validate_session_id(session_id)?;
            let path = self.record_path(session_id);
            match fs::remove_file(&path).await {
                Ok(()) => Ok(true),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
                Err(error) => Err(error).with_context(|| {
                    format!("failed removing session record: {}", path.display())
                }),
            }
        })
    }

    fn quarantine<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            validate_session_id(session_id)?;
            let path = self.record_path(session_id);
            let target = self.quarantine_path(session_id);
            fs::rename(&path, &target).await.with_context(|| {
                format!(
                    "failed moving unreadable record {} to {}",
                    path.display(),
                    target.display()
                )
            })?;
            tracing::warn!(%session_id, target = %target.display(), "unreadable session record moved aside");
            Ok(())
        })
    }
}

/// Process-local backend. Nothing survives a restart; useful for ephemeral
/// deployments and for exercising write-failure paths.
#[derive(Default)]
pub struct InMemoryBackend {
    records: Mutex<HashMap<String, Session>>,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let records = sessions
            .into_iter()
            .map(|session| (session.id.clone(), session))
            .collect();
        Self {
            records: Mutex::new(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// While set, `save` and `remove` fail without touching stored records.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self, session_id: &str) -> Option<Session> {
        self.lock_records()
            .ok()
            .and_then(|records| records.get(session_id).cloned())
    }

    fn lock_records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>> {
        self.records
            .lock()
            .map_err(|error| anyhow::anyhow!("Lock error: {error}"))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("in-memory backend is rejecting writes");
        }
        Ok(())
    }
}

impl SessionBackend for InMemoryBackend {
    fn load_all<'a>(&'a self) -> BackendFuture<'a, Vec<(String, Result<Session>)>> {
        Box::pin(async move {
            let records = self.lock_records()?;
            Ok(records
                .iter()
                .map(|(id, session)| (id.clone(), Ok(session.clone())))
                .collect())
        })
    }

    fn load<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, Option<Session>> {
        Box::pin(async move { Ok(self.lock_records()?.get(session_id).cloned()) })
    }

    fn save<'a>(&'a self, session: &'a Session) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.check_writable()?;
            self.lock_records()?
                .insert(session.id.clone(), session.clone());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, bool> {
        Box::pin(async move {
            self.check_writable()?;
            Ok(self.lock_records()?.remove(session_id).is_some())
        })
    }

    fn quarantine<'a>(&'a self, session_id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.check_writable()?;
            self.lock_records()?.remove(session_id);
            Ok(())
        })
    }
}
