use super::log::MessageLog;
use super::types::{Session, SessionSummary};
use crate::error::SessionError;

type SessionResult<T> = std::result::Result<T, SessionError>;

/// Administrative pass-throughs. Unlike the log itself, these report an
/// unknown session as [`SessionError::NotFound`] instead of creating it.
pub struct SessionAdmin<'a> {
    log: &'a MessageLog,
}

impl<'a> SessionAdmin<'a> {
    pub fn new(log: &'a MessageLog) -> Self {
        Self { log }
    }

    pub async fn list(&self) -> SessionResult<Vec<SessionSummary>> {
        self.log.try_list_sessions().await
    }

    /// Full transcript of one session.
    pub async fn get(&self, session_id: &str) -> SessionResult<Session> {
        self.log
            .try_session(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub async fn delete(&self, session_id: &str) -> SessionResult<()> {
        if self.log.try_delete(session_id).await? {
            Ok(())
        } else {
            Err(SessionError::NotFound(session_id.to_string()))
        }
    }

    /// Remove all messages but keep the session.
    pub async fn clear(&self, session_id: &str) -> SessionResult<()> {
        if self.log.try_clear(session_id).await? {
            Ok(())
        } else {
            Err(SessionError::NotFound(session_id.to_string()))
        }
    }
}
