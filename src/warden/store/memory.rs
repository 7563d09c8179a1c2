//! In-process store for tests and embedding.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{SessionStore, UserStore};
use crate::warden::models::{CreateOutcome, NewUser, SessionRecord, SessionWrite, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
}

/// One mutex guards both tables, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a session row verbatim.
    pub async fn put_session(&self, record: SessionRecord) {
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(record.token_hash.clone(), record);
    }

    pub async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.lock().await.users.len()
    }

    pub async fn set_blocked(&self, user_id: Uuid, blocked: bool) {
        if let Some(user) = self.inner.lock().await.users.get_mut(&user_id) {
            user.blocked = blocked;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id_or_email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        if let Ok(id) = Uuid::parse_str(id_or_email) {
            if let Some(user) = inner.users.get(&id) {
                return Ok(Some(user.clone()));
            }
        }
        Ok(inner
            .users
            .values()
            .find(|user| user.email == id_or_email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Ok(CreateOutcome::Conflict);
        }
        let created = User {
            id: Uuid::now_v7(),
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            blocked: false,
            provider: user.provider,
            reset_token_hash: None,
            reset_token_expires_at: None,
        };
        inner.users.insert(created.id, created.clone());
        Ok(CreateOutcome::Created(created))
    }

    async fn set_reset_ticket(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.reset_token_hash = Some(token_hash.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn find_by_reset_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|user| {
                user.reset_token_hash.as_deref() == Some(token_hash)
                    && user.reset_token_expires_at.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.reset_token_hash.as_deref() != Some(token_hash)
            || !user.reset_token_expires_at.is_some_and(|exp| exp > now)
        {
            return Ok(false);
        }
        user.password_hash = Some(password_hash.to_string());
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn upsert_session(
        &self,
        user_id: Uuid,
        user_agent: &str,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<SessionWrite> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.sessions.get(token_hash) {
            if existing.user_id != user_id || existing.user_agent != user_agent {
                return Ok(SessionWrite::TokenCollision);
            }
        }
        inner
            .sessions
            .retain(|_, s| !(s.user_id == user_id && s.user_agent == user_agent));
        inner.sessions.insert(
            token_hash.to_vec(),
            SessionRecord {
                token_hash: token_hash.to_vec(),
                user_id,
                user_agent: user_agent.to_string(),
                expires_at,
            },
        );
        Ok(SessionWrite::Stored)
    }

    async fn take_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        Ok(self.inner.lock().await.sessions.remove(token_hash))
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        Ok(self.inner.lock().await.sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        self.inner.lock().await.sessions.remove(token_hash);
        Ok(())
    }
}
