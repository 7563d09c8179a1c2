//! Read-through user cache.
//!
//! Entries are keyed by both id and email. Any mutation made through the
//! wrapper drops every entry of the affected user. The inner store stays
//! authoritative; reset-ticket lookups are never served from the cache.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{CreateOutcome, NewUser, User};
use super::store::UserStore;

struct Entry {
    user: User,
    cached_at: Instant,
}

pub struct CachedUserStore {
    inner: Arc<dyn UserStore>,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl CachedUserStore {
    #[must_use]
    pub fn new(inner: Arc<dyn UserStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    async fn remember(&self, user: &User) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.cached_at.elapsed() < self.ttl);
        for key in [user.id.to_string(), user.email.clone()] {
            entries.insert(
                key,
                Entry {
                    user: user.clone(),
                    cached_at: Instant::now(),
                },
            );
        }
    }

    async fn invalidate(&self, user_id: Uuid) {
        self.entries
            .lock()
            .await
            .retain(|_, entry| entry.user.id != user_id);
    }
}

#[async_trait]
impl UserStore for CachedUserStore {
    async fn find_user(&self, id_or_email: &str) -> Result<Option<User>> {
        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(id_or_email) {
                if entry.cached_at.elapsed() < self.ttl {
                    return Ok(Some(entry.user.clone()));
                }
            }
        }

        let user = self.inner.find_user(id_or_email).await?;
        if let Some(user) = &user {
            self.remember(user).await;
        }
        Ok(user)
    }

    /// Drops whatever is cached under the key, then reads the inner store.
    async fn find_user_fresh(&self, id_or_email: &str) -> Result<Option<User>> {
        let stale = self.entries.lock().await.remove(id_or_email);
        if let Some(entry) = stale {
            self.invalidate(entry.user.id).await;
        }

        let user = self.inner.find_user_fresh(id_or_email).await?;
        if let Some(user) = &user {
            self.invalidate(user.id).await;
            self.remember(user).await;
        }
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome> {
        let outcome = self.inner.create_user(user).await?;
        if let CreateOutcome::Created(user) = &outcome {
            self.remember(user).await;
        }
        Ok(outcome)
    }

    async fn set_reset_ticket(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = self
            .inner
            .set_reset_ticket(user_id, token_hash, expires_at)
            .await;
        self.invalidate(user_id).await;
        result
    }

    async fn find_by_reset_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.inner.find_by_reset_hash(token_hash, now).await
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = self
            .inner
            .complete_password_reset(user_id, token_hash, password_hash, now)
            .await;
        self.invalidate(user_id).await;
        result
    }
}
