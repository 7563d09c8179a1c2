//! Durable store collaborators.
//!
//! The store is the only source of truth and the only synchronization point
//! between concurrent requests. `take_session` in particular must be atomic:
//! of two callers presenting the same token hash, at most one receives the
//! record.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{CreateOutcome, NewUser, SessionRecord, SessionWrite, User};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up by either unique key.
    async fn find_user(&self, id_or_email: &str) -> Result<Option<User>>;

    /// Like `find_user`, but never answered from a cache. Credential and
    /// block checks read through this.
    async fn find_user_fresh(&self, id_or_email: &str) -> Result<Option<User>> {
        self.find_user(id_or_email).await
    }

    /// `Conflict` when the email is already taken.
    async fn create_user(&self, user: NewUser) -> Result<CreateOutcome>;

    async fn set_reset_ticket(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Only returns a user whose ticket matches and expires after `now`.
    async fn find_by_reset_hash(&self, token_hash: &str, now: DateTime<Utc>)
        -> Result<Option<User>>;

    /// Store the new password and clear both reset fields in one write,
    /// provided the ticket is still `token_hash` and expires after `now`.
    /// Returns `false` if another caller consumed it first or it lapsed.
    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the `(user_id, user_agent)` session or replace its token and expiry.
    async fn upsert_session(
        &self,
        user_id: Uuid,
        user_agent: &str,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<SessionWrite>;

    /// Atomically delete and return the session, expired or not.
    async fn take_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>>;

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>>;

    /// Idempotent.
    async fn delete_session(&self, token_hash: &[u8]) -> Result<()>;
}
