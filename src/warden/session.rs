//! Refresh session store.
//!
//! Flow overview: `issue_or_rotate` keeps exactly one session per
//! `(user, device)` and hands back a fresh raw token; `consume` removes the
//! presented session atomically before deciding whether it was still valid;
//! `revoke` is an idempotent delete. Expired sessions are reaped lazily, when
//! next presented, never by a background task.

use anyhow::anyhow;
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::error::AuthError;
use super::models::{RefreshSession, SessionRecord, SessionWrite};
use super::store::SessionStore;
use super::utils::{generate_refresh_token, hash_refresh_token};

const MAX_TOKEN_ATTEMPTS: usize = 3;

pub struct RefreshSessions {
    store: Arc<dyn SessionStore>,
    lifetime_months: u32,
}

impl RefreshSessions {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, lifetime_months: u32) -> Self {
        Self {
            store,
            lifetime_months,
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        now.checked_add_months(Months::new(self.lifetime_months))
            .ok_or_else(|| AuthError::Internal(anyhow!("refresh session expiry overflow")))
    }

    /// Create the device's session or rotate its value and expiry.
    #[instrument(skip(self))]
    pub async fn issue_or_rotate(
        &self,
        user_id: Uuid,
        device: &str,
    ) -> Result<RefreshSession, AuthError> {
        let expires_at = self.expiry_from(Utc::now())?;

        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_refresh_token()?;
            let token_hash = hash_refresh_token(&token);
            match self
                .store
                .upsert_session(user_id, device, &token_hash, expires_at)
                .await?
            {
                SessionWrite::Stored => return Ok(RefreshSession { token, expires_at }),
                SessionWrite::TokenCollision => debug!("refresh token collision, regenerating"),
            }
        }

        Err(AuthError::Internal(anyhow!(
            "failed to generate unique refresh token"
        )))
    }

    /// Take the session for `token`. The row is gone afterwards whether it was
    /// valid or expired, so the same value can never succeed twice.
    #[instrument(skip_all)]
    pub async fn consume(&self, token: &str) -> Result<SessionRecord, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        let Some(record) = self.store.take_session(&hash_refresh_token(token)).await? else {
            return Err(AuthError::Unauthorized);
        };

        if record.is_expired(Utc::now()) {
            debug!(user_id = %record.user_id, "expired refresh session reaped");
            return Err(AuthError::Unauthorized);
        }

        Ok(record)
    }

    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(());
        }
        self.store
            .delete_session(&hash_refresh_token(token))
            .await?;
        Ok(())
    }

    /// Current stored state of `token`, if any.
    pub async fn lookup(&self, token: &str) -> Result<Option<SessionRecord>, AuthError> {
        Ok(self
            .store
            .find_session(&hash_refresh_token(token.trim()))
            .await?)
    }
}
