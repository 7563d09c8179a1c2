//! Self-service password reset.
//!
//! A ticket is the SHA-256 of a random token stored on the user with an
//! expiry. The raw token only ever travels in the emailed link. Completing a
//! reset writes the new password and clears the ticket in one conditional
//! update, so a ticket can be redeemed once.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use tracing::{debug, error, info, instrument};

use super::email::password_reset_message;
use super::error::AuthError;
use super::password::hash_password_blocking;
use super::state::ResetDisclosure;
use super::utils::{build_reset_url, generate_reset_token, hash_reset_token, normalize_email};
use super::AuthService;

const INVALID_TOKEN: &str = "invalid or expired token";

impl AuthService {
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.find_user_lenient(&email).await else {
            return match self.config.reset_disclosure() {
                ResetDisclosure::Reveal => Err(AuthError::BadRequest("user not found".to_string())),
                ResetDisclosure::Opaque => {
                    debug!("reset requested for unknown email");
                    Ok(())
                }
            };
        };

        let ttl = self.config.reset_token_ttl_seconds();
        let expires_at = Duration::try_seconds(ttl)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| anyhow!("reset ticket expiry out of range"))?;
        let token = generate_reset_token()?;
        self.users
            .set_reset_ticket(user.id, &hash_reset_token(&token), expires_at)
            .await?;

        let reset_url = build_reset_url(self.config.frontend_base_url(), &token)?;
        let message = password_reset_message(&user.email, &reset_url, ttl / 60);
        if let Err(err) = self.mailer.send(&message).await {
            error!(user_id = %user.id, "failed to send reset email: {err:#}");
        }

        info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    /// Wrong and expired tokens fail with the same message.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        if token.trim().is_empty() {
            return Err(invalid_token());
        }
        if new_password.is_empty() {
            return Err(AuthError::BadRequest("password is required".to_string()));
        }

        let token_hash = hash_reset_token(token);
        let Some(user) = self.users.find_by_reset_hash(&token_hash, Utc::now()).await? else {
            return Err(invalid_token());
        };

        let password_hash =
            hash_password_blocking(new_password.to_string(), self.config.password_cost()).await?;
        if !self
            .users
            .complete_password_reset(user.id, &token_hash, &password_hash, Utc::now())
            .await?
        {
            return Err(invalid_token());
        }

        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }
}

fn invalid_token() -> AuthError {
    AuthError::BadRequest(INVALID_TOKEN.to_string())
}
