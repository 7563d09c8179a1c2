//! Email/password flow: register, login, refresh, logout.

use tracing::{debug, info, instrument};

use super::error::AuthError;
use super::models::{CreateOutcome, NewUser, Provider, Role, Tokens, User};
use super::password::{hash_password_blocking, verify_password_blocking};
use super::utils::{normalize_email, valid_email};
use super::AuthService;

impl AuthService {
    /// Create a local account. Password confirmation is checked by the caller;
    /// no tokens are issued here.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::BadRequest("invalid email".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::BadRequest("password is required".to_string()));
        }

        if self.find_user_lenient(&email).await.is_some() {
            return Err(already_registered());
        }

        let password_hash =
            hash_password_blocking(password.to_string(), self.config.password_cost()).await?;

        let outcome = self
            .users
            .create_user(NewUser {
                email,
                password_hash: Some(password_hash),
                provider: Provider::Local,
                roles: vec![Role::User],
            })
            .await?;

        match outcome {
            CreateOutcome::Created(user) => {
                info!(user_id = %user.id, "user registered");
                Ok(user)
            }
            CreateOutcome::Conflict => Err(already_registered()),
        }
    }

    /// Every failure is the same `Unauthorized`, whichever factor was wrong.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: &str,
    ) -> Result<Tokens, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.find_user_fresh_lenient(&email).await else {
            return Err(AuthError::Unauthorized);
        };
        if user.blocked {
            debug!(user_id = %user.id, "login refused for blocked user");
            return Err(AuthError::Unauthorized);
        }
        let Some(hash) = user.password_hash.clone() else {
            return Err(AuthError::Unauthorized);
        };
        if !verify_password_blocking(password.to_string(), hash).await? {
            return Err(AuthError::Unauthorized);
        }

        self.issue_tokens(&user, device).await
    }

    /// Consume `refresh_token` and mint a new pair for the same device.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str, device: &str) -> Result<Tokens, AuthError> {
        let record = self.sessions.consume(refresh_token).await?;

        let Some(user) = self
            .find_user_fresh_lenient(&record.user_id.to_string())
            .await
        else {
            return Err(AuthError::Unauthorized);
        };
        if user.blocked {
            return Err(AuthError::Unauthorized);
        }

        self.issue_tokens(&user, device).await
    }

    /// Idempotent.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.sessions.revoke(refresh_token).await
    }
}

fn already_registered() -> AuthError {
    AuthError::Conflict("user with this email is already registered".to_string())
}
