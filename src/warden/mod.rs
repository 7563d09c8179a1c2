//! Credential and session core.
//!
//! `AuthService` ties the components together: the user and session stores,
//! the access token issuer, identity provider adapters, and the mailer. The
//! flows live in their own modules (`local`, `federated`, `reset`) as
//! `impl AuthService` blocks.

use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{error, instrument};

pub mod cache;
pub mod cookie;
pub mod email;
pub mod error;
mod federated;
mod local;
pub mod models;
pub mod password;
pub mod policy;
pub mod provider;
mod reset;
pub mod session;
pub mod state;
pub mod store;
pub mod token;
pub mod utils;

#[cfg(test)]
mod tests;

pub use cache::CachedUserStore;
pub use email::{
    EmailMessage, EmailSender, LogEmailSender, SmtpConfig, SmtpEmailSender, TlsMode,
};
pub use error::AuthError;
pub use models::{Provider, RefreshSession, Role, Tokens, User, UserView};
pub use policy::{authorize, Access, Principal};
pub use provider::{HttpIdentityExchange, IdentityExchange, IdentityProvider, ProviderEndpoints};
pub use session::RefreshSessions;
pub use state::{AuthConfig, ResetDisclosure};
pub use store::{MemoryStore, PgStore, SessionStore, UserStore};
pub use token::{AccessClaims, AccessTokens};

use token::bearer;

pub struct AuthService {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    sessions: RefreshSessions,
    tokens: AccessTokens,
    identity: Arc<dyn IdentityExchange>,
    mailer: Arc<dyn EmailSender>,
}

impl AuthService {
    /// # Errors
    /// Returns an error if the signing secret or access-token TTL is invalid.
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        jwt_secret: &SecretString,
        identity: Arc<dyn IdentityExchange>,
        mailer: Arc<dyn EmailSender>,
    ) -> Result<Self> {
        let tokens = AccessTokens::new(jwt_secret, config.access_token_ttl_seconds())?;
        let sessions = RefreshSessions::new(sessions, config.refresh_session_months());
        Ok(Self {
            config,
            users,
            sessions,
            tokens,
            identity,
            mailer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &RefreshSessions {
        &self.sessions
    }

    /// Resolve a bearer access token to the caller's identity.
    ///
    /// The user is re-read so that deleted or blocked accounts lose access
    /// even while their token is still within its lifetime.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, access_token: &str) -> Result<Principal, AuthError> {
        let claims = self.tokens.verify(access_token)?;
        let user = self
            .find_user_lenient(&claims.id.to_string())
            .await
            .ok_or(AuthError::Unauthorized)?;
        if user.blocked {
            return Err(AuthError::Unauthorized);
        }
        Ok(Principal::from(claims))
    }

    /// Mint an access token and rotate the device's refresh session.
    async fn issue_tokens(&self, user: &User, device: &str) -> Result<Tokens, AuthError> {
        let access_token = bearer(&self.tokens.issue(user)?);
        let refresh = self.sessions.issue_or_rotate(user.id, device).await?;
        Ok(Tokens {
            access_token,
            refresh,
        })
    }

    /// Best-effort lookup: store failures read as "not found".
    async fn find_user_lenient(&self, id_or_email: &str) -> Option<User> {
        lenient(self.users.find_user(id_or_email).await)
    }

    /// Uncached variant for password and block checks.
    async fn find_user_fresh_lenient(&self, id_or_email: &str) -> Option<User> {
        lenient(self.users.find_user_fresh(id_or_email).await)
    }
}

fn lenient(lookup: Result<Option<User>>) -> Option<User> {
    match lookup {
        Ok(user) => user,
        Err(err) => {
            error!("user lookup failed: {err:#}");
            None
        }
    }
}
