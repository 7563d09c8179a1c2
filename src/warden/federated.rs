//! Federated login with just-in-time provisioning.

use tracing::{error, info, instrument};

use super::error::AuthError;
use super::models::{CreateOutcome, NewUser, Role, Tokens, User};
use super::provider::IdentityProvider;
use super::utils::normalize_email;
use super::AuthService;

impl AuthService {
    /// Exchange a provider access token for a verified email, then log in as
    /// the matching local user, creating it on first sight.
    #[instrument(skip(self, provider_token))]
    pub async fn provider_auth(
        &self,
        provider: IdentityProvider,
        provider_token: &str,
        device: &str,
    ) -> Result<Tokens, AuthError> {
        let email = normalize_email(&self.identity.exchange(provider, provider_token).await?);

        let user = match self.find_user_lenient(&email).await {
            Some(user) => user,
            None => self.provision(provider, &email).await?,
        };
        if user.blocked {
            return Err(AuthError::Unauthorized);
        }

        self.issue_tokens(&user, device).await
    }

    async fn provision(&self, provider: IdentityProvider, email: &str) -> Result<User, AuthError> {
        let outcome = self
            .users
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: None,
                provider: provider.into(),
                roles: vec![Role::User],
            })
            .await
            .map_err(|err| {
                error!("provisioning {email} failed: {err:#}");
                provisioning_failed(email)
            })?;

        match outcome {
            CreateOutcome::Created(user) => {
                info!(user_id = %user.id, %provider, "user provisioned");
                Ok(user)
            }
            // Lost a race with a concurrent first login for the same email.
            CreateOutcome::Conflict => self
                .find_user_lenient(email)
                .await
                .ok_or_else(|| provisioning_failed(email)),
        }
    }
}

fn provisioning_failed(email: &str) -> AuthError {
    AuthError::BadRequest(format!("failed to create user with email {email}"))
}
