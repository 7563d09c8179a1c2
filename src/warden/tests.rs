use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{CreateOutcome, NewUser, SessionRecord, User};
use super::utils::hash_refresh_token;
use super::*;

struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    async fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().await;
        let body = &sent.last()?.html_body;
        let start = body.find("token=")? + "token=".len();
        let token: String = body[start..]
            .chars()
            .take_while(char::is_ascii_hexdigit)
            .collect();
        Some(token)
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent.lock().await.push(message.clone());
        if self.fail {
            return Err(anyhow!("smtp unavailable"));
        }
        Ok(())
    }
}

/// Answers with a fixed email per provider, or an upstream failure.
struct FakeExchange {
    email: Option<String>,
}

#[async_trait]
impl IdentityExchange for FakeExchange {
    async fn exchange(
        &self,
        provider: IdentityProvider,
        _access_token: &str,
    ) -> Result<String, AuthError> {
        self.email
            .clone()
            .ok_or_else(|| AuthError::Upstream(format!("{provider} userinfo returned 503")))
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
    service: AuthService,
}

fn harness_with(
    config: AuthConfig,
    mailer: RecordingMailer,
    provider_email: Option<&str>,
) -> Result<Harness> {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(mailer);
    let service = AuthService::new(
        config,
        store.clone(),
        store.clone(),
        &SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
        Arc::new(FakeExchange {
            email: provider_email.map(ToString::to_string),
        }),
        mailer.clone(),
    )?;
    Ok(Harness {
        store,
        mailer,
        service,
    })
}

fn config() -> AuthConfig {
    AuthConfig::new("http://localhost:3000".to_string()).with_password_cost(4)
}

fn harness() -> Result<Harness> {
    harness_with(config(), RecordingMailer::new(), Some("carol@gmail.com"))
}

#[tokio::test]
async fn register_login_refresh_scenario() -> Result<()> {
    let h = harness()?;
    let user = h.service.register("alice@example.com", "secret1").await?;
    assert_eq!(user.roles, vec![Role::User]);
    assert_eq!(user.provider, Provider::Local);
    assert!(user.password_hash.is_some());

    let tokens = h
        .service
        .login("alice@example.com", "secret1", "firefox")
        .await?;
    assert!(tokens.access_token.starts_with("Bearer "));

    assert!(matches!(
        h.service.login("alice@example.com", "secret2", "firefox").await,
        Err(AuthError::Unauthorized)
    ));

    let renewed = h.service.refresh(&tokens.refresh.token, "firefox").await?;
    assert_ne!(renewed.refresh.token, tokens.refresh.token);
    assert!(matches!(
        h.service.refresh(&tokens.refresh.token, "firefox").await,
        Err(AuthError::Unauthorized)
    ));

    let principal = h.service.authenticate(&renewed.access_token).await?;
    assert_eq!(principal.user_id, user.id);
    assert_eq!(principal.email, "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts_regardless_of_password() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;
    for password in ["secret1", "other"] {
        assert!(matches!(
            h.service.register("Alice@Example.com ", password).await,
            Err(AuthError::Conflict(_))
        ));
    }
    assert_eq!(h.store.user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn register_rejects_malformed_email() -> Result<()> {
    let h = harness()?;
    assert!(matches!(
        h.service.register("not-an-email", "secret1").await,
        Err(AuthError::BadRequest(_))
    ));
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;

    let wrong_password = h
        .service
        .login("alice@example.com", "nope", "cli")
        .await
        .err()
        .ok_or_else(|| anyhow!("expected failure"))?;
    let unknown_user = h
        .service
        .login("bob@example.com", "secret1", "cli")
        .await
        .err()
        .ok_or_else(|| anyhow!("expected failure"))?;

    assert_eq!(wrong_password.code(), unknown_user.code());
    assert_eq!(wrong_password.public_message(), unknown_user.public_message());
    Ok(())
}

#[tokio::test]
async fn blocked_user_cannot_login_or_refresh() -> Result<()> {
    let h = harness()?;
    let user = h.service.register("alice@example.com", "secret1").await?;
    let tokens = h.service.login("alice@example.com", "secret1", "cli").await?;

    h.store.set_blocked(user.id, true).await;

    assert!(matches!(
        h.service.login("alice@example.com", "secret1", "cli").await,
        Err(AuthError::Unauthorized)
    ));
    assert!(matches!(
        h.service.refresh(&tokens.refresh.token, "cli").await,
        Err(AuthError::Unauthorized)
    ));
    assert!(matches!(
        h.service.authenticate(&tokens.access_token).await,
        Err(AuthError::Unauthorized)
    ));
    Ok(())
}

#[tokio::test]
async fn expired_session_is_removed_on_refresh() -> Result<()> {
    let h = harness()?;
    let user = h.service.register("alice@example.com", "secret1").await?;
    let token = "stale-refresh-token";
    h.store
        .put_session(SessionRecord {
            token_hash: hash_refresh_token(token),
            user_id: user.id,
            user_agent: "cli".to_string(),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await;

    assert!(matches!(
        h.service.refresh(token, "cli").await,
        Err(AuthError::Unauthorized)
    ));
    assert!(h.service.sessions().lookup(token).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn logout_is_idempotent_and_per_device() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;
    let phone = h.service.login("alice@example.com", "secret1", "phone").await?;
    let laptop = h.service.login("alice@example.com", "secret1", "laptop").await?;

    h.service.logout(&phone.refresh.token).await?;
    h.service.logout(&phone.refresh.token).await?;

    assert!(matches!(
        h.service.refresh(&phone.refresh.token, "phone").await,
        Err(AuthError::Unauthorized)
    ));
    h.service.refresh(&laptop.refresh.token, "laptop").await?;
    Ok(())
}

#[tokio::test]
async fn relogin_on_same_device_rotates_session() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;
    let first = h.service.login("alice@example.com", "secret1", "cli").await?;
    let second = h.service.login("alice@example.com", "secret1", "cli").await?;

    assert_eq!(h.store.session_count().await, 1);
    assert!(matches!(
        h.service.refresh(&first.refresh.token, "cli").await,
        Err(AuthError::Unauthorized)
    ));
    h.service.refresh(&second.refresh.token, "cli").await?;
    Ok(())
}

#[tokio::test]
async fn reset_ticket_is_single_use() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;

    h.service.request_reset("alice@example.com").await?;
    let token = h
        .mailer
        .last_token()
        .await
        .ok_or_else(|| anyhow!("no reset email"))?;
    assert_eq!(token.len(), 64);

    h.service.reset_password(&token, "secret3").await?;
    assert!(matches!(
        h.service.reset_password(&token, "secret4").await,
        Err(AuthError::BadRequest(msg)) if msg == "invalid or expired token"
    ));

    h.service.login("alice@example.com", "secret3", "cli").await?;
    assert!(matches!(
        h.service.login("alice@example.com", "secret1", "cli").await,
        Err(AuthError::Unauthorized)
    ));
    Ok(())
}

#[tokio::test]
async fn reset_email_carries_subject_and_link() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;
    h.service.request_reset("alice@example.com").await?;

    let sent = h.mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "alice@example.com");
    assert_eq!(sent[0].subject, "Password Reset Request");
    assert!(sent[0]
        .html_body
        .contains("http://localhost:3000/reset-password?token="));
    Ok(())
}

#[tokio::test]
async fn expired_reset_ticket_is_rejected() -> Result<()> {
    let h = harness_with(
        config().with_reset_token_ttl_seconds(-1),
        RecordingMailer::new(),
        None,
    )?;
    h.service.register("alice@example.com", "secret1").await?;
    h.service.request_reset("alice@example.com").await?;
    let token = h
        .mailer
        .last_token()
        .await
        .ok_or_else(|| anyhow!("no reset email"))?;

    assert!(matches!(
        h.service.reset_password(&token, "secret3").await,
        Err(AuthError::BadRequest(msg)) if msg == "invalid or expired token"
    ));
    assert!(matches!(
        h.service.reset_password("deadbeef", "secret3").await,
        Err(AuthError::BadRequest(msg)) if msg == "invalid or expired token"
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_reset_email_follows_disclosure_policy() -> Result<()> {
    let reveal = harness()?;
    assert!(matches!(
        reveal.service.request_reset("ghost@example.com").await,
        Err(AuthError::BadRequest(msg)) if msg == "user not found"
    ));

    let opaque = harness_with(
        config().with_reset_disclosure(ResetDisclosure::Opaque),
        RecordingMailer::new(),
        None,
    )?;
    opaque.service.request_reset("ghost@example.com").await?;
    assert!(opaque.mailer.sent.lock().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn mail_failure_does_not_fail_reset_request() -> Result<()> {
    let h = harness_with(config(), RecordingMailer::failing(), None)?;
    h.service.register("alice@example.com", "secret1").await?;
    h.service.request_reset("alice@example.com").await?;

    let token = h
        .mailer
        .last_token()
        .await
        .ok_or_else(|| anyhow!("no reset email"))?;
    h.service.reset_password(&token, "secret3").await?;
    Ok(())
}

#[tokio::test]
async fn federated_login_provisions_once() -> Result<()> {
    let h = harness()?;
    let first = h
        .service
        .provider_auth(IdentityProvider::Google, "ya29.token", "cli")
        .await?;
    let second = h
        .service
        .provider_auth(IdentityProvider::Google, "ya29.other", "phone")
        .await?;

    assert_eq!(h.store.user_count().await, 1);
    let first = h.service.authenticate(&first.access_token).await?;
    let second = h.service.authenticate(&second.access_token).await?;
    assert_eq!(first.user_id, second.user_id);

    let user = h
        .store
        .find_user("carol@gmail.com")
        .await?
        .ok_or_else(|| anyhow!("user not provisioned"))?;
    assert_eq!(user.provider, Provider::Google);
    assert!(user.password_hash.is_none());
    Ok(())
}

#[tokio::test]
async fn federated_account_cannot_use_local_login() -> Result<()> {
    let h = harness()?;
    h.service
        .provider_auth(IdentityProvider::Yandex, "y0_token", "cli")
        .await?;
    assert!(matches!(
        h.service.login("carol@gmail.com", "", "cli").await,
        Err(AuthError::Unauthorized)
    ));
    Ok(())
}

#[tokio::test]
async fn federated_login_reuses_local_account() -> Result<()> {
    let h = harness()?;
    let local = h.service.register("carol@gmail.com", "secret1").await?;
    let tokens = h
        .service
        .provider_auth(IdentityProvider::Google, "ya29.token", "cli")
        .await?;
    let principal = h.service.authenticate(&tokens.access_token).await?;
    assert_eq!(principal.user_id, local.id);
    assert_eq!(h.store.user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn provider_failure_is_upstream() -> Result<()> {
    let h = harness_with(config(), RecordingMailer::new(), None)?;
    assert!(matches!(
        h.service
            .provider_auth(IdentityProvider::Google, "ya29.token", "cli")
            .await,
        Err(AuthError::Upstream(_))
    ));
    assert_eq!(h.store.user_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn authenticate_rejects_unknown_subject() -> Result<()> {
    let h = harness()?;
    let other = harness()?;
    other.service.register("alice@example.com", "secret1").await?;
    let tokens = other
        .service
        .login("alice@example.com", "secret1", "cli")
        .await?;

    // Same secret, but the user only exists in the other store.
    assert!(matches!(
        h.service.authenticate(&tokens.access_token).await,
        Err(AuthError::Unauthorized)
    ));
    Ok(())
}

#[tokio::test]
async fn principal_role_requirements() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;
    let tokens = h.service.login("alice@example.com", "secret1", "cli").await?;
    let principal = h.service.authenticate(&tokens.access_token).await?;

    principal.require_any(&[])?;
    principal.require_any(&[Role::User])?;
    assert!(matches!(
        principal.require_any(&[Role::Admin]),
        Err(AuthError::Forbidden)
    ));
    Ok(())
}

#[tokio::test]
async fn concurrent_refresh_has_one_winner() -> Result<()> {
    let h = harness()?;
    h.service.register("alice@example.com", "secret1").await?;
    let tokens = h.service.login("alice@example.com", "secret1", "cli").await?;
    let service = Arc::new(h.service);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let service = service.clone();
        let token = tokens.refresh.token.clone();
        handles.push(tokio::spawn(
            async move { service.refresh(&token, "cli").await },
        ));
    }
    let mut winners = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => winners += 1,
            Err(err) => assert!(matches!(err, AuthError::Unauthorized)),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(h.store.session_count().await, 1);
    Ok(())
}

/// Reads work; every account creation fails at the store.
struct BrokenInserts(Arc<MemoryStore>);

#[async_trait]
impl UserStore for BrokenInserts {
    async fn find_user(&self, id_or_email: &str) -> Result<Option<User>> {
        self.0.find_user(id_or_email).await
    }

    async fn create_user(&self, _user: NewUser) -> Result<CreateOutcome> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn set_reset_ticket(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.0.set_reset_ticket(user_id, token_hash, expires_at).await
    }

    async fn find_by_reset_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        self.0.find_by_reset_hash(token_hash, now).await
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.0
            .complete_password_reset(user_id, token_hash, password_hash, now)
            .await
    }
}

#[tokio::test]
async fn provisioning_store_failure_names_email() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = AuthService::new(
        config(),
        Arc::new(BrokenInserts(store.clone())),
        store.clone(),
        &SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
        Arc::new(FakeExchange {
            email: Some("Erin@Gmail.com".to_string()),
        }),
        Arc::new(RecordingMailer::new()),
    )?;

    let result = service
        .provider_auth(IdentityProvider::Google, "ya29.token", "cli")
        .await;
    assert!(matches!(
        result,
        Err(AuthError::BadRequest(msg)) if msg.contains("erin@gmail.com")
    ));
    assert_eq!(store.user_count().await, 0);
    assert_eq!(store.session_count().await, 0);
    Ok(())
}

/// Two service instances, each with its own user cache, over one store.
fn cached_instance(
    store: &Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
) -> Result<AuthService> {
    AuthService::new(
        config(),
        Arc::new(CachedUserStore::new(
            store.clone(),
            std::time::Duration::from_secs(3600),
        )),
        store.clone(),
        &SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
        Arc::new(FakeExchange { email: None }),
        mailer,
    )
}

#[tokio::test]
async fn password_reset_on_one_instance_applies_to_logins_on_another() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let a = cached_instance(&store, mailer.clone())?;
    let b = cached_instance(&store, mailer.clone())?;

    a.register("alice@example.com", "old-password").await?;
    // Warms b's cache with the old hash.
    b.login("alice@example.com", "old-password", "cli").await?;

    a.request_reset("alice@example.com").await?;
    let token = mailer
        .last_token()
        .await
        .ok_or_else(|| anyhow!("no reset email"))?;
    a.reset_password(&token, "new-password").await?;

    assert!(matches!(
        b.login("alice@example.com", "old-password", "cli").await,
        Err(AuthError::Unauthorized)
    ));
    b.login("alice@example.com", "new-password", "cli").await?;
    Ok(())
}

#[tokio::test]
async fn block_on_store_applies_to_cached_instance() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = cached_instance(&store, Arc::new(RecordingMailer::new()))?;
    let user = service.register("alice@example.com", "secret1").await?;
    let tokens = service.login("alice@example.com", "secret1", "cli").await?;

    store.set_blocked(user.id, true).await;

    assert!(matches!(
        service.login("alice@example.com", "secret1", "cli").await,
        Err(AuthError::Unauthorized)
    ));
    assert!(matches!(
        service.refresh(&tokens.refresh.token, "cli").await,
        Err(AuthError::Unauthorized)
    ));
    Ok(())
}

#[tokio::test]
async fn oversized_reset_ttl_is_an_error() -> Result<()> {
    let h = harness_with(
        config().with_reset_token_ttl_seconds(i64::MAX),
        RecordingMailer::new(),
        None,
    )?;
    h.service.register("alice@example.com", "secret1").await?;
    assert!(matches!(
        h.service.request_reset("alice@example.com").await,
        Err(AuthError::Internal(_))
    ));
    assert!(h.mailer.sent.lock().await.is_empty());
    Ok(())
}
