//! Records owned by the durable store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Where an account came from. Federated accounts have no password hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
    Yandex,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
            Self::Yandex => "yandex",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Self::Local),
            "google" => Ok(Self::Google),
            "yandex" => Ok(Self::Yandex),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub roles: Vec<Role>,
    pub blocked: bool,
    pub provider: Provider,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

/// Public projection of a user; never carries hashes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
    pub provider: Provider,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            provider: user.provider,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: Provider,
    pub roles: Vec<Role>,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(User),
    Conflict,
}

/// Stored view of a refresh session. Only the token hash is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_hash: Vec<u8>,
    pub user_id: Uuid,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionWrite {
    Stored,
    TokenCollision,
}

/// Refresh credential handed to the caller; the raw token exists only here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefreshSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access + refresh pair minted by every successful authentication.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh: RefreshSession,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("ROOT".parse::<Role>().is_err());
    }

    #[test]
    fn provider_parses_lowercase() {
        assert_eq!("google".parse::<Provider>(), Ok(Provider::Google));
        assert_eq!(Provider::Yandex.to_string(), "yandex");
        assert!("github".parse::<Provider>().is_err());
    }

    #[test]
    fn role_serializes_screaming() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&Role::Admin)?, "\"ADMIN\"");
        Ok(())
    }

    #[test]
    fn session_expiry_is_inclusive() {
        let now = Utc::now();
        let record = SessionRecord {
            token_hash: vec![1],
            user_id: Uuid::nil(),
            user_agent: "cli".to_string(),
            expires_at: now,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn user_view_drops_secrets() -> anyhow::Result<()> {
        let user = User {
            id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            password_hash: Some("$2b$10$hash".to_string()),
            roles: vec![Role::User],
            blocked: false,
            provider: Provider::Local,
            reset_token_hash: Some("abc".to_string()),
            reset_token_expires_at: None,
        };
        let json = serde_json::to_string(&UserView::from(&user))?;
        assert!(!json.contains("hash"));
        assert!(json.contains("alice@example.com"));
        Ok(())
    }
}
