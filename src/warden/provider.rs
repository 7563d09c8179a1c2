//! Identity provider adapters.
//!
//! Each provider exchanges its own access token for a verified email at its
//! userinfo endpoint. The set of providers is closed; a new provider is a new
//! `IdentityProvider` variant with its endpoint and email field.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::error::AuthError;
use super::models::Provider;

const GOOGLE_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";
const YANDEX_INFO_URL: &str = "https://login.yandex.ru/info";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityProvider {
    Google,
    Yandex,
}

impl IdentityProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Yandex => "yandex",
        }
    }

    /// Userinfo request for `access_token` against `base`.
    pub(crate) fn userinfo_url(self, base: &Url, access_token: &str) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            match self {
                Self::Google => {
                    query.append_pair("access_token", access_token);
                }
                Self::Yandex => {
                    query.append_pair("format", "json");
                    query.append_pair("oauth_token", access_token);
                }
            }
        }
        url
    }

    /// Pull the verified email out of the provider's userinfo document.
    pub(crate) fn extract_email(self, body: &Value) -> Option<String> {
        let field = match self {
            Self::Google => {
                // tokeninfo reports email_verified as a string.
                let verified = body.get("email_verified").map_or(true, |v| {
                    v.as_bool() == Some(true) || v.as_str() == Some("true")
                });
                if !verified {
                    return None;
                }
                "email"
            }
            Self::Yandex => "default_email",
        };
        body.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(ToString::to_string)
    }
}

impl From<IdentityProvider> for Provider {
    fn from(provider: IdentityProvider) -> Self {
        match provider {
            IdentityProvider::Google => Self::Google,
            IdentityProvider::Yandex => Self::Yandex,
        }
    }
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "yandex" => Ok(Self::Yandex),
            other => Err(format!("unsupported identity provider: {other}")),
        }
    }
}

/// Exchange a provider-issued access token for a verified email.
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    async fn exchange(
        &self,
        provider: IdentityProvider,
        access_token: &str,
    ) -> Result<String, AuthError>;
}

#[derive(Clone, Debug)]
pub struct ProviderEndpoints {
    pub google: Url,
    pub yandex: Url,
}

impl ProviderEndpoints {
    pub fn new(google: &str, yandex: &str) -> anyhow::Result<Self> {
        Ok(Self {
            google: Url::parse(google)?,
            yandex: Url::parse(yandex)?,
        })
    }

    fn base(&self, provider: IdentityProvider) -> &Url {
        match provider {
            IdentityProvider::Google => &self.google,
            IdentityProvider::Yandex => &self.yandex,
        }
    }
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            google: Url::parse(GOOGLE_TOKENINFO_URL).unwrap_or_else(|_| unreachable!()),
            yandex: Url::parse(YANDEX_INFO_URL).unwrap_or_else(|_| unreachable!()),
        }
    }
}

/// Userinfo exchange over HTTPS.
pub struct HttpIdentityExchange {
    client: reqwest::Client,
    endpoints: ProviderEndpoints,
}

impl HttpIdentityExchange {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoints: ProviderEndpoints, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, endpoints })
    }
}

#[async_trait]
impl IdentityExchange for HttpIdentityExchange {
    #[instrument(skip(self, access_token))]
    async fn exchange(
        &self,
        provider: IdentityProvider,
        access_token: &str,
    ) -> Result<String, AuthError> {
        let token = access_token.trim();
        if token.is_empty() {
            return Err(AuthError::Unauthorized);
        }
        let url = provider.userinfo_url(self.endpoints.base(provider), token);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| AuthError::Upstream(format!("{provider} request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!("{provider} userinfo returned {status}");
            return Err(AuthError::Upstream(format!(
                "{provider} userinfo returned {status}"
            )));
        }

        let body: Value = response.json().await.map_err(|err| {
            AuthError::Upstream(format!("{provider} userinfo is not valid json: {err}"))
        })?;

        provider
            .extract_email(&body)
            .ok_or_else(|| AuthError::Upstream(format!("{provider} userinfo has no verified email")))
    }
}
