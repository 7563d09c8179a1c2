//! Core configuration, loaded once at startup.

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_REFRESH_SESSION_MONTHS: u32 = 1;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_PASSWORD_COST: u32 = 10;
const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;

/// How `request_reset` answers for an email with no account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetDisclosure {
    /// Fail with `BadRequest` ("user not found").
    Reveal,
    /// Report success without sending mail.
    Opaque,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_token_ttl_seconds: i64,
    refresh_session_months: u32,
    reset_token_ttl_seconds: i64,
    password_cost: u32,
    user_cache_ttl_seconds: i64,
    secure_cookies: bool,
    provider_timeout_seconds: u64,
    reset_disclosure: ResetDisclosure,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        let secure_cookies = frontend_base_url.starts_with("https://");
        Self {
            frontend_base_url,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_session_months: DEFAULT_REFRESH_SESSION_MONTHS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            password_cost: DEFAULT_PASSWORD_COST,
            user_cache_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            secure_cookies,
            provider_timeout_seconds: DEFAULT_PROVIDER_TIMEOUT_SECONDS,
            reset_disclosure: ResetDisclosure::Reveal,
        }
    }

    /// Also resets the user cache TTL, which tracks the access-token lifetime.
    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self.user_cache_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_session_months(mut self, months: u32) -> Self {
        self.refresh_session_months = months;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    #[must_use]
    pub fn with_user_cache_ttl_seconds(mut self, seconds: i64) -> Self {
        self.user_cache_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_provider_timeout_seconds(mut self, seconds: u64) -> Self {
        self.provider_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_disclosure(mut self, disclosure: ResetDisclosure) -> Self {
        self.reset_disclosure = disclosure;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_session_months(&self) -> u32 {
        self.refresh_session_months
    }

    #[must_use]
    pub fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    #[must_use]
    pub fn password_cost(&self) -> u32 {
        self.password_cost
    }

    #[must_use]
    pub fn user_cache_ttl_seconds(&self) -> i64 {
        self.user_cache_ttl_seconds
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    #[must_use]
    pub fn provider_timeout_seconds(&self) -> u64 {
        self.provider_timeout_seconds
    }

    #[must_use]
    pub fn reset_disclosure(&self) -> ResetDisclosure {
        self.reset_disclosure
    }
}
