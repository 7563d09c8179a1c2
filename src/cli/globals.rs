use secrecy::SecretString;

use crate::warden::{AuthConfig, ResetDisclosure, SmtpConfig};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub dsn: String,
    pub jwt_secret: SecretString,
    pub frontend_url: String,
    pub access_token_ttl_seconds: i64,
    /// Falls back to the access-token lifetime when unset.
    pub user_cache_ttl_seconds: Option<i64>,
    pub refresh_session_months: u32,
    pub reset_token_ttl_seconds: i64,
    pub password_cost: u32,
    pub insecure_cookies: bool,
    pub reset_disclosure: ResetDisclosure,
    pub google_userinfo_url: String,
    pub yandex_userinfo_url: String,
    pub provider_timeout_seconds: u64,
    /// Reset emails are only logged without a relay.
    pub smtp: Option<SmtpConfig>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(dsn: String, jwt_secret: SecretString) -> Self {
        Self {
            dsn,
            jwt_secret,
            frontend_url: "http://localhost:3000".to_string(),
            access_token_ttl_seconds: 3600,
            user_cache_ttl_seconds: None,
            refresh_session_months: 1,
            reset_token_ttl_seconds: 3600,
            password_cost: 10,
            insecure_cookies: false,
            reset_disclosure: ResetDisclosure::Reveal,
            google_userinfo_url: "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string(),
            yandex_userinfo_url: "https://login.yandex.ru/info".to_string(),
            provider_timeout_seconds: 10,
            smtp: None,
        }
    }

    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        let config = AuthConfig::new(self.frontend_url.clone())
            .with_access_token_ttl_seconds(self.access_token_ttl_seconds)
            .with_refresh_session_months(self.refresh_session_months)
            .with_reset_token_ttl_seconds(self.reset_token_ttl_seconds)
            .with_password_cost(self.password_cost)
            .with_provider_timeout_seconds(self.provider_timeout_seconds)
            .with_reset_disclosure(self.reset_disclosure);
        let config = match self.user_cache_ttl_seconds {
            Some(seconds) => config.with_user_cache_ttl_seconds(seconds),
            None => config,
        };
        if self.insecure_cookies {
            config.with_secure_cookies(false)
        } else {
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "postgres://localhost/warden".to_string(),
            SecretString::from("s3cr3t".to_string()),
        );
        assert_eq!(args.dsn, "postgres://localhost/warden");
        assert_eq!(args.jwt_secret.expose_secret(), "s3cr3t");
        assert!(!format!("{args:?}").contains("s3cr3t"));
    }

    #[test]
    fn test_auth_config_from_globals() {
        let mut args = GlobalArgs::new(String::new(), SecretString::default());
        args.frontend_url = "https://warden.dev".to_string();
        args.access_token_ttl_seconds = 900;
        args.reset_disclosure = ResetDisclosure::Opaque;

        let config = args.auth_config();
        assert_eq!(config.frontend_base_url(), "https://warden.dev");
        assert_eq!(config.access_token_ttl_seconds(), 900);
        assert_eq!(config.user_cache_ttl_seconds(), 900);
        assert_eq!(config.reset_disclosure(), ResetDisclosure::Opaque);
        assert!(config.secure_cookies());

        args.insecure_cookies = true;
        assert!(!args.auth_config().secure_cookies());

        args.user_cache_ttl_seconds = Some(0);
        assert_eq!(args.auth_config().user_cache_ttl_seconds(), 0);
        assert_eq!(args.auth_config().access_token_ttl_seconds(), 900);
    }

    #[test]
    fn test_smtp_password_is_redacted() {
        let mut args = GlobalArgs::new(String::new(), SecretString::default());
        let mut smtp = SmtpConfig::new(
            "mail.warden.dev".to_string(),
            "no-reply@warden.dev".to_string(),
        );
        smtp.username = Some("mailer".to_string());
        smtp.password = Some(SecretString::from("hunter22".to_string()));
        args.smtp = Some(smtp);
        assert!(!format!("{args:?}").contains("hunter22"));
    }
}
