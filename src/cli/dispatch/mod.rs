use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

use crate::cli::actions::Action;
use crate::cli::globals::GlobalArgs;
use crate::warden::cookie::extract_refresh_token;
use crate::warden::{IdentityProvider, ResetDisclosure, Role, SmtpConfig, TlsMode};

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn secret(matches: &ArgMatches, id: &str) -> Result<SecretString> {
    required(matches, id).map(SecretString::from)
}

fn device(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("device")
        .cloned()
        .unwrap_or_else(|| crate::APP_USER_AGENT.to_string())
}

/// The refresh token comes either verbatim or inside a `Cookie` header.
fn refresh_token(matches: &ArgMatches) -> Result<String> {
    if let Some(token) = matches.get_one::<String>("token") {
        return Ok(token.clone());
    }
    let header = required(matches, "cookie")?;
    extract_refresh_token(&header).context("cookie header has no refreshtoken")
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let mut globals = GlobalArgs::new(required(matches, "dsn")?, secret(matches, "jwt-secret")?);

    if let Some(url) = matches.get_one::<String>("frontend-url") {
        globals.frontend_url.clone_from(url);
    }
    if let Some(ttl) = matches.get_one::<i64>("access-token-ttl-seconds") {
        globals.access_token_ttl_seconds = *ttl;
    }
    if let Some(months) = matches.get_one::<u32>("refresh-session-months") {
        globals.refresh_session_months = *months;
    }
    if let Some(ttl) = matches.get_one::<i64>("reset-token-ttl-seconds") {
        globals.reset_token_ttl_seconds = *ttl;
    }
    if let Some(cost) = matches.get_one::<u32>("password-cost") {
        globals.password_cost = *cost;
    }
    globals.insecure_cookies = matches.get_flag("insecure-cookies");
    globals.reset_disclosure = match matches.get_one::<String>("reset-disclosure").map(String::as_str) {
        Some("opaque") => ResetDisclosure::Opaque,
        _ => ResetDisclosure::Reveal,
    };
    if let Some(url) = matches.get_one::<String>("google-userinfo-url") {
        globals.google_userinfo_url.clone_from(url);
    }
    if let Some(url) = matches.get_one::<String>("yandex-userinfo-url") {
        globals.yandex_userinfo_url.clone_from(url);
    }
    if let Some(seconds) = matches.get_one::<u64>("provider-timeout-seconds") {
        globals.provider_timeout_seconds = *seconds;
    }
    globals.user_cache_ttl_seconds = matches.get_one::<i64>("user-cache-ttl-seconds").copied();
    globals.smtp = smtp(matches, globals.provider_timeout_seconds)?;

    Ok(globals)
}

fn smtp(matches: &ArgMatches, timeout_seconds: u64) -> Result<Option<SmtpConfig>> {
    let Some(host) = matches.get_one::<String>("smtp-host") else {
        return Ok(None);
    };
    let mut config = SmtpConfig::new(host.clone(), required(matches, "smtp-from")?);
    if let Some(port) = matches.get_one::<u16>("smtp-port") {
        config.port = *port;
    }
    if let Some(security) = matches.get_one::<String>("smtp-security") {
        config.tls = security.parse::<TlsMode>().map_err(|err| anyhow!(err))?;
    }
    config.username = matches.get_one::<String>("smtp-user").cloned();
    config.password = matches
        .get_one::<String>("smtp-password")
        .cloned()
        .map(SecretString::from);
    config.timeout = std::time::Duration::from_secs(timeout_seconds);
    Ok(Some(config))
}

/// # Errors
/// Returns an error if the subcommand is unknown or its arguments are invalid.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let (name, sub_m) = matches
        .subcommand()
        .context("a subcommand is required")?;

    let action = match name {
        "register" => Action::Register {
            email: required(sub_m, "email")?,
            password: secret(sub_m, "password")?,
            password_repeat: secret(sub_m, "password-repeat")?,
        },
        "login" => Action::Login {
            email: required(sub_m, "email")?,
            password: secret(sub_m, "password")?,
            device: device(sub_m),
        },
        "refresh" => Action::Refresh {
            token: refresh_token(sub_m)?,
            device: device(sub_m),
        },
        "logout" => Action::Logout {
            token: refresh_token(sub_m)?,
        },
        "provider-login" => Action::ProviderLogin {
            provider: required(sub_m, "provider")?
                .parse::<IdentityProvider>()
                .map_err(|err| anyhow!(err))?,
            token: secret(sub_m, "token")?,
            device: device(sub_m),
        },
        "reset-request" => Action::ResetRequest {
            email: required(sub_m, "email")?,
        },
        "reset-password" => Action::ResetPassword {
            token: secret(sub_m, "token")?,
            password: secret(sub_m, "password")?,
        },
        "verify" => Action::Verify {
            token: secret(sub_m, "token")?,
            required_roles: sub_m
                .get_many::<String>("require-role")
                .unwrap_or_default()
                .map(|role| role.parse::<Role>().map_err(|err| anyhow!(err)))
                .collect::<Result<Vec<_>>>()?,
        },
        other => return Err(anyhow!("unknown subcommand: {other}")),
    };

    Ok(action)
}
