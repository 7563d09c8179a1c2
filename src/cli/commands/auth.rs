use clap::{Arg, Command};

/// One year.
const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;
/// One week.
const MAX_RESET_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_reset_args(command);
    with_provider_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("HS256 signing secret for access tokens (at least 32 bytes)")
                .env("WARDEN_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token lifetime in seconds")
                .env("WARDEN_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_ACCESS_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new("user-cache-ttl-seconds")
                .long("user-cache-ttl-seconds")
                .help("How long user records are cached; 0 disables the cache (default: access token lifetime)")
                .env("WARDEN_USER_CACHE_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64).range(0..=MAX_ACCESS_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new("refresh-session-months")
                .long("refresh-session-months")
                .help("Refresh session lifetime in months")
                .env("WARDEN_REFRESH_SESSION_MONTHS")
                .default_value("1")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("password-cost")
                .long("password-cost")
                .help("bcrypt cost factor")
                .env("WARDEN_PASSWORD_COST")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
        .arg(
            Arg::new("insecure-cookies")
                .long("insecure-cookies")
                .help("Omit the Secure attribute from refresh cookies even for an https frontend")
                .env("WARDEN_INSECURE_COOKIES")
                .action(clap::ArgAction::SetTrue),
        )
}

fn with_reset_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend base URL used for password reset links")
                .env("WARDEN_FRONTEND_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset ticket lifetime in seconds")
                .env("WARDEN_RESET_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(60..=MAX_RESET_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new("reset-disclosure")
                .long("reset-disclosure")
                .help("Reply to reset requests for unknown emails with an error (reveal) or success (opaque)")
                .env("WARDEN_RESET_DISCLOSURE")
                .default_value("reveal")
                .value_parser(["reveal", "opaque"]),
        )
}

fn with_provider_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("google-userinfo-url")
                .long("google-userinfo-url")
                .help("Google token info endpoint")
                .env("WARDEN_GOOGLE_USERINFO_URL")
                .default_value("https://www.googleapis.com/oauth2/v3/tokeninfo"),
        )
        .arg(
            Arg::new("yandex-userinfo-url")
                .long("yandex-userinfo-url")
                .help("Yandex user info endpoint")
                .env("WARDEN_YANDEX_USERINFO_URL")
                .default_value("https://login.yandex.ru/info"),
        )
        .arg(
            Arg::new("provider-timeout-seconds")
                .long("provider-timeout-seconds")
                .help("Timeout for identity provider requests")
                .env("WARDEN_PROVIDER_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
