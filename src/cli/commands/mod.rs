pub mod auth;
pub mod logging;
pub mod smtp;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgGroup, ColorChoice, Command,
};

fn email_arg() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .long("password")
        .help("Account password")
        .env("WARDEN_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn device_arg() -> Arg {
    Arg::new("device")
        .long("device")
        .help("Device (user agent) the refresh session is bound to")
        .default_value(crate::APP_USER_AGENT)
}

/// `--token` or a raw `Cookie` header carrying the refresh token.
fn with_refresh_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("token")
                .short('t')
                .long("token")
                .help("Refresh token"),
        )
        .arg(
            Arg::new("cookie")
                .long("cookie")
                .help("Cookie header containing the refresh token"),
        )
        .group(
            ArgGroup::new("refresh-token")
                .args(["token", "cookie"])
                .required(true),
        )
}

fn subcommands() -> Vec<Command> {
    vec![
        Command::new("register")
            .about("Create a local account")
            .arg(email_arg())
            .arg(password_arg())
            .arg(
                Arg::new("password-repeat")
                    .long("password-repeat")
                    .help("Password confirmation")
                    .required(true),
            ),
        Command::new("login")
            .about("Log in with email and password")
            .arg(email_arg())
            .arg(password_arg())
            .arg(device_arg()),
        with_refresh_token_args(
            Command::new("refresh")
                .about("Exchange a refresh token for a new token pair")
                .arg(device_arg()),
        ),
        with_refresh_token_args(Command::new("logout").about("Revoke a refresh session")),
        Command::new("provider-login")
            .about("Log in with an identity provider access token")
            .arg(
                Arg::new("provider")
                    .short('p')
                    .long("provider")
                    .help("Identity provider")
                    .value_parser(["google", "yandex"])
                    .required(true),
            )
            .arg(
                Arg::new("token")
                    .short('t')
                    .long("token")
                    .help("Access token issued by the provider")
                    .required(true),
            )
            .arg(device_arg()),
        Command::new("reset-request")
            .about("Email a password reset link")
            .arg(email_arg()),
        Command::new("reset-password")
            .about("Set a new password with a reset token")
            .arg(
                Arg::new("token")
                    .short('t')
                    .long("token")
                    .help("Reset token from the emailed link")
                    .required(true),
            )
            .arg(password_arg()),
        Command::new("verify")
            .about("Verify an access token and print the principal")
            .arg(
                Arg::new("token")
                    .short('t')
                    .long("token")
                    .help("Access token, with or without the Bearer prefix")
                    .env("WARDEN_ACCESS_TOKEN")
                    .hide_env_values(true)
                    .required(true),
            )
            .arg(
                Arg::new("require-role")
                    .long("require-role")
                    .help("Fail unless the principal holds one of these roles")
                    .value_parser(["USER", "ADMIN"])
                    .action(clap::ArgAction::Append),
            ),
    ]
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("warden")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("WARDEN_DSN")
                .required(true),
        )
        .subcommands(subcommands());

    let command = auth::with_args(command);
    let command = smtp::with_args(command);
    logging::with_args(command)
}
