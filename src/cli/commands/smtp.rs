use clap::{Arg, Command};

/// Outbound mail relay. Without `--smtp-host` mail is only logged.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("smtp-host")
                .long("smtp-host")
                .help("SMTP relay host; reset emails are only logged when unset")
                .env("WARDEN_SMTP_HOST"),
        )
        .arg(
            Arg::new("smtp-port")
                .long("smtp-port")
                .help("SMTP relay port")
                .env("WARDEN_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new("smtp-security")
                .long("smtp-security")
                .help("SMTP connection security")
                .env("WARDEN_SMTP_SECURITY")
                .default_value("starttls")
                .value_parser(["starttls", "tls", "none"]),
        )
        .arg(
            Arg::new("smtp-user")
                .long("smtp-user")
                .help("SMTP username")
                .env("WARDEN_SMTP_USER")
                .requires("smtp-password"),
        )
        .arg(
            Arg::new("smtp-password")
                .long("smtp-password")
                .help("SMTP password")
                .env("WARDEN_SMTP_PASSWORD")
                .hide_env_values(true)
                .requires("smtp-user"),
        )
        .arg(
            Arg::new("smtp-from")
                .long("smtp-from")
                .help("Sender address for outgoing mail")
                .env("WARDEN_SMTP_FROM")
                .default_value("Warden <no-reply@localhost>"),
        )
}
