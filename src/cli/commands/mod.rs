use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};
use std::path::PathBuf;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("firegate")
        .about("Firebase-delegating authentication backend")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("FIREGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("project-id")
                .long("project-id")
                .help("Firebase project id")
                .env("FIREBASE_PROJECT_ID")
                .required(true),
        )
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .help("Realtime Database URL, example: https://<project>.firebaseio.com")
                .env("FIREBASE_DATABASE_URL")
                .required(true),
        )
        .arg(
            Arg::new("credentials")
                .short('c')
                .long("credentials")
                .help("Path to the service-account credential file")
                .default_value("firebase.json")
                .env("FIREGATE_CREDENTIALS")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("smtp-host")
                .long("smtp-host")
                .help("SMTP submission host")
                .default_value("smtp.gmail.com")
                .env("FIREGATE_SMTP_HOST"),
        )
        .arg(
            Arg::new("smtp-port")
                .long("smtp-port")
                .help("SMTP submission port (STARTTLS)")
                .default_value("587")
                .env("FIREGATE_SMTP_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("smtp-username")
                .long("smtp-username")
                .help("SMTP username, also used as the From address")
                .env("SMTP_USERNAME")
                .required(true),
        )
        .arg(
            Arg::new("smtp-password")
                .long("smtp-password")
                .help("SMTP password")
                .env("SMTP_PASSWORD")
                .required(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("FIREGATE_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
