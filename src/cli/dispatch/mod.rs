use crate::cli::{
    actions::Action,
    globals::{GlobalArgs, SmtpConfig},
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Turn parsed CLI matches into an `Action` plus the process-wide
/// configuration. Required values are enforced by clap, the `ok_or_else`
/// branches are unreachable in practice.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{name}"))
    };

    let mut globals = GlobalArgs::new(required("project-id")?, required("database-url")?);

    if let Some(credentials) = matches.get_one::<PathBuf>("credentials") {
        globals.credentials_file.clone_from(credentials);
    }

    globals.smtp = SmtpConfig {
        host: required("smtp-host")?,
        port: matches.get_one::<u16>("smtp-port").copied().unwrap_or(587),
        username: required("smtp-username")?,
        password: SecretString::from(required("smtp-password")?),
    };

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
    };

    Ok((action, globals))
}
