use secrecy::SecretString;
use std::path::PathBuf;

/// SMTP submission credentials and endpoint, read once at startup.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Configuration assembled once at startup and passed by reference to
/// collaborators. Handlers never read the environment directly.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub project_id: String,
    pub database_url: String,
    pub credentials_file: PathBuf,
    pub smtp: SmtpConfig,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(project_id: String, database_url: String) -> Self {
        Self {
            project_id,
            database_url,
            credentials_file: PathBuf::from("firebase.json"),
            smtp: SmtpConfig {
                host: String::from("smtp.gmail.com"),
                port: 587,
                username: String::new(),
                password: SecretString::from(String::new()),
            },
        }
    }

    /// Landing page for provider-generated links, derived from the project id.
    #[must_use]
    pub fn continue_url(&self) -> String {
        format!("https://{}.firebaseapp.com/", self.project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "my-project".to_string(),
            "https://my-project.firebaseio.com".to_string(),
        );
        assert_eq!(args.project_id, "my-project");
        assert_eq!(args.database_url, "https://my-project.firebaseio.com");
        assert_eq!(args.credentials_file, PathBuf::from("firebase.json"));
        assert_eq!(args.smtp.password.expose_secret(), "");
    }

    #[test]
    fn test_continue_url() {
        let args = GlobalArgs::new(
            "my-project".to_string(),
            "https://my-project.firebaseio.com".to_string(),
        );
        assert_eq!(args.continue_url(), "https://my-project.firebaseapp.com/");
    }
}
