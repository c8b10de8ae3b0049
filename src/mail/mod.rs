//! Email delivery over authenticated SMTP submission.
//!
//! Plain-text messages only; the verification and reset links inside them are
//! generated by the identity provider. The SMTP transaction is awaited
//! inline, there is no retry or queueing.

use crate::cli::globals::SmtpConfig;
use anyhow::{Context, Result};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

const VERIFICATION_SUBJECT: &str = "Verify your email address";
const PASSWORD_RESET_SUBJECT: &str = "Reset your password";

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    // Captures formatted messages instead of delivering them.
    #[cfg(test)]
    Memory(std::sync::Mutex<Vec<String>>),
}

/// SMTP mail sender, shared across requests behind an `Arc`.
pub struct Mailer {
    transport: Transport,
    from: Mailbox,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer").field("from", &self.from).finish()
    }
}

impl Mailer {
    /// Build a STARTTLS submission transport from the SMTP configuration.
    /// # Errors
    /// Returns an error if the host is invalid or the username is not a
    /// usable From address.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("Invalid SMTP host {}", config.host))?
            .port(config.port)
            .credentials(credentials)
            .build();

        let from = config
            .username
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid From address {}", config.username))?;

        Ok(Self {
            transport: Transport::Smtp(transport),
            from,
        })
    }

    /// Mailer that records messages in memory instead of delivering them.
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self {
            transport: Transport::Memory(std::sync::Mutex::new(Vec::new())),
            from: "backend@example.com".parse().unwrap(),
        }
    }

    /// Formatted messages captured by an in-memory mailer.
    #[cfg(test)]
    pub(crate) fn captured(&self) -> Vec<String> {
        match &self.transport {
            Transport::Smtp(_) => Vec::new(),
            Transport::Memory(messages) => messages.lock().unwrap().clone(),
        }
    }

    /// Send a plain-text message and wait for the SMTP transaction result.
    /// # Errors
    /// Returns an error if the recipient address is invalid or the relay
    /// rejects the message.
    #[instrument(skip(self, body))]
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = build_message(&self.from, to, subject, body)?;

        match &self.transport {
            Transport::Smtp(transport) => {
                transport
                    .send(message)
                    .await
                    .context("SMTP transaction failed")?;
            }
            #[cfg(test)]
            Transport::Memory(messages) => {
                let formatted = String::from_utf8(message.formatted())?;
                messages.lock().unwrap().push(formatted);
            }
        }

        debug!("sent {:?} to {}", subject, to);

        Ok(())
    }

    /// Send the email-verification message for a provider-generated link.
    /// # Errors
    /// Returns an error if the message cannot be built or sent.
    pub async fn send_verification(&self, to: &str, link: &str) -> Result<()> {
        self.send(to, VERIFICATION_SUBJECT, &verification_body(link))
            .await
    }

    /// Send the password-reset message for a provider-generated link.
    /// # Errors
    /// Returns an error if the message cannot be built or sent.
    pub async fn send_password_reset(&self, to: &str, link: &str) -> Result<()> {
        self.send(to, PASSWORD_RESET_SUBJECT, &password_reset_body(link))
            .await
    }
}

fn build_message(from: &Mailbox, to: &str, subject: &str, body: &str) -> Result<Message> {
    let to = to
        .parse::<Mailbox>()
        .with_context(|| format!("Invalid recipient address {to}"))?;

    Ok(Message::builder()
        .from(from.clone())
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?)
}

fn verification_body(link: &str) -> String {
    format!("Please click the following link to verify.\n{link}")
}

fn password_reset_body(link: &str) -> String {
    format!("Please click the following link to reset your password.\n{link}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "backend@example.com".to_string(),
            password: SecretString::from("hunter2".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mailer_new() {
        let mailer = Mailer::new(&config()).unwrap();
        assert_eq!(mailer.from.email.to_string(), "backend@example.com");
    }

    #[tokio::test]
    async fn test_mailer_new_invalid_from() {
        let mut config = config();
        config.username = "not an address".to_string();
        assert!(Mailer::new(&config).is_err());
    }

    #[test]
    fn test_build_message_headers() {
        let from = "backend@example.com".parse::<Mailbox>().unwrap();
        let message = build_message(&from, "a@b.com", "Subject line", "hello").unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("From: backend@example.com"));
        assert!(formatted.contains("To: a@b.com"));
        assert!(formatted.contains("Subject: Subject line"));
        assert!(formatted.contains("Content-Type: text/plain"));
        assert!(formatted.contains("hello"));
    }

    #[test]
    fn test_build_message_invalid_recipient() {
        let from = "backend@example.com".parse::<Mailbox>().unwrap();
        assert!(build_message(&from, "not an address", "s", "b").is_err());
    }

    #[tokio::test]
    async fn test_in_memory_capture() {
        let mailer = Mailer::in_memory();

        mailer
            .send_verification("a@b.com", "https://my-project.firebaseapp.com/?oobCode=abc")
            .await
            .unwrap();

        let captured = mailer.captured();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].contains("To: a@b.com"));
        assert!(captured[0].contains("Subject: Verify your email address"));
    }

    #[test]
    fn test_bodies_contain_link() {
        let link = "https://my-project.firebaseapp.com/?oobCode=abc";
        assert!(verification_body(link).ends_with(link));
        assert!(password_reset_body(link).ends_with(link));
    }
}
