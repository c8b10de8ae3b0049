use crate::{
    cli::{actions::Action, globals::GlobalArgs},
    firebase::{FirebaseClient, ServiceAccount},
    firegate::new,
    mail::Mailer,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port } => {
            let database_url = Url::parse(&globals.database_url)
                .with_context(|| format!("Invalid database URL {}", globals.database_url))?;

            // Fail fast on a missing or malformed credential file
            let service_account = ServiceAccount::from_file(&globals.credentials_file)
                .with_context(|| {
                    format!(
                        "Failed to load service account from {}",
                        globals.credentials_file.display()
                    )
                })?;

            let firebase = Arc::new(FirebaseClient::new(
                service_account,
                globals.project_id.clone(),
                database_url.to_string(),
            )?);

            let mailer = Arc::new(Mailer::new(&globals.smtp)?);

            new(port, firebase, mailer, globals).await?;
        }
    }

    Ok(())
}
