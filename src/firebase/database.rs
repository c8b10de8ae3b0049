//! Realtime Database REST access for the per-user role side record.
//!
//! The database is only used to persist a role string at `users/{uid}/role`.

use crate::firebase::FirebaseClient;
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

impl FirebaseClient {
    /// Write the role side record for a user.
    /// # Errors
    /// Returns an error if the database rejects the write.
    #[instrument(skip(self))]
    pub async fn set_role(&self, uid: &str, role: &str) -> Result<()> {
        let token = self.access_token().await?;

        let response = self
            .http()
            .put(self.role_url(uid))
            .bearer_auth(&token)
            .json(&json!(role))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await?;

            let error_message = json_response["error"].as_str().unwrap_or_default();

            error!("Failed to write role for {}: {}", uid, error_message);

            return Err(anyhow!("{}, {}", status, error_message));
        }

        debug!("role for {} set to {}", uid, role);

        Ok(())
    }

    /// Read the role side record for a user. `Ok(None)` when no role was
    /// ever written; the database returns JSON `null` for missing paths.
    #[instrument(skip(self))]
    pub async fn get_role(&self, uid: &str) -> Result<Option<String>> {
        let token = self.access_token().await?;

        let response = self
            .http()
            .get(self.role_url(uid))
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await?;

            let error_message = json_response["error"].as_str().unwrap_or_default();

            error!("Failed to read role for {}: {}", uid, error_message);

            return Err(anyhow!("{}, {}", status, error_message));
        }

        let json_response: Value = response.json().await?;

        Ok(json_response.as_str().map(ToString::to_string))
    }
}
