//! Firebase Auth account operations (identitytoolkit v1).

use crate::firebase::{FirebaseClient, FirebaseUser};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

/// Request types accepted by `accounts:sendOobCode`.
const OOB_VERIFY_EMAIL: &str = "VERIFY_EMAIL";
const OOB_PASSWORD_RESET: &str = "PASSWORD_RESET";

impl FirebaseClient {
    /// Create a provider user record. The password is handed to the provider
    /// untouched; credential storage is entirely its concern.
    /// # Errors
    /// Returns an error if the provider rejects the request, including the
    /// duplicate-email case (`EMAIL_EXISTS`).
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<FirebaseUser> {
        let token = self.access_token().await?;

        let payload = json!({
            "email": email,
            "password": password,
            "displayName": display_name,
        });

        let response = self
            .http()
            .post(self.accounts_url(""))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await?;

            let error_message = provider_error(&json_response);

            error!("Failed to create user: {}", error_message);

            return Err(anyhow!("{}, {}", status, error_message));
        }

        let json_response: Value = response.json().await?;

        let uid = json_response["localId"]
            .as_str()
            .ok_or_else(|| anyhow!("Error parsing JSON response: no localId found"))?;

        debug!("created user {}", uid);

        Ok(FirebaseUser {
            uid: uid.to_string(),
            email: email.to_string(),
            email_verified: false,
            display_name: Some(display_name.to_string()),
        })
    }

    /// Look up a user record by email. `Ok(None)` when the provider does not
    /// know the address, so callers can map it to 401 instead of 500.
    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<FirebaseUser>> {
        let token = self.access_token().await?;

        let payload = json!({ "email": [email] });

        let response = self
            .http()
            .post(self.accounts_url(":lookup"))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await?;

            let error_message = provider_error(&json_response);

            if error_message == "EMAIL_NOT_FOUND" {
                return Ok(None);
            }

            error!("Failed to look up user: {}", error_message);

            return Err(anyhow!("{}, {}", status, error_message));
        }

        let json_response: Value = response.json().await?;

        match json_response["users"].as_array() {
            Some(users) if !users.is_empty() => {
                let user: FirebaseUser = serde_json::from_value(users[0].clone())?;

                Ok(Some(user))
            }
            _ => Ok(None),
        }
    }

    /// Generate a one-time email verification link for the address.
    /// # Errors
    /// Returns an error if the provider rejects the request, e.g. for an
    /// unknown address.
    pub async fn email_verification_link(&self, email: &str, continue_url: &str) -> Result<String> {
        self.oob_link(OOB_VERIFY_EMAIL, email, continue_url).await
    }

    /// Generate a one-time password reset link for the address.
    /// # Errors
    /// Returns an error if the provider rejects the request, e.g. for an
    /// unknown address.
    pub async fn password_reset_link(&self, email: &str, continue_url: &str) -> Result<String> {
        self.oob_link(OOB_PASSWORD_RESET, email, continue_url).await
    }

    #[instrument(skip(self))]
    async fn oob_link(&self, request_type: &str, email: &str, continue_url: &str) -> Result<String> {
        let token = self.access_token().await?;

        let payload = json!({
            "requestType": request_type,
            "email": email,
            "returnOobLink": true,
            "continueUrl": continue_url,
        });

        let response = self
            .http()
            .post(self.accounts_url(":sendOobCode"))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await?;

            let error_message = provider_error(&json_response);

            error!("Failed to generate {} link: {}", request_type, error_message);

            return Err(anyhow!("{}, {}", status, error_message));
        }

        let json_response: Value = response.json().await?;

        json_response["oobLink"].as_str().map_or_else(
            || {
                error!("No oobLink in {} response", request_type);

                Err(anyhow!("Failed to generate link"))
            },
            |link| Ok(link.to_string()),
        )
    }
}

/// Extract the short error code from a Google API error body,
/// e.g. `{"error": {"message": "EMAIL_NOT_FOUND"}}`.
fn provider_error(json_response: &Value) -> &str {
    json_response["error"]["message"].as_str().unwrap_or_default()
}
