//! OAuth2 service-account token exchange (JWT bearer grant).
//!
//! Admin calls against identitytoolkit and the Realtime Database require an
//! access token. We sign a short-lived RS256 assertion with the
//! service-account key and trade it at the token endpoint. Tokens are fetched
//! per call; there is no local cache.

use crate::firebase::{FirebaseClient, ServiceAccount};
use anyhow::{anyhow, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, instrument};

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit \
                      https://www.googleapis.com/auth/firebase.database \
                      https://www.googleapis.com/auth/userinfo.email";

const ASSERTION_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct BearerClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

pub(crate) fn bearer_claims(account: &ServiceAccount, now: i64) -> BearerClaims {
    BearerClaims {
        iss: account.client_email.clone(),
        scope: SCOPES.to_string(),
        aud: account.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_TTL_SECONDS,
    }
}

fn signed_assertion(account: &ServiceAccount) -> Result<String> {
    let claims = bearer_claims(account, Utc::now().timestamp());

    let key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())?;

    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

impl FirebaseClient {
    /// Obtain an access token for admin API calls.
    #[instrument(skip(self))]
    pub(crate) async fn access_token(&self) -> Result<String> {
        let account = self.service_account();
        let assertion = signed_assertion(account)?;

        let params = [("grant_type", GRANT_TYPE), ("assertion", &assertion)];

        let response = self
            .http()
            .post(&account.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let json_response: Value = response.json().await?;

            let error_message = json_response["error_description"]
                .as_str()
                .unwrap_or_default();

            error!("Token exchange failed: {}", error_message);

            return Err(anyhow!("{}, {}", status, error_message));
        }

        let json_response: Value = response.json().await?;

        json_response["access_token"].as_str().map_or_else(
            || {
                error!("Token exchange failed, no access_token in response");

                Err(anyhow!("Failed to obtain access token"))
            },
            |token| Ok(token.to_string()),
        )
    }
}
