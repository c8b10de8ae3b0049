//! Custom sign-in token minting.
//!
//! Custom tokens are RS256 JWTs signed locally with the service-account key,
//! which the client exchanges for a session via the provider's
//! `signInWithCustomToken` endpoint. An optional `role` claim is embedded so
//! clients can scope their UI without an extra lookup.

use crate::firebase::FirebaseClient;
use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Audience required by the provider for custom tokens.
const CUSTOM_TOKEN_AUD: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Token lifetime; the provider caps custom tokens at one hour.
pub const CUSTOM_TOKEN_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Value>,
}

impl FirebaseClient {
    /// Mint a custom sign-in token for `uid`, returning the token and its
    /// expiry as a unix timestamp.
    /// # Errors
    /// Returns an error if the service-account key cannot be parsed or the
    /// token cannot be signed.
    pub fn custom_token(&self, uid: &str, role: Option<&str>) -> Result<(String, i64)> {
        let account = self.service_account();

        let now = Utc::now().timestamp();
        let expires = now + CUSTOM_TOKEN_TTL_SECONDS;

        let claims = CustomTokenClaims {
            iss: account.client_email.clone(),
            sub: account.client_email.clone(),
            aud: CUSTOM_TOKEN_AUD.to_string(),
            iat: now,
            exp: expires,
            uid: uid.to_string(),
            claims: role.map(|role| json!({ "role": role })),
        };

        let key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())?;

        let token = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        Ok((token, expires))
    }
}
