use crate::{firebase::FirebaseClient, firegate::handlers::valid_email};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserLogin {
    email: String,
    // Accepted for wire compatibility; credential verification happens when
    // the client exchanges the custom token with the provider.
    #[serde(skip_serializing)]
    password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub token: String,
    /// Unix timestamp after which the token is no longer exchangeable.
    pub expires: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub user_id: String,
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Malformed payload or invalid email"),
        (status = 401, description = "Unknown or unverified email"),
        (status = 500, description = "Provider failure"),
    ),
    tag= "login"
)]
/// Look up the user, require a verified email, and mint a custom sign-in
/// token carrying the role claim from the side record.
#[instrument(skip(firebase, payload))]
pub async fn login(
    firebase: Extension<Arc<FirebaseClient>>,
    payload: Option<Json<UserLogin>>,
) -> Response {
    let user: UserLogin = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
        }
    };

    if !valid_email(&user.email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let found = match firebase.get_user_by_email(&user.email).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            debug!("unknown email: {}", user.email);

            return (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()).into_response();
        }
        Err(e) => {
            error!("Failed to look up user: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to look up user".to_string(),
            )
                .into_response();
        }
    };

    if !found.email_verified {
        debug!("email not verified: {}", user.email);

        return (StatusCode::UNAUTHORIZED, "Email not verified".to_string()).into_response();
    }

    // Best effort: a missing or unreadable role only drops the claim.
    let role = match firebase.get_role(&found.uid).await {
        Ok(role) => role,
        Err(e) => {
            error!("Failed to read role for {}: {:?}", found.uid, e);

            None
        }
    };

    let (token, expires) = match firebase.custom_token(&found.uid, role.as_deref()) {
        Ok(minted) => minted,
        Err(e) => {
            error!("Failed to generate token: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate token".to_string(),
            )
                .into_response();
        }
    };

    debug!("login successful for {}", found.uid);

    (
        StatusCode::OK,
        Json(LoginResponse {
            token,
            expires,
            role,
            user_id: found.uid,
        }),
    )
        .into_response()
}
