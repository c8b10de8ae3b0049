use crate::{
    cli::globals::GlobalArgs, firebase::FirebaseClient, firegate::handlers::valid_email,
    mail::Mailer,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPassword {
    email: String,
}

#[utoipa::path(
    post,
    path= "/forget-password",
    request_body = ForgotPassword,
    responses (
        (status = 200, description = "Password reset email sent", content_type = "text/plain"),
        (status = 400, description = "Malformed payload or invalid email"),
        (status = 500, description = "Provider or mail failure"),
    ),
    tag= "password"
)]
/// Generate a provider password-reset link and email it. An unknown address
/// fails at link generation, so no email leaves the process.
#[instrument(skip(firebase, mailer, globals, payload))]
pub async fn forgot_password(
    firebase: Extension<Arc<FirebaseClient>>,
    mailer: Extension<Arc<Mailer>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<ForgotPassword>>,
) -> impl IntoResponse {
    let request: ForgotPassword = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()),
    };

    if !valid_email(&request.email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string());
    }

    let link = match firebase
        .password_reset_link(&request.email, &globals.continue_url())
        .await
    {
        Ok(link) => link,
        Err(e) => {
            error!("Failed to generate password reset link: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send password reset email".to_string(),
            );
        }
    };

    if let Err(e) = mailer.send_password_reset(&request.email, &link).await {
        error!("Failed to send password reset email: {:?}", e);

        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send password reset email".to_string(),
        );
    }

    (
        StatusCode::OK,
        "Password reset email sent successfully".to_string(),
    )
}
