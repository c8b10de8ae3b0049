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
pub struct ResendVerification {
    email: String,
}

#[utoipa::path(
    post,
    path= "/resend-verification",
    request_body = ResendVerification,
    responses (
        (status = 200, description = "Verification email sent", content_type = "text/plain"),
        (status = 400, description = "Malformed payload or invalid email"),
        (status = 500, description = "Provider or mail failure"),
    ),
    tag= "verification"
)]
/// Generate a fresh provider verification link and email it.
#[instrument(skip(firebase, mailer, globals, payload))]
pub async fn resend_verification(
    firebase: Extension<Arc<FirebaseClient>>,
    mailer: Extension<Arc<Mailer>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<ResendVerification>>,
) -> impl IntoResponse {
    let request: ResendVerification = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()),
    };

    if !valid_email(&request.email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string());
    }

    let link = match firebase
        .email_verification_link(&request.email, &globals.continue_url())
        .await
    {
        Ok(link) => link,
        Err(e) => {
            error!("Failed to generate verification link: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to resend verification email".to_string(),
            );
        }
    };

    if let Err(e) = mailer.send_verification(&request.email, &link).await {
        error!("Failed to send verification email: {:?}", e);

        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to resend verification email".to_string(),
        );
    }

    (
        StatusCode::OK,
        "Verification email sent successfully".to_string(),
    )
}
