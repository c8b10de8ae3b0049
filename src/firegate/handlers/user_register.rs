use crate::{
    cli::globals::GlobalArgs, firebase::FirebaseClient, firegate::handlers::valid_email,
    mail::Mailer,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserRegister {
    email: String,
    #[serde(skip_serializing)]
    password: String,
    role: String,
}

#[utoipa::path(
    post,
    path= "/register",
    request_body = UserRegister,
    responses (
        (status = 201, description = "Registration successful", content_type = "text/plain"),
        (status = 400, description = "Malformed payload or invalid email"),
        (status = 500, description = "Provider, database or mail failure"),
    ),
    tag= "register"
)]
/// Create a provider user, send the verification email, and write the role
/// side record. Failures after user creation leave the provider record in
/// place; there is no compensating rollback.
#[instrument(skip(firebase, mailer, globals, payload))]
pub async fn register(
    firebase: Extension<Arc<FirebaseClient>>,
    mailer: Extension<Arc<Mailer>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<UserRegister>>,
) -> impl IntoResponse {
    let user: UserRegister = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()),
    };

    if !valid_email(&user.email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string());
    }

    debug!("registering {} with role {}", user.email, user.role);

    // The password goes to the provider verbatim; credential hashing and
    // storage are its concern. The role doubles as the display name.
    let new_user = match firebase
        .create_user(&user.email, &user.password, &user.role)
        .await
    {
        Ok(new_user) => new_user,
        Err(e) => {
            error!("Failed to create user: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create user".to_string(),
            );
        }
    };

    let link = match firebase
        .email_verification_link(&user.email, &globals.continue_url())
        .await
    {
        Ok(link) => link,
        Err(e) => {
            error!("Failed to generate verification link: {:?}", e);

            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send verification email".to_string(),
            );
        }
    };

    if let Err(e) = mailer.send_verification(&user.email, &link).await {
        error!("Failed to send verification email: {:?}", e);

        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send verification email".to_string(),
        );
    }

    if let Err(e) = firebase.set_role(&new_user.uid, &user.role).await {
        error!("Failed to assign role to user: {:?}", e);

        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to assign role to user".to_string(),
        );
    }

    (
        StatusCode::CREATED,
        "User registered successfully".to_string(),
    )
}
