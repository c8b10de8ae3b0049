//! HTTP surface: router, middleware stack, and server loop.

use crate::{cli::globals::GlobalArgs, firebase::FirebaseClient, mail::Mailer};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub(crate) mod handlers;

use self::handlers::{
    forgot_password::{self, __path_forgot_password},
    health::__path_health,
    resend_verification::{self, __path_resend_verification},
    user_login::{self, __path_login},
    user_register::{self, __path_register},
};

#[derive(OpenApi)]
#[openapi(
    paths(health, register, login, forgot_password, resend_verification),
    components(schemas(
        user_register::UserRegister,
        user_login::UserLogin,
        user_login::LoginResponse,
        forgot_password::ForgotPassword,
        resend_verification::ResendVerification
    )),
    tags(
        (name = "firegate", description = "Firebase-delegating authentication API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router with the full middleware stack.
#[must_use]
pub fn app(firebase: Arc<FirebaseClient>, mailer: Arc<Mailer>, globals: GlobalArgs) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .route("/", get(|| async { "🔥" }))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/forget-password", post(handlers::forgot_password))
        .route("/resend-verification", post(handlers::resend_verification))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(firebase))
                .layer(Extension(mailer))
                .layer(Extension(globals)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    firebase: Arc<FirebaseClient>,
    mailer: Arc<Mailer>,
    globals: &GlobalArgs,
) -> Result<()> {
    let app = app(firebase, mailer, globals.clone());

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firebase::{test_support, ServiceAccount};
    use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use std::{collections::HashMap, sync::Mutex};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let globals = GlobalArgs::new(
            "my-project".to_string(),
            "https://my-project.firebaseio.com".to_string(),
        );

        app(
            Arc::new(test_support::client()),
            Arc::new(Mailer::in_memory()),
            globals,
        )
    }

    fn post_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn post_json(app: Router, path: &str, body: &str) -> StatusCode {
        let response = app.oneshot(post_request(path, body)).await.unwrap();

        response.status()
    }

    // In-process double for the provider: identitytoolkit accounts surface,
    // the OAuth token endpoint, and the RTDB role path. A fallback handler
    // dispatches on the path since `accounts:lookup` is not a routable
    // pattern.
    #[derive(Debug, Default)]
    struct StubState {
        roles: Mutex<HashMap<String, String>>,
        oob_requests: Mutex<Vec<String>>,
    }

    async fn stub_handler(
        State(state): State<Arc<StubState>>,
        request: Request<Body>,
    ) -> axum::response::Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        if path == "/token" {
            return Json(json!({ "access_token": "stub-token" })).into_response();
        }

        if path.ends_with("accounts:lookup") {
            let email = payload["email"][0].as_str().unwrap_or_default();
            return match email {
                "verified@example.com" => Json(json!({
                    "users": [{ "localId": "uid-verified", "email": email, "emailVerified": true }]
                }))
                .into_response(),
                "unverified@example.com" => Json(json!({
                    "users": [{ "localId": "uid-unverified", "email": email, "emailVerified": false }]
                }))
                .into_response(),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": { "message": "EMAIL_NOT_FOUND" } })),
                )
                    .into_response(),
            };
        }

        if path.ends_with("accounts:sendOobCode") {
            let email = payload["email"].as_str().unwrap_or_default();
            if email == "missing@example.com" {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": { "message": "EMAIL_NOT_FOUND" } })),
                )
                    .into_response();
            }

            let request_type = payload["requestType"].as_str().unwrap_or_default();
            state
                .oob_requests
                .lock()
                .unwrap()
                .push(request_type.to_string());

            return Json(json!({
                "oobLink": "https://my-project.firebaseapp.com/?oobCode=abc123"
            }))
            .into_response();
        }

        if path.ends_with("/accounts") && method == Method::POST {
            return Json(json!({ "localId": "uid-new", "email": payload["email"] }))
                .into_response();
        }

        if path.ends_with("/role.json") {
            let uid = path.split('/').nth(2).unwrap_or_default().to_string();

            if method == Method::PUT {
                let role = payload.as_str().unwrap_or_default().to_string();
                state.roles.lock().unwrap().insert(uid, role);
                return Json(payload).into_response();
            }

            let role = state.roles.lock().unwrap().get(&uid).cloned();
            return match role {
                Some(role) => Json(json!(role)).into_response(),
                None => Json(Value::Null).into_response(),
            };
        }

        StatusCode::NOT_FOUND.into_response()
    }

    async fn spawn_stub(state: Arc<StubState>) -> String {
        let stub = Router::new().fallback(stub_handler).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });

        format!("http://{addr}")
    }

    /// Application router wired against the in-process provider double,
    /// returning the mailer handle so tests can inspect captured messages.
    async fn stub_app(state: Arc<StubState>) -> (Router, Arc<Mailer>) {
        let base = spawn_stub(state).await;

        let account = ServiceAccount {
            client_email: "firegate@my-project.iam.gserviceaccount.com".to_string(),
            private_key: SecretString::from(test_support::TEST_PRIVATE_KEY.to_string()),
            token_uri: format!("{base}/token"),
        };

        let firebase = FirebaseClient::new(account, "my-project".to_string(), base.clone())
            .unwrap()
            .with_identity_base(format!("{base}/v1"));

        let mailer = Arc::new(Mailer::in_memory());

        let globals = GlobalArgs::new("my-project".to_string(), base);

        (app(Arc::new(firebase), mailer.clone(), globals), mailer)
    }

    #[tokio::test]
    async fn test_login_unverified_email_rejected() {
        let state = Arc::new(StubState::default());
        let (app, mailer) = stub_app(state).await;

        let response = app
            .oneshot(post_request(
                "/login",
                r#"{"email":"unverified@example.com","password":"hunter2"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Email not verified");
        assert!(mailer.captured().is_empty());
    }

    #[tokio::test]
    async fn test_login_verified_email_issues_token() {
        let state = Arc::new(StubState::default());
        state
            .roles
            .lock()
            .unwrap()
            .insert("uid-verified".to_string(), "admin".to_string());
        let (app, _mailer) = stub_app(state).await;

        let response = app
            .oneshot(post_request(
                "/login",
                r#"{"email":"verified@example.com","password":"hunter2"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();

        assert!(!json["token"].as_str().unwrap().is_empty());
        assert!(json["expires"].as_i64().unwrap() > Utc::now().timestamp());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["user_id"], "uid-verified");
    }

    #[tokio::test]
    async fn test_register_writes_role_and_sends_one_email() {
        let state = Arc::new(StubState::default());
        let (app, mailer) = stub_app(state.clone()).await;

        let response = app
            .oneshot(post_request(
                "/register",
                r#"{"email":"new@example.com","password":"hunter2","role":"admin"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"User registered successfully");

        assert_eq!(
            state.roles.lock().unwrap().get("uid-new").map(String::as_str),
            Some("admin")
        );
        assert_eq!(
            *state.oob_requests.lock().unwrap(),
            vec!["VERIFY_EMAIL".to_string()]
        );

        let captured = mailer.captured();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].contains("To: new@example.com"));
        assert!(captured[0].contains("Subject: Verify your email address"));
    }

    #[tokio::test]
    async fn test_forget_password_unknown_email_sends_nothing() {
        let state = Arc::new(StubState::default());
        let (app, mailer) = stub_app(state.clone()).await;

        let response = app
            .oneshot(post_request(
                "/forget-password",
                r#"{"email":"missing@example.com"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(mailer.captured().is_empty());
        assert!(state.oob_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_root() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-app"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    // Malformed bodies must be rejected before any downstream call. A
    // downstream attempt would surface as 500 here, not 400.
    #[tokio::test]
    async fn test_register_malformed_body() {
        assert_eq!(
            post_json(test_app(), "/register", "{not json").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_login_malformed_body() {
        assert_eq!(
            post_json(test_app(), "/login", "").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_forget_password_malformed_body() {
        assert_eq!(
            post_json(test_app(), "/forget-password", "42").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_resend_verification_malformed_body() {
        assert_eq!(
            post_json(test_app(), "/resend-verification", "{not json").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_register_invalid_email() {
        assert_eq!(
            post_json(
                test_app(),
                "/register",
                r#"{"email":"nope","password":"pw","role":"admin"}"#
            )
            .await,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_openapi_paths() {
        let doc = openapi();
        let paths = doc.paths.paths;

        assert!(paths.contains_key("/register"));
        assert!(paths.contains_key("/login"));
        assert!(paths.contains_key("/forget-password"));
        assert!(paths.contains_key("/resend-verification"));
        assert!(paths.contains_key("/health"));
    }
}
