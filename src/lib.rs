//! # Firegate
//!
//! `firegate` is a thin authentication backend that delegates user
//! registration, login, email verification, and password reset to Firebase
//! (Auth + Realtime Database). The crate decodes JSON requests, talks to the
//! provider over its REST surface, and formats HTTP responses.
//!
//! - **Identity:** Firebase Auth (identitytoolkit v1), authenticated with
//!   OAuth2 access tokens minted from a service-account credential file.
//! - **Roles:** a per-user role string stored at `users/{uid}/role` in the
//!   Realtime Database.
//! - **Email:** verification and password-reset links generated by the
//!   provider and delivered over authenticated SMTP submission.

pub mod cli;
pub mod firebase;
pub mod firegate;
pub mod mail;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
