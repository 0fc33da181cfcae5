//! # Tessera
//!
//! Signed session tokens, revocation and principal resolution.
//!
//! The building blocks, in the order a request meets them:
//!
//! 1. [`auth::CredentialHasher`] turns a plaintext password into a salted
//!    Argon2id hash and verifies it later.
//! 2. [`auth::TokenCodec`] issues and verifies HMAC-signed compact tokens of
//!    two kinds, access and refresh, each with its own secret.
//! 3. [`auth::RevocationStore`] remembers revoked token identifiers until the
//!    token would have expired anyway.
//! 4. [`auth::PrincipalResolver`] turns a bearer token into an active
//!    [`auth::Principal`], or into one of two caller-visible rejections.
//!
//! [`auth::SessionManager`] ties them together for login, refresh rotation and
//! logout. The `tessera` binary exposes the same operations to operators.

pub mod auth;
pub mod cli;
