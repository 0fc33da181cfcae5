//! Authentication primitives.
//!
//! Everything here is transport agnostic except [`http`], which maps the
//! outcome of a resolution onto `axum` responses.

pub mod config;
pub mod error;
pub mod http;
pub mod password;
pub mod principal;
pub mod revocation;
pub mod session;
pub mod token;

pub use self::config::{Algorithm, AuthConfig, HashCost};
pub use self::error::{AuthError, Rejection};
pub use self::password::CredentialHasher;
pub use self::principal::{
    MemoryDirectory, Principal, PrincipalResolver, Resolution, UserDirectory,
};
pub use self::revocation::{
    spawn_purge_task, MemoryRevocationStore, PgRevocationStore, RevocationStore,
};
pub use self::session::{SessionManager, TokenPair};
pub use self::token::{Claims, TokenCodec, TokenType};
