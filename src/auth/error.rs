use thiserror::Error;

/// Internal failure kinds.
///
/// The variants carry enough detail for logs; callers facing clients should
/// only ever see the collapsed [`Rejection`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("malformed token")]
    TokenMalformed,
    #[error("token expired")]
    TokenExpired,
    #[error("unexpected token type")]
    TokenWrongType,
    #[error("invalid token signature")]
    TokenSignatureInvalid,
    #[error("token revoked")]
    TokenRevoked,
    #[error("subject not found")]
    SubjectNotFound,
    #[error("principal is inactive")]
    PrincipalInactive,
    #[error("signing failure: {0}")]
    SigningFailure(String),
    #[error("misconfigured: {0}")]
    Misconfigured(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

impl AuthError {
    /// Operational defects rather than client mistakes.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(
            self,
            Self::SigningFailure(_) | Self::Misconfigured(_) | Self::Backend(_)
        )
    }

    /// Collapse into the outcome a client is allowed to observe.
    #[must_use]
    pub const fn rejection(&self) -> Rejection {
        match self {
            Self::InvalidCredentials
            | Self::TokenMalformed
            | Self::TokenExpired
            | Self::TokenWrongType
            | Self::TokenSignatureInvalid
            | Self::TokenRevoked
            | Self::SubjectNotFound => Rejection::Unauthenticated,
            Self::PrincipalInactive => Rejection::Forbidden,
            Self::SigningFailure(_) | Self::Misconfigured(_) | Self::Backend(_) => {
                Rejection::Internal
            }
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Caller-visible outcome of a failed authentication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("could not validate credentials")]
    Unauthenticated,
    #[error("access denied")]
    Forbidden,
    #[error("internal error")]
    Internal,
}
