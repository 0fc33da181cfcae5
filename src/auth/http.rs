//! HTTP edge: bearer extraction and rejection responses.

use axum::{
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

use super::{
    error::Rejection,
    principal::{Principal, PrincipalResolver},
};

/// Token from `Authorization: Bearer <token>`, if present and non-empty.
/// The scheme name is matched case-insensitively.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the request's bearer token into an active principal.
///
/// # Errors
/// Returns the `Rejection` to send back; operational failures become
/// `Rejection::Internal` and are logged by the resolver.
pub async fn authorize(
    resolver: &PrincipalResolver,
    headers: &HeaderMap,
) -> Result<Principal, Rejection> {
    let token = extract_bearer_token(headers).ok_or(Rejection::Unauthenticated)?;
    match resolver.resolve(&token).await {
        Ok(resolution) => resolution.into_result(),
        Err(_) => Err(Rejection::Internal),
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                let mut response =
                    (StatusCode::UNAUTHORIZED, "Could not validate credentials").into_response();
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            Self::Forbidden => (StatusCode::FORBIDDEN, "Access denied").into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
