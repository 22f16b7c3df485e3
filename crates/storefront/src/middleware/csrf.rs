//! CSRF protection for state-changing form submissions.
//!
//! A random token is stored in the session and embedded in every form as a
//! hidden `_csrf` field. Handlers for POST routes call [`verify`] with the
//! submitted value before touching any aggregate; a mismatch rejects the
//! request without side effects.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::models::session_keys;
use crate::services::auth::random_token;

/// Extractor that returns the session's CSRF token, creating one on first
/// use. Templates embed the token in their forms.
pub struct CsrfToken(pub String);

/// Rejection when no session is available for the token.
pub struct CsrfRejection;

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "session unavailable").into_response()
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = CsrfRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or(CsrfRejection)?;

        if let Ok(Some(token)) = session.get::<String>(session_keys::CSRF_TOKEN).await {
            return Ok(Self(token));
        }

        let token = random_token();
        session
            .insert(session_keys::CSRF_TOKEN, &token)
            .await
            .map_err(|_| CsrfRejection)?;

        Ok(Self(token))
    }
}

/// Check a submitted token against the session's token.
///
/// # Errors
///
/// Returns [`CsrfError`] when the session has no token or the submitted
/// value differs.
pub async fn verify(session: &Session, submitted: &str) -> Result<(), CsrfError> {
    let stored: Option<String> = session
        .get(session_keys::CSRF_TOKEN)
        .await
        .map_err(|_| CsrfError)?;

    match stored {
        Some(token) if token == submitted && !token.is_empty() => Ok(()),
        _ => Err(CsrfError),
    }
}

/// Submitted form token did not match the session token.
#[derive(Debug, thiserror::Error)]
#[error("invalid CSRF token")]
pub struct CsrfError;

impl From<CsrfError> for crate::error::AppError {
    fn from(err: CsrfError) -> Self {
        Self::Validation(err.to_string())
    }
}
