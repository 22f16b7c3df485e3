//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; not-found and server errors render the user-facing
//! error pages instead of leaking internals.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use pomelo_core::CartError;

use crate::db::RepositoryError;
use crate::filters;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::email::EmailError;
use crate::services::invoice::InvoiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Payment gateway operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] CheckoutError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Invoice rendering failed.
    #[error("Invoice error: {0}")]
    Invoice(#[from] InvoiceError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed input rejected before reaching the aggregate.
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        // Removing a missing line is a fault, surfaced as not-found
        match err {
            CartError::LineNotFound(product) => {
                Self::NotFound(format!("cart line for product {product}"))
            }
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// 404 page template.
#[derive(Template)]
#[template(path = "error/404.html")]
struct Error404Template {
    logged_in: bool,
    csrf_token: String,
}

/// 500 page template.
#[derive(Template)]
#[template(path = "error/500.html")]
struct Error500Template {
    logged_in: bool,
    csrf_token: String,
}

/// Render the 404 page body.
fn not_found_page() -> Html<String> {
    let tmpl = Error404Template {
        logged_in: false,
        csrf_token: String::new(),
    };
    Html(
        tmpl.render()
            .unwrap_or_else(|_| "Page not found".to_string()),
    )
}

/// Render the 500 page body.
fn server_error_page() -> Html<String> {
    let tmpl = Error500Template {
        logged_in: false,
        csrf_token: String::new(),
    };
    Html(
        tmpl.render()
            .unwrap_or_else(|_| "Something went wrong".to_string()),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Payment(_)
                | Self::Email(_)
                | Self::Invoice(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match &self {
            Self::Database(_) | Self::Internal(_) | Self::Email(_) | Self::Invoice(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, server_error_page()).into_response()
            }
            Self::Payment(_) => (StatusCode::BAD_GATEWAY, server_error_page()).into_response(),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, not_found_page()).into_response(),
            Self::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "Please log in first".to_string()).into_response()
            }
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()).into_response(),
            Self::Auth(err) => {
                let status = match err {
                    AuthError::InvalidCredentials | AuthError::InvalidResetToken => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                    AuthError::WeakPassword(_)
                    | AuthError::PasswordMismatch
                    | AuthError::EmptyName
                    | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                    AuthError::PasswordHash | AuthError::Repository(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                // Don't expose internal error details to clients
                let message = match err {
                    AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                    AuthError::InvalidResetToken => {
                        "Reset link is invalid or has expired".to_string()
                    }
                    AuthError::UserAlreadyExists => {
                        "An account with this email already exists".to_string()
                    }
                    AuthError::WeakPassword(msg) => msg.clone(),
                    AuthError::PasswordMismatch => "Passwords do not match".to_string(),
                    AuthError::EmptyName => "Name cannot be empty".to_string(),
                    AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                    AuthError::PasswordHash | AuthError::Repository(_) => {
                        return (StatusCode::INTERNAL_SERVER_ERROR, server_error_page())
                            .into_response();
                    }
                };

                (status, message).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Validation failure: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_cart_fault_maps_to_not_found() {
        let err: AppError = pomelo_core::CartError::LineNotFound(pomelo_core::ProductId::new(9))
            .into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
