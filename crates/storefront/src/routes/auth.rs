//! Authentication route handlers.
//!
//! Handles login, sign-up, logout, and the email-token password reset flow.
//! Outcomes are carried between redirects as short query keys and turned
//! into messages when the page renders.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use pomelo_core::UserId;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CsrfToken, clear_current_user, csrf, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Logout form data (just the CSRF token).
#[derive(Debug, Deserialize)]
pub struct LogoutForm {
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// New password form data.
#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    pub password: String,
    pub password_confirm: String,
    pub token: String,
    pub user_id: i32,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Translate a redirect query key into a user-facing message.
fn message_for_key(key: &str) -> String {
    match key {
        "credentials" => "Invalid email or password.".to_string(),
        "email_taken" => "An account with this email already exists.".to_string(),
        "password_mismatch" => "Passwords do not match.".to_string(),
        "password_too_short" => "Password must be at least 8 characters.".to_string(),
        "invalid_input" => "Please check your input and try again.".to_string(),
        "invalid_token" => "That reset link is invalid or has expired.".to_string(),
        "registered" => "Account created. You can log in now.".to_string(),
        "email_sent" => "If that email has an account, a reset link is on its way.".to_string(),
        "password_reset" => "Password updated. Log in with the new one.".to_string(),
        other => other.to_string(),
    }
}

fn map_messages(query: MessageQuery) -> (Option<String>, Option<String>) {
    (
        query.error.as_deref().map(message_for_key),
        query.success.as_deref().map(message_for_key),
    )
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// New password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub error: Option<String>,
    pub token: String,
    pub user_id: i32,
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
#[instrument(skip(csrf))]
pub async fn login_page(
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> LoginTemplate {
    let (error, success) = map_messages(query);
    LoginTemplate {
        logged_in: false,
        csrf_token: csrf,
        error,
        success,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    csrf::verify(&session, &form.csrf).await?;

    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => {
            return Ok(Redirect::to("/auth/login?error=credentials").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    };
    set_current_user(&session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Redirect::to("/").into_response())
}

/// Handle logout.
#[instrument(skip(session, form))]
pub async fn logout(session: Session, Form(form): Form<LogoutForm>) -> Result<Redirect> {
    csrf::verify(&session, &form.csrf).await?;

    clear_current_user(&session).await?;
    clear_sentry_user();

    // Also destroy the entire session
    session.flush().await?;

    Ok(Redirect::to("/"))
}

// =============================================================================
// Sign-up
// =============================================================================

/// Display the sign-up page.
#[instrument(skip(csrf))]
pub async fn signup_page(
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> SignupTemplate {
    let (error, _) = map_messages(query);
    SignupTemplate {
        logged_in: false,
        csrf_token: csrf,
        error,
    }
}

/// Handle sign-up form submission.
///
/// Creates the user with an empty cart, then sends the welcome email
/// best-effort - a delivery failure doesn't undo the registration.
#[instrument(skip(state, session, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    csrf::verify(&session, &form.csrf).await?;

    let user = match AuthService::new(state.pool())
        .register(&form.name, &form.email, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            return Ok(Redirect::to("/auth/signup?error=email_taken").into_response());
        }
        Err(AuthError::PasswordMismatch) => {
            return Ok(Redirect::to("/auth/signup?error=password_mismatch").into_response());
        }
        Err(AuthError::WeakPassword(_)) => {
            return Ok(Redirect::to("/auth/signup?error=password_too_short").into_response());
        }
        Err(AuthError::EmptyName | AuthError::InvalidEmail(_)) => {
            return Ok(Redirect::to("/auth/signup?error=invalid_input").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = state
        .mailer()
        .send_welcome(user.email.as_str(), &user.name)
        .await
    {
        tracing::warn!(user = %user.id, "Failed to send welcome email: {e}");
    }

    Ok(Redirect::to("/auth/login?success=registered").into_response())
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
#[instrument(skip(csrf))]
pub async fn forgot_password_page(
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> ForgotPasswordTemplate {
    let (error, success) = map_messages(query);
    ForgotPasswordTemplate {
        logged_in: false,
        csrf_token: csrf,
        error,
        success,
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form can't be used to probe which emails
/// have accounts.
#[instrument(skip(state, session, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Redirect> {
    csrf::verify(&session, &form.csrf).await?;

    match AuthService::new(state.pool())
        .start_password_reset(&form.email)
        .await
    {
        Ok(Some((user, token))) => {
            let reset_url = format!("{}/auth/reset/{token}", state.config().base_url);
            if let Err(e) = state
                .mailer()
                .send_password_reset(user.email.as_str(), &user.name, &reset_url)
                .await
            {
                tracing::warn!(user = %user.id, "Failed to send reset email: {e}");
            }
        }
        Ok(None) | Err(AuthError::InvalidEmail(_)) => {
            // Unknown account or malformed email: same outward response
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to("/auth/reset-password?success=email_sent"))
}

/// Display the new password form reached from the email link.
#[instrument(skip(state, csrf, token))]
pub async fn new_password_page(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let Some(user) = AuthService::new(state.pool())
        .user_for_reset_token(&token)
        .await?
    else {
        return Ok(Redirect::to("/auth/reset-password?error=invalid_token").into_response());
    };

    let (error, _) = map_messages(query);
    Ok(NewPasswordTemplate {
        logged_in: false,
        csrf_token: csrf,
        error,
        token,
        user_id: user.id.as_i32(),
    }
    .into_response())
}

/// Handle the new password form submission.
#[instrument(skip(state, session, form))]
pub async fn new_password(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<NewPasswordForm>,
) -> Result<Response> {
    csrf::verify(&session, &form.csrf).await?;

    let result = AuthService::new(state.pool())
        .complete_password_reset(
            UserId::new(form.user_id),
            &form.token,
            &form.password,
            &form.password_confirm,
        )
        .await;

    let redirect = match result {
        Ok(()) => "/auth/login?success=password_reset".to_string(),
        Err(AuthError::PasswordMismatch) => {
            format!("/auth/reset/{}?error=password_mismatch", form.token)
        }
        Err(AuthError::WeakPassword(_)) => {
            format!("/auth/reset/{}?error=password_too_short", form.token)
        }
        Err(AuthError::InvalidResetToken) => {
            "/auth/reset-password?error=invalid_token".to_string()
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Redirect::to(&redirect).into_response())
}
