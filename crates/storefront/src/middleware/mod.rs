//! HTTP middleware and request extractors.

pub mod auth;
pub mod csrf;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use csrf::CsrfToken;
pub use session::create_session_layer;
