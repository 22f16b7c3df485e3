//! User domain type.

use chrono::{DateTime, Utc};

use pomelo_core::{Cart, Email, UserId};

/// A shop user.
///
/// The user owns exactly one [`Cart`] value; every cart mutation goes through
/// the cart's own methods and is persisted with a single
/// [`crate::db::users::UserRepository::save_cart`] write. The password hash is
/// deliberately not part of this type - it only surfaces through the
/// credential queries in the repository.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name, shown in greetings and on orders.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// The user's shopping cart.
    pub cart: Cart,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}
