//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page (featured products)
//! GET  /health                  - Health check
//!
//! # Products
//! GET  /products                - Paginated product listing
//! GET  /products/{id}           - Product detail
//! POST /products/search         - Title search
//!
//! # Cart (requires auth)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add one unit of a product
//! POST /cart/remove             - Remove a product's whole line
//!
//! # Checkout (requires auth)
//! GET  /checkout                - Create payment session, show summary
//! GET  /checkout/success        - Snapshot order, reset cart
//! GET  /checkout/cancel         - Back to the cart
//!
//! # Orders (requires auth)
//! GET  /orders                  - Order history
//! GET  /orders/{id}/invoice     - PDF invoice
//!
//! # Auth
//! GET  /auth/login              - Login page
//! POST /auth/login              - Login action
//! GET  /auth/signup             - Sign-up page
//! POST /auth/signup             - Sign-up action
//! POST /auth/logout             - Logout action
//! GET  /auth/reset-password     - Request password reset page
//! POST /auth/reset-password     - Send reset email
//! GET  /auth/reset/{token}      - New password form (from email link)
//! POST /auth/new-password       - Set the new password
//!
//! # Admin (requires auth, own products only)
//! GET  /admin/products          - Own products list
//! GET  /admin/products/new      - Create form
//! POST /admin/products          - Create (multipart, image upload)
//! GET  /admin/products/{id}/edit - Edit form
//! POST /admin/products/{id}     - Update (multipart)
//! POST /admin/products/{id}/delete - Delete
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use rust_decimal::Decimal;

use crate::state::AppState;

/// Format a decimal amount as a price string.
pub(crate) fn format_price(amount: Decimal) -> String {
    format!("${amount:.2}")
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/search", post(products::search))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/success", get(checkout::success))
        .route("/cancel", get(checkout::cancel))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}/invoice", get(orders::invoice))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .route(
            "/reset-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route("/reset/{token}", get(auth::new_password_page))
        .route("/new-password", post(auth::new_password))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::index).post(admin::create))
        .route("/products/new", get(admin::new_form))
        .route("/products/{id}", post(admin::update))
        .route("/products/{id}/edit", get(admin::edit_form))
        .route("/products/{id}/delete", post(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout routes
        .nest("/checkout", checkout_routes())
        // Order routes
        .nest("/orders", order_routes())
        // Auth routes
        .nest("/auth", auth_routes())
        // Admin routes
        .nest("/admin", admin_routes())
}
