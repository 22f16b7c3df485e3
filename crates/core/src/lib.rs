//! Pomelo Core - Shared types library.
//!
//! This crate provides common types used across all Pomelo components:
//! - `storefront` - The public shop server
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The one piece of real behavior here is the
//! [`cart::Cart`] aggregate, which owns the add/remove/reset contract for a
//! user's shopping cart.
//!
//! # Modules
//!
//! - [`cart`] - The cart aggregate (lines, cached total, mutation contract)
//! - [`types`] - Newtype wrappers for type-safe IDs and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartError, CartLine};
pub use types::*;
