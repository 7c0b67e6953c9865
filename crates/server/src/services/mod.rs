//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Session gate: registration, login, token authorization
//! - `cart` - Cart ledger
//! - `catalog` - Filtered restaurant listing and public menus
//! - `menu` - Menu management for restaurant operators
//! - `orders` - Order placement engine and fulfilment
//!
//! Services borrow the store for the duration of one request and take the
//! acting user as an explicit [`CurrentUser`](crate::models::CurrentUser).

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod menu;
pub mod orders;
pub mod ownership;
