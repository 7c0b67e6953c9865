//! Forkful Core - Shared domain types.
//!
//! This crate provides the value types used across all Forkful components:
//! - `server` - JSON API for customers and restaurant operators
//! - `cli` - Command-line tools for migrations and operations
//!
//! # Architecture
//!
//! The core crate contains only types and their validation rules - no I/O,
//! no database access, no HTTP. With the `postgres` feature enabled, the types
//! also implement the sqlx encode/decode traits so they can be bound directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
