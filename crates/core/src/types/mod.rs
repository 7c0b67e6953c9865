//! Core types for Forkful.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{DiscountPercent, Price, PriceError};
pub use role::{Role, RoleParseError};
pub use status::{OrderStatus, StatusParseError};
