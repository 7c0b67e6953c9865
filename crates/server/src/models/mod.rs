//! Domain models for the ordering service.
//!
//! These are validated domain objects, separate from database row types.
//! Store implementations convert their rows into these types.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod promo;
pub mod session;
pub mod user;

pub use cart::{CartAdjustment, CartEntry, CartLine, CheckoutLine, MenuItemSnapshot};
pub use catalog::{MenuItem, MenuItemUpdate, NewMenuItem, Restaurant, RestaurantFilter};
pub use order::{LineDraft, Order, OrderDraft, OrderLineItem, Page};
pub use promo::PromoCode;
pub use session::{CurrentUser, SessionRecord};
pub use user::{NewRestaurantProfile, NewUser, User, UserCredentials};
