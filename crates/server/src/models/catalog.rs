//! Restaurants, menus and the catalog filter.

use rust_decimal::Decimal;
use serde::Serialize;

use forkful_core::{MenuItemId, Price, RestaurantId, UserId};

/// A restaurant as listed in the catalog.
///
/// Rating and delivery time are display attributes maintained outside this
/// service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    /// The restaurant-role account that operates this restaurant.
    pub owner_id: UserId,
    pub name: String,
    pub cuisine: String,
    /// Estimated delivery time in minutes.
    pub delivery_time: Option<i32>,
    pub rating: Decimal,
    pub address: Option<String>,
}

/// Optional, independently composable catalog constraints.
///
/// `None` means "no constraint" for each field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestaurantFilter {
    pub cuisine: Option<String>,
    pub max_delivery_time: Option<i32>,
    pub min_rating: Option<Decimal>,
}

impl RestaurantFilter {
    /// Whether any constraint is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cuisine.is_none() && self.max_delivery_time.is_none() && self.min_rating.is_none()
    }

    /// Evaluate the filter against a restaurant.
    ///
    /// Mirrors the SQL predicate: a restaurant with no delivery estimate never
    /// satisfies a `max_delivery_time` constraint.
    #[must_use]
    pub fn matches(&self, restaurant: &Restaurant) -> bool {
        if let Some(cuisine) = &self.cuisine
            && &restaurant.cuisine != cuisine
        {
            return false;
        }
        if let Some(max) = self.max_delivery_time
            && !restaurant.delivery_time.is_some_and(|t| t <= max)
        {
            return false;
        }
        if let Some(min) = self.min_rating
            && restaurant.rating < min
        {
            return false;
        }
        true
    }
}

/// A menu item as currently offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_url: Option<String>,
}

/// Data needed to insert a menu item.
#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_url: Option<String>,
}

/// Replacement values for an existing menu item.
#[derive(Debug, Clone)]
pub struct MenuItemUpdate {
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image_url: Option<String>,
}
