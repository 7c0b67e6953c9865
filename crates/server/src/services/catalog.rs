//! Catalog query: filtered restaurant listing and public menus.

use rust_decimal::Decimal;
use thiserror::Error;

use forkful_core::RestaurantId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{CurrentUser, MenuItem, Restaurant, RestaurantFilter};

/// Filter value meaning "no constraint".
const ALL: &str = "all";

/// How many dishes the recommendation strip shows.
pub const RECOMMENDED_DISHES: u32 = 4;

/// Errors that can occur while browsing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A filter value could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("restaurant not found")]
    RestaurantNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw filter values as received from a client.
#[derive(Debug, Clone, Default)]
pub struct FilterParams<'a> {
    pub cuisine: Option<&'a str>,
    pub max_delivery_time: Option<&'a str>,
    pub min_rating: Option<&'a str>,
}

/// Treat absent, blank and `all` alike.
fn constraint(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

/// Build a [`RestaurantFilter`] from raw client values.
///
/// # Errors
///
/// Returns `CatalogError::InvalidFilter` if a numeric value does not parse.
pub fn parse_filter(params: &FilterParams<'_>) -> Result<RestaurantFilter, CatalogError> {
    let max_delivery_time = constraint(params.max_delivery_time)
        .map(|v| {
            v.parse::<i32>()
                .ok()
                .filter(|t| *t >= 0)
                .ok_or_else(|| CatalogError::InvalidFilter(format!("max_delivery_time: {v}")))
        })
        .transpose()?;
    let min_rating = constraint(params.min_rating)
        .map(|v| {
            v.parse::<Decimal>()
                .map_err(|_| CatalogError::InvalidFilter(format!("min_rating: {v}")))
        })
        .transpose()?;

    Ok(RestaurantFilter {
        cuisine: constraint(params.cuisine).map(str::to_owned),
        max_delivery_time,
        min_rating,
    })
}

/// Read-only catalog service.
pub struct CatalogService<'a, S> {
    store: &'a S,
}

impl<'a, S> CatalogService<'a, S>
where
    S: CatalogStore + Sync,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Restaurants matching every constraint in `filter`, in store order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_restaurants(
        &self,
        filter: &RestaurantFilter,
    ) -> Result<Vec<Restaurant>, CatalogError> {
        Ok(self.store.list_restaurants(filter).await?)
    }

    /// A restaurant and its current menu.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::RestaurantNotFound` if the restaurant does not exist.
    pub async fn get_menu(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<(Restaurant, Vec<MenuItem>), CatalogError> {
        let restaurant = self
            .store
            .find_restaurant(restaurant_id)
            .await?
            .ok_or(CatalogError::RestaurantNotFound)?;
        let menu = self.store.menu_for(restaurant_id).await?;
        Ok((restaurant, menu))
    }

    /// A handful of dishes from across the catalog, picked by the store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn recommended(&self) -> Result<Vec<MenuItem>, CatalogError> {
        Ok(self.store.random_menu_items(RECOMMENDED_DISHES).await?)
    }

    /// Restaurants operated by the acting user.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn my_restaurants(&self, actor: CurrentUser) -> Result<Vec<Restaurant>, CatalogError> {
        Ok(self.store.restaurants_owned_by(actor.user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forkful_core::{Price, UserId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewMenuItem;

    #[test]
    fn test_all_and_blank_mean_no_constraint() {
        let filter = parse_filter(&FilterParams {
            cuisine: Some("all"),
            max_delivery_time: Some(" "),
            min_rating: Some("ALL"),
        })
        .unwrap();
        assert!(filter.is_empty());
        assert!(parse_filter(&FilterParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_numeric_filters() {
        let filter = parse_filter(&FilterParams {
            cuisine: Some("thai"),
            max_delivery_time: Some("30"),
            min_rating: Some("4.5"),
        })
        .unwrap();
        assert_eq!(filter.cuisine.as_deref(), Some("thai"));
        assert_eq!(filter.max_delivery_time, Some(30));
        assert_eq!(filter.min_rating, Some(Decimal::new(45, 1)));
    }

    #[test]
    fn test_unparsable_numbers_are_rejected() {
        assert!(matches!(
            parse_filter(&FilterParams {
                max_delivery_time: Some("soon"),
                ..FilterParams::default()
            }),
            Err(CatalogError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse_filter(&FilterParams {
                min_rating: Some("great"),
                ..FilterParams::default()
            }),
            Err(CatalogError::InvalidFilter(_))
        ));
    }

    #[tokio::test]
    async fn test_list_restaurants_composes_filters() {
        let store = MemoryStore::new();
        store.seed_restaurant(UserId::new(1), "Fast Thai", "thai", Some(20), Decimal::new(45, 1));
        store.seed_restaurant(UserId::new(2), "Slow Thai", "thai", Some(60), Decimal::new(48, 1));
        store.seed_restaurant(UserId::new(3), "Mystery Thai", "thai", None, Decimal::new(50, 1));
        store.seed_restaurant(UserId::new(4), "Pizza", "italian", Some(15), Decimal::new(49, 1));
        let catalog = CatalogService::new(&store);

        let all = catalog
            .list_restaurants(&RestaurantFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 4);

        let quick_thai = catalog
            .list_restaurants(&RestaurantFilter {
                cuisine: Some("thai".to_owned()),
                max_delivery_time: Some(30),
                min_rating: None,
            })
            .await
            .unwrap();
        let names: Vec<_> = quick_thai.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Fast Thai"]);

        let top_rated = catalog
            .list_restaurants(&RestaurantFilter {
                min_rating: Some(Decimal::new(49, 1)),
                ..RestaurantFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(top_rated.len(), 2);
    }

    #[tokio::test]
    async fn test_recommended_is_capped() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        assert!(catalog.recommended().await.unwrap().is_empty());

        let diner = store.seed_restaurant(UserId::new(1), "Diner", "american", None, Decimal::ZERO);
        let bistro = store.seed_restaurant(UserId::new(2), "Bistro", "french", None, Decimal::ZERO);
        for (restaurant, name) in [
            (diner.id, "Pancakes"),
            (bistro.id, "Onion Soup"),
            (diner.id, "Waffles"),
            (bistro.id, "Crepes"),
            (diner.id, "Hash Browns"),
        ] {
            store
                .insert_menu_item(NewMenuItem {
                    restaurant_id: restaurant,
                    name: name.to_owned(),
                    price: Price::new(Decimal::new(450, 2)).unwrap(),
                    description: String::new(),
                    image_url: None,
                })
                .await
                .unwrap();
        }

        let picks = catalog.recommended().await.unwrap();
        assert_eq!(picks.len(), RECOMMENDED_DISHES as usize);
        assert!(picks.iter().any(|m| m.restaurant_id == diner.id));
        assert!(picks.iter().any(|m| m.restaurant_id == bistro.id));
    }

    #[tokio::test]
    async fn test_get_menu_missing_restaurant() {
        let store = MemoryStore::new();
        assert!(matches!(
            CatalogService::new(&store)
                .get_menu(RestaurantId::new(42))
                .await,
            Err(CatalogError::RestaurantNotFound)
        ));
    }
}
