//! Menu management for restaurant operators.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use forkful_core::{MenuItemId, Price, PriceError, RestaurantId};

use super::ownership::{OwnershipError, require_owner};
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{CurrentUser, MenuItem, MenuItemUpdate, NewMenuItem};

/// Errors that can occur while editing a menu.
#[derive(Debug, Error)]
pub enum MenuError {
    #[error("restaurant not found")]
    RestaurantNotFound,

    #[error("restaurant belongs to another user")]
    NotOwner,

    /// The item does not exist or is not on this restaurant's menu.
    #[error("menu item not found")]
    MenuItemNotFound,

    #[error("menu item name is required")]
    MissingName,

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<OwnershipError> for MenuError {
    fn from(e: OwnershipError) -> Self {
        match e {
            OwnershipError::RestaurantNotFound => Self::RestaurantNotFound,
            OwnershipError::NotOwner => Self::NotOwner,
            OwnershipError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Client-supplied menu item fields.
#[derive(Debug, Clone)]
pub struct MenuItemInput {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl MenuItemInput {
    fn validate(self) -> Result<MenuItemUpdate, MenuError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MenuError::MissingName);
        }
        Ok(MenuItemUpdate {
            name: name.to_owned(),
            price: Price::new(self.price)?,
            description: self.description.unwrap_or_default(),
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
        })
    }
}

/// Menu management service.
pub struct MenuService<'a, S> {
    store: &'a S,
}

impl<'a, S> MenuService<'a, S>
where
    S: CatalogStore + Sync,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add an item to a restaurant the actor operates.
    ///
    /// # Errors
    ///
    /// Returns `MenuError::RestaurantNotFound` or `MenuError::NotOwner` if
    /// the ownership check fails, and `MenuError::MissingName` or
    /// `MenuError::InvalidPrice` for bad input.
    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn add_menu_item(
        &self,
        actor: CurrentUser,
        restaurant_id: RestaurantId,
        input: MenuItemInput,
    ) -> Result<MenuItem, MenuError> {
        require_owner(self.store, actor, restaurant_id).await?;
        let fields = input.validate()?;

        let item = self
            .store
            .insert_menu_item(NewMenuItem {
                restaurant_id,
                name: fields.name,
                price: fields.price,
                description: fields.description,
                image_url: fields.image_url,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => MenuError::RestaurantNotFound,
                other => MenuError::Repository(other),
            })?;

        info!(menu_item_id = %item.id, "menu item added");
        Ok(item)
    }

    /// Replace an item's fields.
    ///
    /// Orders already placed keep the name and price they were placed at.
    ///
    /// # Errors
    ///
    /// As [`Self::add_menu_item`], plus `MenuError::MenuItemNotFound` if the
    /// item is not on this restaurant's menu.
    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn update_menu_item(
        &self,
        actor: CurrentUser,
        restaurant_id: RestaurantId,
        item_id: MenuItemId,
        input: MenuItemInput,
    ) -> Result<MenuItem, MenuError> {
        require_owner(self.store, actor, restaurant_id).await?;
        self.item_on_menu(restaurant_id, item_id).await?;
        let update = input.validate()?;

        self.store
            .update_menu_item(item_id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => MenuError::MenuItemNotFound,
                other => MenuError::Repository(other),
            })
    }

    /// Remove an item and every cart entry referencing it.
    ///
    /// # Errors
    ///
    /// As [`Self::update_menu_item`].
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn delete_menu_item(
        &self,
        actor: CurrentUser,
        restaurant_id: RestaurantId,
        item_id: MenuItemId,
    ) -> Result<(), MenuError> {
        require_owner(self.store, actor, restaurant_id).await?;
        self.item_on_menu(restaurant_id, item_id).await?;

        self.store
            .delete_menu_item(item_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => MenuError::MenuItemNotFound,
                other => MenuError::Repository(other),
            })?;

        info!(menu_item_id = %item_id, "menu item deleted");
        Ok(())
    }

    async fn item_on_menu(
        &self,
        restaurant_id: RestaurantId,
        item_id: MenuItemId,
    ) -> Result<MenuItem, MenuError> {
        self.store
            .find_menu_item(item_id)
            .await?
            .filter(|item| item.restaurant_id == restaurant_id)
            .ok_or(MenuError::MenuItemNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forkful_core::{Role, UserId};

    use super::*;
    use crate::db::{CartStore, MemoryStore};

    fn owner(id: i32) -> CurrentUser {
        CurrentUser {
            user_id: UserId::new(id),
            role: Role::Restaurant,
        }
    }

    fn input(name: &str, cents: i64) -> MenuItemInput {
        MenuItemInput {
            name: name.to_owned(),
            price: Decimal::new(cents, 2),
            description: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_owner_can_manage_menu() {
        let store = MemoryStore::new();
        let restaurant = store.seed_restaurant(UserId::new(1), "Diner", "american", None, Decimal::ZERO);
        let menu = MenuService::new(&store);

        let item = menu
            .add_menu_item(owner(1), restaurant.id, input(" Burger ", 500))
            .await
            .unwrap();
        assert_eq!(item.name, "Burger");

        let updated = menu
            .update_menu_item(owner(1), restaurant.id, item.id, input("Burger", 650))
            .await
            .unwrap();
        assert_eq!(updated.price.to_string(), "6.50");

        store.adjust_cart_entry(UserId::new(7), item.id, 2).await.unwrap();
        menu.delete_menu_item(owner(1), restaurant.id, item.id)
            .await
            .unwrap();
        assert!(store.find_menu_item(item.id).await.unwrap().is_none());
        assert!(store.cart_lines(UserId::new(7)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ownership_is_enforced() {
        let store = MemoryStore::new();
        let mine = store.seed_restaurant(UserId::new(1), "Mine", "thai", None, Decimal::ZERO);
        let theirs = store.seed_restaurant(UserId::new(2), "Theirs", "thai", None, Decimal::ZERO);
        let menu = MenuService::new(&store);

        assert!(matches!(
            menu.add_menu_item(owner(1), theirs.id, input("Soup", 300)).await,
            Err(MenuError::NotOwner)
        ));
        assert!(matches!(
            menu.add_menu_item(owner(1), RestaurantId::new(999), input("Soup", 300))
                .await,
            Err(MenuError::RestaurantNotFound)
        ));

        // An item from another restaurant cannot be edited through mine.
        let their_item = menu
            .add_menu_item(owner(2), theirs.id, input("Curry", 900))
            .await
            .unwrap();
        assert!(matches!(
            menu.update_menu_item(owner(1), mine.id, their_item.id, input("Curry", 1))
                .await,
            Err(MenuError::MenuItemNotFound)
        ));
        assert!(matches!(
            menu.delete_menu_item(owner(1), mine.id, their_item.id).await,
            Err(MenuError::MenuItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_input_validation() {
        let store = MemoryStore::new();
        let restaurant = store.seed_restaurant(UserId::new(1), "Diner", "american", None, Decimal::ZERO);
        let menu = MenuService::new(&store);

        assert!(matches!(
            menu.add_menu_item(owner(1), restaurant.id, input("  ", 500)).await,
            Err(MenuError::MissingName)
        ));
        assert!(matches!(
            menu.add_menu_item(owner(1), restaurant.id, input("Fries", -1)).await,
            Err(MenuError::InvalidPrice(PriceError::Negative))
        ));

        let mut unbounded = input("Caviar", 0);
        unbounded.price = Decimal::MAX;
        assert!(matches!(
            menu.add_menu_item(owner(1), restaurant.id, unbounded).await,
            Err(MenuError::InvalidPrice(PriceError::TooLarge))
        ));
        assert!(matches!(
            menu.add_menu_item(owner(1), restaurant.id, input("Gold Leaf", 1_000_000_000_000)).await,
            Err(MenuError::InvalidPrice(PriceError::TooLarge))
        ));
        assert!(
            menu.add_menu_item(owner(1), restaurant.id, input("Truffle", 999_999_999_999))
                .await
                .is_ok()
        );
    }
}
