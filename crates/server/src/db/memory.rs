//! In-process store backend.
//!
//! Every operation takes the same mutex, so each call (checkout included) is
//! observed as one all-or-nothing step. Used by the unit and integration test
//! suites; nothing here is durable.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use forkful_core::{
    CartEntryId, Email, MenuItemId, OrderId, OrderLineItemId, OrderStatus, RestaurantId, UserId,
};

use super::{
    CartStore, CatalogStore, OrderStore, RepositoryError, SessionStore, Store, UserStore,
};
use crate::models::{
    CartAdjustment, CartEntry, CartLine, CheckoutLine, MenuItem, MenuItemSnapshot,
    MenuItemUpdate, NewMenuItem, NewUser, Order, OrderDraft, OrderLineItem, Page, PromoCode,
    Restaurant, RestaurantFilter, SessionRecord, User, UserCredentials,
};

#[derive(Debug, Default)]
struct Tables {
    sequence: i32,
    users: BTreeMap<UserId, UserCredentials>,
    sessions: HashMap<String, SessionRecord>,
    restaurants: BTreeMap<RestaurantId, Restaurant>,
    menu: BTreeMap<MenuItemId, MenuItem>,
    cart: BTreeMap<CartEntryId, CartEntry>,
    orders: BTreeMap<OrderId, Order>,
    promos: HashMap<String, PromoCode>,
    fail_checkout: bool,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn cart_entry_for(&self, user_id: UserId, menu_item_id: MenuItemId) -> Option<CartEntry> {
        self.cart
            .values()
            .find(|e| e.user_id == user_id && e.menu_item_id == menu_item_id)
            .copied()
    }
}

/// A thread-safe, in-memory [`Store`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a restaurant directly, bypassing registration.
    ///
    /// Lets tests control the display attributes registration leaves at
    /// their defaults.
    pub fn seed_restaurant(
        &self,
        owner_id: UserId,
        name: &str,
        cuisine: &str,
        delivery_time: Option<i32>,
        rating: Decimal,
    ) -> Restaurant {
        let mut tables = self.lock();
        let restaurant = Restaurant {
            id: RestaurantId::new(tables.next_id()),
            owner_id,
            name: name.to_owned(),
            cuisine: cuisine.to_owned(),
            delivery_time,
            rating,
            address: None,
        };
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        restaurant
    }

    /// Make every subsequent checkout fail after planning, as a store write
    /// failure would.
    pub fn fail_checkouts(&self, fail: bool) {
        self.lock().fail_checkout = fail;
    }

    /// Number of live session rows.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

fn checkout_lines(tables: &Tables, user_id: UserId) -> Vec<CheckoutLine> {
    tables
        .cart
        .values()
        .filter(|e| e.user_id == user_id)
        .map(|e| CheckoutLine {
            entry_id: e.id,
            menu_item_id: e.menu_item_id,
            quantity: e.quantity,
            item: tables.menu.get(&e.menu_item_id).map(|m| MenuItemSnapshot {
                name: m.name.clone(),
                unit_price: m.price,
                restaurant_id: m.restaurant_id,
            }),
        })
        .collect()
}

/// IDs are assigned in insertion order, so descending ID is newest first.
fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.id.cmp(&a.id));
    orders
}

impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        if tables.users.values().any(|c| c.user.email == new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(tables.next_id()),
            name: new.name,
            email: new.email,
            role: new.role,
            cuisine: new.cuisine,
            created_at: Utc::now(),
        };

        if let Some(profile) = new.restaurant {
            let restaurant = Restaurant {
                id: RestaurantId::new(tables.next_id()),
                owner_id: user.id,
                name: user.name.clone(),
                cuisine: user.cuisine.clone().unwrap_or_default(),
                delivery_time: profile.delivery_time,
                rating: Decimal::ZERO,
                address: profile.address,
            };
            tables.restaurants.insert(restaurant.id, restaurant);
        }

        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|c| &c.user.email == email)
            .cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(&id).map(|c| c.user.clone()))
    }
}

impl SessionStore for MemoryStore {
    async fn insert_session(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if tables.sessions.contains_key(&record.token_hash) {
            return Err(RepositoryError::Conflict("session token collision".to_owned()));
        }
        tables.sessions.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.lock().sessions.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), RepositoryError> {
        self.lock().sessions.remove(token_hash);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }
}

impl CatalogStore for MemoryStore {
    async fn list_restaurants(
        &self,
        filter: &RestaurantFilter,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        Ok(self
            .lock()
            .restaurants
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        Ok(self.lock().restaurants.get(&id).cloned())
    }

    async fn restaurants_owned_by(&self, owner: UserId) -> Result<Vec<Restaurant>, RepositoryError> {
        Ok(self
            .lock()
            .restaurants
            .values()
            .filter(|r| r.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn menu_for(&self, restaurant: RestaurantId) -> Result<Vec<MenuItem>, RepositoryError> {
        Ok(self
            .lock()
            .menu
            .values()
            .filter(|m| m.restaurant_id == restaurant)
            .cloned()
            .collect())
    }

    async fn find_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        Ok(self.lock().menu.get(&id).cloned())
    }

    /// Lowest IDs first, so tests see a stable pick.
    async fn random_menu_items(&self, limit: u32) -> Result<Vec<MenuItem>, RepositoryError> {
        Ok(self
            .lock()
            .menu
            .values()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert_menu_item(&self, new: NewMenuItem) -> Result<MenuItem, RepositoryError> {
        let mut tables = self.lock();
        if !tables.restaurants.contains_key(&new.restaurant_id) {
            return Err(RepositoryError::NotFound);
        }
        let item = MenuItem {
            id: MenuItemId::new(tables.next_id()),
            restaurant_id: new.restaurant_id,
            name: new.name,
            price: new.price,
            description: new.description,
            image_url: new.image_url,
        };
        tables.menu.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_menu_item(
        &self,
        id: MenuItemId,
        update: MenuItemUpdate,
    ) -> Result<MenuItem, RepositoryError> {
        let mut tables = self.lock();
        let item = tables.menu.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        item.name = update.name;
        item.price = update.price;
        item.description = update.description;
        item.image_url = update.image_url;
        Ok(item.clone())
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if tables.menu.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.cart.retain(|_, e| e.menu_item_id != id);
        Ok(())
    }
}

impl CartStore for MemoryStore {
    async fn adjust_cart_entry(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
        delta: i32,
    ) -> Result<CartAdjustment, RepositoryError> {
        let mut tables = self.lock();
        match tables.cart_entry_for(user_id, menu_item_id) {
            Some(entry) => {
                let quantity = entry.quantity.saturating_add(delta);
                if quantity <= 0 {
                    tables.cart.remove(&entry.id);
                    return Ok(CartAdjustment::Removed { entry_id: entry.id });
                }
                if quantity > CartEntry::MAX_QUANTITY {
                    return Ok(CartAdjustment::OverLimit { entry_id: entry.id });
                }
                if let Some(e) = tables.cart.get_mut(&entry.id) {
                    e.quantity = quantity;
                }
                Ok(CartAdjustment::Updated {
                    entry_id: entry.id,
                    quantity,
                })
            }
            None if delta > 0 => {
                let entry_id = CartEntryId::new(tables.next_id());
                tables.cart.insert(
                    entry_id,
                    CartEntry {
                        id: entry_id,
                        user_id,
                        menu_item_id,
                        quantity: delta,
                    },
                );
                Ok(CartAdjustment::Inserted {
                    entry_id,
                    quantity: delta,
                })
            }
            None => Ok(CartAdjustment::Missing),
        }
    }

    async fn find_cart_entry(&self, id: CartEntryId) -> Result<Option<CartEntry>, RepositoryError> {
        Ok(self.lock().cart.get(&id).copied())
    }

    async fn set_cart_quantity(&self, id: CartEntryId, quantity: i32) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let entry = tables.cart.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        entry.quantity = quantity;
        Ok(())
    }

    async fn delete_cart_entry(&self, id: CartEntryId) -> Result<(), RepositoryError> {
        self.lock().cart.remove(&id);
        Ok(())
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .cart
            .values()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| {
                tables.menu.get(&e.menu_item_id).map(|m| CartLine {
                    entry_id: e.id,
                    menu_item_id: m.id,
                    name: m.name.clone(),
                    unit_price: m.price,
                    quantity: e.quantity,
                    restaurant_id: m.restaurant_id,
                })
            })
            .collect())
    }
}

impl OrderStore for MemoryStore {
    async fn checkout<F, E>(
        &self,
        user_id: UserId,
        promo_code: Option<&str>,
        plan: F,
    ) -> Result<Result<Order, E>, RepositoryError>
    where
        F: FnOnce(&[CheckoutLine], Option<&PromoCode>) -> Result<OrderDraft, E> + Send,
        E: Send,
    {
        let mut tables = self.lock();
        let lines = checkout_lines(&tables, user_id);
        let promo = promo_code.and_then(|code| tables.promos.get(code).cloned());

        let draft = match plan(&lines, promo.as_ref()) {
            Ok(draft) => draft,
            Err(rejection) => return Ok(Err(rejection)),
        };

        if tables.fail_checkout {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let order_id = OrderId::new(tables.next_id());
        let items = draft
            .lines
            .into_iter()
            .map(|line| OrderLineItem {
                id: OrderLineItemId::new(tables.next_id()),
                menu_item_id: line.menu_item_id,
                name: line.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();
        let order = Order {
            id: order_id,
            user_id,
            restaurant_id: draft.restaurant_id,
            total_price: draft.total_price,
            delivery_address: draft.delivery_address,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            items,
        };
        tables.orders.insert(order_id, order.clone());
        for line in &lines {
            tables.cart.remove(&line.entry_id);
        }
        Ok(Ok(order))
    }

    async fn orders_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Order>, RepositoryError> {
        let orders = self
            .lock()
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(newest_first(orders)
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .collect())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.lock().orders.get(&id).cloned())
    }

    async fn orders_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self
            .lock()
            .orders
            .values()
            .filter(|o| o.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        match tables.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_promo_code(&self, promo: &PromoCode) -> Result<(), RepositoryError> {
        self.lock().promos.insert(promo.code.clone(), promo.clone());
        Ok(())
    }
}

impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forkful_core::{Price, Role};

    use super::*;
    use crate::models::NewRestaurantProfile;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: "Sam".to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            role,
            cuisine: (role == Role::Restaurant).then(|| "thai".to_owned()),
            restaurant: (role == Role::Restaurant).then(NewRestaurantProfile::default),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com", Role::Customer)).await.unwrap();
        let err = store
            .create_user(new_user("a@example.com", Role::Rider))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_restaurant_user_gets_restaurant() {
        let store = MemoryStore::new();
        let user = store
            .create_user(new_user("r@example.com", Role::Restaurant))
            .await
            .unwrap();
        let owned = store.restaurants_owned_by(user.id).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].cuisine, "thai");
        assert_eq!(owned[0].rating, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_adjust_cart_entry_lifecycle() {
        let store = MemoryStore::new();
        let user = UserId::new(100);
        let item = MenuItemId::new(200);

        assert_eq!(
            store.adjust_cart_entry(user, item, -1).await.unwrap(),
            CartAdjustment::Missing
        );
        let CartAdjustment::Inserted { entry_id, quantity } =
            store.adjust_cart_entry(user, item, 2).await.unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(quantity, 2);
        assert_eq!(
            store.adjust_cart_entry(user, item, 3).await.unwrap(),
            CartAdjustment::Updated { entry_id, quantity: 5 }
        );
        assert_eq!(
            store
                .adjust_cart_entry(user, item, CartEntry::MAX_QUANTITY)
                .await
                .unwrap(),
            CartAdjustment::OverLimit { entry_id }
        );
        assert_eq!(store.find_cart_entry(entry_id).await.unwrap().unwrap().quantity, 5);
        assert_eq!(
            store.adjust_cart_entry(user, item, -5).await.unwrap(),
            CartAdjustment::Removed { entry_id }
        );
        assert!(store.find_cart_entry(entry_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_menu_item_clears_cart_entries() {
        let store = MemoryStore::new();
        let owner = store
            .create_user(new_user("r@example.com", Role::Restaurant))
            .await
            .unwrap();
        let restaurant = store.restaurants_owned_by(owner.id).await.unwrap().remove(0);
        let item = store
            .insert_menu_item(NewMenuItem {
                restaurant_id: restaurant.id,
                name: "Pad Thai".to_owned(),
                price: Price::new(Decimal::new(1200, 2)).unwrap(),
                description: String::new(),
                image_url: None,
            })
            .await
            .unwrap();
        store.adjust_cart_entry(UserId::new(999), item.id, 1).await.unwrap();

        store.delete_menu_item(item.id).await.unwrap();
        assert!(store.cart_lines(UserId::new(999)).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_menu_item(item.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_purge_keeps_live_sessions() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (hash, offset) in [("old", -1), ("edge", 0), ("live", 1)] {
            store
                .insert_session(SessionRecord {
                    token_hash: hash.to_owned(),
                    user_id: UserId::new(1),
                    expires_at: now + chrono::Duration::hours(offset),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 2);
        assert!(store.find_session("live").await.unwrap().is_some());
    }
}
