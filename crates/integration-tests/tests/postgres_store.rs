//! `PgStore` against a live database.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - `DATABASE_URL` pointing at it (pending migrations are applied on connect)
//!
//! Run with: cargo test -p forkful-integration-tests -- --ignored
//!
//! Every test creates its own users, restaurants and codes with unique names,
//! so they can share one database and run in parallel.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use uuid::Uuid;

use forkful_core::{
    DiscountPercent, Email, MenuItemId, OrderStatus, Price, RestaurantId, Role, UserId,
};
use forkful_server::db::{CartStore, CatalogStore, OrderStore, PgStore, UserStore, create_pool};
use forkful_server::models::{
    CartAdjustment, CartEntry, CheckoutLine, NewMenuItem, NewRestaurantProfile, NewUser,
    OrderDraft, Page, PromoCode, Restaurant, RestaurantFilter,
};
use forkful_server::services::orders::OrderError;
use forkful_server::services::orders::pricing::{apply_promo, validate_cart};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    PgStore::new(pool)
}

fn unique(tag: &str) -> String {
    format!("{tag}-{}", Uuid::new_v4().simple())
}

fn price(cents: i64) -> Price {
    Price::new(Decimal::new(cents, 2)).unwrap()
}

async fn customer(store: &PgStore) -> UserId {
    store
        .create_user(NewUser {
            name: "Diner".to_owned(),
            email: Email::parse(&format!("{}@example.com", unique("diner"))).unwrap(),
            password_hash: "unused".to_owned(),
            role: Role::Customer,
            cuisine: None,
            restaurant: None,
        })
        .await
        .unwrap()
        .id
}

async fn restaurant(
    store: &PgStore,
    cuisine: &str,
    delivery_time: Option<i32>,
    rating: Decimal,
) -> Restaurant {
    let owner = store
        .create_user(NewUser {
            name: unique("Kitchen"),
            email: Email::parse(&format!("{}@example.com", unique("kitchen"))).unwrap(),
            password_hash: "unused".to_owned(),
            role: Role::Restaurant,
            cuisine: Some(cuisine.to_owned()),
            restaurant: Some(NewRestaurantProfile {
                delivery_time,
                address: None,
            }),
        })
        .await
        .unwrap();
    let mut restaurant = store.restaurants_owned_by(owner.id).await.unwrap().pop().unwrap();

    sqlx::query("UPDATE restaurant SET rating = $2 WHERE id = $1")
        .bind(restaurant.id)
        .bind(rating)
        .execute(store.pool())
        .await
        .unwrap();
    restaurant.rating = rating;
    restaurant
}

async fn dish(store: &PgStore, restaurant: RestaurantId, name: &str, cents: i64) -> MenuItemId {
    store
        .insert_menu_item(NewMenuItem {
            restaurant_id: restaurant,
            name: name.to_owned(),
            price: price(cents),
            description: String::new(),
            image_url: None,
        })
        .await
        .unwrap()
        .id
}

fn deliver_to_main_st(
    lines: &[CheckoutLine],
    _promo: Option<&PromoCode>,
) -> Result<OrderDraft, OrderError> {
    validate_cart(lines, "1 Main St")
}

// ============================================================================
// Cart ledger
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_cart_increments_and_caps() {
    let store = store().await;
    let user = customer(&store).await;
    let kitchen = restaurant(&store, &unique("diner"), Some(20), Decimal::ZERO).await;
    let burger = dish(&store, kitchen.id, "Burger", 500).await;

    let CartAdjustment::Inserted { entry_id, quantity } =
        store.adjust_cart_entry(user, burger, 2).await.unwrap()
    else {
        panic!("expected insert");
    };
    assert_eq!(quantity, 2);
    assert_eq!(
        store.adjust_cart_entry(user, burger, 3).await.unwrap(),
        CartAdjustment::Updated { entry_id, quantity: 5 }
    );
    assert_eq!(
        store
            .adjust_cart_entry(user, burger, CartEntry::MAX_QUANTITY)
            .await
            .unwrap(),
        CartAdjustment::OverLimit { entry_id }
    );
    assert_eq!(store.cart_lines(user).await.unwrap()[0].quantity, 5);

    assert_eq!(
        store.adjust_cart_entry(user, burger, -5).await.unwrap(),
        CartAdjustment::Removed { entry_id }
    );
    assert!(store.cart_lines(user).await.unwrap().is_empty());
}

// ============================================================================
// Checkout transaction
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_checkout_commits_and_clears_cart() {
    let store = store().await;
    let user = customer(&store).await;
    let kitchen = restaurant(&store, &unique("american"), Some(20), Decimal::ZERO).await;
    let burger = dish(&store, kitchen.id, "Burger", 500).await;
    let fries = dish(&store, kitchen.id, "Fries", 350).await;
    store.adjust_cart_entry(user, burger, 2).await.unwrap();
    store.adjust_cart_entry(user, fries, 1).await.unwrap();

    let code = unique("SAVE");
    store
        .upsert_promo_code(&PromoCode {
            code: code.clone(),
            discount: DiscountPercent::new(Decimal::from(10)).unwrap(),
            valid_until: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();

    let order = store
        .checkout(user, Some(&code), |lines: &[CheckoutLine], promo: Option<&PromoCode>| {
            let mut draft = validate_cart(lines, "1 Main St")?;
            draft.total_price = apply_promo(draft.total_price, Some(&code), promo, Utc::now()).0;
            Ok::<_, OrderError>(draft)
        })
        .await
        .unwrap()
        .unwrap();

    // (5.00 × 2 + 3.50) less 10%
    assert_eq!(order.total_price, price(1215));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.restaurant_id, kitchen.id);
    assert_eq!(order.items.len(), 2);
    assert!(store.cart_lines(user).await.unwrap().is_empty());

    let stored = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.total_price, order.total_price);
    assert_eq!(stored.items, order.items);

    let history = store.orders_for_user(user, Page::default()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, order.id);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_rejected_checkout_leaves_cart_untouched() {
    let store = store().await;
    let user = customer(&store).await;
    let kitchen = restaurant(&store, &unique("american"), Some(20), Decimal::ZERO).await;
    let bistro = restaurant(&store, &unique("french"), Some(30), Decimal::ZERO).await;
    let burger = dish(&store, kitchen.id, "Burger", 500).await;
    let soup = dish(&store, bistro.id, "Onion Soup", 600).await;
    store.adjust_cart_entry(user, burger, 1).await.unwrap();
    store.adjust_cart_entry(user, soup, 1).await.unwrap();

    let outcome = store.checkout(user, None, deliver_to_main_st).await.unwrap();
    assert!(matches!(outcome, Err(OrderError::MixedRestaurantCart)));

    assert_eq!(store.cart_lines(user).await.unwrap().len(), 2);
    assert!(
        store
            .orders_for_user(user, Page::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_checkout_keeps_entries_added_meanwhile() {
    let store = store().await;
    let user = customer(&store).await;
    let kitchen = restaurant(&store, &unique("american"), Some(20), Decimal::ZERO).await;
    let burger = dish(&store, kitchen.id, "Burger", 500).await;
    let shake = dish(&store, kitchen.id, "Shake", 450).await;
    store.adjust_cart_entry(user, burger, 1).await.unwrap();

    let other_tab = store.clone();
    let order = store
        .checkout(user, None, move |lines: &[CheckoutLine], _: Option<&PromoCode>| {
            // Committed on another connection while the checkout holds its row locks.
            tokio::task::block_in_place(|| {
                tokio::runtime::Handle::current()
                    .block_on(other_tab.adjust_cart_entry(user, shake, 1))
            })
            .unwrap();
            validate_cart(lines, "1 Main St")
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].menu_item_id, burger);
    let left = store.cart_lines(user).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].menu_item_id, shake);
}

// ============================================================================
// Status compare-and-set
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_status_transition_is_compare_and_set() {
    let store = store().await;
    let user = customer(&store).await;
    let kitchen = restaurant(&store, &unique("american"), Some(20), Decimal::ZERO).await;
    let burger = dish(&store, kitchen.id, "Burger", 500).await;
    store.adjust_cart_entry(user, burger, 1).await.unwrap();
    let order = store
        .checkout(user, None, deliver_to_main_st)
        .await
        .unwrap()
        .unwrap();

    assert!(
        store
            .transition_order_status(order.id, OrderStatus::Pending, OrderStatus::Preparing)
            .await
            .unwrap()
    );
    // A second writer that read `pending` before the first update loses.
    assert!(
        !store
            .transition_order_status(order.id, OrderStatus::Pending, OrderStatus::Delivered)
            .await
            .unwrap()
    );

    let stored = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Preparing);
    let incoming = store.orders_for_restaurant(kitchen.id).await.unwrap();
    assert_eq!(incoming[0].status, OrderStatus::Preparing);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_restaurant_filters_compose() {
    let store = store().await;
    let thai = unique("thai");
    let fast = restaurant(&store, &thai, Some(20), Decimal::new(45, 1)).await;
    let slow = restaurant(&store, &thai, Some(60), Decimal::new(48, 1)).await;
    let mystery = restaurant(&store, &thai, None, Decimal::new(50, 1)).await;
    restaurant(&store, &unique("italian"), Some(15), Decimal::new(49, 1)).await;

    let ids = |found: Vec<Restaurant>| found.into_iter().map(|r| r.id).collect::<Vec<_>>();
    let filter = |max_delivery_time, min_rating| RestaurantFilter {
        cuisine: Some(thai.clone()),
        max_delivery_time,
        min_rating,
    };

    let all_thai = store.list_restaurants(&filter(None, None)).await.unwrap();
    assert_eq!(ids(all_thai), vec![fast.id, slow.id, mystery.id]);

    let quick = store.list_restaurants(&filter(Some(30), None)).await.unwrap();
    assert_eq!(ids(quick), vec![fast.id]);

    let good = store
        .list_restaurants(&filter(None, Some(Decimal::new(47, 1))))
        .await
        .unwrap();
    assert_eq!(ids(good), vec![slow.id, mystery.id]);

    let quick_and_good = store
        .list_restaurants(&filter(Some(30), Some(Decimal::new(47, 1))))
        .await
        .unwrap();
    assert!(quick_and_good.is_empty());
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a PostgreSQL database"]
async fn test_random_menu_items_respects_limit() {
    let store = store().await;
    let kitchen = restaurant(&store, &unique("american"), Some(20), Decimal::ZERO).await;
    for (name, cents) in [("Burger", 500), ("Fries", 350), ("Shake", 450), ("Pie", 400), ("Soda", 150)] {
        dish(&store, kitchen.id, name, cents).await;
    }

    let picks = store.random_menu_items(4).await.unwrap();
    assert_eq!(picks.len(), 4);
    let mut ids: Vec<_> = picks.iter().map(|m| m.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}
