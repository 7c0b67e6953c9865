//! Catalog browsing, menu management and order fulfilment over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use forkful_core::UserId;
use forkful_integration_tests::{Operator, Session, TestApp, money};

fn names(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect()
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_catalog_filters() {
    let app = TestApp::new();
    let owner = UserId::new(9_000);
    app.store
        .seed_restaurant(owner, "Fast Thai", "thai", Some(20), Decimal::new(45, 1));
    app.store
        .seed_restaurant(owner, "Slow Thai", "thai", Some(60), Decimal::new(48, 1));
    app.store
        .seed_restaurant(owner, "Pasta Place", "italian", Some(25), Decimal::new(39, 1));
    app.store
        .seed_restaurant(owner, "Mystery Kitchen", "thai", None, Decimal::new(50, 1));

    let all = app.get("/api/restaurants", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 4);

    let thai = app.get("/api/restaurants?cuisine=thai", None).await;
    assert_eq!(thai.body.as_array().unwrap().len(), 3);

    let quick = app
        .get("/api/restaurants?cuisine=thai&max_delivery_time=30", None)
        .await;
    assert_eq!(names(&quick.body), vec!["Fast Thai"]);

    let good = app.get("/api/restaurants?min_rating=4.6", None).await;
    let mut good = names(&good.body);
    good.sort_unstable();
    assert_eq!(good, vec!["Mystery Kitchen", "Slow Thai"]);

    let unconstrained = app
        .get(
            "/api/restaurants?cuisine=all&max_delivery_time=&min_rating=all",
            None,
        )
        .await;
    assert_eq!(unconstrained.body.as_array().unwrap().len(), 4);

    let bad = app.get("/api/restaurants?max_delivery_time=soon", None).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.error_kind(), "validation");
}

#[tokio::test]
async fn test_public_menu() {
    let app = TestApp::new();
    let kitchen = app.operator("kitchen@example.com", "american").await;
    app.menu_item(&kitchen, "Burger", "5.00").await;
    app.menu_item(&kitchen, "Fries", "3.50").await;

    let resp = app
        .get(&format!("/api/restaurants/{}/menu", kitchen.restaurant_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        resp.body["restaurant"]["id"].as_i64(),
        Some(kitchen.restaurant_id)
    );
    assert_eq!(resp.body["items"].as_array().unwrap().len(), 2);

    let missing = app.get("/api/restaurants/999999/menu", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.error_kind(), "not_found");

    let garbage = app.get("/api/restaurants/abc/menu", None).await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommended_dishes() {
    let app = TestApp::new();

    let empty = app.get("/api/recommended-dishes", None).await;
    assert_eq!(empty.status, StatusCode::OK);
    assert_eq!(empty.body.as_array().unwrap().len(), 0);

    let kitchen = app.operator("kitchen@example.com", "american").await;
    let bistro = app.operator("bistro@example.com", "french").await;
    app.menu_item(&kitchen, "Burger", "5.00").await;
    app.menu_item(&bistro, "Onion Soup", "6.00").await;
    app.menu_item(&kitchen, "Fries", "3.50").await;
    app.menu_item(&bistro, "Crepes", "4.00").await;
    app.menu_item(&kitchen, "Shake", "4.50").await;

    let picks = app.get("/api/recommended-dishes", None).await;
    assert_eq!(picks.status, StatusCode::OK);
    let picks = picks.body.as_array().unwrap();
    assert_eq!(picks.len(), 4);
    assert!(picks.iter().all(|d| d["id"].is_i64() && d["price"].is_string()));
    for restaurant in [kitchen.restaurant_id, bistro.restaurant_id] {
        assert!(picks.iter().any(|d| d["restaurant_id"].as_i64() == Some(restaurant)));
    }
}

// ============================================================================
// Menu management
// ============================================================================

#[tokio::test]
async fn test_menu_item_validation() {
    let app = TestApp::new();
    let kitchen = app.operator("kitchen@example.com", "american").await;
    let uri = format!("/api/restaurants/{}/menu", kitchen.restaurant_id);

    let negative = app
        .post(
            &uri,
            Some(&kitchen.session.token),
            json!({"name": "Refund", "price": "-1.00"}),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let blank = app
        .post(
            &uri,
            Some(&kitchen.session.token),
            json!({"name": "  ", "price": "1.00"}),
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let created = app
        .post(
            &uri,
            Some(&kitchen.session.token),
            json!({"name": "Soup", "price": "4.25", "image_url": "https://img.example.com/soup.png"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(money(&created.body["price"]), Decimal::new(425, 2));
    assert_eq!(created.body["description"], "");
}

#[tokio::test]
async fn test_menu_changes_require_ownership() {
    let app = TestApp::new();
    let kitchen = app.operator("kitchen@example.com", "american").await;
    let rival = app.operator("rival@example.com", "american").await;
    let burger = app.menu_item(&kitchen, "Burger", "5.00").await;

    let create = app
        .post(
            &format!("/api/restaurants/{}/menu", kitchen.restaurant_id),
            Some(&rival.session.token),
            json!({"name": "Sabotage", "price": "0.01"}),
        )
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);
    assert_eq!(create.error_kind(), "not_owner");

    let update = app
        .put(
            &format!("/api/restaurants/{}/menu/{burger}", kitchen.restaurant_id),
            Some(&rival.session.token),
            json!({"name": "Burger", "price": "0.01"}),
        )
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);

    let delete = app
        .delete(
            &format!("/api/restaurants/{}/menu/{burger}", kitchen.restaurant_id),
            Some(&rival.session.token),
        )
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);

    // Addressing the item through the rival's own restaurant finds nothing.
    let sideways = app
        .delete(
            &format!("/api/restaurants/{}/menu/{burger}", rival.restaurant_id),
            Some(&rival.session.token),
        )
        .await;
    assert_eq!(sideways.status, StatusCode::NOT_FOUND);

    let missing = app
        .post(
            "/api/restaurants/999999/menu",
            Some(&kitchen.session.token),
            json!({"name": "Ghost", "price": "1.00"}),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let menu = app
        .get(&format!("/api/restaurants/{}/menu", kitchen.restaurant_id), None)
        .await;
    assert_eq!(menu.body["items"][0]["name"], "Burger");
    assert_eq!(money(&menu.body["items"][0]["price"]), Decimal::new(500, 2));
}

#[tokio::test]
async fn test_owner_edits_and_deletes_items() {
    let app = TestApp::new();
    let kitchen = app.operator("kitchen@example.com", "american").await;
    let burger = app.menu_item(&kitchen, "Burger", "5.00").await;
    let uri = format!("/api/restaurants/{}/menu/{burger}", kitchen.restaurant_id);

    let edited = app
        .put(
            &uri,
            Some(&kitchen.session.token),
            json!({"name": "Cheeseburger", "price": "6.50", "description": "With cheddar"}),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["name"], "Cheeseburger");
    assert_eq!(money(&edited.body["price"]), Decimal::new(650, 2));

    let deleted = app.delete(&uri, Some(&kitchen.session.token)).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let again = app.delete(&uri, Some(&kitchen.session.token)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Fulfilment
// ============================================================================

async fn placed_order(app: &TestApp, kitchen: &Operator, customer: &Session) -> i64 {
    let burger = app.menu_item(kitchen, "Burger", "5.00").await;
    app.add_to_cart(customer, burger, 1).await;
    let resp = app
        .post(
            "/api/orders",
            Some(&customer.token),
            json!({"delivery_address": "1 Main St"}),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    resp.body["order"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_status_moves_forward_only() {
    let app = TestApp::new();
    let kitchen = app.operator("kitchen@example.com", "american").await;
    let customer = app.customer("eater@example.com").await;
    let order_id = placed_order(&app, &kitchen, &customer).await;
    let uri = format!(
        "/api/restaurants/{}/orders/{order_id}/status",
        kitchen.restaurant_id
    );
    let token = Some(kitchen.session.token.as_str());

    let preparing = app.put(&uri, token, json!({"status": "preparing"})).await;
    assert_eq!(preparing.status, StatusCode::OK);
    assert_eq!(preparing.body["status"], "preparing");

    let backwards = app.put(&uri, token, json!({"status": "pending"})).await;
    assert_eq!(backwards.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(backwards.error_kind(), "invalid_status_transition");

    let same = app.put(&uri, token, json!({"status": "preparing"})).await;
    assert_eq!(same.status, StatusCode::UNPROCESSABLE_ENTITY);

    let unknown = app.put(&uri, token, json!({"status": "eaten"})).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.error_kind(), "invalid_status");

    let skip = app.put(&uri, token, json!({"status": "delivered"})).await;
    assert_eq!(skip.status, StatusCode::OK);

    let seen = app
        .get(&format!("/api/orders/{order_id}"), Some(&customer.token))
        .await;
    assert_eq!(seen.body["status"], "delivered");
}

#[tokio::test]
async fn test_fulfilment_requires_ownership() {
    let app = TestApp::new();
    let kitchen = app.operator("kitchen@example.com", "american").await;
    let rival = app.operator("rival@example.com", "american").await;
    let customer = app.customer("eater@example.com").await;
    let order_id = placed_order(&app, &kitchen, &customer).await;

    let incoming = app
        .get(
            &format!("/api/restaurants/{}/orders", kitchen.restaurant_id),
            Some(&kitchen.session.token),
        )
        .await;
    assert_eq!(incoming.status, StatusCode::OK);
    assert_eq!(incoming.body[0]["id"].as_i64(), Some(order_id));

    let snooping = app
        .get(
            &format!("/api/restaurants/{}/orders", kitchen.restaurant_id),
            Some(&rival.session.token),
        )
        .await;
    assert_eq!(snooping.status, StatusCode::FORBIDDEN);
    assert_eq!(snooping.error_kind(), "not_owner");

    let hijack = app
        .put(
            &format!(
                "/api/restaurants/{}/orders/{order_id}/status",
                kitchen.restaurant_id
            ),
            Some(&rival.session.token),
            json!({"status": "delivered"}),
        )
        .await;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);

    let through_own = app
        .put(
            &format!(
                "/api/restaurants/{}/orders/{order_id}/status",
                rival.restaurant_id
            ),
            Some(&rival.session.token),
            json!({"status": "delivered"}),
        )
        .await;
    assert_eq!(through_own.status, StatusCode::NOT_FOUND);

    let customer_attempt = app
        .get(
            &format!("/api/restaurants/{}/orders", kitchen.restaurant_id),
            Some(&customer.token),
        )
        .await;
    assert_eq!(customer_attempt.status, StatusCode::FORBIDDEN);
    assert_eq!(customer_attempt.error_kind(), "forbidden");
}
