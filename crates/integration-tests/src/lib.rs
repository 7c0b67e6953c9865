//! Integration tests for Forkful.
//!
//! The tests drive the complete router, middleware included, in-process via
//! `tower::ServiceExt::oneshot`. Persistence is the in-memory store and time
//! is a [`ManualClock`], so no database or sleeping is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p forkful-integration-tests
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use forkful_server::clock::{Clock, ManualClock};
use forkful_server::config::ForkfulConfig;
use forkful_server::db::memory::MemoryStore;
use forkful_server::services::auth::Passwords;
use forkful_server::state::AppState;

/// Password used for every account the helpers register.
pub const PASSWORD: &str = "correct horse battery";

/// Parse a money string such as `"13.50"`.
///
/// # Panics
///
/// Panics if the value is not a decimal string.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a money value: {value}"))
}

/// A decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Value::Null` for empty bodies.
    pub body: Value,
}

impl TestResponse {
    /// The `error.kind` of an error body.
    #[must_use]
    pub fn error_kind(&self) -> &str {
        self.body["error"]["kind"].as_str().unwrap_or_default()
    }
}

/// A logged-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
}

/// A restaurant account together with its restaurant.
#[derive(Debug, Clone)]
pub struct Operator {
    pub session: Session,
    pub restaurant_id: i64,
}

/// The application under test.
pub struct TestApp {
    router: Router,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    next_ip: AtomicU32,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build a fresh application with an empty store.
    ///
    /// # Panics
    ///
    /// Panics if the password hasher cannot be built.
    #[must_use]
    pub fn new() -> Self {
        let config = ForkfulConfig {
            database_url: SecretString::from("postgres://unused"),
            host: [127, 0, 0, 1].into(),
            port: 8081,
            base_url: "http://localhost:8081".to_string(),
            session_ttl_hours: 24,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::default());
        let passwords = Passwords::fast().expect("fast argon2 params are valid");
        let state = AppState::new(
            config,
            store.clone(),
            passwords,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );

        Self {
            router: forkful_server::app(state),
            store,
            clock,
            next_ip: AtomicU32::new(1),
        }
    }

    /// A client IP not used by any earlier request, so the auth rate
    /// limiter only trips when a test asks for it.
    fn fresh_ip(&self) -> String {
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed);
        let [_, a, b, c] = n.to_be_bytes();
        format!("10.{a}.{b}.{c}")
    }

    /// Send a request from an explicit client IP.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn request_from(
        &self,
        ip: &str,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        self.send(request).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Send a request, optionally authenticated with a bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let ip = self.fresh_ip();
        self.request_from(&ip, method, uri, token, body).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    // =========================================================================
    // Account helpers
    // =========================================================================

    /// Log in and return the session.
    ///
    /// # Panics
    ///
    /// Panics if the login fails.
    pub async fn login(&self, email: &str) -> Session {
        let resp = self
            .post(
                "/api/auth/login",
                None,
                json!({"email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {:?}", resp.body);
        Session {
            token: resp.body["token"].as_str().expect("token").to_owned(),
            user_id: resp.body["user_id"].as_i64().expect("user_id"),
        }
    }

    /// Register a customer account and log in.
    ///
    /// # Panics
    ///
    /// Panics if registration or login fails.
    pub async fn customer(&self, email: &str) -> Session {
        let resp = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": "Test Customer",
                    "email": email,
                    "password": PASSWORD,
                    "role": "customer",
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "register failed: {:?}", resp.body);
        self.login(email).await
    }

    /// Register a restaurant account, log in and look up its restaurant.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn operator(&self, email: &str, cuisine: &str) -> Operator {
        let resp = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": format!("{cuisine} Kitchen"),
                    "email": email,
                    "password": PASSWORD,
                    "role": "restaurant",
                    "cuisine": cuisine,
                    "delivery_time": 30,
                    "address": "1 Market Street",
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "register failed: {:?}", resp.body);
        let session = self.login(email).await;

        let mine = self.get("/api/me/restaurants", Some(&session.token)).await;
        assert_eq!(mine.status, StatusCode::OK);
        let restaurant_id = mine.body[0]["id"].as_i64().expect("restaurant id");

        Operator {
            session,
            restaurant_id,
        }
    }

    /// Add a menu item as the operator and return its ID.
    ///
    /// # Panics
    ///
    /// Panics if the item is rejected.
    pub async fn menu_item(&self, operator: &Operator, name: &str, price: &str) -> i64 {
        let resp = self
            .post(
                &format!("/api/restaurants/{}/menu", operator.restaurant_id),
                Some(&operator.session.token),
                json!({"name": name, "price": price, "description": format!("Fresh {name}")}),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "menu item rejected: {:?}", resp.body);
        resp.body["id"].as_i64().expect("menu item id")
    }

    /// Put `quantity` of an item in the customer's cart.
    ///
    /// # Panics
    ///
    /// Panics if the cart rejects the item.
    pub async fn add_to_cart(&self, customer: &Session, menu_item_id: i64, quantity: i32) -> Value {
        let resp = self
            .post(
                "/api/cart",
                Some(&customer.token),
                json!({"menu_item_id": menu_item_id, "quantity": quantity}),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "add to cart failed: {:?}", resp.body);
        resp.body
    }

    /// Number of lines in the customer's cart.
    ///
    /// # Panics
    ///
    /// Panics if the cart cannot be read.
    pub async fn cart_len(&self, customer: &Session) -> usize {
        let resp = self.get("/api/cart", Some(&customer.token)).await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.body["lines"].as_array().map_or(0, Vec::len)
    }
}
