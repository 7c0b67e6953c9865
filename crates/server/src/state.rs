//! Application state shared across handlers.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::ForkfulConfig;
use crate::db::Store;
use crate::db::postgres::PgStore;
use crate::services::auth::{AuthService, Passwords};
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::menu::MenuService;
use crate::services::orders::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, configuration and the per-request services built on them.
/// The store defaults to `PostgreSQL`; tests substitute the in-memory store.
pub struct AppState<S = PgStore> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: ForkfulConfig,
    store: S,
    passwords: Passwords,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Persistence backend
    /// * `passwords` - Password hasher
    /// * `clock` - Time source for sessions, promos and orders
    #[must_use]
    pub fn new(config: ForkfulConfig, store: S, passwords: Passwords, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                passwords,
                clock,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ForkfulConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence backend.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the time source.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Session gate.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_, S> {
        AuthService::new(
            &self.inner.store,
            &self.inner.passwords,
            self.clock(),
            self.inner.config.session_ttl(),
        )
    }

    /// Cart ledger.
    #[must_use]
    pub fn carts(&self) -> CartService<'_, S> {
        CartService::new(&self.inner.store)
    }

    /// Catalog query.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_, S> {
        CatalogService::new(&self.inner.store)
    }

    /// Menu management.
    #[must_use]
    pub fn menus(&self) -> MenuService<'_, S> {
        MenuService::new(&self.inner.store)
    }

    /// Order placement and fulfilment.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_, S> {
        OrderService::new(&self.inner.store, self.clock())
    }
}
