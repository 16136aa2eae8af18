//! Application state shared by every service and command.
//!
//! Holds the configuration, the store, the API client, the signed-in user and
//! the cart. The user and cart live in memory behind `RwLock`s and are written
//! through to the store on every change, so a fresh process picks them up with
//! [`AppState::restore`].

use std::sync::{Arc, Weak};

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use kickforge_core::{Cart, DesignId, LineItem, OrderSummary, PricingPolicy, User};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::storage::{ClientStore, Partition, StorageChange};

/// Cache key of the persisted cart.
pub const CART_KEY: &str = "cart";

/// Cache key of the persisted session cookie.
pub const SESSION_KEY: &str = "session";

/// Application state. Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    store: ClientStore,
    api: ApiClient,
    user: RwLock<Option<User>>,
    cart: RwLock<Cart>,
}

impl AppState {
    /// Create state backed by the store named in the configuration.
    ///
    /// Nothing is loaded until [`Self::restore`] is called.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let store = ClientStore::new(config.store_url.clone());
        Self::with_store(config, store)
    }

    /// Create state on an existing store handle.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_store(config: ClientConfig, store: ClientStore) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                api,
                user: RwLock::new(None),
                cart: RwLock::new(Cart::new()),
            }),
        })
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the client store.
    #[must_use]
    pub fn store(&self) -> &ClientStore {
        &self.inner.store
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get the pricing policy applied at checkout.
    #[must_use]
    pub fn pricing(&self) -> &PricingPolicy {
        &self.inner.config.pricing
    }

    /// Load the persisted user, session cookie and cart.
    ///
    /// A store that cannot be read leaves the state signed out with an empty
    /// cart.
    #[instrument(skip(self))]
    pub async fn restore(&self) {
        let store = &self.inner.store;

        match store.cache().get::<String>(SESSION_KEY).await {
            Ok(Some(entry)) => self.inner.api.restore_session_cookie(&entry.payload),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "could not restore session cookie"),
        }

        let user = store.users().get().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not restore user; starting signed out");
            None
        });
        if let Some(user) = &user {
            set_sentry_user(&user.id, Some(user.email.as_str()));
        }
        *self.inner.user.write().await = user;

        let cart = match store.cache().get::<Cart>(CART_KEY).await {
            Ok(entry) => entry.map(|e| e.payload).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not restore cart; starting empty");
                Cart::new()
            }
        };
        *self.inner.cart.write().await = cart;
        debug!("state restored");
    }

    // =========================================================================
    // User
    // =========================================================================

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.inner.user.read().await.clone()
    }

    /// Whether a user is signed in.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.user.read().await.is_some()
    }

    /// Persist `user` (and the current session cookie), then publish it.
    ///
    /// # Errors
    ///
    /// Returns error if the store write fails; the in-memory user is left as
    /// it was.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn set_user(&self, user: User) -> Result<User> {
        let mut current = self.inner.user.write().await;
        let stored = self.inner.store.users().save(&user).await?;
        if let Some(cookie) = self.inner.api.session_cookie() {
            self.inner.store.cache().save(SESSION_KEY, &cookie).await?;
        }
        set_sentry_user(&stored.id, Some(stored.email.as_str()));
        *current = Some(stored.clone());
        Ok(stored)
    }

    /// Drop the user, session cookie and cart locally.
    ///
    /// In-memory state is cleared first, so the state is signed out even when
    /// the store write fails.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be cleared.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        *self.inner.user.write().await = None;
        self.inner.cart.write().await.clear();
        self.inner.api.forget_session();
        clear_sentry_user();

        let store = &self.inner.store;
        store.users().clear().await?;
        store.cache().delete(SESSION_KEY).await?;
        store.cache().delete(CART_KEY).await?;
        info!("signed out");
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// A snapshot of the cart.
    pub async fn cart(&self) -> Cart {
        self.inner.cart.read().await.clone()
    }

    /// Add a line item, incrementing the quantity if the design is already in
    /// the cart.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be persisted; the cart is unchanged.
    #[instrument(skip(self, item), fields(design_id = %item.design_id))]
    pub async fn add_to_cart(&self, item: LineItem) -> Result<Cart> {
        let design_id = item.design_id.to_string();
        let cart = self.mutate_cart(|cart| cart.add(item)).await?;
        add_breadcrumb("cart", "Added design to cart", Some(&[("design_id", &design_id)]));
        Ok(cart)
    }

    /// Remove a design from the cart. Returns whether it was there.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, id: &DesignId) -> Result<bool> {
        let mut removed = false;
        self.mutate_cart(|cart| removed = cart.remove(id)).await?;
        Ok(removed)
    }

    /// Set a quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, id: &DesignId, quantity: i64) -> Result<bool> {
        let mut changed = false;
        self.mutate_cart(|cart| changed = cart.update_quantity(id, quantity))
            .await?;
        Ok(changed)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<()> {
        self.mutate_cart(Cart::clear).await?;
        Ok(())
    }

    /// Sum of price times quantity over the cart.
    pub async fn cart_total(&self) -> Decimal {
        self.inner.cart.read().await.total()
    }

    /// Total number of units in the cart.
    pub async fn cart_item_count(&self) -> u64 {
        self.inner.cart.read().await.item_count()
    }

    /// Checkout figures for the current cart.
    pub async fn order_summary(&self) -> OrderSummary {
        self.pricing()
            .summarize_cart(&*self.inner.cart.read().await)
    }

    /// Apply `f` to a copy of the cart, persist the copy, then publish it.
    async fn mutate_cart(&self, f: impl FnOnce(&mut Cart)) -> Result<Cart> {
        let mut current = self.inner.cart.write().await;
        let mut next = current.clone();
        f(&mut next);
        self.inner.store.cache().save(CART_KEY, &next).await?;
        *current = next.clone();
        Ok(next)
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Keep this state in step with writes made through other handles on the
    /// same store. The last write wins.
    ///
    /// The task ends when the state is dropped or the store goes away; abort
    /// the handle to stop it sooner.
    #[must_use]
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let mut changes = self.inner.store.subscribe();
        let state = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let change = match changes.recv().await {
                    Ok(change) => Some(change),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "storage listener lagged; reloading everything");
                        None
                    }
                    Err(RecvError::Closed) => break,
                };
                if !reload(&state, change.as_ref()).await {
                    break;
                }
            }
        })
    }
}

/// Re-read whatever `change` touched (everything when `None`). Returns
/// `false` once the state is gone.
async fn reload(state: &Weak<AppStateInner>, change: Option<&StorageChange>) -> bool {
    let Some(inner) = state.upgrade() else {
        return false;
    };

    let user_changed = change.is_none_or(|c| c.partition == Partition::User);
    let cart_changed = change.is_none_or(|c| {
        c.partition == Partition::Cache && c.key.as_deref().is_none_or(|k| k == CART_KEY)
    });

    if user_changed {
        match inner.store.users().get().await {
            Ok(user) => *inner.user.write().await = user,
            Err(e) => warn!(error = %e, "could not reload user"),
        }
    }
    if cart_changed {
        match inner.store.cache().get::<Cart>(CART_KEY).await {
            Ok(entry) => *inner.cart.write().await = entry.map(|e| e.payload).unwrap_or_default(),
            Err(e) => warn!(error = %e, "could not reload cart"),
        }
    }
    true
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}
