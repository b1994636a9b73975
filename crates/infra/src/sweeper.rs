//! Lifecycle sweeper: inactive → abandoned → removed.
//!
//! A two-phase batch pass over the cart store. Phase 1 marks carts abandoned
//! once they have been idle past the inactivity threshold; phase 2 purges
//! carts that have stayed abandoned past the removal threshold (the cascade
//! takes their items with them). Both boundaries are inclusive. Every cart is
//! processed independently: a failure is logged, counted, and skipped — the
//! batch never aborts.
//!
//! Because the removal threshold is far larger than a sweep interval, purge
//! only ever sees `abandoned_at` values written by an earlier pass, which is
//! the quiescence window that keeps it away from carts a shopper might still
//! be touching.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::store::CartStore;

/// Sweeper thresholds and scheduling.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Idle time after which a live cart is marked abandoned.
    pub inactivity_threshold: Duration,
    /// Time a cart may stay abandoned before it is destroyed.
    pub removal_threshold: Duration,
    /// Interval between periodic passes (only used by `spawn`).
    pub interval: Duration,
    /// Name for logging and the background thread.
    pub name: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            inactivity_threshold: Duration::from_secs(3 * 60 * 60),
            removal_threshold: Duration::from_secs(7 * 24 * 60 * 60),
            interval: Duration::from_secs(30 * 60),
            name: "cart-sweeper".to_string(),
        }
    }
}

impl SweeperConfig {
    pub fn with_thresholds(mut self, inactivity: Duration, removal: Duration) -> Self {
        self.inactivity_threshold = inactivity;
        self.removal_threshold = removal;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SweepReport {
    /// Carts newly marked abandoned.
    pub marked: u64,
    /// Abandoned carts destroyed.
    pub purged: u64,
    /// Carts skipped because their individual update/delete failed.
    pub failures: u64,
}

/// Cumulative statistics across periodic passes.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SweeperStats {
    pub runs: u64,
    pub marked: u64,
    pub purged: u64,
    pub failures: u64,
}

/// Handle to control a spawned sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl SweeperHandle {
    /// Request graceful shutdown and wait for the thread to finish.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> SweeperStats {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Batch job advancing carts through inactive → abandoned → removed.
pub struct LifecycleSweeper<S: CartStore> {
    store: S,
    config: SweeperConfig,
}

impl<S: CartStore> LifecycleSweeper<S> {
    pub fn new(store: S, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Run both phases once, as of the given instant.
    pub fn run_once(&self, as_of: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        self.mark_abandoned(as_of, &mut report);
        self.purge(as_of, &mut report);
        info!(
            sweeper = %self.config.name,
            marked = report.marked,
            purged = report.purged,
            failures = report.failures,
            "sweep pass complete"
        );
        report
    }

    fn mark_abandoned(&self, as_of: DateTime<Utc>, report: &mut SweepReport) {
        let cutoff = cutoff(as_of, self.config.inactivity_threshold);
        let carts = match self.store.list_inactive_carts(cutoff) {
            Ok(carts) => carts,
            Err(e) => {
                error!(sweeper = %self.config.name, error = %e, "inactive scan failed");
                report.failures += 1;
                return;
            }
        };

        for mut cart in carts {
            cart.mark_abandoned(as_of);
            match self.store.update_cart(&cart) {
                Ok(()) => {
                    report.marked += 1;
                    debug!(cart_id = %cart.id_typed(), "cart marked as abandoned");
                }
                Err(e) => {
                    report.failures += 1;
                    warn!(
                        cart_id = %cart.id_typed(),
                        error = %e,
                        "failed to mark cart abandoned, skipping"
                    );
                }
            }
        }
    }

    fn purge(&self, as_of: DateTime<Utc>, report: &mut SweepReport) {
        let cutoff = cutoff(as_of, self.config.removal_threshold);
        let carts = match self.store.list_abandoned_carts(cutoff) {
            Ok(carts) => carts,
            Err(e) => {
                error!(sweeper = %self.config.name, error = %e, "abandoned scan failed");
                report.failures += 1;
                return;
            }
        };

        for cart in carts {
            match self.store.delete_cart(cart.id_typed()) {
                Ok(removed) => {
                    if removed {
                        report.purged += 1;
                        info!(cart_id = %cart.id_typed(), "removed abandoned cart");
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    warn!(
                        cart_id = %cart.id_typed(),
                        error = %e,
                        "failed to remove abandoned cart, skipping"
                    );
                }
            }
        }
    }

    /// Run the sweep periodically in a named background thread.
    pub fn spawn(self) -> SweeperHandle
    where
        S: Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SweeperStats::default()));
        let stats_clone = stats.clone();

        let name = self.config.name.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                info!(sweeper = %self.config.name, "sweeper started");
                loop {
                    // One channel doubles as shutdown signal and interval timer.
                    match shutdown_rx.recv_timeout(self.config.interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }

                    let report = self.run_once(Utc::now());
                    let mut stats = stats_clone.lock().unwrap_or_else(|e| e.into_inner());
                    stats.runs += 1;
                    stats.marked += report.marked;
                    stats.purged += report.purged;
                    stats.failures += report.failures;
                }
                info!(sweeper = %name, "sweeper stopped");
            })
            .expect("failed to spawn sweeper thread");

        SweeperHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }
}

/// `as_of - threshold`, degrading to "match nothing" when the threshold is
/// not representable.
fn cutoff(as_of: DateTime<Utc>, threshold: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(threshold)
        .ok()
        .and_then(|delta| as_of.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CartStore, InMemoryCartStore};
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;
    use trolley_cart::{Cart, CartItem};
    use trolley_catalog::Product;
    use trolley_core::{CartId, ProductId, StoreError};

    fn test_time() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn config() -> SweeperConfig {
        SweeperConfig::default()
    }

    fn inactivity() -> ChronoDuration {
        ChronoDuration::hours(3)
    }

    fn removal() -> ChronoDuration {
        ChronoDuration::days(7)
    }

    fn sweeper(store: Arc<InMemoryCartStore>) -> LifecycleSweeper<Arc<InMemoryCartStore>> {
        LifecycleSweeper::new(store, config())
    }

    fn insert_cart_idle_since(store: &InMemoryCartStore, at: DateTime<Utc>) -> CartId {
        let cart = Cart::new(CartId::new(), at);
        store.insert_cart(&cart).unwrap();
        cart.id_typed()
    }

    #[test]
    fn idle_cart_is_marked_exactly_at_threshold() {
        let store = Arc::new(InMemoryCartStore::new());
        let idle_since = test_time();
        let id = insert_cart_idle_since(&store, idle_since);
        let sweeper = sweeper(store.clone());

        // One unit before the threshold: untouched.
        let report = sweeper.run_once(idle_since + inactivity() - ChronoDuration::seconds(1));
        assert_eq!(report.marked, 0);
        assert!(!store.get_cart(id).unwrap().unwrap().is_abandoned());

        // Exactly at the threshold: marked.
        let as_of = idle_since + inactivity();
        let report = sweeper.run_once(as_of);
        assert_eq!(report.marked, 1);
        let cart = store.get_cart(id).unwrap().unwrap();
        assert_eq!(cart.abandoned_at(), Some(as_of));
    }

    #[test]
    fn marking_is_idempotent_when_no_time_passes() {
        let store = Arc::new(InMemoryCartStore::new());
        insert_cart_idle_since(&store, test_time());
        let sweeper = sweeper(store);

        let as_of = test_time() + inactivity();
        assert_eq!(sweeper.run_once(as_of).marked, 1);
        assert_eq!(sweeper.run_once(as_of).marked, 0);
    }

    #[test]
    fn purge_never_touches_unabandoned_carts() {
        let store = Arc::new(InMemoryCartStore::new());
        let id = insert_cart_idle_since(&store, test_time());
        let sweeper = sweeper(store.clone());

        // Idle long past the removal threshold but never marked: one pass
        // marks it, and only a later pass may purge it.
        let as_of = test_time() + ChronoDuration::days(30);
        let report = sweeper.run_once(as_of);
        assert_eq!(report.marked, 1);
        assert_eq!(report.purged, 0);
        assert!(store.get_cart(id).unwrap().is_some());
    }

    #[test]
    fn abandoned_cart_is_purged_exactly_at_threshold() {
        let store = Arc::new(InMemoryCartStore::new());
        let id = insert_cart_idle_since(&store, test_time());
        let sweeper = sweeper(store.clone());

        let marked_at = test_time() + inactivity();
        sweeper.run_once(marked_at);

        // One unit short of the removal threshold: survives.
        let report = sweeper.run_once(marked_at + removal() - ChronoDuration::seconds(1));
        assert_eq!(report.purged, 0);
        assert!(store.get_cart(id).unwrap().is_some());

        // Exactly at the removal threshold: destroyed.
        let report = sweeper.run_once(marked_at + removal());
        assert_eq!(report.purged, 1);
        assert!(store.get_cart(id).unwrap().is_none());
    }

    #[test]
    fn purge_cascades_to_items() {
        let store = Arc::new(InMemoryCartStore::new());
        let cart = Cart::new(CartId::new(), test_time());
        store.insert_cart(&cart).unwrap();
        let product = Product::new(ProductId::new(), "iPhone 15", 99_999);
        let item = CartItem::new(cart.id_typed(), &product, 1).unwrap();
        store.upsert_item(&item).unwrap();

        let sweeper = sweeper(store.clone());
        sweeper.run_once(test_time() + inactivity());
        sweeper.run_once(test_time() + inactivity() + removal());

        assert!(store.get_cart(cart.id_typed()).unwrap().is_none());
        assert!(store.items_for_cart(cart.id_typed()).unwrap().is_empty());
    }

    #[test]
    fn an_interaction_resets_the_clock() {
        let store = Arc::new(InMemoryCartStore::new());
        let id = insert_cart_idle_since(&store, test_time());
        let sweeper = sweeper(store.clone());

        // Shopper comes back just before the sweep.
        let mut cart = store.get_cart(id).unwrap().unwrap();
        cart.touch(test_time() + ChronoDuration::hours(2));
        store.update_cart(&cart).unwrap();

        let report = sweeper.run_once(test_time() + inactivity());
        assert_eq!(report.marked, 0);
    }

    /// Store wrapper that fails every update for one specific cart.
    struct FlakyStore {
        inner: Arc<InMemoryCartStore>,
        poison: CartId,
    }

    impl CartStore for FlakyStore {
        fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
            self.inner.insert_cart(cart)
        }
        fn get_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
            self.inner.get_cart(id)
        }
        fn update_cart(&self, cart: &Cart) -> Result<(), StoreError> {
            if cart.id_typed() == self.poison {
                return Err(StoreError::backend("injected failure"));
            }
            self.inner.update_cart(cart)
        }
        fn delete_cart(&self, id: CartId) -> Result<bool, StoreError> {
            self.inner.delete_cart(id)
        }
        fn upsert_item(&self, item: &CartItem) -> Result<(), StoreError> {
            self.inner.upsert_item(item)
        }
        fn find_item(
            &self,
            cart_id: CartId,
            product_id: ProductId,
        ) -> Result<Option<CartItem>, StoreError> {
            self.inner.find_item(cart_id, product_id)
        }
        fn delete_item(&self, cart_id: CartId, product_id: ProductId) -> Result<bool, StoreError> {
            self.inner.delete_item(cart_id, product_id)
        }
        fn items_for_cart(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
            self.inner.items_for_cart(cart_id)
        }
        fn list_inactive_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
            self.inner.list_inactive_carts(cutoff)
        }
        fn list_abandoned_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
            self.inner.list_abandoned_carts(cutoff)
        }
    }

    #[test]
    fn one_failing_cart_does_not_abort_the_batch() {
        let inner = Arc::new(InMemoryCartStore::new());
        let poisoned = insert_cart_idle_since(&inner, test_time());
        let healthy = insert_cart_idle_since(&inner, test_time());

        let sweeper = LifecycleSweeper::new(
            FlakyStore {
                inner: inner.clone(),
                poison: poisoned,
            },
            config(),
        );

        let report = sweeper.run_once(test_time() + inactivity());
        assert_eq!(report.marked, 1);
        assert_eq!(report.failures, 1);
        assert!(inner.get_cart(healthy).unwrap().unwrap().is_abandoned());
        assert!(!inner.get_cart(poisoned).unwrap().unwrap().is_abandoned());
    }

    #[test]
    fn spawned_sweeper_shuts_down_cleanly() {
        let store = Arc::new(InMemoryCartStore::new());
        let sweeper = LifecycleSweeper::new(
            store,
            SweeperConfig::default().with_interval(Duration::from_millis(10)),
        );

        let handle = sweeper.spawn();
        std::thread::sleep(Duration::from_millis(50));
        let stats = handle.stats();
        assert!(stats.runs >= 1);
        handle.shutdown();
    }
}
