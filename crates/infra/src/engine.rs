//! Cart mutation engine and session resolver.
//!
//! Every operation follows the same choreography: validate, resolve the
//! session's cart, apply the item mutation, then run one explicit
//! recompute-and-persist-total step and hand back the reloaded state. The
//! engine serialises the read-modify-write per cart id, so a reader going
//! through the engine never observes a total that reflects only part of a
//! mutation. Different carts never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use trolley_cart::{Cart, CartItem, CartView};
use trolley_catalog::{Product, ProductCatalog};
use trolley_core::{CartError, CartId, CartResult, ProductId, SessionId, StoreError};

use crate::store::{CartStore, SessionStore};

/// A cart plus its line items, re-read from the store after an operation.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub cart: Cart,
    /// Line items paired with their catalog products, in insertion order.
    pub lines: Vec<(CartItem, Product)>,
}

impl CartSnapshot {
    pub fn view(&self) -> CartView {
        CartView::project(
            &self.cart,
            self.lines.iter().map(|(item, product)| (item, product)),
        )
    }

    /// Quantity of a product in this snapshot, 0 if absent.
    pub fn quantity_of(&self, product_id: ProductId) -> i64 {
        self.lines
            .iter()
            .find(|(item, _)| item.product_id() == product_id)
            .map(|(item, _)| item.quantity())
            .unwrap_or(0)
    }
}

/// The cart lifecycle state machine: add/update/remove line items for a
/// session-bound cart, with derived-total maintenance.
pub struct CartEngine<S, K, C> {
    store: S,
    sessions: K,
    catalog: C,
    /// Single-writer-per-cart discipline; entries are created on demand.
    locks: Mutex<HashMap<CartId, Arc<Mutex<()>>>>,
}

impl<S, K, C> CartEngine<S, K, C>
where
    S: CartStore,
    K: SessionStore,
    C: ProductCatalog,
{
    pub fn new(store: S, sessions: K, catalog: C) -> Self {
        Self {
            store,
            sessions,
            catalog,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Read-only resolution: the session's cart, if one is bound and alive.
    pub fn resolve(&self, session: &SessionId) -> CartResult<Option<Cart>> {
        let Some(cart_id) = self.sessions.get_cart_id(session)? else {
            return Ok(None);
        };
        Ok(self.store.get_cart(cart_id)?)
    }

    /// The session's cart, creating and binding a fresh one when the session
    /// is unbound or its bound cart no longer exists (e.g. swept away).
    pub fn resolve_or_create(&self, session: &SessionId) -> CartResult<Cart> {
        if let Some(cart) = self.resolve(session)? {
            return Ok(cart);
        }

        let cart = Cart::new(CartId::new(), Utc::now());
        self.store.insert_cart(&cart)?;
        self.sessions.bind_cart_id(session, cart.id_typed())?;
        info!(cart_id = %cart.id_typed(), "created cart for session");
        Ok(cart)
    }

    /// Add `quantity` units of a product, merging into an existing line item.
    ///
    /// Failure order: `InvalidQuantity` (`quantity < 1`), `ProductNotFound`.
    pub fn add_item(
        &self,
        session: &SessionId,
        product_id: ProductId,
        quantity: i64,
    ) -> CartResult<CartSnapshot> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let product = self.find_product(product_id)?;
        let cart = self.resolve_or_create(session)?;
        let cart_id = cart.id_typed();

        let lock = self.cart_lock(cart_id);
        let _guard = lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        match self.store.find_item(cart_id, product_id)? {
            Some(mut item) => {
                let merged = item
                    .quantity()
                    .checked_add(quantity)
                    .ok_or(CartError::InvalidQuantity(quantity))?;
                item.set_quantity(&product, merged)?;
                self.store.upsert_item(&item)?;
            }
            None => {
                let item = CartItem::new(cart_id, &product, quantity)?;
                self.store.upsert_item(&item)?;
            }
        }

        debug!(cart_id = %cart_id, product_id = %product_id, quantity, "item added");
        self.finish_mutation(cart_id)
    }

    /// Add `delta` (possibly negative) to the product's current quantity,
    /// creating the line item at `delta` when absent. A resulting quantity
    /// of zero or below removes the item instead of erroring.
    ///
    /// Failure order: `InvalidQuantity` (`delta == 0`), `ProductNotFound`.
    pub fn set_item_quantity(
        &self,
        session: &SessionId,
        product_id: ProductId,
        delta: i64,
    ) -> CartResult<CartSnapshot> {
        if delta == 0 {
            return Err(CartError::InvalidQuantity(0));
        }
        let product = self.find_product(product_id)?;
        let cart = self.resolve_or_create(session)?;
        let cart_id = cart.id_typed();

        let lock = self.cart_lock(cart_id);
        let _guard = lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let existing = self.store.find_item(cart_id, product_id)?;
        let current = existing.as_ref().map(|item| item.quantity()).unwrap_or(0);
        let merged = current
            .checked_add(delta)
            .ok_or(CartError::InvalidQuantity(delta))?;

        if merged <= 0 {
            if existing.is_some() {
                self.store.delete_item(cart_id, product_id)?;
                debug!(
                    cart_id = %cart_id,
                    product_id = %product_id,
                    merged,
                    "quantity floored, item removed"
                );
            }
        } else {
            match existing {
                Some(mut item) => {
                    item.set_quantity(&product, merged)?;
                    self.store.upsert_item(&item)?;
                }
                None => {
                    let item = CartItem::new(cart_id, &product, merged)?;
                    self.store.upsert_item(&item)?;
                }
            }
            debug!(
                cart_id = %cart_id,
                product_id = %product_id,
                delta,
                merged,
                "item quantity updated"
            );
        }

        self.finish_mutation(cart_id)
    }

    /// Remove the product's line item from the session's cart.
    ///
    /// Failure order: `CartNotFound`, `EmptyCart`, `ProductNotFound`,
    /// `ProductNotInCart`.
    pub fn remove_item(
        &self,
        session: &SessionId,
        product_id: ProductId,
    ) -> CartResult<CartSnapshot> {
        let cart = self.resolve(session)?.ok_or(CartError::CartNotFound)?;
        let cart_id = cart.id_typed();

        let lock = self.cart_lock(cart_id);
        let _guard = lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        // Re-check under the lock; the sweeper may have purged the cart
        // between resolution and here.
        if self.store.get_cart(cart_id)?.is_none() {
            return Err(CartError::CartNotFound);
        }

        let items = self.store.items_for_cart(cart_id)?;
        if items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        self.find_product(product_id)?;

        if !items.iter().any(|item| item.product_id() == product_id) {
            return Err(CartError::ProductNotInCart);
        }

        self.store.delete_item(cart_id, product_id)?;
        debug!(cart_id = %cart_id, product_id = %product_id, "item removed");
        self.finish_mutation(cart_id)
    }

    /// Pure read: the session's cart with its items, or `None`.
    pub fn get_cart(&self, session: &SessionId) -> CartResult<Option<CartSnapshot>> {
        let Some(cart) = self.resolve(session)? else {
            return Ok(None);
        };
        let cart_id = cart.id_typed();

        let lock = self.cart_lock(cart_id);
        let _guard = lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        let Some(cart) = self.store.get_cart(cart_id)? else {
            return Ok(None);
        };
        let lines = self.load_lines(cart_id)?;
        Ok(Some(CartSnapshot { cart, lines }))
    }

    fn find_product(&self, id: ProductId) -> CartResult<Product> {
        self.catalog
            .find_product(id)?
            .ok_or(CartError::ProductNotFound)
    }

    fn cart_lock(&self, id: CartId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id).or_default().clone()
    }

    /// The explicit recompute-and-persist-total step that ends every
    /// mutating operation. Items are re-read from the store and every line
    /// is re-priced against the catalog, so a price moved upstream is folded
    /// into line totals and the cart total in the same step. Returns the
    /// reloaded cart state. Must be called with the cart's lock held.
    fn finish_mutation(&self, cart_id: CartId) -> CartResult<CartSnapshot> {
        let mut cart = self.store.get_cart(cart_id)?.ok_or(CartError::CartNotFound)?;

        let mut lines = Vec::new();
        let mut total: u64 = 0;
        for mut item in self.store.items_for_cart(cart_id)? {
            let product = self
                .catalog
                .find_product(item.product_id())?
                .ok_or_else(|| {
                    StoreError::backend(format!(
                        "product {} missing from catalog for stored item",
                        item.product_id()
                    ))
                })?;

            let fresh = product
                .line_total(item.quantity())
                .ok_or(CartError::InvalidQuantity(item.quantity()))?;
            if fresh != item.total_price() {
                item.set_quantity(&product, item.quantity())?;
                self.store.upsert_item(&item)?;
            }

            total = total
                .checked_add(fresh)
                .ok_or_else(|| StoreError::backend("cart total overflow"))?;
            lines.push((item, product));
        }

        cart.set_total_price(total);
        cart.touch(Utc::now());
        self.store.update_cart(&cart)?;

        Ok(CartSnapshot { cart, lines })
    }

    fn load_lines(&self, cart_id: CartId) -> CartResult<Vec<(CartItem, Product)>> {
        let mut lines = Vec::new();
        for item in self.store.items_for_cart(cart_id)? {
            let product = self
                .catalog
                .find_product(item.product_id())?
                .ok_or_else(|| {
                    StoreError::backend(format!(
                        "product {} missing from catalog for stored item",
                        item.product_id()
                    ))
                })?;
            lines.push((item, product));
        }
        Ok(lines)
    }
}
