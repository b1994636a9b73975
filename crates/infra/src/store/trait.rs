use chrono::{DateTime, Utc};
use std::sync::Arc;

use trolley_cart::{Cart, CartItem};
use trolley_core::{CartId, ProductId, StoreError};

/// Cart persistence boundary.
///
/// One cart exclusively owns its items: deleting a cart deletes every item
/// that belongs to it, and an item can only be written while its cart row
/// exists. Items are unique per `(cart_id, product_id)` — `upsert_item` is
/// the only write path, so a second write for the same pair replaces the
/// first instead of duplicating it. Implementations must reject persisting
/// an item whose quantity is not positive.
///
/// The two scan methods drive the lifecycle sweep and take **explicit**
/// cutoff timestamps (both boundaries inclusive), so sweep decisions are
/// deterministic and testable without wall-clock tricks:
///
/// - `list_inactive_carts(cutoff)`: not yet abandoned, and
///   `last_interaction_at <= cutoff`.
/// - `list_abandoned_carts(cutoff)`: `abandoned_at` set and `<= cutoff`.
pub trait CartStore: Send + Sync {
    /// Persist a new cart. Fails with `AlreadyExists` on an id collision.
    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    /// Load a cart by id. `Ok(None)` when the cart does not exist.
    fn get_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError>;

    /// Replace a cart's stored fields (total, interaction time, abandonment).
    fn update_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    /// Delete a cart and, by cascade, all of its items. Returns whether a
    /// cart row was actually removed.
    fn delete_cart(&self, id: CartId) -> Result<bool, StoreError>;

    /// Insert or replace the line item for `(item.cart_id, item.product_id)`.
    fn upsert_item(&self, item: &CartItem) -> Result<(), StoreError>;

    /// Find the line item for a `(cart, product)` pair.
    fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError>;

    /// Delete the line item for a `(cart, product)` pair. Returns whether an
    /// item row was actually removed.
    fn delete_item(&self, cart_id: CartId, product_id: ProductId) -> Result<bool, StoreError>;

    /// All items belonging to a cart, in insertion order.
    fn items_for_cart(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError>;

    /// Sweep phase 1 scan: live carts idle since `cutoff` (inclusive).
    fn list_inactive_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError>;

    /// Sweep phase 2 scan: carts abandoned at or before `cutoff` (inclusive).
    fn list_abandoned_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError>;
}

impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        (**self).insert_cart(cart)
    }

    fn get_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        (**self).get_cart(id)
    }

    fn update_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        (**self).update_cart(cart)
    }

    fn delete_cart(&self, id: CartId) -> Result<bool, StoreError> {
        (**self).delete_cart(id)
    }

    fn upsert_item(&self, item: &CartItem) -> Result<(), StoreError> {
        (**self).upsert_item(item)
    }

    fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError> {
        (**self).find_item(cart_id, product_id)
    }

    fn delete_item(&self, cart_id: CartId, product_id: ProductId) -> Result<bool, StoreError> {
        (**self).delete_item(cart_id, product_id)
    }

    fn items_for_cart(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        (**self).items_for_cart(cart_id)
    }

    fn list_inactive_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
        (**self).list_inactive_carts(cutoff)
    }

    fn list_abandoned_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
        (**self).list_abandoned_carts(cutoff)
    }
}
