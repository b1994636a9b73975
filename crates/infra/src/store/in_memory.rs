use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use trolley_cart::{Cart, CartItem};
use trolley_core::{CartId, ProductId, StoreError};

use super::r#trait::CartStore;

#[derive(Debug, Default)]
struct State {
    carts: HashMap<CartId, Cart>,
    items: HashMap<(CartId, ProductId), CartItem>,
}

/// In-memory cart store.
///
/// Intended for tests/dev. Not optimized for performance. A single lock over
/// carts and items keeps every operation atomic with respect to the cascade
/// and referential-integrity rules.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    state: RwLock<State>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for InMemoryCartStore {
    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if state.carts.contains_key(&cart.id_typed()) {
            return Err(StoreError::AlreadyExists(format!(
                "cart {}",
                cart.id_typed()
            )));
        }
        state.carts.insert(cart.id_typed(), cart.clone());
        Ok(())
    }

    fn get_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.carts.get(&id).cloned())
    }

    fn update_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if !state.carts.contains_key(&cart.id_typed()) {
            return Err(StoreError::CartMissing(cart.id_typed().to_string()));
        }
        state.carts.insert(cart.id_typed(), cart.clone());
        Ok(())
    }

    fn delete_cart(&self, id: CartId) -> Result<bool, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let removed = state.carts.remove(&id).is_some();
        if removed {
            // Cascade: a cart exclusively owns its items.
            state.items.retain(|(cart_id, _), _| *cart_id != id);
        }
        Ok(removed)
    }

    fn upsert_item(&self, item: &CartItem) -> Result<(), StoreError> {
        if item.quantity() <= 0 {
            return Err(StoreError::invalid_item(format!(
                "quantity must be positive, got {}",
                item.quantity()
            )));
        }

        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if !state.carts.contains_key(&item.cart_id()) {
            return Err(StoreError::CartMissing(item.cart_id().to_string()));
        }
        state
            .items
            .insert((item.cart_id(), item.product_id()), item.clone());
        Ok(())
    }

    fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.items.get(&(cart_id, product_id)).cloned())
    }

    fn delete_item(&self, cart_id: CartId, product_id: ProductId) -> Result<bool, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.items.remove(&(cart_id, product_id)).is_some())
    }

    fn items_for_cart(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.cart_id() == cart_id)
            .cloned()
            .collect();
        // CartItemIds are UUIDv7, so sorting by id yields insertion order.
        items.sort_by_key(|item| *item.id_typed().as_uuid());
        Ok(items)
    }

    fn list_inactive_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut carts: Vec<_> = state
            .carts
            .values()
            .filter(|cart| cart.is_inactive(cutoff))
            .cloned()
            .collect();
        carts.sort_by_key(|cart| cart.last_interaction_at());
        Ok(carts)
    }

    fn list_abandoned_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut carts: Vec<_> = state
            .carts
            .values()
            .filter(|cart| cart.should_purge(cutoff))
            .cloned()
            .collect();
        carts.sort_by_key(|cart| cart.abandoned_at());
        Ok(carts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use trolley_catalog::Product;

    fn test_time() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    fn test_product() -> Product {
        Product::new(ProductId::new(), "iPhone 15", 99_999)
    }

    fn stored_cart(store: &InMemoryCartStore) -> Cart {
        let cart = Cart::new(CartId::new(), test_time());
        store.insert_cart(&cart).unwrap();
        cart
    }

    #[test]
    fn insert_then_get_round_trips() {
        let store = InMemoryCartStore::new();
        let cart = stored_cart(&store);
        assert_eq!(store.get_cart(cart.id_typed()).unwrap(), Some(cart));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = InMemoryCartStore::new();
        let cart = stored_cart(&store);
        assert!(matches!(
            store.insert_cart(&cart),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_requires_existing_cart() {
        let store = InMemoryCartStore::new();
        let cart = Cart::new(CartId::new(), test_time());
        assert!(matches!(
            store.update_cart(&cart),
            Err(StoreError::CartMissing(_))
        ));
    }

    #[test]
    fn upsert_item_enforces_referential_integrity() {
        let store = InMemoryCartStore::new();
        let product = test_product();
        let orphan = CartItem::new(CartId::new(), &product, 1).unwrap();
        assert!(matches!(
            store.upsert_item(&orphan),
            Err(StoreError::CartMissing(_))
        ));
    }

    #[test]
    fn upsert_item_replaces_per_cart_product_pair() {
        let store = InMemoryCartStore::new();
        let cart = stored_cart(&store);
        let product = test_product();

        let first = CartItem::new(cart.id_typed(), &product, 1).unwrap();
        store.upsert_item(&first).unwrap();
        let second = CartItem::new(cart.id_typed(), &product, 5).unwrap();
        store.upsert_item(&second).unwrap();

        let items = store.items_for_cart(cart.id_typed()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity(), 5);
    }

    #[test]
    fn non_positive_quantities_never_persist() {
        let store = InMemoryCartStore::new();
        let cart = stored_cart(&store);
        let product = test_product();
        // Forge an invalid quantity through rehydration to hit the store guard.
        let item = CartItem::from_parts(
            trolley_core::CartItemId::new(),
            cart.id_typed(),
            product.id_typed(),
            0,
            0,
        );
        assert!(matches!(
            store.upsert_item(&item),
            Err(StoreError::InvalidItem(_))
        ));
        assert!(store.items_for_cart(cart.id_typed()).unwrap().is_empty());
    }

    #[test]
    fn delete_cart_cascades_to_items() {
        let store = InMemoryCartStore::new();
        let cart = stored_cart(&store);
        let product = test_product();
        let item = CartItem::new(cart.id_typed(), &product, 2).unwrap();
        store.upsert_item(&item).unwrap();

        assert!(store.delete_cart(cart.id_typed()).unwrap());
        assert_eq!(store.get_cart(cart.id_typed()).unwrap(), None);
        assert!(store.items_for_cart(cart.id_typed()).unwrap().is_empty());
        assert_eq!(
            store
                .find_item(cart.id_typed(), product.id_typed())
                .unwrap(),
            None
        );

        // Second delete reports nothing removed.
        assert!(!store.delete_cart(cart.id_typed()).unwrap());
    }

    #[test]
    fn lifecycle_scans_respect_inclusive_cutoffs() {
        let store = InMemoryCartStore::new();
        let now = test_time();

        let idle = stored_cart(&store); // last interaction == now
        let mut busy = Cart::new(CartId::new(), now);
        busy.touch(now + Duration::hours(1));
        store.insert_cart(&busy).unwrap();

        let inactive = store.list_inactive_carts(now).unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id_typed(), idle.id_typed());

        let mut abandoned = Cart::new(CartId::new(), now);
        abandoned.mark_abandoned(now);
        store.insert_cart(&abandoned).unwrap();

        assert_eq!(store.list_abandoned_carts(now).unwrap().len(), 1);
        assert!(store
            .list_abandoned_carts(now - Duration::seconds(1))
            .unwrap()
            .is_empty());
    }
}
