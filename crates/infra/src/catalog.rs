//! In-memory product catalog for tests/dev.
//!
//! The real catalog is an external system; this adapter satisfies the
//! read-only port with a seedable map.

use std::collections::HashMap;
use std::sync::RwLock;

use trolley_catalog::{Product, ProductCatalog};
use trolley_core::{ProductId, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub fn insert(&self, product: Product) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| StoreError::LockPoisoned)?;
        products.insert(product.id_typed(), product);
        Ok(())
    }

    /// Remove a product (simulates a delisting upstream).
    pub fn remove(&self, id: ProductId) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| StoreError::LockPoisoned)?;
        products.remove(&id);
        Ok(())
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(products.get(&id).cloned())
    }
}
