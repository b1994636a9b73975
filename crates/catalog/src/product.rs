use serde::{Deserialize, Serialize};

use trolley_core::{Entity, ProductId, StoreError};

/// A sellable product: id, display name, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    /// Price in smallest currency unit (e.g., cents).
    unit_price: u64,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: u64) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    /// Line total for `quantity` units, or `None` when the quantity is not
    /// positive or the multiplication overflows.
    pub fn line_total(&self, quantity: i64) -> Option<u64> {
        if quantity <= 0 {
            return None;
        }
        self.unit_price.checked_mul(quantity as u64)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Read-only lookup the cart core consumes: product id → name/price.
pub trait ProductCatalog: Send + Sync {
    /// Resolve a product id. `Ok(None)` means the id is unknown; `Err` is a
    /// backend failure, never a domain condition.
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

impl<C> ProductCatalog for std::sync::Arc<C>
where
    C: ProductCatalog + ?Sized,
{
    fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_product(id)
    }
}
