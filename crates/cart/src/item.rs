use serde::{Deserialize, Serialize};

use trolley_catalog::Product;
use trolley_core::{CartError, CartId, CartItemId, CartResult, Entity, ProductId};

/// A line item: one product inside one cart.
///
/// `quantity` is always positive — a quantity driven to zero or below is a
/// deletion, never a persisted state. `total_price` is the line subtotal at
/// the product's price as of the last quantity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i64,
    /// Line subtotal in smallest currency unit.
    total_price: u64,
}

impl CartItem {
    /// Create a line item for `quantity` units of `product`.
    ///
    /// Fails with `InvalidQuantity` when the quantity is not positive or the
    /// line total would overflow.
    pub fn new(cart_id: CartId, product: &Product, quantity: i64) -> CartResult<Self> {
        let total_price = product
            .line_total(quantity)
            .ok_or(CartError::InvalidQuantity(quantity))?;
        Ok(Self {
            id: CartItemId::new(),
            cart_id,
            product_id: product.id_typed(),
            quantity,
            total_price,
        })
    }

    /// Rehydrate a line item from stored fields.
    pub fn from_parts(
        id: CartItemId,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
        total_price: u64,
    ) -> Self {
        Self {
            id,
            cart_id,
            product_id,
            quantity,
            total_price,
        }
    }

    pub fn id_typed(&self) -> CartItemId {
        self.id
    }

    pub fn cart_id(&self) -> CartId {
        self.cart_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    /// Replace the quantity and recompute the line total at the product's
    /// current price. Same failure modes as [`CartItem::new`].
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CartResult<()> {
        debug_assert_eq!(product.id_typed(), self.product_id);
        self.total_price = product
            .line_total(quantity)
            .ok_or(CartError::InvalidQuantity(quantity))?;
        self.quantity = quantity;
        Ok(())
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
