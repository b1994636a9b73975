//! JSON-facing cart projection.
//!
//! A pure mapping from the domain entities to the shape the boundary
//! serializes: `{id, items: [{product_id, name, quantity, unit_price,
//! line_total}], total_price}`. An absent cart projects to
//! `{id: null, items: [], total_price: 0}`.

use serde::Serialize;

use trolley_catalog::Product;
use trolley_core::{CartId, ProductId};

use crate::{Cart, CartItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub id: Option<CartId>,
    pub items: Vec<CartItemView>,
    pub total_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: u64,
    pub line_total: u64,
}

impl CartView {
    /// Project a cart and its (item, product) pairs.
    pub fn project<'a>(
        cart: &Cart,
        items: impl IntoIterator<Item = (&'a CartItem, &'a Product)>,
    ) -> Self {
        Self {
            id: Some(cart.id_typed()),
            items: items
                .into_iter()
                .map(|(item, product)| CartItemView {
                    product_id: item.product_id(),
                    name: product.name().to_string(),
                    quantity: item.quantity(),
                    unit_price: product.unit_price(),
                    line_total: item.total_price(),
                })
                .collect(),
            total_price: cart.total_price(),
        }
    }

    /// Projection of "no cart bound to this session".
    pub fn absent() -> Self {
        Self {
            id: None,
            items: Vec::new(),
            total_price: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn absent_cart_projects_to_null_id_and_zero_total() {
        let json = serde_json::to_value(CartView::absent()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": null, "items": [], "total_price": 0})
        );
    }

    #[test]
    fn projection_carries_items_and_total() {
        let mut cart = Cart::new(CartId::new(), Utc::now());
        let product = Product::new(ProductId::new(), "iPhone 15", 99_999);
        let item = CartItem::new(cart.id_typed(), &product, 2).unwrap();
        cart.set_total_price(item.total_price());

        let view = CartView::project(&cart, [(&item, &product)]);
        assert_eq!(view.id, Some(cart.id_typed()));
        assert_eq!(view.total_price, 199_998);
        assert_eq!(view.items.len(), 1);

        let line = &view.items[0];
        assert_eq!(line.name, "iPhone 15");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, 99_999);
        assert_eq!(line.line_total, 199_998);
    }
}
