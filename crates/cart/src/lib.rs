//! `trolley-cart` — cart lifecycle domain model.
//!
//! Entities for the cart and its line items, the lifecycle predicates the
//! sweeper decides on, and the JSON-facing projection. All state transitions
//! here are pure; persistence and operation choreography live in
//! `trolley-infra`.

pub mod cart;
pub mod item;
pub mod projection;

pub use cart::Cart;
pub use item::CartItem;
pub use projection::{CartItemView, CartView};
