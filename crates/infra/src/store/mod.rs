//! Cart and session storage boundary.
//!
//! This module defines infrastructure-facing abstractions for persisting
//! carts, their line items, and the session→cart binding, without making any
//! storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod session;
pub mod r#trait;

pub use in_memory::InMemoryCartStore;
pub use postgres::PostgresCartStore;
pub use session::{InMemorySessionStore, SessionStore};
pub use r#trait::CartStore;
