//! `trolley-catalog` — read-only product lookup.
//!
//! The catalog is an external collaborator: the cart core only ever asks it
//! to resolve a product id into a name and price. This crate holds the
//! `Product` entity and the port the core consumes; implementations live
//! with the rest of the storage adapters.

pub mod product;

pub use product::{Product, ProductCatalog};
