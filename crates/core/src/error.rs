//! Error taxonomy for cart operations.

use thiserror::Error;

/// Result envelope returned by every cart operation.
///
/// Success carries the operation's value; failure carries a [`CartError`]
/// kind. Accessing the wrong side (`unwrap` on a failure, `unwrap_err` on a
/// success) panics, which is exactly the fail-loudly contract the boundary
/// relies on.
pub type CartResult<T> = Result<T, CartError>;

/// Typed failure of a single cart operation.
///
/// The first five kinds are expected domain conditions; `Store` is the
/// unrecoverable path (storage unavailable, lock poisoned) and is the only
/// kind the boundary maps to a server-error status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No cart is bound to the session (or the bound cart no longer exists).
    #[error("cart not found")]
    CartNotFound,

    /// The product id does not resolve in the catalog.
    #[error("product not found")]
    ProductNotFound,

    /// The product exists but has no line item in this cart.
    #[error("product not found in cart")]
    ProductNotInCart,

    /// The requested quantity is not usable for the operation.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The cart has no items to remove.
    #[error("cart is empty")]
    EmptyCart,

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Storage failure; not a domain condition.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CartError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Whether the failure belongs to the not-found response family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CartError::CartNotFound | CartError::ProductNotFound | CartError::ProductNotInCart
        )
    }
}

/// Cart store operation error.
///
/// Infrastructure failures only; domain conditions belong in [`CartError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Referential integrity: the item's cart does not exist.
    #[error("cart does not exist: {0}")]
    CartMissing(String),

    /// An insert collided with an existing row.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The item violates a store invariant (non-positive quantity, duplicate id).
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// Backend failure (database, pool, serialization).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A shared lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn invalid_item(msg: impl Into<String>) -> Self {
        Self::InvalidItem(msg.into())
    }
}
