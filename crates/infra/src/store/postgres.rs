//! Postgres-backed cart store.
//!
//! Persists carts and line items with the ownership invariants pushed down
//! into the schema: the item→cart foreign key carries `ON DELETE CASCADE`
//! (destroying a cart destroys its items), `UNIQUE (cart_id, product_id)`
//! backs the one-item-per-product rule, and `CHECK (quantity > 0)` makes a
//! non-positive quantity unstorable.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error code | StoreError      | Scenario                          |
//! |-----------------------|-----------------|-----------------------------------|
//! | `23503` (foreign key) | `CartMissing`   | Item written for a missing cart   |
//! | `23505` (unique)      | `AlreadyExists` | Cart id collision on insert       |
//! | `23514` (check)       | `InvalidItem`   | Non-positive quantity or total    |
//! | anything else         | `Backend`       | Pool, network, decode failures    |
//!
//! ## Sync/async bridging
//!
//! The [`CartStore`] trait is synchronous; sqlx is async. The trait impl
//! resolves the current tokio runtime handle and `block_on`s the async
//! inherent methods. Callers must therefore invoke the store from a blocking
//! context inside a runtime (e.g. `tokio::task::spawn_blocking` from an HTTP
//! handler), which is how the API layer drives the engine.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use trolley_cart::{Cart, CartItem};
use trolley_core::{CartId, CartItemId, ProductId, StoreError};

use super::r#trait::CartStore;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS carts (
        id UUID PRIMARY KEY,
        total_price BIGINT NOT NULL CHECK (total_price >= 0),
        last_interaction_at TIMESTAMPTZ NOT NULL,
        abandoned_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        id UUID PRIMARY KEY,
        cart_id UUID NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
        product_id UUID NOT NULL,
        quantity BIGINT NOT NULL CHECK (quantity > 0),
        total_price BIGINT NOT NULL CHECK (total_price >= 0),
        UNIQUE (cart_id, product_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_carts_lifecycle
        ON carts (abandoned_at, last_interaction_at)
    "#,
];

/// Postgres-backed cart store.
#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: Arc<PgPool>,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("init_schema", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id_typed()), err)]
    pub async fn insert_cart_async(&self, cart: &Cart) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, total_price, last_interaction_at, abandoned_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*cart.id_typed().as_uuid())
        .bind(cents_to_db(cart.total_price(), "total_price")?)
        .bind(cart.last_interaction_at())
        .bind(cart.abandoned_at())
        .bind(cart.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_cart", e))?;
        Ok(())
    }

    pub async fn get_cart_async(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, total_price, last_interaction_at, abandoned_at, created_at
            FROM carts
            WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_cart", e))?;

        row.map(|r| cart_from_row(&r)).transpose()
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id_typed()), err)]
    pub async fn update_cart_async(&self, cart: &Cart) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET total_price = $2, last_interaction_at = $3, abandoned_at = $4
            WHERE id = $1
            "#,
        )
        .bind(*cart.id_typed().as_uuid())
        .bind(cents_to_db(cart.total_price(), "total_price")?)
        .bind(cart.last_interaction_at())
        .bind(cart.abandoned_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_cart", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartMissing(cart.id_typed().to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(cart_id = %id), err)]
    pub async fn delete_cart_async(&self, id: CartId) -> Result<bool, StoreError> {
        // Items go with the cart via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_cart", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn upsert_item_async(&self, item: &CartItem) -> Result<(), StoreError> {
        if item.quantity() <= 0 {
            return Err(StoreError::invalid_item(format!(
                "quantity must be positive, got {}",
                item.quantity()
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, total_price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, total_price = EXCLUDED.total_price
            "#,
        )
        .bind(*item.id_typed().as_uuid())
        .bind(*item.cart_id().as_uuid())
        .bind(*item.product_id().as_uuid())
        .bind(item.quantity())
        .bind(cents_to_db(item.total_price(), "total_price")?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_item", e))?;
        Ok(())
    }

    pub async fn find_item_async(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity, total_price
            FROM cart_items
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(*cart_id.as_uuid())
        .bind(*product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_item", e))?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    pub async fn delete_item_async(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(*cart_id.as_uuid())
        .bind(*product_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn items_for_cart_async(
        &self,
        cart_id: CartId,
    ) -> Result<Vec<CartItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity, total_price
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(*cart_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("items_for_cart", e))?;

        rows.iter().map(item_from_row).collect()
    }

    pub async fn list_inactive_carts_async(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Cart>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, total_price, last_interaction_at, abandoned_at, created_at
            FROM carts
            WHERE abandoned_at IS NULL AND last_interaction_at <= $1
            ORDER BY last_interaction_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_inactive_carts", e))?;

        rows.iter().map(cart_from_row).collect()
    }

    pub async fn list_abandoned_carts_async(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Cart>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, total_price, last_interaction_at, abandoned_at, created_at
            FROM carts
            WHERE abandoned_at IS NOT NULL AND abandoned_at <= $1
            ORDER BY abandoned_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_abandoned_carts", e))?;

        rows.iter().map(cart_from_row).collect()
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::backend(
            "PostgresCartStore requires an async runtime (tokio); \
             call from a blocking context inside a runtime",
        )
    })
}

impl CartStore for PostgresCartStore {
    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.insert_cart_async(cart))
    }

    fn get_cart(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        runtime_handle()?.block_on(self.get_cart_async(id))
    }

    fn update_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.update_cart_async(cart))
    }

    fn delete_cart(&self, id: CartId) -> Result<bool, StoreError> {
        runtime_handle()?.block_on(self.delete_cart_async(id))
    }

    fn upsert_item(&self, item: &CartItem) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.upsert_item_async(item))
    }

    fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError> {
        runtime_handle()?.block_on(self.find_item_async(cart_id, product_id))
    }

    fn delete_item(&self, cart_id: CartId, product_id: ProductId) -> Result<bool, StoreError> {
        runtime_handle()?.block_on(self.delete_item_async(cart_id, product_id))
    }

    fn items_for_cart(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        runtime_handle()?.block_on(self.items_for_cart_async(cart_id))
    }

    fn list_inactive_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
        runtime_handle()?.block_on(self.list_inactive_carts_async(cutoff))
    }

    fn list_abandoned_carts(&self, cutoff: DateTime<Utc>) -> Result<Vec<Cart>, StoreError> {
        runtime_handle()?.block_on(self.list_abandoned_carts_async(cutoff))
    }
}

fn cart_from_row(row: &PgRow) -> Result<Cart, StoreError> {
    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("decode carts.id", e))?;
    let total: i64 = row
        .try_get("total_price")
        .map_err(|e| map_sqlx_error("decode carts.total_price", e))?;
    let last_interaction_at: DateTime<Utc> = row
        .try_get("last_interaction_at")
        .map_err(|e| map_sqlx_error("decode carts.last_interaction_at", e))?;
    let abandoned_at: Option<DateTime<Utc>> = row
        .try_get("abandoned_at")
        .map_err(|e| map_sqlx_error("decode carts.abandoned_at", e))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| map_sqlx_error("decode carts.created_at", e))?;

    Ok(Cart::from_parts(
        CartId::from_uuid(id),
        cents_from_db(total, "total_price")?,
        last_interaction_at,
        abandoned_at,
        created_at,
    ))
}

fn item_from_row(row: &PgRow) -> Result<CartItem, StoreError> {
    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("decode cart_items.id", e))?;
    let cart_id: uuid::Uuid = row
        .try_get("cart_id")
        .map_err(|e| map_sqlx_error("decode cart_items.cart_id", e))?;
    let product_id: uuid::Uuid = row
        .try_get("product_id")
        .map_err(|e| map_sqlx_error("decode cart_items.product_id", e))?;
    let quantity: i64 = row
        .try_get("quantity")
        .map_err(|e| map_sqlx_error("decode cart_items.quantity", e))?;
    let total: i64 = row
        .try_get("total_price")
        .map_err(|e| map_sqlx_error("decode cart_items.total_price", e))?;

    Ok(CartItem::from_parts(
        CartItemId::from_uuid(id),
        CartId::from_uuid(cart_id),
        ProductId::from_uuid(product_id),
        quantity,
        cents_from_db(total, "total_price")?,
    ))
}

fn cents_to_db(value: u64, field: &str) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::backend(format!("{field} out of range for storage: {value}")))
}

fn cents_from_db(value: i64, field: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::backend(format!("{field} negative in storage: {value}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        match db.code().as_deref() {
            Some("23503") => return StoreError::CartMissing(db.message().to_string()),
            Some("23505") => return StoreError::AlreadyExists(db.message().to_string()),
            Some("23514") => return StoreError::invalid_item(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::backend(format!("{operation}: {err}"))
}
