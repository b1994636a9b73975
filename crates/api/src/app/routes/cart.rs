use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use trolley_cart::CartView;
use trolley_core::{CartError, CartResult, StoreError};
use trolley_infra::CartSnapshot;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/cart", get(show).post(add_product))
        .route("/cart/add_item", post(update_quantity))
        .route("/cart/:product_id", delete(remove_product))
}

/// GET /cart — the session's current cart, absent carts included.
pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    let result = run_engine(move || {
        services
            .engine
            .get_cart(session.session_id())
            .map(|snapshot| snapshot.map(|s| s.view()).unwrap_or_else(CartView::absent))
    })
    .await;

    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::cart_error_to_response(e),
    }
}

/// POST /cart — add quantity of a product (pure increment).
pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<dto::AddProductRequest>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&body.product_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = run_engine(move || {
        services
            .engine
            .add_item(session.session_id(), product_id, body.quantity)
    })
    .await;

    cart_response(result)
}

/// POST /cart/add_item — add a delta to the product's current quantity;
/// a result at or below zero removes the line.
pub async fn update_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<dto::UpdateQuantityRequest>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&body.product_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = run_engine(move || {
        services
            .engine
            .set_item_quantity(session.session_id(), product_id, body.quantity)
    })
    .await;

    cart_response(result)
}

/// DELETE /cart/{product_id} — remove the product's line item.
pub async fn remove_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let result = run_engine(move || {
        services
            .engine
            .remove_item(session.session_id(), product_id)
    })
    .await;

    cart_response(result)
}

/// The engine is synchronous (it may block on the Postgres bridge), so every
/// call moves to the blocking pool.
async fn run_engine<T, F>(f: F) -> CartResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CartResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(CartError::Store(StoreError::backend(format!(
            "engine task failed: {e}"
        )))),
    }
}

fn cart_response(result: CartResult<CartSnapshot>) -> axum::response::Response {
    match result {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot.view())).into_response(),
        Err(e) => errors::cart_error_to_response(e),
    }
}
