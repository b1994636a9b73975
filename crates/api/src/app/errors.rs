use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use trolley_core::CartError;

/// Map a cart failure to its response status class: not-found family → 404,
/// unprocessable family → 422, storage → 500.
pub fn cart_error_to_response(err: CartError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        CartError::CartNotFound => json_error(StatusCode::NOT_FOUND, "cart_not_found", message),
        CartError::ProductNotFound => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", message)
        }
        CartError::ProductNotInCart => {
            json_error(StatusCode::NOT_FOUND, "product_not_in_cart", message)
        }
        CartError::InvalidQuantity(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_quantity", message)
        }
        CartError::EmptyCart => json_error(StatusCode::UNPROCESSABLE_ENTITY, "empty_cart", message),
        CartError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        CartError::Store(e) => {
            tracing::error!(error = %e, "cart store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "storage unavailable",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
