//! Request DTOs and parsing helpers.

use axum::http::StatusCode;
use serde::Deserialize;

use trolley_core::ProductId;

use crate::app::errors;

#[derive(Debug, Deserialize)]
pub struct AddProductRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub product_id: String,
    /// Added to the current quantity; negative values shrink the line and a
    /// result at or below zero removes it.
    pub quantity: i64,
}

pub fn parse_product_id(s: &str) -> Result<ProductId, axum::response::Response> {
    s.parse::<ProductId>().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
    })
}
