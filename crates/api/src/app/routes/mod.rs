use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use stockroom_infra::InventorySnapshot;

use crate::app::errors;
use crate::app::services::AppServices;

pub mod categories;
pub mod dashboard;
pub mod history;
pub mod items;
pub mod stock_in;
pub mod stock_out;
pub mod system;
pub mod webhooks;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/:id",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/stock-in",
            get(stock_in::list_stock_ins).post(stock_in::create_stock_in),
        )
        .route(
            "/stock-in/:id",
            get(stock_in::get_stock_in)
                .put(stock_in::update_stock_in)
                .delete(stock_in::delete_stock_in),
        )
        .route(
            "/stock-out",
            get(stock_out::list_stock_outs).post(stock_out::create_stock_out),
        )
        .route(
            "/stock-out/:id",
            get(stock_out::get_stock_out)
                .put(stock_out::update_stock_out)
                .delete(stock_out::delete_stock_out),
        )
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/history", get(history::get_history))
        .route("/webhooks/identity", post(webhooks::identity_webhook))
}

async fn load_snapshot(services: &AppServices) -> Result<InventorySnapshot, Response> {
    services
        .store
        .snapshot()
        .await
        .map_err(errors::store_error_to_response)
}

fn deleted() -> Response {
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}
