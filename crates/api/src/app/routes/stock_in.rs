use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use stockroom_core::StockInId;
use stockroom_inventory::StockInRecord;

use super::{deleted, load_snapshot};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Respond with `record` joined to its item as of a fresh snapshot.
async fn entry_response(
    services: &AppServices,
    record: StockInRecord,
    status: StatusCode,
) -> Response {
    let snapshot = match load_snapshot(services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let item_id = record.item_id;
    (status, Json(dto::Views::new(&snapshot).entry(record, item_id))).into_response()
}

pub async fn list_stock_ins(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let snapshot = match load_snapshot(&services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let views = dto::Views::new(&snapshot);
    let entries: Vec<_> = snapshot
        .stock_ins
        .iter()
        .map(|r| views.entry(r, r.item_id))
        .collect();
    (StatusCode::OK, Json(entries)).into_response()
}

pub async fn create_stock_in(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateStockInRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let input = match body.into_new() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let record = match services.store.create_stock_in(input).await {
        Ok(r) => r,
        Err(e) => return errors::store_error_to_response(e),
    };
    tracing::info!(
        stock_in_id = %record.id,
        item_id = %record.item_id,
        quantity = record.quantity,
        "stock-in recorded"
    );

    entry_response(&services, record, StatusCode::CREATED).await
}

pub async fn get_stock_in(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: StockInId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("stock-in"),
    };

    match services.store.get_stock_in(id).await {
        Ok(record) => entry_response(&services, record, StatusCode::OK).await,
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_stock_in(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStockInRequest>, JsonRejection>,
) -> Response {
    let id: StockInId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("stock-in"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };
    let patch = match body.into_patch() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.store.update_stock_in(id, patch).await {
        Ok(record) => entry_response(&services, record, StatusCode::OK).await,
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_stock_in(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: StockInId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("stock-in"),
    };

    match services.store.delete_stock_in(id).await {
        Ok(()) => {
            tracing::info!(stock_in_id = %id, "stock-in deleted");
            deleted()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
