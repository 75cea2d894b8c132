use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};

use stockroom_core::ItemId;

use super::{deleted, load_snapshot};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

async fn item_response(services: &AppServices, id: ItemId, status: StatusCode) -> Response {
    let snapshot = match load_snapshot(services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match dto::Views::new(&snapshot).item(id) {
        Some(view) => (status, Json(view)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
    }
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ItemsQuery>, QueryRejection>,
) -> Response {
    let filter = match query {
        Ok(Query(q)) => match q.into_filter() {
            Ok(f) => f,
            Err(resp) => return resp,
        },
        Err(e) => return errors::query_rejection_to_response(e),
    };

    let snapshot = match load_snapshot(&services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let views = dto::Views::new(&snapshot).items(&filter);
    (StatusCode::OK, Json(views)).into_response()
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateItemRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    let created = match services.store.create_item(body.into()).await {
        Ok(c) => c,
        Err(e) => return errors::store_error_to_response(e),
    };
    tracing::info!(
        item_id = %created.item.id,
        code = %created.item.code,
        opening_stock = created.opening_entry.as_ref().map_or(0, |e| e.quantity),
        "item created"
    );

    item_response(&services, created.item.id, StatusCode::CREATED).await
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };
    item_response(&services, id, StatusCode::OK).await
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
) -> Response {
    let id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    if let Err(e) = services.store.update_item(id, body.into()).await {
        return errors::store_error_to_response(e);
    }
    item_response(&services, id, StatusCode::OK).await
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("item"),
    };

    match services.store.delete_item(id).await {
        Ok(()) => {
            tracing::info!(item_id = %id, "item deleted");
            deleted()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
