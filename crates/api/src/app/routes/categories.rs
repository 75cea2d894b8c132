use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use stockroom_core::CategoryId;

use super::{deleted, load_snapshot};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

async fn category_response(services: &AppServices, id: CategoryId, status: StatusCode) -> Response {
    let snapshot = match load_snapshot(services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match dto::Views::new(&snapshot).category(id) {
        Some(view) => (status, Json(view)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "category not found"),
    }
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let snapshot = match load_snapshot(&services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    (StatusCode::OK, Json(dto::Views::new(&snapshot).categories())).into_response()
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateCategoryRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    match services.store.create_category(body.into()).await {
        Ok(category) => {
            tracing::info!(category_id = %category.id, name = %category.name, "category created");
            (
                StatusCode::CREATED,
                Json(dto::CategoryView {
                    category,
                    items: Vec::new(),
                }),
            )
                .into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: CategoryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("category"),
    };
    category_response(&services, id, StatusCode::OK).await
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateCategoryRequest>, JsonRejection>,
) -> Response {
    let id: CategoryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("category"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_rejection_to_response(e),
    };

    if let Err(e) = services.store.update_category(id, body.into()).await {
        return errors::store_error_to_response(e);
    }
    category_response(&services, id, StatusCode::OK).await
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: CategoryId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("category"),
    };

    match services.store.delete_category(id).await {
        Ok(()) => {
            tracing::info!(category_id = %id, "category deleted");
            deleted()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
