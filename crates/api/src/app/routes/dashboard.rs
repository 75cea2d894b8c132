use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use stockroom_inventory::DashboardSummary;

use super::load_snapshot;
use crate::app::services::AppServices;

pub async fn get_dashboard(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let snapshot = match load_snapshot(&services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let summary = DashboardSummary::compute(
        &snapshot.items,
        snapshot.categories.len(),
        &snapshot.stock_ins,
        &snapshot.stock_outs,
    );
    (StatusCode::OK, Json(summary)).into_response()
}
