use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use stockroom_inventory::{HistoryFilter, TransactionKind, build_history};

use super::load_snapshot;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

fn parse_filter(query: dto::HistoryQuery) -> Result<HistoryFilter, Response> {
    let kind = match query.kind.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<TransactionKind>().map_err(|e| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.to_string())
        })?),
    };
    let date = match query.date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(dto::parse_day(raw)?),
    };
    Ok(HistoryFilter {
        kind,
        date,
        search: query.search,
    })
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::HistoryQuery>, QueryRejection>,
) -> Response {
    let filter = match query {
        Ok(Query(q)) => match parse_filter(q) {
            Ok(f) => f,
            Err(resp) => return resp,
        },
        Err(e) => return errors::query_rejection_to_response(e),
    };

    let snapshot = match load_snapshot(&services).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let view = build_history(
        &snapshot.items,
        &snapshot.stock_ins,
        &snapshot.stock_outs,
        &filter,
    );
    (StatusCode::OK, Json(view)).into_response()
}
