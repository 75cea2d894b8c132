use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use stockroom_auth::webhook::{HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use stockroom_auth::{IdentityEvent, WebhookHeaders};

use crate::app::errors;
use crate::app::services::AppServices;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Identity-provider webhook: verify the signature, then mirror user changes.
pub async fn identity_webhook(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(verifier) = services.webhook.as_ref() else {
        tracing::error!("identity webhook received but no webhook secret is configured");
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "webhook_not_configured",
            "webhook secret is not configured",
        );
    };

    let signed = WebhookHeaders {
        id: header(&headers, HEADER_ID),
        timestamp: header(&headers, HEADER_TIMESTAMP),
        signature: header(&headers, HEADER_SIGNATURE),
    };

    if let Err(e) = verifier.verify(&signed, &body) {
        tracing::warn!(error = %e, "rejected identity webhook");
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_webhook", e.to_string());
    }

    let event = match IdentityEvent::parse(&body) {
        Ok(ev) => ev,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_webhook", e.to_string());
        }
    };

    match event {
        IdentityEvent::UpsertUser { external_id, email } => {
            match services.store.upsert_user(&external_id, email).await {
                Ok(user) => {
                    tracing::info!(
                        user_id = %user.id,
                        external_id = %user.external_id,
                        "user synced"
                    );
                }
                Err(e) => return errors::store_error_to_response(e),
            }
        }
        IdentityEvent::Ignored(kind) => {
            tracing::debug!(event_type = %kind, "ignoring identity event");
        }
    }

    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}
