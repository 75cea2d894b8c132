//! Service wiring: which store backs the API, and the webhook verifier.

use std::sync::Arc;

use anyhow::Context;

use stockroom_auth::{WebhookError, WebhookVerifier};
use stockroom_infra::{
    AppConfig, InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StorageConfig,
};

#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn InventoryStore>,
    /// `None` when no webhook secret is configured.
    pub webhook: Option<Arc<WebhookVerifier>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            store,
            webhook: None,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryInventoryStore::new()))
    }

    pub fn with_webhook_secret(mut self, secret: &str) -> Result<Self, WebhookError> {
        self.webhook = Some(Arc::new(WebhookVerifier::new(secret)?));
        Ok(self)
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let services = match &config.storage {
        StorageConfig::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES is off; inventory data lives in memory only");
            AppServices::in_memory()
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PostgresInventoryStore::connect(database_url, *max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!(max_connections, "using Postgres inventory store");
            AppServices::new(Arc::new(store))
        }
    };

    match config.webhook_secret.as_deref() {
        Some(secret) => services
            .with_webhook_secret(secret)
            .context("invalid webhook secret"),
        None => {
            tracing::warn!("no webhook secret configured; identity webhooks will be rejected");
            Ok(services)
        }
    }
}
