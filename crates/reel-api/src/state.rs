use std::sync::Arc;

use reel_catalog::Catalog;
use reel_db::Database;
use reel_gateway::Dispatcher;
use reel_party::PartyService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub catalog: Arc<dyn Catalog>,
    pub dispatcher: Dispatcher,
    pub parties: PartyService,
    pub auth: AuthConfig,
}

/// Bearer token settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl AppStateInner {
    /// Wire the party service to the shared database, catalog and room
    /// dispatcher.
    pub fn new(db: Arc<Database>, catalog: Arc<dyn Catalog>, dispatcher: Dispatcher, auth: AuthConfig) -> AppState {
        let parties = PartyService::new(db.clone(), catalog.clone(), Arc::new(dispatcher.clone()));
        Arc::new(Self {
            db,
            catalog,
            dispatcher,
            parties,
            auth,
        })
    }

    /// Run a blocking storage call off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> crate::error::ApiResult<T>
    where
        F: FnOnce(&Database) -> reel_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let res = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                tracing::error!("spawn_blocking join error: {}", e);
                crate::error::ApiError::internal(e)
            })?;
        Ok(res?)
    }
}
