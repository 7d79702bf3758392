use std::sync::Arc;

use cedb_audit::AuditLog;
use cedb_auth::{AuthOptions, AuthProvider, ConfigAuthenticator};
use cedb_store::{DocumentStore, FileStore};

use crate::config::ServerConfig;
use crate::coordinator::WriteCoordinator;

/// Shared handles every request works against.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub audit: Arc<AuditLog>,
    pub coordinator: Arc<WriteCoordinator>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// File-backed state rooted at `config.data_dir`, authenticating against
    /// the stored config document.
    pub fn from_config(config: &ServerConfig) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(config.data_dir.clone()));
        let audit = Arc::new(AuditLog::in_data_dir(&config.data_dir));
        let options = AuthOptions {
            legacy_admin_fallback: config.legacy_admin_fallback,
        };
        let auth: Arc<dyn AuthProvider> =
            Arc::new(ConfigAuthenticator::new(store.clone(), options));
        Self::with_parts(config.clone(), store, auth, audit)
    }

    pub fn with_parts(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        audit: Arc<AuditLog>,
    ) -> Self {
        let coordinator = Arc::new(WriteCoordinator::new(store.clone(), auth, audit.clone()));
        Self {
            store,
            audit,
            coordinator,
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("audit", &self.audit)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
