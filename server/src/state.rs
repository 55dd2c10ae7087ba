use std::sync::Arc;

use shared::types::server_config::AppConfig;

use crate::security::csrf::CsrfStore;
use crate::security::request_log::RequestLog;
use crate::store::{AdminDirectory, ProductStore};

/// Per-process state, cloned into every connection task.
///
/// Everything the pipeline mutates lives here — there are no module-level
/// singletons, so tests can build an isolated state per case and shutdown
/// drops everything cleanly.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub csrf: CsrfStore,
    pub logs: RequestLog,
    pub admins: AdminDirectory,
    pub products: ProductStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let csrf = CsrfStore::new(config.security.csrf_ttl());
        let logs = RequestLog::new(config.security.log_capacity);

        Self {
            config: Arc::new(config),
            csrf,
            logs,
            admins: AdminDirectory::seeded(),
            products: ProductStore::new(),
        }
    }
}
