use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::core::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            pool,
            config,
            sessions: Arc::new(SessionManager::new()),
        }
    }
}
