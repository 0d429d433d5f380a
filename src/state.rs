use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::auth::google::GoogleOAuth;
use crate::config::AppConfig;
use crate::uploads::UploadStore;

/// Shared, read-only handles every request needs
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub google: GoogleOAuth,
    pub uploads: UploadStore,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let google = GoogleOAuth::new(config.google.clone());
        let uploads = UploadStore::new(&config.server.upload_dir);
        Self {
            pool,
            config: Arc::new(config),
            google,
            uploads,
            started_at: Instant::now(),
        }
    }
}
