use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    recommender::Recommender,
};

/// Shared application state
///
/// Queries clone the current `Arc<Recommender>` and drop the lock immediately.
/// Only an explicit reload takes the write side, and reloads run one at a time.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<Arc<Recommender>>>,
    reload_lock: Arc<Mutex<()>>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(recommender: Recommender, config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(recommender))),
            reload_lock: Arc::new(Mutex::new(())),
            config: Arc::new(config),
        }
    }

    /// The recommender currently serving queries
    pub async fn recommender(&self) -> Arc<Recommender> {
        self.inner.read().await.clone()
    }

    /// Reloads both artifacts from the configured paths and swaps them in
    ///
    /// A reload requested while another is running waits for it, then reads the
    /// artifacts itself, so the last reload to finish saw the newest files. On
    /// failure the previously loaded data keeps serving.
    pub async fn reload(&self) -> AppResult<Arc<Recommender>> {
        let _reloading = self.reload_lock.lock().await;

        let config = Arc::clone(&self.config);
        let loaded = tokio::task::spawn_blocking(move || Recommender::load(&config))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let recommender = match loaded {
            Ok(recommender) => Arc::new(recommender),
            Err(e) => {
                tracing::error!(error = %e, "Reload failed, keeping current data");
                return Err(e);
            }
        };

        *self.inner.write().await = Arc::clone(&recommender);
        tracing::info!(movies = recommender.catalog().len(), "Recommendation data reloaded");

        Ok(recommender)
    }
}
