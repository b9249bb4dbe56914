use std::sync::Arc;
use std::time::Duration;

use bt_inference::Engine;

use crate::session::SessionStore;

/// Default upload limit, 200 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Pause after inference before the result is shown.
    pub reveal_delay: Duration,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::ZERO,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: Duration::from_secs(3600),
        }
    }
}

pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: SessionStore,
    pub config: WebConfig,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, config: WebConfig) -> Self {
        Self {
            engine,
            sessions: SessionStore::new(config.session_ttl),
            config,
        }
    }
}
