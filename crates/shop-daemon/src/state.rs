//! Shared runtime state for shop-daemon.
//!
//! Handlers receive `State<Arc<AppState<S>>>` from Axum. The state is generic
//! over the store so tests can run the real router against `MemoryStore`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shop_inventory::{InventoryStore, TransitionService};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: String,
    pub version: String,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: "shop-daemon".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub struct AppState<S> {
    pub service: Arc<TransitionService<S>>,
    /// HS256 secret for admin tokens. `None` rejects every admin request.
    pub jwt_secret: Option<String>,
    pub build: BuildInfo,
}

impl<S: InventoryStore> AppState<S> {
    pub fn new(store: S, jwt_secret: Option<String>) -> Self {
        Self {
            service: Arc::new(TransitionService::new(store)),
            jwt_secret: jwt_secret.filter(|s| !s.trim().is_empty()),
            build: BuildInfo::default(),
        }
    }

    pub fn store(&self) -> &S {
        self.service.store()
    }
}
