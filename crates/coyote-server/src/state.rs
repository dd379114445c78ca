use coyote_core::ShockService;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ShockService>,
}

impl AppState {
    pub fn new(service: Arc<ShockService>) -> Self {
        Self { service }
    }
}
