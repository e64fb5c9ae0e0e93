//! Shared application state injected into the REST handlers.

use std::sync::Arc;

use crate::domain::ConnectionRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of live sync connections, shared with the sync route.
    pub registry: Arc<ConnectionRegistry>,
}
