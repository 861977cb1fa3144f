//! Application state for the API server

use crate::{BatchProcessor, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the processor instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The batch processor
    pub processor: Arc<BatchProcessor>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(processor: Arc<BatchProcessor>, config: Arc<Config>) -> Self {
        Self { processor, config }
    }
}
