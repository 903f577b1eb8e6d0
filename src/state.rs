//! Shared request state.
//!
//! Built once at startup and handed to every handler through an axum
//! `Extension`, the same way the database pool is shared.

use std::sync::Arc;

use crate::analytics::{RandomRealtime, RealtimeSource, ReportEngine};
use crate::config::ReportLimits;
use crate::store::AnalyticsStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: ReportEngine,
    pub realtime: Arc<dyn RealtimeSource>,
}

impl AppState {
    /// State over `store`, with the random placeholder realtime source.
    pub fn new(store: Arc<dyn AnalyticsStore>, limits: ReportLimits) -> Self {
        Self {
            engine: ReportEngine::new(store, limits),
            realtime: Arc::new(RandomRealtime),
        }
    }

    pub fn with_realtime(mut self, source: Arc<dyn RealtimeSource>) -> Self {
        self.realtime = source;
        self
    }
}
