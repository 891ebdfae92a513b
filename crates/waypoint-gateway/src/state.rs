use std::sync::Arc;

use waypoint_resolver::ResolutionEngine;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<ResolutionEngine>,
}

impl AppState {
    pub fn new(engine: Arc<ResolutionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }
}
