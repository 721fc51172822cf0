//! Shared application state

use crate::config::Config;
use npresolve::Resolver;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Resolver,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            resolver: Resolver::new(),
            config: Arc::new(config),
        }
    }
}
