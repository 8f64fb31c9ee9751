// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    identity::IdentityProvider,
    store::{DocumentStore, LearningStore, LocalMediaStore, MediaStore},
};

/// Everything a handler needs, injected through axum state.
#[derive(Clone)]
pub struct AppState {
    pub learning: Arc<dyn LearningStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub media: Arc<dyn MediaStore>,
    pub config: Config,
}

impl AppState {
    /// Builds state from one backend serving both gateways.
    /// Media goes to `config.media_dir`.
    pub fn new<S>(store: Arc<S>, identity: Arc<dyn IdentityProvider>, config: Config) -> Self
    where
        S: LearningStore + DocumentStore + 'static,
    {
        Self {
            learning: store.clone(),
            documents: store,
            identity,
            media: Arc::new(LocalMediaStore::new(config.media_dir.clone())),
            config,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
