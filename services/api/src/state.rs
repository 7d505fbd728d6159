//! Application state shared across request handlers.

use std::sync::Arc;

use crate::api::tokens::TokenService;
use crate::db::Store;
use crate::registration::RegistrationEngine;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    tokens: TokenService,
    registrations: RegistrationEngine,
}

impl AppState {
    /// Create a new application state.
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        let registrations = RegistrationEngine::new(store.clone());
        Self {
            inner: Arc::new(AppStateInner {
                store,
                tokens,
                registrations,
            }),
        }
    }

    /// Get a reference to the user and event store.
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    pub fn registrations(&self) -> &RegistrationEngine {
        &self.inner.registrations
    }
}
