// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the authgate server.

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod mailer;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod store;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthService, LocalAuth};
use crate::config::Settings;
use crate::guard::RequestGuard;
use crate::mailer::Mailer;
use crate::store::Store;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Validation pipeline run before the auth service
    pub guard: Arc<RequestGuard>,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
    /// Storage backend, closed once on shutdown
    pub store: Arc<S>,
}

impl<S: Store + 'static> AppState<S> {
    /// Wire the services around an injected store
    pub fn new(store: Arc<S>, settings: Settings, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let auth = Arc::new(LocalAuth::new(store.clone(), &settings, mailer)?);
        let guard = Arc::new(RequestGuard::new(settings.schemas()));

        Ok(Self {
            auth,
            guard,
            settings: Arc::new(settings),
            store,
        })
    }
}
