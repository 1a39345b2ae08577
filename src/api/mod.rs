//! API module - host-facing HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::accessory::HostPlatform;
use crate::tuya::CredentialManager;

#[derive(Clone)]
pub struct ApiState {
    pub host: Arc<dyn HostPlatform>,
    pub credentials: Arc<CredentialManager>,
}

pub fn routes(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Accessories
        .route("/api/accessories", get(handlers::list_accessories))
        .route("/api/accessories/:uuid", get(handlers::get_accessory))
        .route(
            "/api/accessories/:uuid/motion-detected",
            get(handlers::get_motion_detected),
        )
        .with_state(state)
}
