//! HTTP handlers module

mod accessories;

pub use self::accessories::*;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub token_held: bool,
    pub token_expire_seconds: u64,
}

/// Health check handler
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    let credentials = state.credentials.credentials().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "tuya-pir-bridge".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        token_held: !credentials.is_empty(),
        token_expire_seconds: credentials.expire_seconds,
    })
}
