//! Accessory handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::ApiState;
use crate::error::AppError;

#[derive(Serialize)]
pub struct MotionDetectedResponse {
    pub uuid: Uuid,
    pub motion_detected: bool,
}

fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid accessory id {}", raw)))
}

/// GET /api/accessories - List registered accessories
pub async fn list_accessories(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.host.accessories().await)
}

/// GET /api/accessories/:uuid - Get a single accessory
pub async fn get_accessory(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let uuid = parse_uuid(&uuid)?;
    let accessory = state
        .host
        .find_accessory(uuid)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Accessory {} not found", uuid)))?;

    Ok(Json(accessory))
}

/// GET /api/accessories/:uuid/motion-detected - Last pushed motion value
pub async fn get_motion_detected(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let uuid = parse_uuid(&uuid)?;
    tracing::debug!("[Api] Triggered GET MotionDetected for {}", uuid);

    let motion_detected = state
        .host
        .motion_detected(uuid)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Accessory {} not found", uuid)))?;

    Ok(Json(MotionDetectedResponse {
        uuid,
        motion_detected,
    }))
}
