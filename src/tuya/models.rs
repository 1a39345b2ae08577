//! Tuya cloud API payloads

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::error::TuyaError;

/// Status code carrying the motion flag
pub const PIR_CODE: &str = "pir";

/// Raw response: HTTP status plus the body parsed as JSON (`Null` when unparsable)
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub path: String,
    pub status: reqwest::StatusCode,
    pub body: Value,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    result: Option<T>,
}

impl ApiResponse {
    /// Interpret the response as `{success, result}` and return `result`.
    ///
    /// Non-2xx statuses, `success: false` and a missing `result` are all errors.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, TuyaError> {
        if !self.status.is_success() {
            return Err(TuyaError::Status {
                path: self.path,
                status: self.status,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_value(self.body).map_err(|e| TuyaError::MalformedResponse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if envelope.success == Some(false) {
            return Err(TuyaError::Rejected {
                path: self.path,
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        envelope.result.ok_or(TuyaError::MalformedResponse {
            path: self.path,
            reason: "missing result".to_string(),
        })
    }
}

/// `result` of `GET /v1.0/token?grant_type=1`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    /// Lifetime in seconds
    pub expire_time: u64,
}

/// One `{code, value}` entry of `GET /v1.0/devices/{id}/status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEntry {
    pub code: String,
    #[serde(default)]
    pub value: Value,
}

/// Derive the motion flag from a status list.
///
/// The entry whose code is `pir` is compared literally against the string `"pir"`.
/// Later entries win; no entry means no motion.
pub fn motion_detected(entries: &[StatusEntry]) -> bool {
    entries
        .iter()
        .rev()
        .find(|entry| entry.code == PIR_CODE)
        .map(|entry| entry.value.as_str() == Some(PIR_CODE))
        .unwrap_or(false)
}
