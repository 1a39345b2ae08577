//! Tuya cloud HTTP client
//!
//! Every call is signed fresh; the access token is passed in by the caller
//! (see `CredentialManager::get`) so this client holds no auth state.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::TuyaError;
use crate::tuya::models::ApiResponse;
use crate::tuya::signer::{calc_sign, sign_payload, SIGN_METHOD};

/// One outbound request with its auth headers. Built per call, never reused.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    pub params: Vec<(String, String)>,
    pub body: String,
}

impl SignedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub struct TuyaClient {
    http_client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl TuyaClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the signed request for `path`.
    ///
    /// An empty `access_token` selects the bootstrap `secret` header.
    pub fn sign(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &str,
        access_token: &str,
        t: i64,
    ) -> Result<SignedRequest, TuyaError> {
        let sign = calc_sign(&sign_payload(&self.client_id, access_token, t), &self.secret)?;

        let mut headers = vec![
            ("client_id", self.client_id.clone()),
            ("sign", sign),
            ("t", t.to_string()),
            ("sign_method", SIGN_METHOD.to_string()),
        ];
        if access_token.is_empty() {
            headers.push(("secret", self.secret.clone()));
        } else {
            headers.push(("access_token", access_token.to_string()));
        }

        Ok(SignedRequest {
            path: path.to_string(),
            headers,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        })
    }

    /// Issue a signed request. The verb is always GET, even with a body.
    ///
    /// Any HTTP status is returned as-is; only transport failures are errors.
    pub async fn send(&self, request: SignedRequest) -> Result<ApiResponse, TuyaError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.http_client.get(&url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let resp = builder.send().await.map_err(|e| TuyaError::Transport {
            path: request.path.clone(),
            source: e,
        })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| TuyaError::Transport {
            path: request.path.clone(),
            source: e,
        })?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        tracing::debug!(
            "[TuyaClient] {} (token: {}) -> {} {}",
            request.path,
            request.header("access_token").is_some(),
            status.as_u16(),
            body
        );

        Ok(ApiResponse {
            path: request.path,
            status,
            body,
        })
    }

    /// Sign with the current unix time in milliseconds and send
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &str,
        access_token: &str,
    ) -> Result<ApiResponse, TuyaError> {
        let t = Utc::now().timestamp_millis();
        let request = self.sign(path, params, body, access_token, t)?;
        self.send(request).await
    }
}
