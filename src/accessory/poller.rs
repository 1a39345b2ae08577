//! DevicePoller: fixed-cadence status polling for one device
//!
//! Each tick fetches `/v1.0/devices/{id}/status`, derives the motion flag and
//! pushes it to the host. A failed cycle is logged and skipped; the host keeps
//! the last pushed value.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use crate::accessory::HostPlatform;
use crate::error::TuyaError;
use crate::tuya::models::{motion_detected, StatusEntry};
use crate::tuya::CredentialManager;

pub fn status_path(device: &str) -> String {
    format!("/v1.0/devices/{}/status", device)
}

pub struct DevicePoller {
    device: String,
    uuid: Uuid,
    interval: Duration,
    credentials: Arc<CredentialManager>,
    host: Arc<dyn HostPlatform>,
}

impl DevicePoller {
    pub fn new(
        device: String,
        uuid: Uuid,
        interval: Duration,
        credentials: Arc<CredentialManager>,
        host: Arc<dyn HostPlatform>,
    ) -> Self {
        tracing::debug!("[Poller] Initializing {}", device);
        Self {
            device,
            uuid,
            interval,
            credentials,
            host,
        }
    }

    /// Fetch the status list once and derive the motion flag
    pub async fn fetch_motion(&self) -> Result<bool, TuyaError> {
        let path = status_path(&self.device);
        tracing::debug!("[Poller] Getting motion sensor status: {}", self.device);

        let response = self.credentials.get(&path, &[], "").await?;
        let entries: Vec<StatusEntry> = response.into_result()?;
        let detected = motion_detected(&entries);

        tracing::debug!("[Poller] {} motion_detected={}", self.device, detected);
        Ok(detected)
    }

    /// One poll cycle: fetch and push, or log and skip
    pub async fn poll_once(&self) {
        match self.fetch_motion().await {
            Ok(detected) => self.host.update_motion_detected(self.uuid, detected).await,
            Err(e) => tracing::warn!("[Poller] {} status poll skipped: {}", self.device, e),
        }
    }

    /// Poll forever on the configured cadence. Cycles never overlap; late
    /// ticks are skipped rather than queued.
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "[Poller] Starting {} (interval: {:?})",
            self.device,
            self.interval
        );

        let mut timer = time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            self.poll_once().await;
        }
    }
}
