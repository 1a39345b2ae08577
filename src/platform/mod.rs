//! Platform: wires the token lifecycle to device discovery
//!
//! The host's "ready" signal starts the credential refresh loop. Every
//! successful refresh re-runs discovery over the configured device list,
//! which registers accessories and starts one poller per device. Discovery is
//! idempotent: a device that already has a running poller is left alone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::accessory::{accessory_uuid, AccessoryInfo, DevicePoller, HostPlatform};
use crate::tuya::CredentialManager;

pub struct Platform {
    device_list: Vec<String>,
    poll_interval: Duration,
    credentials: Arc<CredentialManager>,
    host: Arc<dyn HostPlatform>,
    pollers: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Platform {
    pub fn new(
        device_list: Vec<String>,
        poll_interval: Duration,
        credentials: Arc<CredentialManager>,
        host: Arc<dyn HostPlatform>,
    ) -> Self {
        Self {
            device_list,
            poll_interval,
            credentials,
            host,
            pollers: Mutex::new(HashMap::new()),
            refresh_task: Mutex::new(None),
        }
    }

    /// Host "ready" signal: start the token refresh loop (once)
    pub async fn did_finish_launching(self: &Arc<Self>) {
        tracing::debug!("[Platform] Executed did_finish_launching");

        let mut refresh_task = self.refresh_task.lock().await;
        if refresh_task.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::warn!("[Platform] Refresh loop already running");
            return;
        }

        let platform = Arc::clone(self);
        let credentials = Arc::clone(&self.credentials);
        *refresh_task = Some(tokio::spawn(credentials.run(move |_| {
            let platform = Arc::clone(&platform);
            async move { platform.discover_devices().await }
        })));
    }

    /// Register (or restore) an accessory per configured device and make sure
    /// each one has a running poller. Accessories for devices no longer
    /// configured are removed.
    pub async fn discover_devices(&self) {
        let mut configured = HashSet::new();

        for device in &self.device_list {
            if device.trim().is_empty() {
                tracing::warn!("[Platform] Skipping empty device reference");
                continue;
            }

            tracing::info!("[Platform] Discovering device: {}", device);
            let uuid = accessory_uuid(device);
            configured.insert(uuid);

            match self.host.find_accessory(uuid).await {
                Some(existing) => {
                    tracing::info!(
                        "[Platform] Restoring existing accessory: {}",
                        existing.info.display_name
                    );
                    self.host.update_accessories(vec![existing.info]).await;
                }
                None => {
                    let info = AccessoryInfo::for_device(device);
                    tracing::info!("[Platform] Adding new accessory: {}", info.display_name);
                    self.host.register_accessories(vec![info]).await;
                }
            }

            self.ensure_poller(device, uuid).await;
        }

        for accessory in self.host.accessories().await {
            let uuid = accessory.info.uuid;
            if configured.contains(&uuid) {
                continue;
            }
            tracing::info!(
                "[Platform] Removing existing accessory: {}",
                accessory.info.display_name
            );
            if let Some(handle) = self.pollers.lock().await.remove(&uuid) {
                handle.abort();
            }
            self.host.unregister_accessories(&[uuid]).await;
        }
    }

    async fn ensure_poller(&self, device: &str, uuid: Uuid) {
        let mut pollers = self.pollers.lock().await;
        if pollers.get(&uuid).is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let poller = Arc::new(DevicePoller::new(
            device.to_string(),
            uuid,
            self.poll_interval,
            Arc::clone(&self.credentials),
            Arc::clone(&self.host),
        ));
        pollers.insert(uuid, tokio::spawn(poller.start()));
    }

    #[cfg(test)]
    pub async fn running_pollers(&self) -> usize {
        self.pollers
            .lock()
            .await
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Stop the refresh loop and every poller
    pub async fn shutdown(&self) {
        if let Some(task) = self.refresh_task.lock().await.take() {
            task.abort();
        }
        let mut pollers = self.pollers.lock().await;
        let count = pollers.len();
        for (_, handle) in pollers.drain() {
            handle.abort();
        }
        tracing::info!("[Platform] Stopped refresh loop and {} pollers", count);
    }
}
