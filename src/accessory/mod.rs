//! Host-side accessory bookkeeping
//!
//! `HostPlatform` is the seam to the home-automation host: accessory
//! registration keyed by a deterministic UUID, push updates of the motion
//! flag, and pull reads of the last pushed value. `AccessoryRegistry` is the
//! in-memory implementation served over the HTTP API.

pub mod poller;

pub use poller::DevicePoller;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const MANUFACTURER: &str = "Tuya";
pub const MODEL: &str = "Tuya PIR sensor";
pub const SERIAL_NUMBER: &str = "000000";

/// Namespace for accessory UUIDs (v5, derived from the device reference)
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8b3d_5c70_9e21_d4a7_3b58_c016);

/// Same device reference, same UUID, across restarts
pub fn accessory_uuid(device: &str) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, device.as_bytes())
}

/// Static accessory metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessoryInfo {
    pub uuid: Uuid,
    pub display_name: String,
    pub device: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

impl AccessoryInfo {
    pub fn for_device(device: &str) -> Self {
        Self {
            uuid: accessory_uuid(device),
            display_name: format!("{} ({})", MODEL, device),
            device: device.to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL.to_string(),
            serial_number: SERIAL_NUMBER.to_string(),
        }
    }
}

/// Accessory as seen by the host, including the last pushed value
#[derive(Debug, Clone, Serialize)]
pub struct AccessoryState {
    #[serde(flatten)]
    pub info: AccessoryInfo,
    pub motion_detected: bool,
    pub update_count: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl AccessoryState {
    fn new(info: AccessoryInfo) -> Self {
        Self {
            info,
            motion_detected: false,
            update_count: 0,
            last_updated: None,
        }
    }
}

#[async_trait]
pub trait HostPlatform: Send + Sync {
    async fn register_accessories(&self, accessories: Vec<AccessoryInfo>);

    async fn update_accessories(&self, accessories: Vec<AccessoryInfo>);

    async fn unregister_accessories(&self, uuids: &[Uuid]);

    async fn find_accessory(&self, uuid: Uuid) -> Option<AccessoryState>;

    async fn accessories(&self) -> Vec<AccessoryState>;

    /// Push a new motion value (called every poll cycle, changed or not)
    async fn update_motion_detected(&self, uuid: Uuid, value: bool);

    /// Pull the last pushed motion value
    async fn motion_detected(&self, uuid: Uuid) -> Option<bool>;
}

#[derive(Default)]
pub struct AccessoryRegistry {
    accessories: RwLock<HashMap<Uuid, AccessoryState>>,
}

impl AccessoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HostPlatform for AccessoryRegistry {
    async fn register_accessories(&self, accessories: Vec<AccessoryInfo>) {
        let mut map = self.accessories.write().await;
        for info in accessories {
            tracing::debug!("[Registry] Registered {} ({})", info.display_name, info.uuid);
            map.entry(info.uuid)
                .or_insert_with(|| AccessoryState::new(info));
        }
    }

    async fn update_accessories(&self, accessories: Vec<AccessoryInfo>) {
        let mut map = self.accessories.write().await;
        for info in accessories {
            match map.get_mut(&info.uuid) {
                Some(state) => state.info = info,
                None => tracing::warn!("[Registry] Update for unknown accessory {}", info.uuid),
            }
        }
    }

    async fn unregister_accessories(&self, uuids: &[Uuid]) {
        let mut map = self.accessories.write().await;
        for uuid in uuids {
            if let Some(state) = map.remove(uuid) {
                tracing::debug!("[Registry] Unregistered {}", state.info.display_name);
            }
        }
    }

    async fn find_accessory(&self, uuid: Uuid) -> Option<AccessoryState> {
        self.accessories.read().await.get(&uuid).cloned()
    }

    async fn accessories(&self) -> Vec<AccessoryState> {
        let mut list: Vec<AccessoryState> =
            self.accessories.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.info.device.cmp(&b.info.device));
        list
    }

    async fn update_motion_detected(&self, uuid: Uuid, value: bool) {
        let mut map = self.accessories.write().await;
        match map.get_mut(&uuid) {
            Some(state) => {
                state.motion_detected = value;
                state.update_count += 1;
                state.last_updated = Some(Utc::now());
            }
            None => tracing::warn!("[Registry] Motion update for unknown accessory {}", uuid),
        }
    }

    async fn motion_detected(&self, uuid: Uuid) -> Option<bool> {
        self.accessories
            .read()
            .await
            .get(&uuid)
            .map(|state| state.motion_detected)
    }
}
