//! Block-device topology (`lsblk -J`) parsing and the root-drive serial signal.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::command::CommandExecutor;
use crate::component::Component;
use crate::error::DeviceIdError;

pub const LSBLK_COMMAND: &str = "lsblk -f -J -o Name,MountPoint";
const ROOT_MOUNT: &str = "/";

/// One entry of the block-device tree.
///
/// Fields that are missing or of the wrong type in the source document are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDevice {
    pub name: Option<String>,
    pub mount_points: Vec<String>,
    pub children: Vec<BlockDevice>,
}

impl BlockDevice {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name").and_then(Value::as_str).map(str::to_string);

        // Older lsblk emits `mountpoint`, newer ones a `mountpoints` array.
        let mut mount_points: Vec<String> = Vec::new();
        if let Some(mp) = obj.get("mountpoint").and_then(Value::as_str) {
            mount_points.push(mp.to_string());
        }
        if let Some(list) = obj.get("mountpoints").and_then(Value::as_array) {
            mount_points.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }

        Some(Self {
            name,
            mount_points,
            children: devices_from(obj.get("children")),
        })
    }

    pub fn is_root(&self) -> bool {
        self.mount_points.iter().any(|mp| mp == ROOT_MOUNT)
    }

    fn contains_root(&self) -> bool {
        self.is_root() || self.children.iter().any(BlockDevice::contains_root)
    }
}

fn devices_from(value: Option<&Value>) -> Vec<BlockDevice> {
    value
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(BlockDevice::from_value).collect())
        .unwrap_or_default()
}

/// Parse `lsblk -J` output into its top-level devices.
pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>, DeviceIdError> {
    let doc: Value = serde_json::from_str(json)
        .map_err(|e| DeviceIdError::malformed(format!("lsblk output: {e}")))?;
    Ok(devices_from(doc.get("blockdevices")))
}

/// The device mounted at `/`, searched depth-first at any nesting level.
pub fn find_root_device(devices: &[BlockDevice]) -> Option<&BlockDevice> {
    devices.iter().find_map(|device| {
        if device.is_root() {
            Some(device)
        } else {
            find_root_device(&device.children)
        }
    })
}

/// The top-level device whose subtree holds the root mount.
pub fn find_root_parent(devices: &[BlockDevice]) -> Option<&BlockDevice> {
    devices.iter().find(|device| device.contains_root())
}

/// Extract the value of an `ID_SERIAL=` line from `udevadm info` output.
fn parse_udev_serial(udev: &str) -> Option<String> {
    udev.lines().find_map(|line| {
        let line = line.trim();
        let property = line.strip_prefix("E: ").unwrap_or(line);
        property
            .strip_prefix("ID_SERIAL=")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Serial number of the disk that holds the root filesystem.
pub struct RootDriveSerialComponent {
    executor: Arc<dyn CommandExecutor>,
}

impl RootDriveSerialComponent {
    /// Resolve the root drive through commands run by `executor`.
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }
}

impl Component for RootDriveSerialComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        let listing = self.executor.execute(LSBLK_COMMAND)?;
        let devices = parse_lsblk(&listing)?;
        let disk = find_root_parent(&devices)
            .ok_or_else(|| DeviceIdError::unavailable("no device mounted at /"))?;
        let name = disk
            .name
            .as_deref()
            .ok_or_else(|| DeviceIdError::unavailable("root disk has no name"))?;
        debug!(disk = name, "root disk located");

        let udev = self
            .executor
            .execute(&format!("udevadm info --query=all --name=/dev/{name}"))?;
        parse_udev_serial(&udev).ok_or_else(|| DeviceIdError::unavailable("no ID_SERIAL"))
    }
}
