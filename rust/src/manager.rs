//! Versioned builders and the newest-usable-first selection policy.

use std::collections::BTreeMap;

use tracing::debug;

use crate::builder::{DeviceIdBuilder, usable_id};
use crate::platform::Platform;

/// Holds builders keyed by version and picks the identifier to report.
///
/// Higher versions are preferred. A version whose components all come back
/// empty is skipped in favour of the next older one, so a signal set can grow
/// over releases without stranding hosts that can only answer an older set.
#[derive(Debug)]
pub struct DeviceIdManager {
    platform: Platform,
    builders: BTreeMap<i64, DeviceIdBuilder>,
}

impl DeviceIdManager {
    /// An empty manager for the running host.
    pub fn new() -> Self {
        Self::with_platform(Platform::current())
    }

    /// Builders created by this manager are scoped to `platform`.
    pub fn with_platform(platform: Platform) -> Self {
        Self {
            platform,
            builders: BTreeMap::new(),
        }
    }

    /// Create a builder, let `configure` populate it and store it at `version`.
    ///
    /// Registering an existing version replaces the earlier builder.
    pub fn add_builder<F>(&mut self, version: i64, configure: F) -> &mut Self
    where
        F: FnOnce(&mut DeviceIdBuilder),
    {
        let mut builder = DeviceIdBuilder::with_platform(self.platform);
        configure(&mut builder);
        self.builders.insert(version, builder);
        self
    }

    /// Registered versions, newest first.
    pub fn versions(&self) -> Vec<i64> {
        self.builders.keys().rev().copied().collect()
    }

    pub fn builder(&self, version: i64) -> Option<&DeviceIdBuilder> {
        self.builders.get(&version)
    }

    /// Identifier of the newest version that produced at least one signal.
    pub fn device_id(&self) -> Option<String> {
        self.device_id_with_version().map(|(_, id)| id)
    }

    /// Like [`DeviceIdManager::device_id`], also reporting the winning version.
    pub fn device_id_with_version(&self) -> Option<(i64, String)> {
        for (&version, builder) in self.builders.iter().rev() {
            let values = builder.evaluate();
            match usable_id(&values, builder.format(&values)) {
                Some(id) => {
                    debug!(version, "device id resolved");
                    return Some((version, id));
                }
                None => debug!(version, "no usable signal, falling back"),
            }
        }
        debug!(builders = self.builders.len(), "no version produced a device id");
        None
    }

    /// Version whose current identifier equals `device_id`, checked newest first.
    pub fn validate(&self, device_id: &str) -> Option<i64> {
        self.builders.iter().rev().find_map(|(&version, builder)| {
            let values = builder.evaluate();
            usable_id(&values, builder.format(&values))
                .filter(|id| id == device_id)
                .map(|_| version)
        })
    }
}

impl Default for DeviceIdManager {
    fn default() -> Self {
        Self::new()
    }
}
