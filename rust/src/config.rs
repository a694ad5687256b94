//! Serializable settings for the standard signal set.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::DeviceIdBuilder;
use crate::command::{CommandExecutor, ShellExecutor};
use crate::error::DeviceIdError;
use crate::formatter::{ConcatFormatter, StructuredFormatter};
use crate::manager::DeviceIdManager;
use crate::network::AdapterFilter;
use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatterConfig {
    #[default]
    Hashed,
    Concatenated,
    Structured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceIdConfig {
    #[serde(default = "default_true")]
    pub exclude_wireless: bool,
    #[serde(default = "default_true")]
    pub exclude_docker_bridge: bool,
    #[serde(default)]
    pub file_token: Option<PathBuf>,
    #[serde(default)]
    pub include_user_name: bool,
    #[serde(default)]
    pub include_machine_name: bool,
    #[serde(default)]
    pub formatter: FormatterConfig,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    ".".to_string()
}

impl Default for DeviceIdConfig {
    fn default() -> Self {
        Self {
            exclude_wireless: true,
            exclude_docker_bridge: true,
            file_token: None,
            include_user_name: false,
            include_machine_name: false,
            formatter: FormatterConfig::default(),
            separator: default_separator(),
        }
    }
}

impl DeviceIdConfig {
    /// Parse and validate a JSON settings document.
    pub fn from_json(data: &str) -> Result<Self, DeviceIdError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, DeviceIdError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, DeviceIdError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), DeviceIdError> {
        if self.formatter != FormatterConfig::Structured && self.separator.is_empty() {
            return Err(DeviceIdError::Configuration(
                "separator must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn adapter_filter(&self) -> AdapterFilter {
        AdapterFilter {
            exclude_wireless: self.exclude_wireless,
            exclude_docker_bridge: self.exclude_docker_bridge,
        }
    }

    fn apply_formatter(&self, builder: &mut DeviceIdBuilder) {
        match self.formatter {
            FormatterConfig::Hashed => {
                builder.use_formatter(ConcatFormatter::hashed(&self.separator))
            }
            FormatterConfig::Concatenated => {
                builder.use_formatter(ConcatFormatter::new(&self.separator))
            }
            FormatterConfig::Structured => builder.use_formatter(StructuredFormatter),
        };
    }

    fn hardware_signals(builder: &mut DeviceIdBuilder, executor: &Arc<dyn CommandExecutor>) {
        builder
            .on_windows(|w| {
                w.add_machine_guid(Arc::clone(executor))
                    .add_baseboard_serial(Arc::clone(executor));
            })
            .on_linux(|l| {
                l.add_machine_id()
                    .add_cpu_info()
                    .add_motherboard_serial()
                    .add_system_drive_serial(Arc::clone(executor))
                    .add_docker_container_id();
            })
            .on_mac(|m| {
                m.add_platform_serial(Arc::clone(executor))
                    .add_system_volume_uuid(Arc::clone(executor));
            });
    }

    /// The standard manager for the running host.
    pub fn into_manager(&self) -> DeviceIdManager {
        let platform = Platform::current();
        self.into_manager_for(platform, Arc::new(ShellExecutor::for_platform(platform)))
    }

    /// Version 1 holds the hardware signals of `platform`; version 2 adds
    /// network adapters and the optional user-level signals on top.
    pub fn into_manager_for(
        &self,
        platform: Platform,
        executor: Arc<dyn CommandExecutor>,
    ) -> DeviceIdManager {
        let mut manager = DeviceIdManager::with_platform(platform);
        manager
            .add_builder(1, |b| {
                Self::hardware_signals(b, &executor);
                self.apply_formatter(b);
            })
            .add_builder(2, |b| {
                Self::hardware_signals(b, &executor);
                b.add_mac_address(self.adapter_filter());
                if let Some(path) = &self.file_token {
                    b.add_file_token(path);
                }
                if self.include_user_name {
                    b.add_user_name(true);
                }
                if self.include_machine_name {
                    b.add_machine_name();
                }
                self.apply_formatter(b);
            });
        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_commands() -> Arc<dyn CommandExecutor> {
        Arc::new(|cmd: &str| -> Result<String, DeviceIdError> {
            Err(DeviceIdError::unavailable(cmd))
        })
    }

    #[test]
    fn test_defaults_from_empty_document() {
        let config = DeviceIdConfig::from_json("{}").unwrap();
        assert_eq!(config, DeviceIdConfig::default());
        assert!(config.exclude_wireless);
        assert_eq!(config.separator, ".");
    }

    #[test]
    fn test_json_roundtrip_and_names() {
        let config = DeviceIdConfig::from_json(
            r#"{
                "formatter": "structured",
                "file_token": "/var/lib/app/token",
                "exclude_wireless": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.formatter, FormatterConfig::Structured);
        assert!(!config.exclude_wireless);
        let back = DeviceIdConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_rejects_unknown_fields_and_empty_separator() {
        assert!(matches!(
            DeviceIdConfig::from_json(r#"{"colour": "blue"}"#),
            Err(DeviceIdError::Json(_))
        ));
        assert!(matches!(
            DeviceIdConfig::from_json(r#"{"separator": ""}"#),
            Err(DeviceIdError::Configuration(_))
        ));
        assert!(
            DeviceIdConfig::from_json(r#"{"separator": "", "formatter": "structured"}"#).is_ok()
        );
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deviceid.json");
        fs::write(&path, r#"{"formatter": "concatenated", "separator": "|"}"#).unwrap();
        let config = DeviceIdConfig::from_file(&path).unwrap();
        assert_eq!(config.formatter, FormatterConfig::Concatenated);
        assert!(matches!(
            DeviceIdConfig::from_file(&dir.path().join("missing.json")),
            Err(DeviceIdError::Io(_))
        ));
    }

    #[test]
    fn test_manager_layout() {
        let dir = TempDir::new().unwrap();
        let config = DeviceIdConfig {
            file_token: Some(dir.path().join("token")),
            include_machine_name: true,
            ..Default::default()
        };
        let manager = config.into_manager_for(Platform::MacOs, no_commands());
        assert_eq!(manager.versions(), vec![2, 1]);

        let v1: Vec<_> = manager.builder(1).unwrap().component_names().collect();
        assert_eq!(v1, vec!["IOPlatformSerialNumber", "SystemDriveVolumeUUID"]);
        let v2: Vec<_> = manager.builder(2).unwrap().component_names().collect();
        assert_eq!(v2.len(), 5);
        assert_eq!(v2[2], "MACAddress");
        assert!(v2[3].starts_with("FileToken_"));
        assert_eq!(v2[4], "MachineName");
    }

    #[test]
    fn test_mac_address_source_follows_platform() {
        let config = DeviceIdConfig::default();
        for (platform, expected) in [
            (Platform::Windows, "interfaces"),
            (Platform::MacOs, "interfaces"),
            (Platform::Linux, "sysfs"),
        ] {
            let manager = config.into_manager_for(platform, no_commands());
            let v2 = manager.builder(2).unwrap();
            assert_eq!(v2.component_source("MACAddress"), Some(expected), "{platform:?}");
            assert!(manager.builder(1).unwrap().component_source("MACAddress").is_none());
        }
    }

    #[test]
    fn test_token_keeps_newest_version_usable() {
        let dir = TempDir::new().unwrap();
        let config = DeviceIdConfig {
            file_token: Some(dir.path().join("token")),
            exclude_wireless: true,
            ..Default::default()
        };
        // Other platform: no hardware signals, only the v2 extras.
        let manager = config.into_manager_for(Platform::Other, no_commands());
        let (version, id) = manager.device_id_with_version().unwrap();
        assert_eq!(version, 2);
        assert_eq!(id.len(), 64);
        assert_eq!(manager.device_id().unwrap(), id);
        assert_eq!(manager.validate(&id), Some(2));
    }
}
