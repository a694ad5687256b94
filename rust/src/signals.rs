//! Convenience registrations for the well-known signals.
//!
//! Each method registers one component under a fixed name, so identifiers
//! built by different releases agree on naming.

use std::path::Path;
use std::sync::Arc;

use crate::blockdev::RootDriveSerialComponent;
use crate::builder::DeviceIdBuilder;
use crate::command::{CommandComponent, CommandExecutor};
use crate::docker::DockerContainerIdComponent;
use crate::file::{FileContentsComponent, FileTokenComponent, file_token_name};
use crate::network::{AdapterFilter, AdapterSource, MacAddressComponent};
use crate::system::{MachineNameComponent, OsVersionComponent, UserNameComponent};

const MACHINE_ID_FILES: [&str; 2] = ["/var/lib/dbus/machine-id", "/etc/machine-id"];
/// `/proc/cpuinfo` lines that change while the machine runs.
const VOLATILE_CPUINFO_FIELDS: [&str; 2] = ["cpu MHz", "bogomips"];

const MACHINE_GUID_COMMAND: &str =
    "(Get-ItemProperty -Path 'HKLM:\\SOFTWARE\\Microsoft\\Cryptography').MachineGuid";
const BASEBOARD_SERIAL_COMMAND: &str = "(Get-CimInstance -ClassName Win32_BaseBoard).SerialNumber";
const PLATFORM_SERIAL_COMMAND: &str =
    "ioreg -l | grep IOPlatformSerialNumber | sed 's/.*= //' | sed 's/\"//g'";
const SYSTEM_VOLUME_UUID_COMMAND: &str = "diskutil info / | sed -n 's/.*Volume UUID: *//p'";

impl DeviceIdBuilder {
    // Cross-platform

    /// The login name, lowercased when `normalize` is set.
    pub fn add_user_name(&mut self, normalize: bool) -> &mut Self {
        self.add_component("UserName", UserNameComponent::new(normalize))
    }

    /// The host name.
    pub fn add_machine_name(&mut self) -> &mut Self {
        self.add_component("MachineName", MachineNameComponent::default())
    }

    /// The OS release string.
    pub fn add_os_version(&mut self) -> &mut Self {
        self.add_component("OSVersion", OsVersionComponent::default())
    }

    /// MAC addresses from the native adapter source of the builder's
    /// platform: sysfs on Linux, the OS interface list elsewhere.
    pub fn add_mac_address(&mut self, filter: AdapterFilter) -> &mut Self {
        let platform = self.platform();
        self.add_component(
            "MACAddress",
            MacAddressComponent::for_platform(filter, platform),
        )
    }

    /// MAC addresses from a caller-supplied adapter source.
    pub fn add_mac_address_from(
        &mut self,
        filter: AdapterFilter,
        source: Arc<dyn AdapterSource>,
    ) -> &mut Self {
        self.add_component("MACAddress", MacAddressComponent::new(filter, source))
    }

    /// A token file at `path`, created on first use.
    pub fn add_file_token(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        self.add_component(file_token_name(path), FileTokenComponent::new(path))
    }

    // Linux

    /// The D-Bus / systemd machine id.
    pub fn add_machine_id(&mut self) -> &mut Self {
        self.add_component("MachineID", FileContentsComponent::new(MACHINE_ID_FILES))
    }

    /// A hash of `/proc/cpuinfo` without its volatile lines.
    pub fn add_cpu_info(&mut self) -> &mut Self {
        self.add_component(
            "CPUInfo",
            FileContentsComponent::new(["/proc/cpuinfo"])
                .skipping_lines(&VOLATILE_CPUINFO_FIELDS)
                .hashed(),
        )
    }

    /// The DMI board serial.
    pub fn add_motherboard_serial(&mut self) -> &mut Self {
        self.add_component(
            "MotherboardSerialNumber",
            FileContentsComponent::new(["/sys/class/dmi/id/board_serial"]),
        )
    }

    /// The DMI product UUID.
    pub fn add_product_uuid(&mut self) -> &mut Self {
        self.add_component(
            "ProductUUID",
            FileContentsComponent::new(["/sys/class/dmi/id/product_uuid"]),
        )
    }

    /// The serial of the disk holding `/`, found through `lsblk` and udev.
    pub fn add_system_drive_serial(&mut self, executor: Arc<dyn CommandExecutor>) -> &mut Self {
        self.add_component(
            "SystemDriveSerialNumber",
            RootDriveSerialComponent::new(executor),
        )
    }

    /// The container id from `/proc/self/cgroup`.
    pub fn add_docker_container_id(&mut self) -> &mut Self {
        self.add_component("DockerContainerId", DockerContainerIdComponent::default())
    }

    // Windows

    /// `MachineGuid` from the Cryptography registry key.
    pub fn add_machine_guid(&mut self, executor: Arc<dyn CommandExecutor>) -> &mut Self {
        self.add_component(
            "MachineGuid",
            CommandComponent::new(MACHINE_GUID_COMMAND, executor),
        )
    }

    /// The `Win32_BaseBoard` serial number.
    pub fn add_baseboard_serial(&mut self, executor: Arc<dyn CommandExecutor>) -> &mut Self {
        self.add_component(
            "MotherboardSerialNumber",
            CommandComponent::new(BASEBOARD_SERIAL_COMMAND, executor),
        )
    }

    // macOS

    /// `IOPlatformSerialNumber` from the I/O registry.
    pub fn add_platform_serial(&mut self, executor: Arc<dyn CommandExecutor>) -> &mut Self {
        self.add_component(
            "IOPlatformSerialNumber",
            CommandComponent::new(PLATFORM_SERIAL_COMMAND, executor),
        )
    }

    /// The volume UUID of `/`.
    pub fn add_system_volume_uuid(&mut self, executor: Arc<dyn CommandExecutor>) -> &mut Self {
        self.add_component(
            "SystemDriveVolumeUUID",
            CommandComponent::new(SYSTEM_VOLUME_UUID_COMMAND, executor),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceIdError;
    use crate::formatter::StructuredFormatter;
    use crate::platform::Platform;

    fn recording_executor() -> Arc<dyn CommandExecutor> {
        Arc::new(|cmd: &str| -> Result<String, DeviceIdError> {
            if cmd == MACHINE_GUID_COMMAND {
                Ok("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0\r\n".to_string())
            } else if cmd == PLATFORM_SERIAL_COMMAND {
                Ok("C02ABCDEF\n".to_string())
            } else {
                Err(DeviceIdError::unavailable(cmd))
            }
        })
    }

    #[test]
    fn test_windows_signals_use_injected_executor() {
        let exec = recording_executor();
        let mut b = DeviceIdBuilder::with_platform(Platform::Windows);
        b.on_windows(|w| {
            w.add_machine_guid(Arc::clone(&exec))
                .add_baseboard_serial(Arc::clone(&exec));
        })
        .use_formatter(StructuredFormatter);

        let values = b.evaluate();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].name, "MachineGuid");
        assert_eq!(values[0].value, "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0");
        assert_eq!(values[1].name, "MotherboardSerialNumber");
        assert!(values[1].is_empty());
    }

    #[test]
    fn test_mac_signals() {
        let exec = recording_executor();
        let mut b = DeviceIdBuilder::with_platform(Platform::MacOs);
        b.on_mac(|m| {
            m.add_platform_serial(Arc::clone(&exec))
                .add_system_volume_uuid(Arc::clone(&exec));
        });
        let names: Vec<_> = b.component_names().collect();
        assert_eq!(names, vec!["IOPlatformSerialNumber", "SystemDriveVolumeUUID"]);
        assert_eq!(b.evaluate()[0].value, "C02ABCDEF");
    }

    #[test]
    fn test_linux_signal_names() {
        let mut b = DeviceIdBuilder::with_platform(Platform::Linux);
        b.add_machine_id()
            .add_cpu_info()
            .add_motherboard_serial()
            .add_product_uuid()
            .add_system_drive_serial(recording_executor())
            .add_docker_container_id()
            .add_mac_address(AdapterFilter::default())
            .add_user_name(true)
            .add_machine_name()
            .add_os_version()
            .add_file_token("/tmp/deviceid-test-token-name-only");
        let names: Vec<_> = b.component_names().collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "MachineID");
        assert!(names[10].starts_with("FileToken_"));
        // Registering again replaces rather than appends.
        b.add_machine_id();
        assert_eq!(b.len(), 11);
    }
}
