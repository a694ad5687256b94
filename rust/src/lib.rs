//! deviceid: stable device identifiers composed from hardware and OS signals.
//!
//! A [`DeviceIdBuilder`] evaluates named [`Component`]s in registration order,
//! encodes each value and hands the ordered pairs to a [`Formatter`]. A
//! [`DeviceIdManager`] keeps several builders keyed by version and reports the
//! newest one that could observe at least one signal.
//!
//! Signal collection never fails: an unavailable signal is an empty value, and
//! an identifier that cannot be produced at all is `None`.
//!
//! # Example
//!
//! ```
//! use deviceid::{ConcatFormatter, DeviceIdManager, ValueComponent};
//!
//! let mut manager = DeviceIdManager::new();
//! manager
//!     .add_builder(1, |b| {
//!         b.add_component("A", ValueComponent::of("x"))
//!             .use_formatter(ConcatFormatter::new("|"));
//!     })
//!     .add_builder(2, |b| {
//!         b.add_component("B", ValueComponent::none());
//!     });
//! assert_eq!(manager.device_id().as_deref(), Some("A=x"));
//! ```

mod blockdev;
mod builder;
mod command;
mod component;
mod config;
mod docker;
mod encoder;
mod error;
mod file;
mod formatter;
mod manager;
mod network;
mod platform;
mod signals;
mod system;

pub use blockdev::{
    BlockDevice, LSBLK_COMMAND, RootDriveSerialComponent, find_root_device, find_root_parent,
    parse_lsblk,
};
pub use builder::DeviceIdBuilder;
pub use command::{CommandComponent, CommandExecutor, ShellExecutor};
pub use component::{Component, FnComponent, ValueComponent};
pub use config::{DeviceIdConfig, FormatterConfig};
pub use docker::{DEFAULT_CGROUP_FILE, DockerContainerIdComponent, parse_container_id};
pub use encoder::{Encoder, HashEncoder, PlainTextEncoder};
pub use error::DeviceIdError;
pub use file::{FileContentsComponent, FileTokenComponent, file_token_name};
pub use formatter::{ConcatFormatter, EncodedValue, Formatter, StructuredFormatter};
pub use manager::DeviceIdManager;
pub use network::{
    AdapterFilter, AdapterSource, InterfaceAdapterSource, MacAddress, MacAddressComponent,
    NetworkAdapter, SysfsAdapterSource, host_adapter_source, select_adapters,
};
pub use platform::Platform;
pub use system::{MachineNameComponent, OsVersionComponent, UserNameComponent};
