//! Network adapter enumeration and the deterministic adapter selection that
//! feeds the MAC address signal.

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::component::Component;
use crate::error::DeviceIdError;
use crate::platform::Platform;

/// Bridges created by the Docker daemon: the default `docker0` and the
/// per-network `br-<12 hex>` devices.
static DOCKER_BRIDGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(docker\d+|br-[0-9a-f]{12})$").unwrap());

/// ARPHRD values for loopback, tunnels and interfaces without a hardware header.
const NON_PHYSICAL_LINK_TYPES: &[u32] = &[768, 769, 772, 776, 778, 823, 65534];

/// A 6-byte physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Wrap raw address bytes.
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }

    /// All six bytes are zero, which some drivers report for "no address".
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = DeviceIdError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` and `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if digits.len() != 12 {
            return Err(DeviceIdError::malformed(format!("bad MAC address: {s}")));
        }
        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&digits, &mut bytes)
            .map_err(|_| DeviceIdError::malformed(format!("bad MAC address: {s}")))?;
        Ok(Self(bytes))
    }
}

/// One interface as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAdapter {
    pub name: String,
    pub index: Option<u32>,
    pub address: Option<MacAddress>,
    pub is_wireless: bool,
    pub is_loopback_or_virtual: bool,
}

impl NetworkAdapter {
    /// A physical, wired adapter.
    pub fn wired(name: impl Into<String>, index: Option<u32>, address: MacAddress) -> Self {
        Self {
            name: name.into(),
            index,
            address: Some(address),
            is_wireless: false,
            is_loopback_or_virtual: false,
        }
    }
}

/// Exclusion flags applied on top of the always-on physical-address filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterFilter {
    pub exclude_wireless: bool,
    pub exclude_docker_bridge: bool,
}

/// Narrow `adapters` to the physical candidates and put them in a stable order.
///
/// Ordering uses only stable attributes: interface index first (adapters
/// without one last), then the address, then the name.
pub fn select_adapters(
    adapters: Vec<NetworkAdapter>,
    filter: AdapterFilter,
) -> Vec<NetworkAdapter> {
    let mut selected: Vec<NetworkAdapter> = adapters
        .into_iter()
        .filter(|a| match a.address {
            Some(mac) => !mac.is_zero(),
            None => false,
        })
        .filter(|a| !a.is_loopback_or_virtual)
        .filter(|a| !(filter.exclude_wireless && a.is_wireless))
        .filter(|a| !(filter.exclude_docker_bridge && DOCKER_BRIDGE_PATTERN.is_match(&a.name)))
        .collect();
    selected.sort_by(compare_adapters);
    selected
}

fn compare_adapters(a: &NetworkAdapter, b: &NetworkAdapter) -> Ordering {
    let by_index = match (a.index, b.index) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_index
        .then_with(|| a.address.cmp(&b.address))
        .then_with(|| a.name.cmp(&b.name))
}

/// Source of the live adapter list.
pub trait AdapterSource: Send + Sync {
    fn adapters(&self) -> Result<Vec<NetworkAdapter>, DeviceIdError>;

    /// Short label of where adapters come from, shown in diagnostics.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// The adapter source used for `platform`: sysfs on Linux, the OS interface
/// list everywhere else.
pub fn host_adapter_source(platform: Platform) -> Arc<dyn AdapterSource> {
    match platform {
        Platform::Linux => Arc::new(SysfsAdapterSource::default()),
        Platform::Windows | Platform::MacOs | Platform::Other => Arc::new(InterfaceAdapterSource),
    }
}

/// Reads adapters from a Linux `/sys/class/net` style directory.
#[derive(Debug, Clone)]
pub struct SysfsAdapterSource {
    root: PathBuf,
}

impl SysfsAdapterSource {
    /// Read adapters from `root` instead of `/sys/class/net`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_adapter(dir: &Path, name: String) -> NetworkAdapter {
        let read = |file: &str| fs::read_to_string(dir.join(file)).ok();
        let address = read("address").and_then(|s| s.parse::<MacAddress>().ok());
        let index = read("ifindex").and_then(|s| s.trim().parse::<u32>().ok());
        let link_type = read("type").and_then(|s| s.trim().parse::<u32>().ok());
        let is_wireless = dir.join("wireless").exists() || dir.join("phy80211").exists();
        // Only hardware-backed interfaces carry a `device` link.
        let is_loopback_or_virtual = name == "lo"
            || !dir.join("device").exists()
            || link_type.is_some_and(|t| NON_PHYSICAL_LINK_TYPES.contains(&t));
        trace!(adapter = %name, ?address, ?index, is_wireless, is_loopback_or_virtual, "adapter");
        NetworkAdapter {
            name,
            index,
            address,
            is_wireless,
            is_loopback_or_virtual,
        }
    }
}

impl Default for SysfsAdapterSource {
    fn default() -> Self {
        Self::new("/sys/class/net")
    }
}

impl AdapterSource for SysfsAdapterSource {
    fn adapters(&self) -> Result<Vec<NetworkAdapter>, DeviceIdError> {
        let mut adapters = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().to_string();
            adapters.push(Self::read_adapter(&entry.path(), name));
        }
        Ok(adapters)
    }

    fn kind(&self) -> &'static str {
        "sysfs"
    }
}

/// Adapters enumerated through the OS interface APIs (`getifaddrs`,
/// `GetAdaptersAddresses`).
///
/// These APIs report neither names nor wireless flags, so only the
/// physical-address filter applies; every adapter sorts by address.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceAdapterSource;

impl AdapterSource for InterfaceAdapterSource {
    fn adapters(&self) -> Result<Vec<NetworkAdapter>, DeviceIdError> {
        let interfaces = mac_address::MacAddressIterator::new()
            .map_err(|e| DeviceIdError::unavailable(format!("interface enumeration: {e}")))?;
        Ok(interfaces
            .map(|mac| NetworkAdapter {
                name: String::new(),
                index: None,
                address: Some(MacAddress::new(mac.bytes())),
                is_wireless: false,
                is_loopback_or_virtual: false,
            })
            .collect())
    }

    fn kind(&self) -> &'static str {
        "interfaces"
    }
}

/// Comma-joined addresses of every selected adapter.
pub struct MacAddressComponent {
    filter: AdapterFilter,
    source: Arc<dyn AdapterSource>,
}

impl MacAddressComponent {
    /// Select from the adapters reported by `source`.
    pub fn new(filter: AdapterFilter, source: Arc<dyn AdapterSource>) -> Self {
        Self { filter, source }
    }

    /// Component over the native adapter source of `platform`.
    pub fn for_platform(filter: AdapterFilter, platform: Platform) -> Self {
        Self::new(filter, host_adapter_source(platform))
    }
}

impl Component for MacAddressComponent {
    fn value(&self) -> Result<String, DeviceIdError> {
        let selected = select_adapters(self.source.adapters()?, self.filter);
        if selected.is_empty() {
            return Err(DeviceIdError::unavailable("no adapter left after filtering"));
        }
        debug!(count = selected.len(), source = self.source.kind(), "selected network adapters");
        Ok(selected
            .iter()
            .filter_map(|a| a.address)
            .map(|mac| mac.to_string())
            .collect::<Vec<_>>()
            .join(","))
    }

    fn source(&self) -> Option<&str> {
        Some(self.source.kind())
    }
}
