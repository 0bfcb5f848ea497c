//! # Device Registry
//!
//! Lists serial endpoints a scanner or printer could be attached to. Knows
//! nothing about what is on the other end.
//!
//! ## Linux sysfs Walk
//! ```text
//! /sys/class/tty/
//! ├── ttyUSB0/device ──► .../1-1.2:1.0/ttyUSB0   USB-serial bridge
//! │                         └── ../idVendor, idProduct, serial
//! ├── ttyACM0/device ──► .../1-1.3:1.0           CDC-ACM (most scanners)
//! ├── ttyS0/device, type != 0                    real UART
//! ├── ttyS1/device, type == 0                    placeholder, skipped
//! ├── rfcomm0                                    Bluetooth SPP, no device link
//! └── tty0, pts, ...                             skipped
//! ```
//!
//! Enumeration failure is never an error for the caller: it logs and
//! returns an empty list ("no devices found").

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::endpoint::DeviceEndpoint;

/// How far up from the tty's `device` link to look for USB descriptors.
const MAX_USB_PARENT_DEPTH: usize = 4;

/// Source of candidate endpoints.
pub trait DeviceRegistry: Send + Sync {
    fn list_endpoints(&self) -> Vec<DeviceEndpoint>;
}

/// Enumerates `/sys/class/tty`.
#[derive(Debug, Clone)]
pub struct SysfsRegistry {
    class_dir: PathBuf,
    dev_dir: PathBuf,
}

impl Default for SysfsRegistry {
    fn default() -> Self {
        SysfsRegistry::new("/sys/class/tty", "/dev")
    }
}

impl SysfsRegistry {
    pub fn new(class_dir: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        SysfsRegistry {
            class_dir: class_dir.into(),
            dev_dir: dev_dir.into(),
        }
    }

    fn scan(&self) -> std::io::Result<Vec<DeviceEndpoint>> {
        let mut endpoints = Vec::new();

        for entry in fs::read_dir(&self.class_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let node = entry.path();

            if !is_candidate(&name, &node) {
                continue;
            }

            let usb = usb_parent(&node.join("device"));
            let read = |attr: &str| usb.as_ref().and_then(|dir| read_attr(&dir.join(attr)));

            endpoints.push(DeviceEndpoint {
                path: self.dev_dir.join(&name).to_string_lossy().into_owned(),
                vendor_id: read("idVendor"),
                product_id: read("idProduct"),
                serial_number: read("serial"),
            });
        }

        endpoints.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(endpoints)
    }
}

impl DeviceRegistry for SysfsRegistry {
    fn list_endpoints(&self) -> Vec<DeviceEndpoint> {
        match self.scan() {
            Ok(endpoints) => {
                debug!(count = endpoints.len(), "Enumerated serial endpoints");
                endpoints
            }
            Err(e) => {
                warn!(dir = %self.class_dir.display(), error = %e, "Serial enumeration failed");
                Vec::new()
            }
        }
    }
}

/// A fixed list, for tests and for platforms without sysfs.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry(pub Vec<DeviceEndpoint>);

impl DeviceRegistry for StaticRegistry {
    fn list_endpoints(&self) -> Vec<DeviceEndpoint> {
        self.0.clone()
    }
}

fn is_candidate(name: &str, node: &Path) -> bool {
    if name.starts_with("rfcomm") {
        return true;
    }
    let has_device = node.join("device").exists();
    if name.starts_with("ttyUSB") || name.starts_with("ttyACM") {
        return has_device;
    }
    if name.starts_with("ttyS") {
        // The 8250 driver registers placeholder ports with type 0 (unknown)
        return has_device && read_attr(&node.join("type")).as_deref() != Some("0");
    }
    false
}

/// Nearest ancestor of `device` that carries USB descriptors.
fn usb_parent(device: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(device).ok()?;
    for _ in 0..=MAX_USB_PARENT_DEPTH {
        if dir.join("idVendor").is_file() {
            return Some(dir);
        }
        dir = dir.parent()?.to_path_buf();
    }
    None
}

fn read_attr(path: &Path) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Builds a fake sysfs: devices/ holds the hardware tree, class/ the
    /// tty entries with `device` links into it.
    fn fake_sysfs() -> TempDir {
        let root = TempDir::new().unwrap();
        let r = root.path();

        // USB bridge: descriptors one level above the interface
        let usb_dev = r.join("devices/usb1/1-1");
        let iface = usb_dev.join("1-1:1.0");
        fs::create_dir_all(&iface).unwrap();
        fs::write(usb_dev.join("idVendor"), "0416\n").unwrap();
        fs::write(usb_dev.join("idProduct"), "5011\n").unwrap();
        fs::write(usb_dev.join("serial"), "PRN-001\n").unwrap();

        let platform = r.join("devices/platform/serial8250");
        fs::create_dir_all(&platform).unwrap();

        let class = r.join("class");
        for name in ["ttyUSB0", "ttyS0", "ttyS1", "rfcomm0", "tty0", "ttyACM9"] {
            fs::create_dir_all(class.join(name)).unwrap();
        }
        std::os::unix::fs::symlink(&iface, class.join("ttyUSB0/device")).unwrap();
        std::os::unix::fs::symlink(&platform, class.join("ttyS0/device")).unwrap();
        std::os::unix::fs::symlink(&platform, class.join("ttyS1/device")).unwrap();
        std::os::unix::fs::symlink(&platform, class.join("tty0/device")).unwrap();
        fs::write(class.join("ttyS0/type"), "4\n").unwrap();
        fs::write(class.join("ttyS1/type"), "0\n").unwrap();
        // ttyACM9 has no device link: stale entry

        root
    }

    #[test]
    fn test_sysfs_enumeration() {
        let root = fake_sysfs();
        let registry = SysfsRegistry::new(root.path().join("class"), "/dev");

        let endpoints = registry.list_endpoints();
        let paths: Vec<&str> = endpoints.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/dev/rfcomm0", "/dev/ttyS0", "/dev/ttyUSB0"]);

        let usb = &endpoints[2];
        assert_eq!(usb.vendor_id.as_deref(), Some("0416"));
        assert_eq!(usb.product_id.as_deref(), Some("5011"));
        assert_eq!(usb.serial_number.as_deref(), Some("PRN-001"));

        assert_eq!(endpoints[1].vendor_id, None);
    }

    #[test]
    fn test_missing_sysfs_is_empty_not_error() {
        let registry = SysfsRegistry::new("/nonexistent/sys/class/tty", "/dev");
        assert!(registry.list_endpoints().is_empty());
    }

    #[test]
    fn test_static_registry() {
        let registry = StaticRegistry(vec![DeviceEndpoint::from_path("/dev/ttyUSB0")]);
        assert_eq!(registry.list_endpoints().len(), 1);
    }
}
