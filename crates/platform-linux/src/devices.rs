//! Video4Linux device enumeration.

use std::path::{Path, PathBuf};

use lightbox_common::error::{LightboxError, LightboxResult};
use serde::Serialize;

/// sysfs class directory listing every video4linux node.
pub const SYSFS_VIDEO4LINUX: &str = "/sys/class/video4linux";

/// A capture device node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoDevice {
    /// Name reported by the driver (sysfs `name`).
    pub name: String,

    /// Device node, e.g. `/dev/video0`.
    pub path: PathBuf,
}

impl VideoDevice {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// `"{name} ({path})"`, as shown in device pickers.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.path.display())
    }
}

/// Enumerate video4linux devices on this system.
pub fn enumerate_devices() -> LightboxResult<Vec<VideoDevice>> {
    enumerate_devices_in(Path::new(SYSFS_VIDEO4LINUX), Path::new("/dev"))
}

/// Enumerate devices from a sysfs class directory, mapping each entry to
/// a node under `dev_root`.
pub fn enumerate_devices_in(sysfs_root: &Path, dev_root: &Path) -> LightboxResult<Vec<VideoDevice>> {
    if !sysfs_root.exists() {
        tracing::debug!(path = %sysfs_root.display(), "No video4linux class directory");
        return Ok(Vec::new());
    }

    let mut devices = Vec::new();
    for entry in std::fs::read_dir(sysfs_root)? {
        let entry = entry?;
        let node = entry.file_name().to_string_lossy().into_owned();

        // Read device name from sysfs
        let name = std::fs::read_to_string(entry.path().join("name"))
            .map(|n| n.trim().to_string())
            .ok()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| node.clone());

        devices.push(VideoDevice::new(name, dev_root.join(&node)));
    }

    devices.sort_by_key(|d| node_sort_key(&d.path));
    tracing::debug!(count = devices.len(), "Enumerated video devices");
    Ok(devices)
}

/// Orders `video2` before `video10`.
fn node_sort_key(path: &Path) -> (String, u32) {
    let node = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits_at = node
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(node.len());
    let (prefix, number) = node.split_at(digits_at);
    (prefix.to_string(), number.parse().unwrap_or(u32::MAX))
}

/// Device picker contents. Index 0 is the neutral "no device" entry.
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    devices: Vec<VideoDevice>,
}

impl DeviceList {
    pub const NO_DEVICE_LABEL: &'static str = "No device";

    pub fn new(devices: Vec<VideoDevice>) -> Self {
        Self { devices }
    }

    /// Enumerate the system's devices.
    pub fn detect() -> LightboxResult<Self> {
        enumerate_devices().map(Self::new)
    }

    pub fn devices(&self) -> &[VideoDevice] {
        &self.devices
    }

    /// Number of picker entries, the neutral one included. Never zero.
    pub fn entry_count(&self) -> usize {
        self.devices.len() + 1
    }

    /// Whether any real device was found.
    pub fn has_devices(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Picker labels, neutral entry first.
    pub fn labels(&self) -> Vec<String> {
        std::iter::once(Self::NO_DEVICE_LABEL.to_string())
            .chain(self.devices.iter().map(VideoDevice::display_name))
            .collect()
    }

    /// Resolve a picker index. `Ok(None)` is the neutral entry.
    pub fn choice(&self, index: usize) -> LightboxResult<Option<&VideoDevice>> {
        match index {
            0 => Ok(None),
            n => self.devices.get(n - 1).map(Some).ok_or_else(|| {
                LightboxError::platform(format!(
                    "Invalid device index {n}. Available devices: 0..={}",
                    self.devices.len()
                ))
            }),
        }
    }

    /// Find a device by node path.
    pub fn by_path(&self, path: &Path) -> Option<&VideoDevice> {
        self.devices.iter().find(|d| d.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_sysfs(entries: &[(&str, Option<&str>)]) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for (node, name) in entries {
            let dir = root.path().join(node);
            std::fs::create_dir_all(&dir).unwrap();
            if let Some(name) = name {
                std::fs::write(dir.join("name"), format!("{name}\n")).unwrap();
            }
        }
        root
    }

    #[test]
    fn enumerates_nodes_in_numeric_order() {
        let sysfs = fake_sysfs(&[
            ("video10", Some("Loopback")),
            ("video2", Some("HD Pro Webcam C920")),
            ("video0", Some("Integrated Camera")),
        ]);

        let devices = enumerate_devices_in(sysfs.path(), Path::new("/dev")).unwrap();
        let paths: Vec<_> = devices.iter().map(|d| d.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/dev/video0"),
                PathBuf::from("/dev/video2"),
                PathBuf::from("/dev/video10"),
            ]
        );
        assert_eq!(devices[1].display_name(), "HD Pro Webcam C920 (/dev/video2)");
    }

    #[test]
    fn missing_name_falls_back_to_node() {
        let sysfs = fake_sysfs(&[("video0", None)]);
        let devices = enumerate_devices_in(sysfs.path(), Path::new("/dev")).unwrap();
        assert_eq!(devices[0].name, "video0");
    }

    #[test]
    fn missing_class_directory_yields_no_devices() {
        let devices =
            enumerate_devices_in(Path::new("/nonexistent/video4linux"), Path::new("/dev")).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn index_zero_is_no_device() {
        let list = DeviceList::new(vec![VideoDevice::new("Cam", "/dev/video0")]);
        assert_eq!(list.choice(0).unwrap(), None);
        assert_eq!(list.choice(1).unwrap().unwrap().name, "Cam");
        assert!(list.choice(2).is_err());
        assert_eq!(list.labels(), vec!["No device", "Cam (/dev/video0)"]);
        assert_eq!(list.entry_count(), 2);
        assert!(list.has_devices());
    }

    #[test]
    fn empty_list_still_offers_the_neutral_entry() {
        let list = DeviceList::new(Vec::new());
        assert_eq!(list.entry_count(), 1);
        assert!(!list.has_devices());
        assert_eq!(list.labels(), vec!["No device"]);
        assert_eq!(list.choice(0).unwrap(), None);
        assert!(list.choice(1).is_err());
    }
}
