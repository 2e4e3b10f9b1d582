//! Shell-outs to the block-device utilities, behind a trait so the
//! classification and preparation logic can run against canned devices in
//! tests.

use crate::device::{BlockDevice, LsblkReport};
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const REQUIRED_UTILITIES: &[&str] = &["lsblk", "blkid", "mount", "umount", "findmnt"];

pub trait System {
    /// Top-level block devices, without descendants.
    fn list_devices(&self) -> Result<Vec<BlockDevice>>;

    /// One device with its full descendant tree.
    fn device_tree(&self, device: &str) -> Result<BlockDevice>;

    /// Filesystem signature of the device itself, None if blank.
    fn probe_fstype(&self, device: &str) -> Result<Option<String>>;

    /// Filesystem UUID, None if the device has no resolvable one.
    fn probe_uuid(&self, device: &str) -> Result<Option<String>>;

    /// Create a filesystem on the device, destroying prior contents.
    fn format(&self, fstype: &str, device: &str) -> Result<()>;

    fn mount(&self, fstype: &str, device: &str, path: &Path) -> Result<()>;

    fn unmount(&self, path: &Path) -> Result<()>;

    /// Source device of whatever is mounted at the path, if anything.
    fn mounted_source(&self, path: &Path) -> Result<Option<String>>;

    fn read_mount_table(&self) -> Result<String>;

    fn append_mount_entry(&self, line: &str) -> Result<()>;

    /// Ask the OS to mount every table entry; errors carry the tool output.
    fn validate_mount_table(&self) -> Result<()>;
}

/// Real implementation shelling out to the host utilities.
pub struct HostSystem {
    fstab_path: PathBuf,
}

impl HostSystem {
    pub fn new() -> Self {
        Self {
            fstab_path: PathBuf::from("/etc/fstab"),
        }
    }

    #[cfg(test)]
    fn with_fstab(path: PathBuf) -> Self {
        Self { fstab_path: path }
    }

    /// Bail early if any required external utility is missing.
    pub fn check_utilities() -> Result<()> {
        for utility in REQUIRED_UTILITIES {
            which::which(utility).with_context(|| format!("{} not found on this system", utility))?;
        }
        Ok(())
    }

    fn lsblk(&self, args: &[&str]) -> Result<LsblkReport> {
        let output = Command::new("lsblk")
            .args(args)
            .output()
            .context("Failed to run lsblk")?;
        if !output.status.success() {
            bail!("lsblk failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        serde_json::from_slice(&output.stdout).context("Failed to parse lsblk JSON output")
    }

    /// blkid exits non-zero when the device carries no signature; that is a
    /// valid answer, not an error.
    fn blkid_value(&self, tag: &str, device: &str) -> Result<Option<String>> {
        let output = Command::new("blkid")
            .args(["-o", "value", "-s", tag, device])
            .output()
            .context("Failed to run blkid")?;
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn run_checked(&self, command: &mut Command) -> Result<()> {
        let output = command
            .output()
            .with_context(|| format!("Failed to run {:?}", command.get_program()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{}", stderr.trim());
        }
        Ok(())
    }
}

impl System for HostSystem {
    fn list_devices(&self) -> Result<Vec<BlockDevice>> {
        let report = self.lsblk(&[
            "-d",
            "--json",
            "-o",
            "NAME,SIZE,TYPE,FSTYPE,MOUNTPOINT",
        ])?;
        Ok(report.blockdevices)
    }

    fn device_tree(&self, device: &str) -> Result<BlockDevice> {
        let report = self.lsblk(&["--json", "-o", "NAME,SIZE,TYPE,FSTYPE,MOUNTPOINT", device])?;
        report
            .blockdevices
            .into_iter()
            .next()
            .with_context(|| format!("lsblk returned no entry for {}", device))
    }

    fn probe_fstype(&self, device: &str) -> Result<Option<String>> {
        self.blkid_value("TYPE", device)
    }

    fn probe_uuid(&self, device: &str) -> Result<Option<String>> {
        self.blkid_value("UUID", device)
    }

    fn format(&self, fstype: &str, device: &str) -> Result<()> {
        self.run_checked(Command::new(format!("mkfs.{}", fstype)).arg(device))
    }

    fn mount(&self, fstype: &str, device: &str, path: &Path) -> Result<()> {
        self.run_checked(Command::new("mount").arg("-t").arg(fstype).arg(device).arg(path))
    }

    fn unmount(&self, path: &Path) -> Result<()> {
        self.run_checked(Command::new("umount").arg(path))
    }

    fn mounted_source(&self, path: &Path) -> Result<Option<String>> {
        let output = Command::new("findmnt")
            .arg("-n")
            .arg("-o")
            .arg("SOURCE")
            .arg("--mountpoint")
            .arg(path)
            .output()
            .context("Failed to run findmnt")?;
        // findmnt exits non-zero when nothing is mounted there
        let source = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if source.is_empty() {
            Ok(None)
        } else {
            Ok(Some(source))
        }
    }

    fn read_mount_table(&self) -> Result<String> {
        std::fs::read_to_string(&self.fstab_path)
            .with_context(|| format!("Failed to read {}", self.fstab_path.display()))
    }

    fn append_mount_entry(&self, line: &str) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.fstab_path)
            .with_context(|| format!("Failed to open {}", self.fstab_path.display()))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn validate_mount_table(&self) -> Result<()> {
        let output = Command::new("mount")
            .arg("-a")
            .output()
            .context("Failed to run mount -a")?;
        if !output.status.success() {
            bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory stand-in returning canned lsblk trees and recording every
    /// destructive call.
    pub struct FakeSystem {
        devices: Vec<BlockDevice>,
        fstypes: HashMap<String, String>,
        uuids: HashMap<String, String>,
        mounted: HashMap<PathBuf, String>,
        fstab: RefCell<String>,
        fail_unmount: bool,
        validate_error: Option<String>,
        pub format_calls: RefCell<Vec<(String, String)>>,
        pub mount_calls: RefCell<Vec<(String, String, PathBuf)>>,
        pub unmount_calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeSystem {
        pub fn with_devices(device_json: &[&str]) -> Self {
            let devices = device_json
                .iter()
                .map(|json| serde_json::from_str(json).unwrap())
                .collect();
            Self {
                devices,
                fstypes: HashMap::new(),
                uuids: HashMap::new(),
                mounted: HashMap::new(),
                fstab: RefCell::new(String::new()),
                fail_unmount: false,
                validate_error: None,
                format_calls: RefCell::new(Vec::new()),
                mount_calls: RefCell::new(Vec::new()),
                unmount_calls: RefCell::new(Vec::new()),
            }
        }

        pub fn set_fstype(mut self, device: &str, fstype: &str) -> Self {
            self.fstypes.insert(device.to_string(), fstype.to_string());
            self
        }

        pub fn set_uuid(mut self, device: &str, uuid: &str) -> Self {
            self.uuids.insert(device.to_string(), uuid.to_string());
            self
        }

        pub fn set_mounted(mut self, path: &str, source: &str) -> Self {
            self.mounted.insert(PathBuf::from(path), source.to_string());
            self
        }

        pub fn set_fstab(self, contents: &str) -> Self {
            *self.fstab.borrow_mut() = contents.to_string();
            self
        }

        pub fn fail_unmount(mut self) -> Self {
            self.fail_unmount = true;
            self
        }

        pub fn fail_validation(mut self, output: &str) -> Self {
            self.validate_error = Some(output.to_string());
            self
        }

        pub fn fstab_contents(&self) -> String {
            self.fstab.borrow().clone()
        }
    }

    impl System for FakeSystem {
        fn list_devices(&self) -> Result<Vec<BlockDevice>> {
            Ok(self.devices.clone())
        }

        fn device_tree(&self, device: &str) -> Result<BlockDevice> {
            self.devices
                .iter()
                .find(|d| d.path() == device)
                .cloned()
                .with_context(|| format!("no such device {}", device))
        }

        fn probe_fstype(&self, device: &str) -> Result<Option<String>> {
            Ok(self.fstypes.get(device).cloned())
        }

        fn probe_uuid(&self, device: &str) -> Result<Option<String>> {
            Ok(self.uuids.get(device).cloned())
        }

        fn format(&self, fstype: &str, device: &str) -> Result<()> {
            self.format_calls
                .borrow_mut()
                .push((fstype.to_string(), device.to_string()));
            Ok(())
        }

        fn mount(&self, fstype: &str, device: &str, path: &Path) -> Result<()> {
            self.mount_calls.borrow_mut().push((
                fstype.to_string(),
                device.to_string(),
                path.to_path_buf(),
            ));
            Ok(())
        }

        fn unmount(&self, path: &Path) -> Result<()> {
            if self.fail_unmount {
                bail!("target is busy");
            }
            self.unmount_calls.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn mounted_source(&self, path: &Path) -> Result<Option<String>> {
            Ok(self.mounted.get(path).cloned())
        }

        fn read_mount_table(&self) -> Result<String> {
            Ok(self.fstab.borrow().clone())
        }

        fn append_mount_entry(&self, line: &str) -> Result<()> {
            let mut fstab = self.fstab.borrow_mut();
            fstab.push_str(line);
            fstab.push('\n');
            Ok(())
        }

        fn validate_mount_table(&self) -> Result<()> {
            match &self.validate_error {
                Some(output) => bail!("{}", output),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_append_mount_entry_appends_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let fstab = dir.path().join("fstab");
        std::fs::write(&fstab, "# header\n").unwrap();

        let system = HostSystem::with_fstab(fstab.clone());
        system
            .append_mount_entry("UUID=abcd /data ext4 defaults 0 2")
            .unwrap();

        let contents = std::fs::read_to_string(&fstab).unwrap();
        assert_eq!(contents, "# header\nUUID=abcd /data ext4 defaults 0 2\n");
        assert_eq!(system.read_mount_table().unwrap(), contents);
    }

    #[test]
    fn test_append_creates_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let fstab = dir.path().join("fstab");

        let system = HostSystem::with_fstab(fstab.clone());
        system
            .append_mount_entry("UUID=abcd /data ext4 defaults 0 2")
            .unwrap();

        assert!(fstab.exists());
    }
}
