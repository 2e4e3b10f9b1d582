//! Persisting the mount across reboots via /etc/fstab.
//!
//! The table is append-only from this tool's perspective: an existing entry
//! for the same UUID or mount path is reported and left alone, and nothing is
//! ever edited or removed.

use crate::error::ProvisionError;
use crate::provision::MountRequest;
use crate::system::System;
use colored::*;
use std::fmt;
use std::path::{Path, PathBuf};

pub struct PersistentMountEntry {
    pub uuid: String,
    pub mount_path: PathBuf,
    pub fstype: String,
    pub pass: u8,
}

impl fmt::Display for PersistentMountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UUID={} {} {} defaults 0 {}",
            self.uuid,
            self.mount_path.display(),
            self.fstype,
            self.pass
        )
    }
}

/// Boot-time fsck ordering: the ext family gets checked, everything else is
/// left alone.
pub fn fsck_pass(fstype: &str) -> u8 {
    match fstype {
        "ext2" | "ext3" | "ext4" => 2,
        _ => 0,
    }
}

/// First table line already claiming the UUID or the mount path, if any.
/// Comments and blank lines are skipped.
pub fn find_conflict<'a>(table: &'a str, uuid: &str, mount_path: &Path) -> Option<&'a str> {
    let uuid_field = format!("UUID={}", uuid);
    let path_field = mount_path.to_string_lossy();

    table.lines().find(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return false;
        }
        let mut fields = line.split_whitespace();
        let device = fields.next();
        let target = fields.next();
        device == Some(uuid_field.as_str()) || target == Some(path_field.as_ref())
    })
}

/// Append the fstab entry and validate the whole table, unless the UUID is
/// unresolvable or an entry already exists; both of those are warnings, not
/// failures, and the disk stays mounted either way.
pub fn persistence_stage(
    system: &dyn System,
    request: &MountRequest,
) -> Result<(), ProvisionError> {
    let Some(uuid) = system.probe_uuid(&request.device_path)? else {
        eprintln!(
            "{}",
            format!(
                "Warning: no filesystem UUID for {}; mount will not survive a reboot",
                request.device_path
            )
            .yellow()
        );
        return Ok(());
    };

    let entry = PersistentMountEntry {
        pass: fsck_pass(&request.fstype),
        uuid,
        mount_path: request.mount_path.clone(),
        fstype: request.fstype.clone(),
    };

    let table = system.read_mount_table()?;
    if let Some(line) = find_conflict(&table, &entry.uuid, &entry.mount_path) {
        eprintln!(
            "{}\n  {}",
            "Warning: fstab already has an entry for this disk or path, leaving it untouched:"
                .yellow(),
            line
        );
        return Ok(());
    }

    system.append_mount_entry(&entry.to_string())?;
    println!("Added fstab entry: {}", entry);

    println!("Validating fstab (mount -a)...");
    system
        .validate_mount_table()
        .map_err(|e| ProvisionError::PersistenceValidation {
            output: e.to_string(),
        })?;

    Ok(())
}
