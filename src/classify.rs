//! Disk eligibility classification and the selection menu.
//!
//! A disk is only offered for provisioning when nothing on it could still be
//! in use: no descendant partition, crypt, or LVM volume may carry a
//! filesystem signature or an active mount. Ineligible disks are listed with
//! the reason but cannot be selected, so a system disk can never be picked by
//! a typo.

use crate::device::{BlockDevice, DeviceType};
use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::system::System;
use colored::*;

pub struct DiskCandidate {
    pub device: BlockDevice,
    pub ineligible_reason: Option<String>,
}

impl DiskCandidate {
    pub fn eligible(&self) -> bool {
        self.ineligible_reason.is_none()
    }
}

/// Why a disk cannot be provisioned, or None if it can.
pub fn ineligible_reason(disk: &BlockDevice) -> Option<String> {
    for descendant in disk.descendants() {
        if !matches!(
            descendant.kind,
            DeviceType::Part | DeviceType::Crypt | DeviceType::Lvm
        ) {
            continue;
        }
        if let Some(mountpoint) = &descendant.mountpoint {
            return Some(format!("{} is mounted at {}", descendant.name, mountpoint));
        }
        if let Some(fstype) = &descendant.fstype {
            return Some(format!("{} carries a {} filesystem", descendant.name, fstype));
        }
    }
    None
}

/// Classify every physical disk on the host, in enumeration order.
pub fn classify_disks(system: &dyn System) -> Result<Vec<DiskCandidate>, ProvisionError> {
    let mut candidates = Vec::new();
    for device in system.list_devices()? {
        if device.kind != DeviceType::Disk {
            continue;
        }
        // -d listing has no children; fetch the full tree per disk
        let tree = system.device_tree(&device.path())?;
        candidates.push(DiskCandidate {
            ineligible_reason: ineligible_reason(&tree),
            device: tree,
        });
    }
    Ok(candidates)
}

/// Present the menu and return the chosen disk. Eligible disks are indexed
/// densely from 1; any input that is not a listed index or `q` is fatal.
pub fn select_disk(
    candidates: Vec<DiskCandidate>,
    prompter: &mut dyn Prompter,
) -> Result<BlockDevice, ProvisionError> {
    let mut eligible: Vec<BlockDevice> = Vec::new();

    println!("{}", "Available disks:".bold());
    for candidate in candidates {
        match &candidate.ineligible_reason {
            None => {
                println!(
                    "  {}) {} ({})",
                    (eligible.len() + 1).to_string().green(),
                    candidate.device.path(),
                    candidate.device.size_label()
                );
                eligible.push(candidate.device);
            }
            Some(reason) => {
                println!(
                    "     {} ({})  {}",
                    candidate.device.path(),
                    candidate.device.size_label(),
                    format!("in use: {}", reason).yellow()
                );
            }
        }
    }

    if eligible.is_empty() {
        return Err(ProvisionError::NoEligibleDisk);
    }

    let answer = prompter.read_line("Select a disk to provision (q to cancel):")?;
    if answer == "q" {
        return Err(ProvisionError::UserCancelled(
            "no disk selected".to_string(),
        ));
    }

    let index: usize = answer
        .parse()
        .map_err(|_| ProvisionError::InvalidSelection(answer.clone()))?;
    if index == 0 || index > eligible.len() {
        return Err(ProvisionError::InvalidSelection(answer));
    }

    Ok(eligible.swap_remove(index - 1))
}
