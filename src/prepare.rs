//! Filesystem preparation: decide between adopting an existing filesystem,
//! refusing an ambiguous layout, and formatting a blank disk.

use crate::device::BlockDevice;
use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::system::System;
use colored::*;

/// The only filesystems the formatter may be asked to create. An adopted
/// filesystem can be anything blkid reports.
pub const FORMAT_CHOICES: &[&str] = &["ext4", "xfs", "btrfs", "f2fs", "vfat", "ntfs"];

const CONFIRM_TOKEN: &str = "yes";

#[derive(Debug)]
pub struct PreparedFilesystem {
    pub fstype: String,
    pub formatted: bool,
}

/// Decide how the selected disk becomes mountable.
///
/// An existing whole-disk filesystem is always kept as-is, even if it is not
/// what the operator expected: destroying data takes an explicit format of a
/// blank disk. Partitioned disks without a whole-disk signature are rejected
/// outright rather than guessed at.
pub fn prepare_filesystem(
    system: &dyn System,
    prompter: &mut dyn Prompter,
    disk: &BlockDevice,
) -> Result<PreparedFilesystem, ProvisionError> {
    let device = disk.path();

    if let Some(fstype) = system.probe_fstype(&device)? {
        println!(
            "{} already carries a {} filesystem, keeping it",
            device,
            fstype.green()
        );
        return Ok(PreparedFilesystem {
            fstype,
            formatted: false,
        });
    }

    if !disk.descendants().is_empty() {
        return Err(ProvisionError::AmbiguousLayout { device });
    }

    println!("{} is blank. Available filesystems:", device);
    for (index, fstype) in FORMAT_CHOICES.iter().enumerate() {
        println!("  {}) {}", index + 1, fstype);
    }

    let answer = prompter.read_line("Filesystem to create:")?;
    let fstype = match answer.parse::<usize>() {
        Ok(index) if index >= 1 && index <= FORMAT_CHOICES.len() => FORMAT_CHOICES[index - 1],
        Ok(_) => return Err(ProvisionError::InvalidSelection(answer)),
        Err(_) => FORMAT_CHOICES
            .iter()
            .copied()
            .find(|choice| *choice == answer)
            .ok_or(ProvisionError::InvalidSelection(answer))?,
    };

    let confirmation = prompter.read_line(&format!(
        "{} Type '{}' to format {} as {}:",
        "All data on the disk will be lost.".red().bold(),
        CONFIRM_TOKEN,
        device,
        fstype
    ))?;
    if confirmation != CONFIRM_TOKEN {
        return Err(ProvisionError::UserCancelled(format!(
            "{} not formatted",
            device
        )));
    }

    println!("Formatting {} as {}...", device, fstype);
    system
        .format(fstype, &device)
        .map_err(|e| ProvisionError::FormatFailure {
            device: device.clone(),
            fstype: fstype.to_string(),
            reason: e.to_string(),
        })?;

    Ok(PreparedFilesystem {
        fstype: fstype.to_string(),
        formatted: true,
    })
}
