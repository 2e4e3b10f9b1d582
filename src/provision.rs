//! The linear provisioning procedure: classify, prepare, mount, persist.

use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::system::System;
use crate::{classify, fstab, mount, prepare};
use colored::*;
use std::path::PathBuf;

/// Everything the mount and persistence stages need, built up across the
/// interactive stages and passed along explicitly.
pub struct MountRequest {
    pub device_path: String,
    pub mount_path: PathBuf,
    pub fstype: String,
    pub formatted: bool,
}

/// One full run. Every stage either succeeds or aborts the whole procedure;
/// there is no rollback and no retry.
pub fn run(system: &dyn System, prompter: &mut dyn Prompter) -> Result<(), ProvisionError> {
    let candidates = classify::classify_disks(system)?;
    let disk = classify::select_disk(candidates, prompter)?;

    let prepared = prepare::prepare_filesystem(system, prompter, &disk)?;
    let mount_path = mount::ask_mount_path(prompter)?;

    let request = MountRequest {
        device_path: disk.path(),
        mount_path,
        fstype: prepared.fstype,
        formatted: prepared.formatted,
    };

    mount::mount_stage(system, &request)?;
    fstab::persistence_stage(system, &request)?;

    println!(
        "{}",
        format!(
            "Done: {} ({}{}) mounted at {}",
            request.device_path,
            request.fstype,
            if request.formatted {
                ", freshly formatted"
            } else {
                ", existing filesystem"
            },
            request.mount_path.display()
        )
        .green()
        .bold()
    );
    Ok(())
}
