//! Mount stage: conflict checks, target takeover, the mount call itself.

use crate::error::ProvisionError;
use crate::prompt::Prompter;
use crate::provision::MountRequest;
use crate::system::System;
use anyhow::Context;
use colored::*;
use std::path::PathBuf;

/// Ask for the mount path, offering to create a missing directory. Declining
/// the creation cancels the run.
pub fn ask_mount_path(prompter: &mut dyn Prompter) -> Result<PathBuf, ProvisionError> {
    let answer = prompter.read_line("Mount path (e.g. /mnt/data):")?;
    if answer.is_empty() {
        return Err(ProvisionError::UserCancelled(
            "no mount path given".to_string(),
        ));
    }
    let path = PathBuf::from(answer);

    if !path.is_dir() {
        let create = prompter.confirm(&format!("{} does not exist. Create it?", path.display()))?;
        if !create {
            return Err(ProvisionError::UserCancelled(format!(
                "{} not created",
                path.display()
            )));
        }
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }

    Ok(path)
}

/// Attach the prepared filesystem at the requested path.
///
/// A disk that is itself mounted somewhere is never touched; a busy target
/// path is taken over by unmounting whatever currently serves it.
pub fn mount_stage(system: &dyn System, request: &MountRequest) -> Result<(), ProvisionError> {
    let tree = system.device_tree(&request.device_path)?;
    if let Some(mountpoint) = tree.mountpoint {
        return Err(ProvisionError::MountConflict {
            device: request.device_path.clone(),
            mountpoint,
        });
    }

    if let Some(source) = system.mounted_source(&request.mount_path)? {
        println!(
            "{}",
            format!(
                "Unmounting {} from {} first",
                source,
                request.mount_path.display()
            )
            .yellow()
        );
        system
            .unmount(&request.mount_path)
            .map_err(|e| ProvisionError::UnmountFailure {
                path: request.mount_path.clone(),
                reason: e.to_string(),
            })?;
    }

    println!(
        "Mounting {} at {}...",
        request.device_path,
        request.mount_path.display()
    );
    system
        .mount(&request.fstype, &request.device_path, &request.mount_path)
        .map_err(|e| ProvisionError::MountFailure {
            device: request.device_path.clone(),
            path: request.mount_path.clone(),
            reason: e.to_string(),
        })?;

    Ok(())
}
