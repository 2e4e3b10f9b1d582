use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of the provisioning run. Every variant aborts the whole
/// procedure with exit code 1; there are no retries.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("This tool must be run as root (try sudo)")]
    Privilege,

    #[error("No eligible disks found: every disk carries partitions, filesystem signatures, or active mounts")]
    NoEligibleDisk,

    #[error("Invalid selection '{0}': enter one of the listed numbers")]
    InvalidSelection(String),

    #[error("{device} has partitions but no whole-disk filesystem; refusing to guess, handle it manually")]
    AmbiguousLayout { device: String },

    #[error("Cancelled: {0}")]
    UserCancelled(String),

    #[error("Formatting {device} as {fstype} failed: {reason}")]
    FormatFailure {
        device: String,
        fstype: String,
        reason: String,
    },

    #[error("{device} is already mounted at {mountpoint}; unmount it before provisioning")]
    MountConflict { device: String, mountpoint: String },

    #[error("Mounting {device} at {path} failed: {reason}")]
    MountFailure {
        device: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Unmounting {path} failed: {reason}")]
    UnmountFailure { path: PathBuf, reason: String },

    #[error("fstab validation (mount -a) failed:\n{output}")]
    PersistenceValidation { output: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
