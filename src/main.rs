mod classify;
mod device;
mod error;
mod fstab;
mod mount;
mod prepare;
mod prompt;
mod provision;
mod system;

use clap::Parser;
use colored::*;
use error::ProvisionError;
use prompt::TerminalPrompter;
use system::HostSystem;

/// Provision an unused disk: pick it, optionally format it, mount it, and
/// persist the mount in /etc/fstab.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {}

fn main() {
    let _cli = Cli::parse();

    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), ProvisionError> {
    // Everything here touches raw disks; refuse to start without root.
    if !matches!(sudo::check(), sudo::RunningAs::Root) {
        return Err(ProvisionError::Privilege);
    }
    HostSystem::check_utilities()?;

    let system = HostSystem::new();
    let mut prompter = TerminalPrompter;
    provision::run(&system, &mut prompter)
}
