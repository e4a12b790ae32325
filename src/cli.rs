//! Command-line interface definitions
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Parser, Subcommand};

use crate::policy::OutputDeviceType;

/// DASW - Display Audio Switcher
///
/// Switch the default audio output when an external display is connected.
#[derive(Parser)]
#[command(name = "dasw")]
#[command(version)]
#[command(about = "Route audio to the proxy device while an external display is connected")]
#[command(after_help = "\
BEHAVIOR:
  - External display connected  → default output becomes the proxy device
  - No external display         → default output becomes the built-in output
  - The daemon acts once at startup, then only when display presence changes
  - Missing devices are skipped silently; nothing is switched if already default

DAEMON:
  dasw daemon              Watch display changes (logs to stderr)
  dasw daemon --log-file   Log to a rotating file instead (for launchd)

QUERY COMMANDS:
  dasw status              Display presence, policy target, current output (or just: dasw)
  dasw list-devices        Output devices and their class
  dasw list-displays       Active displays
  dasw validate            Validate config file

ACTION COMMANDS:
  dasw apply               Probe displays once and apply the policy
  dasw switch CLASS        Switch to built-in or proxy, ignoring displays

CONFIG:
  $DASW_CONFIG, or config.toml under the user config directory (dasw/).
  The file is optional; every setting has a default.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the display watcher and switch audio on changes
    Daemon {
        /// Log to a rotating file instead of stderr
        #[arg(long)]
        log_file: bool,
    },

    /// Show display presence, policy target and current output
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List output-capable audio devices
    ListDevices {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List active displays
    ListDisplays {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Probe displays once and apply the routing policy
    Apply {
        /// Show what would be selected without switching
        #[arg(long)]
        dry_run: bool,
    },

    /// Switch to a device class directly
    Switch {
        /// Device class to make the default output
        #[arg(value_enum)]
        target: OutputDeviceType,
    },

    /// Validate config file
    Validate,
}
