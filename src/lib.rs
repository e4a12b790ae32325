//! `DASW` - Display Audio Switcher
//!
//! Watches external-display connectivity on macOS and switches the system
//! default audio output accordingly:
//! - external display present → the named proxy device ("Proxy Audio Device")
//! - no external display → the built-in output
//!
//! The switch is idempotent: a device that is already the default is left
//! alone, and repeated notifications with an unchanged display state are
//! ignored.
//!
//! # Platform seams
//! - [`display::DisplayProbe`] - active display list (Quartz display services)
//! - [`audio::AudioDeviceRegistry`] - output devices and the default output (CoreAudio HAL)
//!
//! [`test_utils`] provides in-memory fakes for both.

pub mod audio;
pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod display;
pub mod logging;
pub mod notification;
pub mod policy;
pub mod state;
pub mod style;
pub mod switcher;
pub mod test_utils;

/// Build-time information generated by `built`
#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Re-export commonly used types for convenience
pub use cli::Args;
pub use config::Config;
pub use policy::{OutputDeviceType, select_target_class};
pub use state::{DisplayState, Monitor};
pub use switcher::{SwitchOutcome, SwitchReport, Switcher};
