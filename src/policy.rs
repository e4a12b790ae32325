//! Output routing policy
//!
//! Maps display presence to the class of audio device that should be the
//! system default. Only two classes exist: the built-in output and the
//! single named proxy device.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

use crate::audio::AudioDevice;

/// Name of the proxy output device when none is configured
pub const DEFAULT_PROXY_DEVICE_NAME: &str = "Proxy Audio Device";

/// Target class for the default output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDeviceType {
    /// Internal speakers/headphone jack
    #[value(name = "built-in")]
    BuiltIn,
    /// The named proxy device, routed to the external display
    Proxy,
}

impl OutputDeviceType {
    /// Whether `device` belongs to this class
    #[must_use]
    pub fn matches(self, device: &AudioDevice, proxy_name: &str) -> bool {
        match self {
            Self::BuiltIn => device.is_built_in,
            Self::Proxy => device.name == proxy_name,
        }
    }

    /// Classify a device, `None` if it is neither built-in nor the proxy
    #[must_use]
    pub fn classify(device: &AudioDevice, proxy_name: &str) -> Option<Self> {
        [Self::BuiltIn, Self::Proxy]
            .into_iter()
            .find(|class| class.matches(device, proxy_name))
    }
}

impl fmt::Display for OutputDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn => f.write_str("built-in"),
            Self::Proxy => f.write_str("proxy"),
        }
    }
}

/// Decide the target class for the current display presence
#[must_use]
pub fn select_target_class(display_present: bool) -> OutputDeviceType {
    if display_present {
        OutputDeviceType::Proxy
    } else {
        OutputDeviceType::BuiltIn
    }
}
