//! Audio output devices
//!
//! Enumerates output-capable audio devices and reads/writes the system
//! default output device. The [`AudioDeviceRegistry`] trait is the seam
//! between switching logic and the platform: the system implementation talks
//! to the CoreAudio HAL on macOS, tests use the in-memory fake from
//! [`crate::test_utils`].

#[cfg(target_os = "macos")]
mod coreaudio;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[cfg(target_os = "macos")]
pub use coreaudio::CoreAudioRegistry as SystemAudioRegistry;

#[cfg(not(target_os = "macos"))]
pub use unsupported::UnsupportedRegistry as SystemAudioRegistry;

/// Platform-assigned audio object identifier
///
/// Stable for as long as the device stays connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl DeviceId {
    /// `kAudioObjectUnknown` - never assigned to a real device
    pub const UNKNOWN: Self = Self(0);
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One enumerated output-capable audio endpoint
///
/// Built fresh on every enumeration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioDevice {
    pub id: DeviceId,
    pub name: String,
    /// Transport type reports a built-in connection
    pub is_built_in: bool,
}

impl AudioDevice {
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, is_built_in: bool) -> Self {
        Self {
            id: DeviceId(id),
            name: name.into(),
            is_built_in,
        }
    }
}

/// Failure to change audio routing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// The platform refused or could not complete a default-device change
    #[error("failed to set default output device {id} (OSStatus {status})")]
    SetFailed { id: DeviceId, status: i32 },

    /// No audio backend on this platform
    #[error("changing the default output device is not supported on this platform")]
    Unsupported,
}

/// Access to the system's output devices and default output setting
pub trait AudioDeviceRegistry {
    /// Enumerate devices with at least one output stream, in platform order
    fn list_output_devices(&self) -> Vec<AudioDevice>;

    /// Current default output device, or [`DeviceId::UNKNOWN`] if it cannot be read
    fn default_output_device_id(&self) -> DeviceId;

    /// Make `id` the system default output device
    ///
    /// # Errors
    /// Returns [`AudioError::SetFailed`] when the platform rejects the change.
    fn set_default_output_device(&self, id: DeviceId) -> Result<(), AudioError>;
}

impl<R: AudioDeviceRegistry + ?Sized> AudioDeviceRegistry for &R {
    fn list_output_devices(&self) -> Vec<AudioDevice> {
        (**self).list_output_devices()
    }

    fn default_output_device_id(&self) -> DeviceId {
        (**self).default_output_device_id()
    }

    fn set_default_output_device(&self, id: DeviceId) -> Result<(), AudioError> {
        (**self).set_default_output_device(id)
    }
}

#[cfg(not(target_os = "macos"))]
mod unsupported {
    use super::{AudioDevice, AudioDeviceRegistry, AudioError, DeviceId};
    use tracing::debug;

    /// Registry for platforms without a CoreAudio backend
    ///
    /// Reports no devices, so every policy application is skipped.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UnsupportedRegistry;

    impl AudioDeviceRegistry for UnsupportedRegistry {
        fn list_output_devices(&self) -> Vec<AudioDevice> {
            debug!("Audio device enumeration is not available on this platform");
            Vec::new()
        }

        fn default_output_device_id(&self) -> DeviceId {
            DeviceId::UNKNOWN
        }

        fn set_default_output_device(&self, _id: DeviceId) -> Result<(), AudioError> {
            Err(AudioError::Unsupported)
        }
    }
}
