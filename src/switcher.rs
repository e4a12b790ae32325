//! Policy application
//!
//! Picks the device for a target class, short-circuits when it is already the
//! default, and otherwise commits the change through the registry.

use std::fmt;
use tracing::{debug, info};

use crate::audio::{AudioDevice, AudioDeviceRegistry, AudioError};
use crate::policy::{DEFAULT_PROXY_DEVICE_NAME, OutputDeviceType};

/// Why no change was committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No enumerated device belongs to the target class
    NoMatchingDevice { target: OutputDeviceType },
    /// The selected device is already the system default
    AlreadyDefault { device: AudioDevice },
}

/// Successful result of [`Switcher::apply_policy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Applied(AudioDevice),
    Skipped(SkipReason),
}

/// What gets reported outward after each switch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchReport {
    Applied { device_name: String },
    Skipped(SkipReason),
    Failed(AudioError),
}

impl From<Result<SwitchOutcome, AudioError>> for SwitchReport {
    fn from(result: Result<SwitchOutcome, AudioError>) -> Self {
        match result {
            Ok(SwitchOutcome::Applied(device)) => Self::Applied {
                device_name: device.name,
            },
            Ok(SwitchOutcome::Skipped(reason)) => Self::Skipped(reason),
            Err(e) => Self::Failed(e),
        }
    }
}

impl fmt::Display for SwitchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied { device_name } => write!(f, "Audio device set to {device_name}"),
            Self::Skipped(SkipReason::NoMatchingDevice { target }) => {
                write!(f, "No {target} output device found")
            }
            Self::Skipped(SkipReason::AlreadyDefault { device }) => {
                write!(f, "{} is already the default output", device.name)
            }
            Self::Failed(e) => write!(f, "Switch failed: {e}"),
        }
    }
}

/// Applies a target class against an audio registry
#[derive(Debug, Clone)]
pub struct Switcher {
    proxy_name: String,
}

impl Default for Switcher {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_DEVICE_NAME)
    }
}

impl Switcher {
    /// Create a switcher that recognises the proxy device by `proxy_name`
    #[must_use]
    pub fn new(proxy_name: impl Into<String>) -> Self {
        Self {
            proxy_name: proxy_name.into(),
        }
    }

    #[must_use]
    pub fn proxy_name(&self) -> &str {
        &self.proxy_name
    }

    /// First device in enumeration order belonging to `target`
    ///
    /// Ties are broken by enumeration order only.
    #[must_use]
    pub fn select_device(
        &self,
        devices: Vec<AudioDevice>,
        target: OutputDeviceType,
    ) -> Option<AudioDevice> {
        devices
            .into_iter()
            .find(|d| target.matches(d, &self.proxy_name))
    }

    /// Make a device of class `target` the system default output
    ///
    /// Returns [`SwitchOutcome::Skipped`] without touching the platform when no
    /// device matches or the match is already the default.
    ///
    /// # Errors
    /// Returns the registry's [`AudioError`] if committing the change fails.
    pub fn apply_policy<R: AudioDeviceRegistry + ?Sized>(
        &self,
        registry: &R,
        target: OutputDeviceType,
    ) -> Result<SwitchOutcome, AudioError> {
        let Some(device) = self.select_device(registry.list_output_devices(), target) else {
            debug!("No {} output device present, nothing to do", target);
            return Ok(SwitchOutcome::Skipped(SkipReason::NoMatchingDevice { target }));
        };

        if device.id == registry.default_output_device_id() {
            debug!("{} ({}) is already the default output", device.name, device.id);
            return Ok(SwitchOutcome::Skipped(SkipReason::AlreadyDefault { device }));
        }

        info!("Switching default output: {} ({})", device.name, device.id);
        registry.set_default_output_device(device.id)?;
        Ok(SwitchOutcome::Applied(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::DeviceId;
    use crate::test_utils::FakeAudioRegistry;
    use pretty_assertions::assert_eq;

    fn speakers() -> AudioDevice {
        AudioDevice::new(1, "MacBook Speakers", true)
    }

    fn proxy() -> AudioDevice {
        AudioDevice::new(2, "Proxy Audio Device", false)
    }

    #[test]
    fn test_already_default_is_skipped() {
        let registry = FakeAudioRegistry::new(vec![speakers()], DeviceId(1));
        let outcome = Switcher::default()
            .apply_policy(&registry, OutputDeviceType::BuiltIn)
            .unwrap();

        assert_eq!(
            outcome,
            SwitchOutcome::Skipped(SkipReason::AlreadyDefault { device: speakers() })
        );
        assert!(registry.set_calls().is_empty());
    }

    #[test]
    fn test_proxy_is_selected_and_set() {
        let registry = FakeAudioRegistry::new(vec![speakers(), proxy()], DeviceId(1));
        let outcome = Switcher::default()
            .apply_policy(&registry, OutputDeviceType::Proxy)
            .unwrap();

        assert_eq!(outcome, SwitchOutcome::Applied(proxy()));
        assert_eq!(registry.set_calls(), vec![DeviceId(2)]);
        assert_eq!(registry.current_default(), DeviceId(2));
    }

    #[test]
    fn test_missing_proxy_is_skipped_without_mutation() {
        let registry = FakeAudioRegistry::new(vec![speakers()], DeviceId(1));
        let outcome = Switcher::default()
            .apply_policy(&registry, OutputDeviceType::Proxy)
            .unwrap();

        assert_eq!(
            outcome,
            SwitchOutcome::Skipped(SkipReason::NoMatchingDevice {
                target: OutputDeviceType::Proxy
            })
        );
        assert!(registry.set_calls().is_empty());
    }

    #[test]
    fn test_second_application_is_skipped() {
        let registry = FakeAudioRegistry::new(vec![speakers(), proxy()], DeviceId(1));
        let switcher = Switcher::default();

        let first = switcher.apply_policy(&registry, OutputDeviceType::Proxy).unwrap();
        let second = switcher.apply_policy(&registry, OutputDeviceType::Proxy).unwrap();

        assert!(matches!(first, SwitchOutcome::Applied(_)));
        assert!(matches!(
            second,
            SwitchOutcome::Skipped(SkipReason::AlreadyDefault { .. })
        ));
        assert_eq!(registry.set_calls().len(), 1);
    }

    #[test]
    fn test_first_built_in_wins() {
        let registry = FakeAudioRegistry::new(
            vec![
                AudioDevice::new(7, "External Headphones", true),
                AudioDevice::new(8, "MacBook Speakers", true),
            ],
            DeviceId(42),
        );
        let outcome = Switcher::default()
            .apply_policy(&registry, OutputDeviceType::BuiltIn)
            .unwrap();

        assert_eq!(
            outcome,
            SwitchOutcome::Applied(AudioDevice::new(7, "External Headphones", true))
        );
    }

    #[test]
    fn test_set_failure_propagates() {
        let registry = FakeAudioRegistry::new(vec![speakers(), proxy()], DeviceId(1));
        registry.reject_sets(-50);

        let err = Switcher::default()
            .apply_policy(&registry, OutputDeviceType::Proxy)
            .unwrap_err();

        assert_eq!(
            err,
            AudioError::SetFailed {
                id: DeviceId(2),
                status: -50
            }
        );
        assert_eq!(registry.current_default(), DeviceId(1));
    }

    #[test]
    fn test_unknown_default_still_sets() {
        let registry = FakeAudioRegistry::new(vec![speakers()], DeviceId::UNKNOWN);
        let outcome = Switcher::default()
            .apply_policy(&registry, OutputDeviceType::BuiltIn)
            .unwrap();
        assert_eq!(outcome, SwitchOutcome::Applied(speakers()));
    }

    #[test]
    fn test_custom_proxy_name() {
        let bridge = AudioDevice::new(5, "HDMI Bridge", false);
        let registry =
            FakeAudioRegistry::new(vec![speakers(), proxy(), bridge.clone()], DeviceId(1));
        let outcome = Switcher::new("HDMI Bridge")
            .apply_policy(&registry, OutputDeviceType::Proxy)
            .unwrap();
        assert_eq!(outcome, SwitchOutcome::Applied(bridge));
    }

    #[test]
    fn test_report_from_result() {
        let applied: SwitchReport = Ok(SwitchOutcome::Applied(proxy())).into();
        assert_eq!(
            applied,
            SwitchReport::Applied {
                device_name: "Proxy Audio Device".to_string()
            }
        );
        assert_eq!(applied.to_string(), "Audio device set to Proxy Audio Device");

        let failed: SwitchReport = Err(AudioError::Unsupported).into();
        assert!(matches!(failed, SwitchReport::Failed(AudioError::Unsupported)));
    }
}
