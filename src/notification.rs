//! Desktop notifications
//!
//! Presents switch reports to the user via notify-rust, gated by the
//! notification settings.

use color_eyre::eyre::{Context, Result};
use notify_rust::Notification;
use tracing::warn;

use crate::config::Settings;
use crate::switcher::SwitchReport;

const APP_NAME: &str = "DASW";

/// Send a desktop notification
///
/// # Errors
/// Returns an error if the notification cannot be delivered.
pub fn send_notification(summary: &str, body: &str) -> Result<()> {
    Notification::new()
        .summary(summary)
        .body(body)
        .appname(APP_NAME)
        .timeout(3000)
        .show()
        .context("Failed to show notification")?;

    Ok(())
}

/// Summary and body for a report, if the settings ask for one
#[must_use]
pub fn report_notification(
    report: &SwitchReport,
    settings: &Settings,
) -> Option<(&'static str, String)> {
    match report {
        SwitchReport::Applied { device_name } if settings.notify_switch => {
            Some(("Audio Output", device_name.clone()))
        }
        SwitchReport::Failed(e) if settings.notify_errors => {
            Some(("Audio Output Switch Failed", e.to_string()))
        }
        _ => None,
    }
}

/// Notify about a report; delivery failures are logged, not returned
pub fn notify_report(report: &SwitchReport, settings: &Settings) {
    if let Some((summary, body)) = report_notification(report, settings)
        && let Err(e) = send_notification(summary, &body)
    {
        warn!("Notification failed: {:#}", e);
    }
}

/// Summary and body for a daemon start or stop, if enabled
#[must_use]
pub fn daemon_notification(
    settings: &Settings,
    running: bool,
) -> Option<(&'static str, &'static str)> {
    if !settings.notify_daemon {
        return None;
    }
    Some(if running {
        ("DASW Started", "Watching display changes")
    } else {
        ("DASW Stopped", "No longer watching displays")
    })
}

/// Notify about the daemon starting or stopping; failures are logged
pub fn notify_daemon_state(settings: &Settings, running: bool) {
    if let Some((summary, body)) = daemon_notification(settings, running)
        && let Err(e) = send_notification(summary, body)
    {
        warn!("Could not send {} notification: {:#}", summary, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioDevice, AudioError, DeviceId};
    use crate::switcher::SkipReason;

    #[test]
    fn test_applied_notifies_when_enabled() {
        let settings = Settings::default();
        let report = SwitchReport::Applied {
            device_name: "Proxy Audio Device".to_string(),
        };
        let (summary, body) = report_notification(&report, &settings).unwrap();
        assert_eq!(summary, "Audio Output");
        assert_eq!(body, "Proxy Audio Device");
    }

    #[test]
    fn test_applied_silent_when_disabled() {
        let settings = Settings {
            notify_switch: false,
            ..Settings::default()
        };
        let report = SwitchReport::Applied {
            device_name: "MacBook Speakers".to_string(),
        };
        assert!(report_notification(&report, &settings).is_none());
    }

    #[test]
    fn test_failure_notifies_with_error_text() {
        let report = SwitchReport::Failed(AudioError::SetFailed {
            id: DeviceId(2),
            status: -1,
        });
        let (summary, body) = report_notification(&report, &Settings::default()).unwrap();
        assert_eq!(summary, "Audio Output Switch Failed");
        assert!(body.contains("OSStatus -1"));
    }

    #[test]
    fn test_failure_silent_when_disabled() {
        let settings = Settings {
            notify_errors: false,
            ..Settings::default()
        };
        let report = SwitchReport::Failed(AudioError::Unsupported);
        assert!(report_notification(&report, &settings).is_none());
    }

    #[test]
    fn test_skips_never_notify() {
        let report = SwitchReport::Skipped(SkipReason::AlreadyDefault {
            device: AudioDevice::new(1, "MacBook Speakers", true),
        });
        assert!(report_notification(&report, &Settings::default()).is_none());
    }

    #[test]
    fn test_daemon_notifications_follow_setting() {
        let quiet = Settings::default();
        assert!(daemon_notification(&quiet, true).is_none());
        assert!(daemon_notification(&quiet, false).is_none());

        let chatty = Settings {
            notify_daemon: true,
            ..Settings::default()
        };
        assert_eq!(
            daemon_notification(&chatty, true),
            Some(("DASW Started", "Watching display changes"))
        );
        assert_eq!(
            daemon_notification(&chatty, false),
            Some(("DASW Stopped", "No longer watching displays"))
        );
    }
}
