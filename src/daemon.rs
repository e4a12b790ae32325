//! Daemon mode
//!
//! Watches display reconfigurations and re-applies the audio routing policy
//! whenever external display presence changes.

use color_eyre::eyre::{self, Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioDeviceRegistry, SystemAudioRegistry};
use crate::config::{Config, Settings};
use crate::display::{self, DisplayEvents, DisplayProbe, SystemDisplayProbe};
use crate::logging;
use crate::notification::{notify_daemon_state, notify_report};
use crate::state::Monitor;
use crate::switcher::{SwitchReport, Switcher};

/// Run the daemon with the given configuration
///
/// Blocks the calling thread, which must be the main thread: it services
/// display callbacks while the event loop runs on a worker thread with its
/// own tokio runtime.
///
/// # Errors
/// Returns an error if logging or the display watcher cannot be set up, or
/// the watcher stops unexpectedly.
pub fn run(config: Config, log_file: bool) -> Result<()> {
    let settings = config.settings;
    let _log_guard = logging::init_daemon_logging(&settings.log_level, log_file)?;

    info!("Starting DASW daemon");
    info!(
        "Proxy device: {:?}, display bound: {}",
        settings.proxy_device, settings.max_displays
    );

    // Subscribed before the worker starts, so the startup probe misses nothing
    display::run_with_display_events(move |mut events| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        runtime.block_on(serve(&settings, &mut events))
    })
}

async fn serve(settings: &Settings, events: &mut DisplayEvents) -> Result<()> {
    let mut monitor = Monitor::new(
        SystemDisplayProbe::new(settings.max_displays),
        SystemAudioRegistry::default(),
        Switcher::new(settings.proxy_device.clone()),
    );

    notify_daemon_state(settings, true);

    startup(&mut monitor, settings);
    let result = run_event_loop(&mut monitor, events, settings, shutdown_signal()).await;

    notify_daemon_state(settings, false);

    result
}

/// Startup observation
///
/// Goes through the state machine like any other event, so with nothing
/// known yet it always acts.
pub fn startup<P, R>(monitor: &mut Monitor<P, R>, settings: &Settings)
where
    P: DisplayProbe,
    R: AudioDeviceRegistry,
{
    if settings.apply_on_startup {
        if let Some(report) = monitor.handle_display_change_event() {
            report_outcome(&report, settings);
        }
    } else {
        let present = monitor.record_current();
        info!(
            "Startup apply disabled; external display {}",
            if present { "connected" } else { "absent" }
        );
    }
}

/// Main event loop
///
/// Each display event is followed by a settle window in which further queued
/// events are absorbed, then the state machine runs once.
///
/// # Errors
/// Returns an error if the display event channel closes.
pub async fn run_event_loop<P, R, F>(
    monitor: &mut Monitor<P, R>,
    events: &mut DisplayEvents,
    settings: &Settings,
    shutdown: F,
) -> Result<()>
where
    P: DisplayProbe,
    R: AudioDeviceRegistry,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!("Monitoring display changes...");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    error!("Display watcher stopped (event channel closed)");
                    eyre::bail!("Display watcher stopped unexpectedly");
                };
                debug!("Display event: {:?}", event);

                let absorbed = settle(events, settings.settle_ms).await;
                if absorbed > 0 {
                    debug!("Coalesced {} additional display events", absorbed);
                }

                match monitor.handle_display_change_event() {
                    Some(report) => report_outcome(&report, settings),
                    None => debug!("External display presence unchanged"),
                }
            }

            () = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Wait out the settle window and drain queued events, returning how many
async fn settle(events: &mut DisplayEvents, settle_ms: u64) -> usize {
    if settle_ms > 0 {
        tokio::time::sleep(Duration::from_millis(settle_ms)).await;
    }

    let mut absorbed = 0;
    loop {
        match events.try_recv() {
            Ok(_) => absorbed += 1,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
        }
    }
    absorbed
}

/// Log a report and notify if configured
fn report_outcome(report: &SwitchReport, settings: &Settings) {
    match report {
        SwitchReport::Applied { .. } => info!("{}", report),
        SwitchReport::Skipped(_) => debug!("{}", report),
        SwitchReport::Failed(_) => error!("{}", report),
    }
    notify_report(report, settings);
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                let _ = signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioDevice, DeviceId};
    use crate::display::DisplayEvent;
    use crate::test_utils::{FakeAudioRegistry, FakeDisplayProbe};
    use tokio::sync::mpsc;

    fn quiet_settings() -> Settings {
        Settings {
            settle_ms: 0,
            notify_switch: false,
            notify_errors: false,
            notify_daemon: false,
            ..Settings::default()
        }
    }

    fn registry() -> FakeAudioRegistry {
        FakeAudioRegistry::new(
            vec![
                AudioDevice::new(1, "MacBook Speakers", true),
                AudioDevice::new(2, "Proxy Audio Device", false),
            ],
            DeviceId(1),
        )
    }

    fn reconfigured(display: u32) -> DisplayEvent {
        DisplayEvent::Reconfigured { display, flags: 0 }
    }

    #[tokio::test]
    async fn test_burst_is_coalesced_into_one_probe() {
        let probe = FakeDisplayProbe::with_external(true);
        let registry = registry();
        let mut monitor = Monitor::new(&probe, &registry, Switcher::default());
        let settings = quiet_settings();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for display in [1, 2, 2] {
            tx.send(reconfigured(display)).unwrap();
        }
        drop(tx);

        let result =
            run_event_loop(&mut monitor, &mut rx, &settings, std::future::pending()).await;

        assert!(result.is_err(), "closed channel ends the loop with an error");
        assert_eq!(probe.probe_count(), 1);
        assert_eq!(registry.set_calls(), vec![DeviceId(2)]);
    }

    #[tokio::test]
    async fn test_shutdown_ends_loop_cleanly() {
        let probe = FakeDisplayProbe::with_external(false);
        let registry = registry();
        let mut monitor = Monitor::new(&probe, &registry, Switcher::default());

        let (_tx, mut rx) = mpsc::unbounded_channel();
        let result =
            run_event_loop(&mut monitor, &mut rx, &quiet_settings(), std::future::ready(())).await;

        assert!(result.is_ok());
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_event_inside_settle_window_is_coalesced() {
        let probe = FakeDisplayProbe::with_external(true);
        let registry = registry();
        let mut monitor = Monitor::new(&probe, &registry, Switcher::default());
        let settings = Settings {
            settle_ms: 100,
            ..quiet_settings()
        };

        startup(&mut monitor, &settings);
        probe.set_external(false);

        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(reconfigured(2)).unwrap();
        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            tx.send(reconfigured(2)).unwrap();
        });

        let result =
            run_event_loop(&mut monitor, &mut rx, &settings, std::future::pending()).await;
        late.await.unwrap();

        assert!(result.is_err());
        // Startup plus one probe for the whole burst
        assert_eq!(probe.probe_count(), 2);
        assert_eq!(registry.set_calls(), vec![DeviceId(2), DeviceId(1)]);
        assert_eq!(monitor.state().previous(), Some(false));
    }

    #[test]
    fn test_startup_applies_policy() {
        let probe = FakeDisplayProbe::with_external(true);
        let registry = registry();
        let mut monitor = Monitor::new(&probe, &registry, Switcher::default());

        startup(&mut monitor, &quiet_settings());

        assert_eq!(monitor.state().previous(), Some(true));
        assert_eq!(registry.set_calls(), vec![DeviceId(2)]);
    }

    #[test]
    fn test_startup_without_apply_only_records() {
        let probe = FakeDisplayProbe::with_external(true);
        let registry = registry();
        let mut monitor = Monitor::new(&probe, &registry, Switcher::default());
        let settings = Settings {
            apply_on_startup: false,
            ..quiet_settings()
        };

        startup(&mut monitor, &settings);

        assert_eq!(monitor.state().previous(), Some(true));
        assert!(registry.set_calls().is_empty());
    }

    #[tokio::test]
    async fn test_settle_drains_queue() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(reconfigured(1)).unwrap();
        tx.send(reconfigured(2)).unwrap();

        assert_eq!(settle(&mut rx, 0).await, 2);
        assert_eq!(settle(&mut rx, 0).await, 0);
    }
}
