//! Display state tracking
//!
//! Remembers the last display-presence observation and only re-applies the
//! routing policy when it changes. The first observation after startup
//! always acts.

use tracing::{debug, info};

use crate::audio::AudioDeviceRegistry;
use crate::display::DisplayProbe;
use crate::policy::{OutputDeviceType, select_target_class};
use crate::switcher::{SwitchReport, Switcher};

/// Last acted-upon display presence
///
/// `None` until the first observation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DisplayState {
    previous: Option<bool>,
}

impl DisplayState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously stored observation
    #[must_use]
    pub fn previous(&self) -> Option<bool> {
        self.previous
    }

    /// Check if an observation requires applying the policy
    #[must_use]
    pub fn should_act(&self, external_present: bool) -> bool {
        self.previous != Some(external_present)
    }

    /// Record an observation, returning whether the policy must be applied
    ///
    /// The stored value is refreshed even when nothing changed.
    pub fn observe(&mut self, external_present: bool) -> bool {
        let act = self.should_act(external_present);
        debug!(
            "Display state: {:?} → {} (act: {})",
            self.previous, external_present, act
        );
        self.previous = Some(external_present);
        act
    }
}

/// Handle one display configuration change
///
/// Probes the displays, updates `state`, and runs the switcher if the
/// presence value changed (or nothing was known yet). Returns `None` when
/// the event was suppressed.
pub fn handle_display_change_event<P, R>(
    state: &mut DisplayState,
    probe: &P,
    registry: &R,
    switcher: &Switcher,
) -> Option<SwitchReport>
where
    P: DisplayProbe + ?Sized,
    R: AudioDeviceRegistry + ?Sized,
{
    let external_present = probe.is_external_display_present();
    if !state.observe(external_present) {
        return None;
    }

    let target = select_target_class(external_present);
    info!(
        "External display {} → target: {}",
        if external_present { "connected" } else { "absent" },
        target
    );
    Some(switcher.apply_policy(registry, target).into())
}

/// Owns the platform seams, the switcher and the display state
pub struct Monitor<P, R> {
    probe: P,
    registry: R,
    switcher: Switcher,
    state: DisplayState,
}

impl<P: DisplayProbe, R: AudioDeviceRegistry> Monitor<P, R> {
    #[must_use]
    pub fn new(probe: P, registry: R, switcher: Switcher) -> Self {
        Self {
            probe,
            registry,
            switcher,
            state: DisplayState::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Entry point for display change notifications and the startup probe
    pub fn handle_display_change_event(&mut self) -> Option<SwitchReport> {
        handle_display_change_event(&mut self.state, &self.probe, &self.registry, &self.switcher)
    }

    /// Probe and store the current presence without applying the policy
    pub fn record_current(&mut self) -> bool {
        let external_present = self.probe.is_external_display_present();
        let _ = self.state.observe(external_present);
        external_present
    }

    /// Apply a class directly, leaving the display state untouched
    pub fn apply(&self, target: OutputDeviceType) -> SwitchReport {
        self.switcher.apply_policy(&self.registry, target).into()
    }
}
