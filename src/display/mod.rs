//! Display topology
//!
//! Probes the active display list and classifies whether an external display
//! is attached. Also provides the display-change event source the daemon
//! listens on:
//! - macOS: Quartz display reconfiguration callbacks on a dedicated run-loop thread
//! - other platforms: no displays are reported and the watcher refuses to start

#[cfg(target_os = "macos")]
mod macos;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

#[cfg(target_os = "macos")]
pub use macos::{CoreGraphicsProbe as SystemDisplayProbe, run_with_display_events};

#[cfg(not(target_os = "macos"))]
pub use unsupported::{UnsupportedProbe as SystemDisplayProbe, run_with_display_events};

/// Default bound on the active display list
pub const DEFAULT_MAX_DISPLAYS: u32 = 16;

/// `kCGDisplayBeginConfigurationFlag`: sent before the change is applied
pub const BEGIN_CONFIGURATION_FLAG: u32 = 1 << 0;

/// One active display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Display {
    pub id: u32,
    pub is_built_in: bool,
    pub is_main: bool,
}

impl Display {
    #[must_use]
    pub fn new(id: u32, is_built_in: bool) -> Self {
        Self {
            id,
            is_built_in,
            is_main: false,
        }
    }
}

/// Display configuration change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A display was added, removed, or reconfigured
    Reconfigured { display: u32, flags: u32 },
}

/// Receiver side of the display watcher
pub type DisplayEvents = mpsc::UnboundedReceiver<DisplayEvent>;

/// What became of one reconfiguration callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// Queued for the daemon
    Sent,
    /// "Begin configuration" pass, the change is not applied yet
    Ignored,
    /// The daemon is gone; the watcher should stop
    Closed,
}

/// Turn a raw reconfiguration callback into a [`DisplayEvent`]
///
/// Quartz calls back twice per change and display: once before (with
/// [`BEGIN_CONFIGURATION_FLAG`]) and once after. Only the second is sent.
pub fn forward_reconfiguration(
    tx: &mpsc::UnboundedSender<DisplayEvent>,
    display: u32,
    flags: u32,
) -> Forwarded {
    if flags & BEGIN_CONFIGURATION_FLAG != 0 {
        return Forwarded::Ignored;
    }

    let display_id = display;
    trace!("Display {} reconfigured (flags {:#x})", display_id, flags);
    match tx.send(DisplayEvent::Reconfigured { display, flags }) {
        Ok(()) => Forwarded::Sent,
        Err(_) => Forwarded::Closed,
    }
}

/// Source of the active display list
pub trait DisplayProbe {
    /// Active displays; an unreadable list is reported as empty
    fn active_displays(&self) -> Vec<Display>;

    /// True iff at least one active display is not the built-in panel
    fn is_external_display_present(&self) -> bool {
        has_external_display(&self.active_displays())
    }
}

impl<P: DisplayProbe + ?Sized> DisplayProbe for &P {
    fn active_displays(&self) -> Vec<Display> {
        (**self).active_displays()
    }
}

/// Classify a display list
#[must_use]
pub fn has_external_display(displays: &[Display]) -> bool {
    displays.iter().any(|d| !d.is_built_in)
}

#[cfg(not(target_os = "macos"))]
mod unsupported {
    use super::{Display, DisplayEvents, DisplayProbe};
    use color_eyre::eyre::{self, Result};

    /// Probe for platforms without Quartz display services
    #[derive(Debug, Clone, Copy)]
    pub struct UnsupportedProbe;

    impl UnsupportedProbe {
        #[must_use]
        pub fn new(_max_displays: u32) -> Self {
            Self
        }
    }

    impl DisplayProbe for UnsupportedProbe {
        fn active_displays(&self) -> Vec<Display> {
            Vec::new()
        }
    }

    /// # Errors
    /// Always fails: there is no display notification source on this platform.
    pub fn run_with_display_events<F>(_worker: F) -> Result<()>
    where
        F: FnOnce(DisplayEvents) -> Result<()> + Send + 'static,
    {
        eyre::bail!(
            "Display change notifications are only available on macOS.\n\
             The daemon cannot run on this platform."
        )
    }
}
