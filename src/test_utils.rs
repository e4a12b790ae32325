//! In-memory stand-ins for the platform seams
//!
//! [`FakeDisplayProbe`] and [`FakeAudioRegistry`] implement the same traits as
//! the system backends so the state machine and switcher can be driven
//! without CoreGraphics or CoreAudio.

use std::cell::{Cell, RefCell};

use crate::audio::{AudioDevice, AudioDeviceRegistry, AudioError, DeviceId};
use crate::display::{Display, DisplayProbe};

/// Display probe with a scripted display list
#[derive(Debug, Default)]
pub struct FakeDisplayProbe {
    displays: RefCell<Vec<Display>>,
    probes: Cell<usize>,
}

impl FakeDisplayProbe {
    #[must_use]
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays: RefCell::new(displays),
            probes: Cell::new(0),
        }
    }

    /// Laptop panel only, or panel plus one external monitor
    #[must_use]
    pub fn with_external(external: bool) -> Self {
        let probe = Self::default();
        probe.set_external(external);
        probe
    }

    /// Replace the display list
    pub fn set_displays(&self, displays: Vec<Display>) {
        *self.displays.borrow_mut() = displays;
    }

    /// Plug or unplug a single external monitor next to the built-in panel
    pub fn set_external(&self, external: bool) {
        let mut displays = vec![Display::new(1, true)];
        if external {
            displays.push(Display::new(2, false));
        }
        self.set_displays(displays);
    }

    /// Number of times the display list was read
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.get()
    }
}

impl DisplayProbe for FakeDisplayProbe {
    fn active_displays(&self) -> Vec<Display> {
        self.probes.set(self.probes.get() + 1);
        self.displays.borrow().clone()
    }
}

/// Audio registry holding devices and a default in memory
///
/// A successful set makes the id the new default. Every set attempt is
/// recorded, including rejected ones.
#[derive(Debug)]
pub struct FakeAudioRegistry {
    devices: RefCell<Vec<AudioDevice>>,
    default_id: Cell<DeviceId>,
    set_calls: RefCell<Vec<DeviceId>>,
    reject_status: Cell<Option<i32>>,
}

impl FakeAudioRegistry {
    #[must_use]
    pub fn new(devices: Vec<AudioDevice>, default_id: DeviceId) -> Self {
        Self {
            devices: RefCell::new(devices),
            default_id: Cell::new(default_id),
            set_calls: RefCell::new(Vec::new()),
            reject_status: Cell::new(None),
        }
    }

    /// Make every following set fail with `status`
    pub fn reject_sets(&self, status: i32) {
        self.reject_status.set(Some(status));
    }

    /// Accept sets again
    pub fn accept_sets(&self) {
        self.reject_status.set(None);
    }

    /// Replace the device list, as if hardware was plugged or unplugged
    pub fn set_devices(&self, devices: Vec<AudioDevice>) {
        *self.devices.borrow_mut() = devices;
    }

    /// Change the default behind the switcher's back
    pub fn set_current_default(&self, id: DeviceId) {
        self.default_id.set(id);
    }

    #[must_use]
    pub fn current_default(&self) -> DeviceId {
        self.default_id.get()
    }

    #[must_use]
    pub fn set_calls(&self) -> Vec<DeviceId> {
        self.set_calls.borrow().clone()
    }
}

impl AudioDeviceRegistry for FakeAudioRegistry {
    fn list_output_devices(&self) -> Vec<AudioDevice> {
        self.devices.borrow().clone()
    }

    fn default_output_device_id(&self) -> DeviceId {
        self.default_id.get()
    }

    fn set_default_output_device(&self, id: DeviceId) -> Result<(), AudioError> {
        self.set_calls.borrow_mut().push(id);
        if let Some(status) = self.reject_status.get() {
            return Err(AudioError::SetFailed { id, status });
        }
        self.default_id.set(id);
        Ok(())
    }
}
