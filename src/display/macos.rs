//! Quartz display services
//!
//! Active display enumeration via `CGGetActiveDisplayList`, and change
//! notifications via `CGDisplayRegisterReconfigurationCallback`. Quartz
//! delivers the callbacks through the registering thread's run loop, so the
//! watcher keeps the main thread in `CFRunLoopRun` and hands the events to a
//! worker thread.

use color_eyre::eyre::{self, Context, Result};
use core_foundation::date::CFDate;
use core_foundation::runloop::{
    CFRunLoop, CFRunLoopTimer, CFRunLoopTimerContext, CFRunLoopTimerRef, kCFRunLoopDefaultMode,
};
use core_graphics::display::{CGDirectDisplayID, CGDisplay, CGGetActiveDisplayList};
use std::ffi::c_void;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
    Display, DisplayEvent, DisplayEvents, DisplayProbe, Forwarded, forward_reconfiguration,
};

type CGError = i32;
const CG_SUCCESS: CGError = 0;

/// Seconds between checks that the worker is still listening
const KEEP_ALIVE_INTERVAL: f64 = 0.5;

type EventSender = mpsc::UnboundedSender<DisplayEvent>;

type ReconfigurationCallback =
    extern "C" fn(display: CGDirectDisplayID, flags: u32, user_info: *mut c_void);

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGDisplayRegisterReconfigurationCallback(
        callback: ReconfigurationCallback,
        user_info: *mut c_void,
    ) -> CGError;

    fn CGDisplayRemoveReconfigurationCallback(
        callback: ReconfigurationCallback,
        user_info: *mut c_void,
    ) -> CGError;
}

/// Display probe backed by Quartz display services
#[derive(Debug, Clone, Copy)]
pub struct CoreGraphicsProbe {
    max_displays: u32,
}

impl CoreGraphicsProbe {
    /// Create a probe that reads at most `max_displays` entries
    #[must_use]
    pub fn new(max_displays: u32) -> Self {
        Self { max_displays }
    }
}

impl DisplayProbe for CoreGraphicsProbe {
    fn active_displays(&self) -> Vec<Display> {
        let mut ids: Vec<CGDirectDisplayID> = vec![0; self.max_displays as usize];
        let mut count: u32 = 0;

        // SAFETY: `ids` has room for `max_displays` entries and `count` is a live u32.
        let status =
            unsafe { CGGetActiveDisplayList(self.max_displays, ids.as_mut_ptr(), &raw mut count) };
        if status != CG_SUCCESS {
            warn!("CGGetActiveDisplayList failed (CGError {})", status);
            return Vec::new();
        }

        if count >= self.max_displays {
            debug!(
                "Active display list filled the bound of {} entries",
                self.max_displays
            );
        }

        ids.truncate(count as usize);
        ids.into_iter()
            .map(|id| {
                let display = CGDisplay::new(id);
                Display {
                    id,
                    is_built_in: display.is_builtin(),
                    is_main: display.is_main(),
                }
            })
            .collect()
    }
}

/// Borrow the sender behind a callback's `user_info`
///
/// # Safety
/// `info` must come from `Arc::into_raw` on an `Arc<EventSender>` that is
/// still alive.
unsafe fn sender<'a>(info: *mut c_void) -> &'a EventSender {
    // SAFETY: upheld by the caller.
    unsafe { &*info.cast_const().cast::<EventSender>() }
}

extern "C" fn on_reconfiguration(display: CGDirectDisplayID, flags: u32, user_info: *mut c_void) {
    // SAFETY: `user_info` is the Arc registered in `run_with_display_events`; it is
    // released only after this callback has been removed.
    let tx = unsafe { sender(user_info) };
    if forward_reconfiguration(tx, display, flags) == Forwarded::Closed {
        CFRunLoop::get_current().stop();
    }
}

extern "C" fn on_keep_alive(_timer: CFRunLoopTimerRef, info: *mut c_void) {
    // SAFETY: same pointer as the reconfiguration callback; the timer is removed
    // before the Arc is released.
    let tx = unsafe { sender(info) };
    if tx.is_closed() {
        CFRunLoop::get_current().stop();
    }
}

/// Run `worker` on its own thread, feeding it display reconfigurations
///
/// The calling thread registers the Quartz callback and services it from its
/// CoreFoundation run loop until the worker drops its [`DisplayEvents`]. Call
/// this from the main thread. Callbacks carrying the "begin configuration"
/// flag are dropped; every completed change becomes one [`DisplayEvent`].
/// Quartz calls back once per affected display, so a single cable plug can
/// yield several events.
///
/// Returns the worker's result once it finishes.
///
/// # Errors
/// Returns an error if the callback cannot be registered, the worker thread
/// cannot be spawned or panics, or the worker itself fails.
pub fn run_with_display_events<F>(worker: F) -> Result<()>
where
    F: FnOnce(DisplayEvents) -> Result<()> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let tx = Arc::new(tx);
    let user_info = Arc::into_raw(Arc::clone(&tx)).cast_mut().cast::<c_void>();

    // SAFETY: `user_info` stays valid until the matching remove call below.
    let status = unsafe { CGDisplayRegisterReconfigurationCallback(on_reconfiguration, user_info) };

    let result = if status == CG_SUCCESS {
        info!("Listening for display reconfigurations");
        let outcome = std::thread::Builder::new()
            .name("dasw-daemon".to_string())
            .spawn(move || worker(rx))
            .context("Failed to spawn daemon thread")
            .and_then(|handle| {
                service_run_loop(user_info, &tx);
                handle
                    .join()
                    .map_err(|_| eyre::eyre!("Daemon thread panicked"))
                    .and_then(|result| result)
            });

        // SAFETY: same callback/user_info pair as registered above.
        unsafe { CGDisplayRemoveReconfigurationCallback(on_reconfiguration, user_info) };
        debug!("Display watcher stopped");
        outcome
    } else {
        Err(eyre::eyre!(
            "Failed to register display reconfiguration callback (CGError {status})"
        ))
    };

    // SAFETY: reclaims the reference leaked by `Arc::into_raw`; neither the
    // callback nor the keep-alive timer is registered any more.
    drop(unsafe { Arc::from_raw(user_info.cast_const().cast::<EventSender>()) });

    result
}

/// Run the current thread's run loop until the worker drops its receiver
///
/// A repeating timer keeps the run loop from returning for lack of sources
/// and stops it once the channel closes.
fn service_run_loop(user_info: *mut c_void, tx: &EventSender) {
    let mut context = CFRunLoopTimerContext {
        version: 0,
        info: user_info,
        retain: None,
        release: None,
        copyDescription: None,
    };
    let timer = CFRunLoopTimer::new(
        CFDate::now().abs_time() + KEEP_ALIVE_INTERVAL,
        KEEP_ALIVE_INTERVAL,
        0,
        0,
        on_keep_alive,
        &raw mut context,
    );

    let run_loop = CFRunLoop::get_current();
    // SAFETY: reading an immutable CoreFoundation constant.
    let mode = unsafe { kCFRunLoopDefaultMode };
    run_loop.add_timer(&timer, mode);

    while !tx.is_closed() {
        CFRunLoop::run_current();
    }

    run_loop.remove_timer(&timer, mode);
}
