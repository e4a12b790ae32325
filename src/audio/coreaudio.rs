//! CoreAudio HAL backend
//!
//! Talks to `AudioObject*PropertyData` directly. Every query is a bounded,
//! synchronous property read against the system object or a device object.

use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use std::ffi::c_void;
use std::mem;
use std::ptr;
use tracing::{debug, trace, warn};

use super::{AudioDevice, AudioDeviceRegistry, AudioError, DeviceId};

type AudioObjectId = u32;
type OsStatus = i32;

const NO_ERR: OsStatus = 0;

// FourCC selectors and scopes from <CoreAudio/AudioHardware.h>
const SYSTEM_OBJECT: AudioObjectId = 1;
const HARDWARE_DEVICES: u32 = 0x6465_7623; // 'dev#'
const DEFAULT_OUTPUT_DEVICE: u32 = 0x644F_7574; // 'dOut'
const DEVICE_STREAMS: u32 = 0x7374_6D23; // 'stm#'
const OBJECT_NAME: u32 = 0x6C6E_616D; // 'lnam'
const DEVICE_TRANSPORT_TYPE: u32 = 0x7472_616E; // 'tran'
const TRANSPORT_TYPE_BUILT_IN: u32 = 0x626C_746E; // 'bltn'
const SCOPE_GLOBAL: u32 = 0x676C_6F62; // 'glob'
const SCOPE_OUTPUT: u32 = 0x6F75_7470; // 'outp'
const ELEMENT_MAIN: u32 = 0;

#[repr(C)]
struct AudioObjectPropertyAddress {
    selector: u32,
    scope: u32,
    element: u32,
}

impl AudioObjectPropertyAddress {
    const fn new(selector: u32, scope: u32) -> Self {
        Self {
            selector,
            scope,
            element: ELEMENT_MAIN,
        }
    }
}

#[link(name = "CoreAudio", kind = "framework")]
unsafe extern "C" {
    fn AudioObjectGetPropertyDataSize(
        object_id: AudioObjectId,
        address: *const AudioObjectPropertyAddress,
        qualifier_data_size: u32,
        qualifier_data: *const c_void,
        out_data_size: *mut u32,
    ) -> OsStatus;

    fn AudioObjectGetPropertyData(
        object_id: AudioObjectId,
        address: *const AudioObjectPropertyAddress,
        qualifier_data_size: u32,
        qualifier_data: *const c_void,
        io_data_size: *mut u32,
        out_data: *mut c_void,
    ) -> OsStatus;

    fn AudioObjectSetPropertyData(
        object_id: AudioObjectId,
        address: *const AudioObjectPropertyAddress,
        qualifier_data_size: u32,
        qualifier_data: *const c_void,
        data_size: u32,
        data: *const c_void,
    ) -> OsStatus;
}

/// System audio registry backed by the CoreAudio HAL
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioRegistry;

impl CoreAudioRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Byte size of a property, `None` if the query fails
    fn property_size(object: AudioObjectId, address: &AudioObjectPropertyAddress) -> Option<u32> {
        let mut size: u32 = 0;
        // SAFETY: address and size point to live stack values for the duration of the call.
        let status = unsafe {
            AudioObjectGetPropertyDataSize(object, address, 0, ptr::null(), &raw mut size)
        };
        (status == NO_ERR).then_some(size)
    }

    /// Read a `u32`-sized property
    fn read_u32(object: AudioObjectId, address: &AudioObjectPropertyAddress) -> Option<u32> {
        let mut value: u32 = 0;
        let mut size = mem::size_of::<u32>() as u32;
        // SAFETY: the output buffer is exactly `size` bytes and outlives the call.
        let status = unsafe {
            AudioObjectGetPropertyData(
                object,
                address,
                0,
                ptr::null(),
                &raw mut size,
                (&raw mut value).cast::<c_void>(),
            )
        };
        (status == NO_ERR).then_some(value)
    }

    fn all_device_ids() -> Vec<AudioObjectId> {
        let address = AudioObjectPropertyAddress::new(HARDWARE_DEVICES, SCOPE_GLOBAL);

        let Some(mut size) = Self::property_size(SYSTEM_OBJECT, &address) else {
            warn!("Could not query audio device list size");
            return Vec::new();
        };

        let count = size as usize / mem::size_of::<AudioObjectId>();
        let mut ids: Vec<AudioObjectId> = vec![0; count];
        if count == 0 {
            return ids;
        }

        // SAFETY: `ids` holds `count` elements, which is `size` bytes.
        let status = unsafe {
            AudioObjectGetPropertyData(
                SYSTEM_OBJECT,
                &address,
                0,
                ptr::null(),
                &raw mut size,
                ids.as_mut_ptr().cast::<c_void>(),
            )
        };
        if status != NO_ERR {
            warn!("Could not enumerate audio devices (OSStatus {})", status);
            return Vec::new();
        }

        // The device list may shrink between the size query and the read
        ids.truncate(size as usize / mem::size_of::<AudioObjectId>());
        ids
    }

    fn has_output_streams(device: AudioObjectId) -> bool {
        let address = AudioObjectPropertyAddress::new(DEVICE_STREAMS, SCOPE_OUTPUT);
        Self::property_size(device, &address).is_some_and(|size| size > 0)
    }

    fn device_name(device: AudioObjectId) -> Option<String> {
        let address = AudioObjectPropertyAddress::new(OBJECT_NAME, SCOPE_GLOBAL);
        let mut name_ref: CFStringRef = ptr::null();
        let mut size = mem::size_of::<CFStringRef>() as u32;
        // SAFETY: the HAL writes one retained CFStringRef into `name_ref`.
        let status = unsafe {
            AudioObjectGetPropertyData(
                device,
                &address,
                0,
                ptr::null(),
                &raw mut size,
                (&raw mut name_ref).cast::<c_void>(),
            )
        };
        if status != NO_ERR || name_ref.is_null() {
            return None;
        }
        // SAFETY: the name property follows the create rule; we own this reference.
        let name = unsafe { CFString::wrap_under_create_rule(name_ref) };
        Some(name.to_string())
    }

    fn is_built_in(device: AudioObjectId) -> bool {
        let address = AudioObjectPropertyAddress::new(DEVICE_TRANSPORT_TYPE, SCOPE_GLOBAL);
        Self::read_u32(device, &address) == Some(TRANSPORT_TYPE_BUILT_IN)
    }
}

impl AudioDeviceRegistry for CoreAudioRegistry {
    fn list_output_devices(&self) -> Vec<AudioDevice> {
        let devices: Vec<AudioDevice> = Self::all_device_ids()
            .into_iter()
            .filter(|&id| Self::has_output_streams(id))
            .map(|id| AudioDevice {
                id: DeviceId(id),
                name: Self::device_name(id).unwrap_or_default(),
                is_built_in: Self::is_built_in(id),
            })
            .collect();

        trace!("CoreAudio reported {} output devices", devices.len());
        devices
    }

    fn default_output_device_id(&self) -> DeviceId {
        let address = AudioObjectPropertyAddress::new(DEFAULT_OUTPUT_DEVICE, SCOPE_GLOBAL);
        Self::read_u32(SYSTEM_OBJECT, &address).map_or_else(
            || {
                warn!("Could not read default output device");
                DeviceId::UNKNOWN
            },
            DeviceId,
        )
    }

    fn set_default_output_device(&self, id: DeviceId) -> Result<(), AudioError> {
        let address = AudioObjectPropertyAddress::new(DEFAULT_OUTPUT_DEVICE, SCOPE_GLOBAL);
        let value: AudioObjectId = id.0;
        // SAFETY: `value` is a live u32 and the size passed matches it.
        let status = unsafe {
            AudioObjectSetPropertyData(
                SYSTEM_OBJECT,
                &address,
                0,
                ptr::null(),
                mem::size_of::<AudioObjectId>() as u32,
                (&raw const value).cast::<c_void>(),
            )
        };

        if status != NO_ERR {
            return Err(AudioError::SetFailed { id, status });
        }

        debug!("Set default output device: {}", id);
        Ok(())
    }
}
