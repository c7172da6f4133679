//! Windows audio endpoint enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list active capture (microphone) and
//! render (speaker/headphone) endpoints with friendly names, and to
//! resolve the OS default endpoint per direction.

use windows::core::*;
use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::StructuredStorage::PropVariantClear;
use windows::Win32::System::Com::*;
use windows::Win32::System::Variant::*;

use audio_meter_core::models::endpoint::{AudioEndpointRef, Direction};
use audio_meter_core::models::error::MeterError;

/// Audio endpoint enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> Result<Self, MeterError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| MeterError::Backend(format!("failed to create enumerator: {}", e)))?;
            Ok(Self { enumerator })
        }
    }

    /// List active endpoints for one direction, in OS enumeration order.
    pub fn list_endpoints(&self, direction: Direction) -> Result<Vec<AudioEndpointRef>, MeterError> {
        unsafe {
            let data_flow = data_flow_for(direction);
            let collection = self
                .enumerator
                .EnumAudioEndpoints(data_flow, DEVICE_STATE_ACTIVE)
                .map_err(|e| MeterError::Backend(format!("EnumAudioEndpoints failed: {}", e)))?;

            let count = collection
                .GetCount()
                .map_err(|e| MeterError::Backend(format!("GetCount failed: {}", e)))?;

            // Get default device ID for comparison
            let default_id = self
                .enumerator
                .GetDefaultAudioEndpoint(data_flow, eConsole)
                .ok()
                .and_then(|d| d.GetId().ok())
                .and_then(|id| id.to_string().ok());

            let mut endpoints = Vec::new();

            for i in 0..count {
                let device = match collection.Item(i) {
                    Ok(d) => d,
                    Err(_) => continue,
                };

                let id = match device.GetId() {
                    Ok(id) => id.to_string().unwrap_or_default(),
                    Err(_) => continue,
                };

                let name =
                    Self::get_device_friendly_name(&device).unwrap_or_else(|| format!("Device {}", i));
                let is_default = default_id.as_deref() == Some(&id);

                endpoints.push(AudioEndpointRef {
                    id,
                    name,
                    direction,
                    is_default,
                });
            }

            Ok(endpoints)
        }
    }

    /// The OS default endpoint for one direction.
    pub fn default_endpoint(&self, direction: Direction) -> Result<AudioEndpointRef, MeterError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(data_flow_for(direction), eConsole)
                .map_err(|_| MeterError::DeviceUnavailable("no default endpoint".into()))?;

            let id = device
                .GetId()
                .map_err(|e| MeterError::Backend(format!("GetId failed: {}", e)))?
                .to_string()
                .unwrap_or_default();

            let name = Self::get_device_friendly_name(&device)
                .unwrap_or_else(|| "Default Device".to_string());

            Ok(AudioEndpointRef {
                id,
                name,
                direction,
                is_default: true,
            })
        }
    }

    /// Read the PKEY_Device_FriendlyName property from a device.
    fn get_device_friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;

            let mut prop_variant = std::mem::zeroed::<PROPVARIANT>();
            store
                .GetValue(&PKEY_Device_FriendlyName, &mut prop_variant)
                .ok()?;

            let name = if prop_variant.Anonymous.Anonymous.vt == VT_LPWSTR {
                let pwsz = prop_variant.Anonymous.Anonymous.Anonymous.pwszVal;
                if !pwsz.is_null() {
                    let len = (0..).take_while(|&i| *pwsz.offset(i) != 0).count();
                    Some(String::from_utf16_lossy(std::slice::from_raw_parts(
                        pwsz, len,
                    )))
                } else {
                    None
                }
            } else {
                None
            };

            PropVariantClear(&mut prop_variant).ok();
            name
        }
    }
}

pub(crate) fn data_flow_for(direction: Direction) -> EDataFlow {
    match direction {
        Direction::Capture => eCapture,
        Direction::Render => eRender,
    }
}
