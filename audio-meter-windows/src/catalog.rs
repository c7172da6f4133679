//! The Windows `DeviceCatalog` implementation.
//!
//! Ties MMDevice enumeration, WASAPI capture construction, and endpoint
//! notifications together behind the core's platform seam.

use parking_lot::Mutex;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use audio_meter_core::models::endpoint::{AudioEndpointRef, Direction};
use audio_meter_core::models::error::MeterError;
use audio_meter_core::traits::capture_provider::CaptureProvider;
use audio_meter_core::traits::device_catalog::{DeviceCatalog, DeviceChangeObserver};

use crate::device_enumerator::DeviceEnumerator;
use crate::notifications::EndpointNotifications;
use crate::wasapi_capture::WasapiCapture;

// S_FALSE — COM already initialized on this thread (acceptable).
const COM_S_FALSE: u32 = 1;
// RPC_E_CHANGED_MODE — COM initialized with a different threading model
// (acceptable, the existing apartment still serves us).
const COM_RPC_E_CHANGED_MODE: u32 = 0x8001_0106;

/// MMDevice-backed device catalog.
///
/// Enumerators are created per call on whichever thread asks; the
/// notification registration is kept alive for the catalog's lifetime.
pub struct WindowsDeviceCatalog {
    registration: Mutex<Option<NotificationRegistration>>,
}

struct NotificationRegistration {
    enumerator: IMMDeviceEnumerator,
    client: IMMNotificationClient,
}

impl Drop for NotificationRegistration {
    fn drop(&mut self) {
        unsafe {
            let _ = self
                .enumerator
                .UnregisterEndpointNotificationCallback(&self.client);
        }
    }
}

// SAFETY: the registered enumerator and client live in the COM MTA;
// MMDevice notification callbacks are apartment-agnostic, and the
// catalog only ever touches the registration under its Mutex.
unsafe impl Send for WindowsDeviceCatalog {}
unsafe impl Sync for WindowsDeviceCatalog {}

impl WindowsDeviceCatalog {
    pub fn new() -> Self {
        Self {
            registration: Mutex::new(None),
        }
    }
}

impl Default for WindowsDeviceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCatalog for WindowsDeviceCatalog {
    fn endpoints(&self, direction: Direction) -> Result<Vec<AudioEndpointRef>, MeterError> {
        ensure_com_initialized()?;
        DeviceEnumerator::new()?.list_endpoints(direction)
    }

    fn default_endpoint(&self, direction: Direction) -> Result<AudioEndpointRef, MeterError> {
        ensure_com_initialized()?;
        DeviceEnumerator::new()?.default_endpoint(direction)
    }

    fn open_capture(
        &self,
        endpoint: &AudioEndpointRef,
    ) -> Result<Box<dyn CaptureProvider>, MeterError> {
        Ok(Box::new(WasapiCapture::new(endpoint)))
    }

    fn subscribe_changes(&self, observer: DeviceChangeObserver) -> Result<(), MeterError> {
        let mut registration = self.registration.lock();
        if registration.is_some() {
            return Ok(());
        }

        ensure_com_initialized()?;
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| MeterError::Backend(format!("failed to create enumerator: {}", e)))?;

            let client: IMMNotificationClient = EndpointNotifications::new(observer).into();
            enumerator
                .RegisterEndpointNotificationCallback(&client)
                .map_err(|e| {
                    MeterError::Backend(format!("RegisterEndpointNotificationCallback failed: {}", e))
                })?;

            *registration = Some(NotificationRegistration { enumerator, client });
        }
        Ok(())
    }
}

/// Initialize COM (MTA) for the calling thread.
///
/// The MTA must outlive the enumerators and the notification
/// registration created on this thread, so there is deliberately no
/// matching CoUninitialize here.
fn ensure_com_initialized() -> Result<(), MeterError> {
    unsafe {
        let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
        if hr.is_err() {
            let code = hr.0 as u32;
            if code != COM_S_FALSE && code != COM_RPC_E_CHANGED_MODE {
                return Err(MeterError::Backend(format!(
                    "COM initialization failed: HRESULT 0x{:08X}",
                    code
                )));
            }
        }
    }
    Ok(())
}
