//! MMDevice endpoint-change notifications.
//!
//! Implements `IMMNotificationClient` and forwards device add, remove,
//! state-change, and default-change events to a `DeviceChangeObserver`.
//! Callbacks arrive on an OS notification thread; the observer must only
//! set flags (the monitor loop defers the rebuild to its next tick).

use windows::core::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;

use audio_meter_core::models::endpoint::{DeviceEvent, Direction};
use audio_meter_core::traits::device_catalog::DeviceChangeObserver;

/// COM notification client bridging MMDevice events to the core.
#[implement(IMMNotificationClient)]
pub struct EndpointNotifications {
    observer: DeviceChangeObserver,
}

impl EndpointNotifications {
    pub fn new(observer: DeviceChangeObserver) -> Self {
        Self { observer }
    }
}

impl IMMNotificationClient_Impl for EndpointNotifications_Impl {
    fn OnDeviceStateChanged(
        &self,
        pwstrdeviceid: &PCWSTR,
        dwnewstate: DEVICE_STATE,
    ) -> Result<()> {
        let device_id = pcwstr_to_string(pwstrdeviceid);
        log::debug!("OnDeviceStateChanged: {}, {:?}", device_id, dwnewstate);
        (self.observer)(&DeviceEvent::StateChanged {
            device_id,
            active: dwnewstate == DEVICE_STATE_ACTIVE,
        });
        Ok(())
    }

    fn OnDeviceAdded(&self, pwstrdeviceid: &PCWSTR) -> Result<()> {
        let device_id = pcwstr_to_string(pwstrdeviceid);
        log::debug!("OnDeviceAdded: {}", device_id);
        (self.observer)(&DeviceEvent::Added { device_id });
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> Result<()> {
        let device_id = pcwstr_to_string(pwstrdeviceid);
        log::debug!("OnDeviceRemoved: {}", device_id);
        (self.observer)(&DeviceEvent::Removed { device_id });
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> Result<()> {
        let device_id = pcwstr_to_string(pwstrdefaultdeviceid);
        log::debug!("OnDefaultDeviceChanged: {:?}, {:?}, {}", flow, role, device_id);
        let direction = if flow == eRender {
            Direction::Render
        } else {
            Direction::Capture
        };
        (self.observer)(&DeviceEvent::DefaultChanged { direction });
        Ok(())
    }

    fn OnPropertyValueChanged(&self, pwstrdeviceid: &PCWSTR, key: &PROPERTYKEY) -> Result<()> {
        log::debug!(
            "OnPropertyValueChanged: {}, {:?}",
            pcwstr_to_string(pwstrdeviceid),
            key
        );
        Ok(())
    }
}

fn pcwstr_to_string(pwstr: &PCWSTR) -> String {
    if pwstr.is_null() {
        return String::new();
    }
    // SAFETY: the PCWSTR comes from the MMDevice API and is
    // null-terminated for the duration of the callback.
    unsafe { pwstr.to_string().unwrap_or_default() }
}
