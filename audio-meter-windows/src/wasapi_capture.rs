//! WASAPI peak capture provider.
//!
//! One provider type serves both directions: capture endpoints are
//! opened directly, render endpoints with `AUDCLNT_STREAMFLAGS_LOOPBACK`
//! (the mix the device is playing, observed as if it were an input).
//! No special permissions needed on Windows; DRM-protected audio is
//! silenced in loopback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use audio_meter_core::models::endpoint::{AudioEndpointRef, Direction};
use audio_meter_core::models::error::MeterError;
use audio_meter_core::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

/// WASAPI capture for one resolved endpoint.
///
/// Delivers Float32 buffers on a dedicated high-priority thread
/// registered with MMCSS.
pub struct WasapiCapture {
    endpoint: AudioEndpointRef,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

// SAFETY: All Windows COM objects are used on a single thread (the
// capture thread). The struct fields are either atomics, Mutex-protected,
// or plain data.
unsafe impl Send for WasapiCapture {}
unsafe impl Sync for WasapiCapture {}

impl WasapiCapture {
    pub fn new(endpoint: &AudioEndpointRef) -> Self {
        Self {
            endpoint: endpoint.clone(),
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        }
    }
}

impl CaptureProvider for WasapiCapture {
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), MeterError> {
        if self.running.load(Ordering::SeqCst) {
            // Already delivering: a second start is a no-op success.
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let endpoint = self.endpoint.clone();

        let handle = thread::Builder::new()
            .name("wasapi-meter-capture".into())
            .spawn(move || {
                if let Err(e) = capture_loop(running.clone(), &endpoint, callback) {
                    log::error!("Capture error on '{}': {}", endpoint.name, e);
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| MeterError::Backend(format!("failed to spawn capture thread: {}", e)))?;

        *self.capture_handle.lock() = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MeterError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Main capture loop running on a dedicated thread.
///
/// Sequence:
/// 1. CoInitializeEx (MTA)
/// 2. Get the endpoint's device by id
/// 3. Activate IAudioClient
/// 4. Initialize in shared mode (LOOPBACK flag for render endpoints)
/// 5. Get IAudioCaptureClient service
/// 6. Register with MMCSS for real-time priority
/// 7. Start, poll for buffers
fn capture_loop(
    running: Arc<AtomicBool>,
    endpoint: &AudioEndpointRef,
    callback: AudioBufferCallback,
) -> Result<(), MeterError> {
    unsafe {
        CoInitializeEx(None, COINIT_MULTITHREADED)
            .ok()
            .map_err(|e| MeterError::Backend(format!("CoInitializeEx failed: {}", e)))?;

        let _com_guard = CoUninitializeGuard;

        let enumerator: IMMDeviceEnumerator =
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                .map_err(|_| MeterError::DeviceUnavailable(endpoint.name.clone()))?;

        let wide_id: Vec<u16> = endpoint.id.encode_utf16().chain(std::iter::once(0)).collect();
        let device = enumerator
            .GetDevice(PCWSTR(wide_id.as_ptr()))
            .map_err(|_| MeterError::DeviceUnavailable(endpoint.name.clone()))?;

        let audio_client: IAudioClient = device
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| MeterError::Backend(format!("Activate failed: {}", e)))?;

        let mix_format_ptr = audio_client
            .GetMixFormat()
            .map_err(|e| MeterError::Backend(format!("GetMixFormat failed: {}", e)))?;

        let mix_format = &*mix_format_ptr;
        let sample_rate = mix_format.nSamplesPerSec as f64;
        let channels = mix_format.nChannels;

        // Loopback reads the mix going to a render endpoint; capture
        // endpoints are opened as plain input streams.
        let stream_flags = match endpoint.direction {
            Direction::Render => AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
            Direction::Capture => AUDCLNT_STREAMFLAGS_NOPERSIST,
        };

        // Buffer duration: 100ms in 100-nanosecond units
        let buffer_duration = 1_000_000;

        audio_client
            .Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                stream_flags,
                buffer_duration,
                0,
                mix_format,
                None,
            )
            .map_err(|e| MeterError::Backend(format!("IAudioClient::Initialize failed: {}", e)))?;

        let capture_client: IAudioCaptureClient = audio_client
            .GetService()
            .map_err(|e| MeterError::Backend(format!("GetService failed: {}", e)))?;

        // MMCSS registration for real-time priority
        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        let _mmcss_handle = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index);

        audio_client
            .Start()
            .map_err(|e| MeterError::CaptureFailure(format!("IAudioClient::Start failed: {}", e)))?;

        // Capture loop — poll every 10ms
        while running.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(10));

            let mut packet_length = capture_client
                .GetNextPacketSize()
                .map_err(|e| MeterError::CaptureFailure(format!("GetNextPacketSize failed: {}", e)))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                capture_client
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(|e| MeterError::CaptureFailure(format!("GetBuffer failed: {}", e)))?;

                if num_frames > 0 && !buffer_ptr.is_null() {
                    let total_samples = num_frames as usize * channels as usize;

                    // WASAPI delivers Float32 in shared mode
                    let float_ptr = buffer_ptr as *const f32;
                    let samples = std::slice::from_raw_parts(float_ptr, total_samples);

                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        let silence = vec![0.0f32; total_samples];
                        callback(&silence, sample_rate, channels);
                    } else {
                        callback(samples, sample_rate, channels);
                    }
                }

                capture_client
                    .ReleaseBuffer(num_frames)
                    .map_err(|e| MeterError::CaptureFailure(format!("ReleaseBuffer failed: {}", e)))?;

                packet_length = capture_client
                    .GetNextPacketSize()
                    .map_err(|e| MeterError::CaptureFailure(format!("GetNextPacketSize failed: {}", e)))?;
            }
        }

        let _ = audio_client.Stop();
        CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
    }

    Ok(())
}

struct CoUninitializeGuard;

impl Drop for CoUninitializeGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
