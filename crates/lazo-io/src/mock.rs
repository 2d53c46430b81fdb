//! Deterministic in-process backend for tests.
//!
//! [`MockBackend`] implements [`DeviceBackend`] without touching any
//! platform audio API, so the full graph and engine stack can run in CI
//! where no sound hardware exists. Instead of a hardware clock, the
//! paired [`MockController`] drives the session by hand:
//! [`MockController::render_quantum`] invokes the registered render
//! callback for one quantum and returns what it produced, and
//! [`MockController::feed_capture`] delivers a captured buffer.
//!
//! The constructors model the degraded environments the engine must
//! survive: [`MockBackend::without_capture`] (no microphone),
//! [`MockBackend::without_render`] (no speakers), and
//! [`MockBackend::without_devices`].
//!
//! The mock ignores [`EndpointConfig::buffer_frames`]; quantum sizing is
//! whatever the controller passes per call, which is exactly what the
//! size-robustness tests need.

use std::sync::{Arc, Mutex};

use lazo_core::AudioFormat;

use crate::backend::{
    CaptureCallback, DeviceBackend, DeviceInfo, EndpointConfig, ErrorCallback, RenderCallback,
    StreamHandle,
};
use crate::{Error, Result};

const RENDER_DEVICE_NAME: &str = "Mock Render";
const CAPTURE_DEVICE_NAME: &str = "Mock Capture";

/// Callback slots shared between the backend and its controller.
#[derive(Default)]
struct MockShared {
    render: Mutex<Option<RenderCallback>>,
    capture: Mutex<Option<CaptureCallback>>,
}

/// Clears the render slot when its stream handle is dropped.
struct RenderSlotGuard(Arc<MockShared>);

impl Drop for RenderSlotGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.0.render.lock() {
            *slot = None;
        }
    }
}

/// Clears the capture slot when its stream handle is dropped.
struct CaptureSlotGuard(Arc<MockShared>);

impl Drop for CaptureSlotGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.0.capture.lock() {
            *slot = None;
        }
    }
}

/// Test backend with hand-driven quanta.
///
/// A device is modeled as `Some(format)`; `None` means the device does
/// not exist and the corresponding calls fail with [`Error::NoDevice`].
pub struct MockBackend {
    shared: Arc<MockShared>,
    render_format: Option<AudioFormat>,
    capture_format: Option<AudioFormat>,
    fail_render_build: bool,
}

/// Drives a [`MockBackend`] from test code.
#[derive(Clone)]
pub struct MockController {
    shared: Arc<MockShared>,
}

impl MockBackend {
    /// Backend with the given render and capture device formats.
    pub fn with_formats(render: AudioFormat, capture: AudioFormat) -> (Self, MockController) {
        let shared = Arc::new(MockShared::default());
        let controller = MockController {
            shared: Arc::clone(&shared),
        };
        (
            Self {
                shared,
                render_format: Some(render),
                capture_format: Some(capture),
                fail_render_build: false,
            },
            controller,
        )
    }

    /// Stereo 48 kHz render device plus a mono 48 kHz capture device.
    pub fn duplex() -> (Self, MockController) {
        Self::with_formats(AudioFormat::stereo_f32(48000), AudioFormat::new(48000, 1, 32))
    }

    /// Render device only; every capture call fails.
    pub fn without_capture() -> (Self, MockController) {
        let (mut backend, controller) = Self::duplex();
        backend.capture_format = None;
        (backend, controller)
    }

    /// Capture device only; every render call fails.
    pub fn without_render() -> (Self, MockController) {
        let (mut backend, controller) = Self::duplex();
        backend.render_format = None;
        (backend, controller)
    }

    /// No devices at all.
    pub fn without_devices() -> (Self, MockController) {
        let (mut backend, controller) = Self::duplex();
        backend.render_format = None;
        backend.capture_format = None;
        (backend, controller)
    }

    /// Render device negotiates fine but its stream refuses to build.
    ///
    /// Models an endpoint grabbed by another process after enumeration.
    pub fn failing_render_build() -> (Self, MockController) {
        let (mut backend, controller) = Self::duplex();
        backend.fail_render_build = true;
        (backend, controller)
    }

    fn check_selector(selector: Option<&str>, name: &str, role: &str) -> Result<()> {
        match selector {
            Some(search) if !name.to_lowercase().contains(&search.to_lowercase()) => Err(
                Error::DeviceNotFound(format!("no {} device matching '{}'", role, search)),
            ),
            _ => Ok(()),
        }
    }
}

impl DeviceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();
        if let Some(format) = self.capture_format {
            devices.push(DeviceInfo {
                name: CAPTURE_DEVICE_NAME.to_string(),
                is_capture: true,
                is_render: false,
                default_sample_rate: format.sample_rate,
            });
        }
        if let Some(format) = self.render_format {
            devices.push(DeviceInfo {
                name: RENDER_DEVICE_NAME.to_string(),
                is_capture: false,
                is_render: true,
                default_sample_rate: format.sample_rate,
            });
        }
        Ok(devices)
    }

    fn default_render_device(&self) -> Result<Option<DeviceInfo>> {
        Ok(self.render_format.map(|format| DeviceInfo {
            name: RENDER_DEVICE_NAME.to_string(),
            is_capture: false,
            is_render: true,
            default_sample_rate: format.sample_rate,
        }))
    }

    fn default_capture_device(&self) -> Result<Option<DeviceInfo>> {
        Ok(self.capture_format.map(|format| DeviceInfo {
            name: CAPTURE_DEVICE_NAME.to_string(),
            is_capture: true,
            is_render: false,
            default_sample_rate: format.sample_rate,
        }))
    }

    fn render_format(&self, device: Option<&str>) -> Result<AudioFormat> {
        Self::check_selector(device, RENDER_DEVICE_NAME, "render")?;
        self.render_format.ok_or(Error::NoDevice)
    }

    fn capture_format(&self, device: Option<&str>) -> Result<AudioFormat> {
        Self::check_selector(device, CAPTURE_DEVICE_NAME, "capture")?;
        self.capture_format.ok_or(Error::NoDevice)
    }

    fn build_render_stream(
        &self,
        config: &EndpointConfig,
        callback: RenderCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        Self::check_selector(config.device.as_deref(), RENDER_DEVICE_NAME, "render")?;
        if self.render_format.is_none() {
            return Err(Error::NoDevice);
        }
        if self.fail_render_build {
            return Err(Error::Stream("render endpoint rejected the stream".into()));
        }
        if let Ok(mut slot) = self.shared.render.lock() {
            *slot = Some(callback);
        }
        Ok(StreamHandle::new(RenderSlotGuard(Arc::clone(&self.shared))))
    }

    fn build_capture_stream(
        &self,
        config: &EndpointConfig,
        callback: CaptureCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        Self::check_selector(config.device.as_deref(), CAPTURE_DEVICE_NAME, "capture")?;
        if self.capture_format.is_none() {
            return Err(Error::NoDevice);
        }
        if let Ok(mut slot) = self.shared.capture.lock() {
            *slot = Some(callback);
        }
        Ok(StreamHandle::new(CaptureSlotGuard(Arc::clone(&self.shared))))
    }
}

impl MockController {
    /// Drive one render quantum of `samples` interleaved samples.
    ///
    /// Returns the buffer the registered callback produced, or `None`
    /// when no render stream is live. `samples` is a raw sample count,
    /// not a frame count, so callers can present misaligned buffers.
    pub fn render_quantum(&self, samples: usize) -> Option<Vec<f32>> {
        let mut slot = self.shared.render.lock().ok()?;
        let callback = slot.as_mut()?;
        let mut buffer = vec![0.0f32; samples];
        callback(&mut buffer);
        Some(buffer)
    }

    /// Deliver one captured buffer to the live capture stream.
    ///
    /// Returns `false` when no capture stream is live.
    pub fn feed_capture(&self, samples: &[f32]) -> bool {
        let Ok(mut slot) = self.shared.capture.lock() else {
            return false;
        };
        match slot.as_mut() {
            Some(callback) => {
                callback(samples);
                true
            }
            None => false,
        }
    }
}
