//! Pluggable audio backend abstraction.
//!
//! This module defines the [`DeviceBackend`] trait, which decouples the
//! device graph from any specific platform audio API. The production
//! implementation wraps [cpal](https://crates.io/crates/cpal); tests use
//! the deterministic [`MockBackend`](crate::mock::MockBackend), which
//! drives quanta by hand instead of from a hardware clock.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │           DuplexEngine           │
//! └──────────────┬───────────────────┘
//!                │ owns
//!                ▼
//! ┌──────────────────────────────────┐
//! │           DeviceGraph            │
//! │  negotiate / attach / start/stop │
//! └──────────────┬───────────────────┘
//!                │ uses DeviceBackend trait
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌─────────────┐
//! │ CpalBackend │  │ MockBackend │
//! │ (hardware)  │  │ (tests/CI)  │
//! └─────────────┘  └─────────────┘
//! ```
//!
//! The trait uses boxed closures for callbacks rather than generic
//! parameters, making `DeviceBackend` object-safe so the engine can hold a
//! `Box<dyn DeviceBackend>` chosen at runtime. Stream handles are returned
//! as [`StreamHandle`], a type-erased wrapper that stops the stream on
//! drop, keeping platform types out of graph code.

use lazo_core::AudioFormat;

use crate::Result;

/// Configuration for building a capture or render endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Preferred quantum size in sample-frames.
    pub buffer_frames: u32,
    /// Optional device selector (uses the system default if `None`).
    pub device: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            buffer_frames: 480,
            device: None,
        }
    }
}

/// Audio device information, as reported by a backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device can capture audio.
    pub is_capture: bool,
    /// Whether the device can render audio.
    pub is_render: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Type-erased audio stream handle.
///
/// Wraps a backend-specific stream object. The endpoint is alive while
/// this handle exists; dropping it stops capture or playback. RAII
/// teardown holds regardless of which backend produced the stream.
pub struct StreamHandle {
    /// The backend-specific stream object, kept alive via RAII.
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Create a stream handle wrapping a backend-specific stream object.
    ///
    /// The wrapped value is kept alive until this handle is dropped. The
    /// type `T` must be `Send + 'static` so the handle can move between
    /// threads.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Render callback signature.
///
/// Invoked by the backend on the real-time audio thread with a mutable
/// buffer of interleaved f32 samples to fill. For stereo the layout is
/// `[L0, R0, L1, R1, ...]` and the buffer length is `frames * channels`.
///
/// Runs on the audio thread: implementations must not block, lock, or
/// perform I/O.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Capture callback signature.
///
/// Invoked by the backend on the real-time audio thread with captured
/// interleaved f32 samples, in the same layout as [`RenderCallback`].
pub type CaptureCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Error callback signature.
///
/// Invoked when the backend encounters an error during streaming, with a
/// human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable audio backend trait.
///
/// Abstracts over platform audio APIs to provide a uniform surface for
/// device enumeration, format negotiation, and endpoint construction.
/// Object-safe: all callbacks are boxed closures and stream handles are
/// type-erased.
pub trait DeviceBackend: Send {
    /// Short name of this backend (e.g., "cpal", "mock").
    fn name(&self) -> &str;

    /// List all available audio devices.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// The default render device, if any.
    fn default_render_device(&self) -> Result<Option<DeviceInfo>>;

    /// The default capture device, if any.
    fn default_capture_device(&self) -> Result<Option<DeviceInfo>>;

    /// Negotiate the native format of a render device.
    ///
    /// `device` selects by index, exact name, or case-insensitive partial
    /// name; `None` means the system default. This is the graph's
    /// authoritative format source.
    fn render_format(&self, device: Option<&str>) -> Result<AudioFormat>;

    /// Negotiate the native format of a capture device.
    fn capture_format(&self, device: Option<&str>) -> Result<AudioFormat>;

    /// Build a render endpoint.
    ///
    /// `callback` is invoked per quantum with a buffer to fill. The
    /// returned [`StreamHandle`] keeps the endpoint alive; dropping it
    /// stops playback.
    fn build_render_stream(
        &self,
        config: &EndpointConfig,
        callback: RenderCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Build a capture endpoint.
    ///
    /// `callback` is invoked per delivered buffer of captured samples. The
    /// returned [`StreamHandle`] keeps the endpoint alive; dropping it
    /// stops capture.
    fn build_capture_stream(
        &self,
        config: &EndpointConfig,
        callback: CaptureCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}
