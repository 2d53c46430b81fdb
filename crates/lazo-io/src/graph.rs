//! Audio device graph construction and lifecycle.
//!
//! The [`DeviceGraph`] owns the capture and render endpoints of a duplex
//! session. Creation negotiates the render device's native format, which
//! becomes the graph format; endpoint nodes are then attached
//! independently, so a missing microphone or a failed render stream
//! degrades the session instead of aborting it.
//!
//! Endpoints are built in a stopped state: the backend stream is live as
//! soon as it is constructed, but an atomic gate keeps the callbacks
//! inert (render emits silence, capture discards) until [`DeviceGraph::start`]
//! opens the gates. [`DeviceGraph::stop`] tears down in a fixed order:
//! capture node first, then the quantum callback registration, then the
//! render node. Every step is skipped when the part was never attached,
//! so stopping a degraded or already-stopped graph is safe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TrySendError, sync_channel};

use lazo_core::{AudioFormat, AudioFrame};

use crate::backend::{DeviceBackend, EndpointConfig, StreamHandle};
use crate::quantum::{EngineStats, QuantumHandler};
use crate::{Error, NodeRole, Result};

/// Capacity of the capture queue, in buffers.
///
/// Small on purpose: the render side only ever wants the newest captured
/// buffer, so anything beyond a few quanta of slack is latency.
pub(crate) const CAPTURE_QUEUE_FRAMES: usize = 4;

/// Lifecycle state of a [`DeviceGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// No graph exists yet.
    Uninitialized,
    /// Graph created and format negotiated; endpoints may be attached.
    Initializing,
    /// Gates open; audio is flowing (possibly in a degraded mode).
    Running,
    /// Torn down. A new graph must be created to run again.
    Stopped,
}

/// Quantum size selection for endpoint construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyMode {
    /// Smallest quantum the backends commonly accept (128 frames).
    Lowest,
    /// Conservative quantum (480 frames, 10 ms at 48 kHz).
    #[default]
    Standard,
}

impl LatencyMode {
    /// Preferred quantum size in sample-frames.
    pub fn buffer_frames(self) -> u32 {
        match self {
            LatencyMode::Lowest => 128,
            LatencyMode::Standard => 480,
        }
    }
}

/// Settings for building a device graph.
#[derive(Debug, Clone, Default)]
pub struct GraphSettings {
    /// Quantum size selection.
    pub latency: LatencyMode,
    /// Render device selector (system default if `None`).
    pub render_device: Option<String>,
    /// Capture device selector (system default if `None`).
    pub capture_device: Option<String>,
}

/// Registration token for the per-quantum render callback.
///
/// Returned conceptually by [`DeviceGraph::attach_render`] and held by
/// the graph. While the token is armed, the render endpoint invokes the
/// quantum handler; releasing (or dropping) it disarms the callback, and
/// the endpoint emits silence from then on. This keeps "unregister the
/// callback" distinct from "stop the endpoint" during teardown.
#[derive(Debug)]
pub struct QuantumRegistration {
    armed: Arc<AtomicBool>,
}

impl QuantumRegistration {
    /// Disarm the callback. The render endpoint renders silence after this.
    pub fn release(self) {
        self.armed.store(false, Ordering::SeqCst);
        tracing::debug!("quantum callback unregistered");
    }
}

impl Drop for QuantumRegistration {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

/// Consumer end of the capture path.
///
/// Owns the receiving half of the capture queue. The quantum handler
/// drains it once per render quantum, keeping only the newest buffer.
#[derive(Debug)]
pub struct CaptureSource {
    rx: Receiver<AudioFrame>,
    format: AudioFormat,
}

impl CaptureSource {
    /// Format the capture endpoint was opened with.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Drain the queue, returning the newest buffer and the number of
    /// stale buffers superseded by it.
    ///
    /// Returns `(None, 0)` when nothing was captured this quantum; that
    /// is a normal condition, not an error.
    pub(crate) fn drain_newest(&mut self) -> (Option<AudioFrame>, u64) {
        let mut newest = None;
        let mut superseded = 0u64;
        while let Ok(frame) = self.rx.try_recv() {
            if newest.is_some() {
                superseded += 1;
            }
            newest = Some(frame);
        }
        (newest, superseded)
    }
}

/// A live endpoint: the backend stream plus its gate.
#[derive(Debug)]
struct EndpointNode {
    /// Keeps the backend stream alive; dropping stops it.
    _stream: StreamHandle,
    /// Gate checked by the stream callback. Closed until `start`.
    enabled: Arc<AtomicBool>,
}

/// Duplex audio device graph.
///
/// Holds the negotiated format, the lifecycle state, and up to two
/// endpoint nodes. Backends are passed per call rather than stored, so
/// the owner can tear a graph down and build a fresh one from the same
/// backend.
#[derive(Debug)]
pub struct DeviceGraph {
    format: AudioFormat,
    state: GraphState,
    render: Option<EndpointNode>,
    capture: Option<EndpointNode>,
    registration: Option<QuantumRegistration>,
}

impl DeviceGraph {
    /// Create a graph by negotiating the render device's native format.
    ///
    /// This is the one step that can fail outright: without a render
    /// format there is nothing to build against, and the caller gets
    /// [`Error::GraphCreation`].
    pub fn create(backend: &dyn DeviceBackend, settings: &GraphSettings) -> Result<Self> {
        let format = backend
            .render_format(settings.render_device.as_deref())
            .map_err(|e| Error::GraphCreation(e.to_string()))?;

        tracing::info!(
            backend = backend.name(),
            sample_rate = format.sample_rate,
            channels = format.channels,
            "device graph created"
        );

        Ok(Self {
            format,
            state: GraphState::Initializing,
            render: None,
            capture: None,
            registration: None,
        })
    }

    /// The negotiated graph format (the render device's native format).
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Whether a render node is attached.
    pub fn render_active(&self) -> bool {
        self.render.is_some()
    }

    /// Whether a capture node is attached.
    pub fn capture_active(&self) -> bool {
        self.capture.is_some()
    }

    /// Attach the capture endpoint and return the consumer end of its queue.
    ///
    /// The endpoint is opened at the capture device's own native format;
    /// a sample-rate mismatch against the graph format is logged and
    /// tolerated, not resampled. Failure leaves the graph usable in
    /// render-only mode.
    pub fn attach_capture(
        &mut self,
        backend: &dyn DeviceBackend,
        settings: &GraphSettings,
        stats: &Arc<EngineStats>,
    ) -> Result<CaptureSource> {
        let capture_format = backend
            .capture_format(settings.capture_device.as_deref())
            .map_err(|e| Error::NodeCreation {
                role: NodeRole::Capture,
                reason: e.to_string(),
            })?;

        if capture_format.sample_rate != self.format.sample_rate {
            tracing::warn!(
                capture_rate = capture_format.sample_rate,
                render_rate = self.format.sample_rate,
                "capture and render sample rates differ; mixing without resampling"
            );
        }

        let config = EndpointConfig {
            sample_rate: capture_format.sample_rate,
            channels: capture_format.channels,
            buffer_frames: settings.latency.buffer_frames(),
            device: settings.capture_device.clone(),
        };

        let enabled = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&enabled);
        let stats = Arc::clone(stats);
        let (tx, rx) = sync_channel::<AudioFrame>(CAPTURE_QUEUE_FRAMES);

        // Set when a buffer is discarded, so the next delivered buffer is
        // flagged as following a gap.
        let mut drop_pending = false;

        let stream = backend
            .build_capture_stream(
                &config,
                Box::new(move |data: &[f32]| {
                    if !gate.load(Ordering::SeqCst) {
                        return;
                    }
                    let mut frame = AudioFrame::from_samples(capture_format, data.to_vec());
                    if drop_pending {
                        frame.mark_discontinuous();
                    }
                    match tx.try_send(frame) {
                        Ok(()) => drop_pending = false,
                        Err(TrySendError::Full(_)) => {
                            drop_pending = true;
                            stats.dropped_frames.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(TrySendError::Disconnected(_)) => {}
                    }
                }),
                Box::new(|err| {
                    tracing::error!(error = err, "capture stream error");
                }),
            )
            .map_err(|e| Error::NodeCreation {
                role: NodeRole::Capture,
                reason: e.to_string(),
            })?;

        self.capture = Some(EndpointNode {
            _stream: stream,
            enabled,
        });

        Ok(CaptureSource {
            rx,
            format: capture_format,
        })
    }

    /// Attach the render endpoint and register the quantum handler on it.
    ///
    /// The handler is moved onto the audio thread. Until [`start`](Self::start)
    /// opens the gate the endpoint emits silence; after the registration
    /// is released during [`stop`](Self::stop) it emits silence again.
    /// Failure leaves the graph usable in capture-only mode.
    pub fn attach_render(
        &mut self,
        backend: &dyn DeviceBackend,
        settings: &GraphSettings,
        mut handler: QuantumHandler,
    ) -> Result<()> {
        let config = EndpointConfig {
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
            buffer_frames: settings.latency.buffer_frames(),
            device: settings.render_device.clone(),
        };

        let enabled = Arc::new(AtomicBool::new(false));
        let gate = Arc::clone(&enabled);
        let armed = Arc::new(AtomicBool::new(true));
        let armed_gate = Arc::clone(&armed);
        let channels = usize::from(self.format.channels.max(1));

        let stream = backend
            .build_render_stream(
                &config,
                Box::new(move |data: &mut [f32]| {
                    if !gate.load(Ordering::SeqCst) || !armed_gate.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        return;
                    }
                    let required = data.len() / channels;
                    match handler.handle(required) {
                        Some(frame) => {
                            let view = frame.lock_read();
                            let samples = view.samples();
                            let n = samples.len().min(data.len());
                            data[..n].copy_from_slice(&samples[..n]);
                            data[n..].fill(0.0);
                        }
                        None => data.fill(0.0),
                    }
                }),
                Box::new(|err| {
                    tracing::error!(error = err, "render stream error");
                }),
            )
            .map_err(|e| Error::NodeCreation {
                role: NodeRole::Render,
                reason: e.to_string(),
            })?;

        self.render = Some(EndpointNode {
            _stream: stream,
            enabled,
        });
        self.registration = Some(QuantumRegistration { armed });

        Ok(())
    }

    /// Open the endpoint gates and mark the graph running.
    pub fn start(&mut self) {
        if let Some(capture) = &self.capture {
            capture.enabled.store(true, Ordering::SeqCst);
        }
        if let Some(render) = &self.render {
            render.enabled.store(true, Ordering::SeqCst);
        }
        self.state = GraphState::Running;
        tracing::info!(
            render = self.render.is_some(),
            capture = self.capture.is_some(),
            "device graph started"
        );
    }

    /// Tear the graph down.
    ///
    /// Order is fixed: capture node, then the callback registration, then
    /// the render node. Every step tolerates the part being absent, so
    /// this is safe to call twice and safe on degraded graphs.
    pub fn stop(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.enabled.store(false, Ordering::SeqCst);
            drop(capture);
            tracing::debug!("capture node stopped");
        }
        if let Some(registration) = self.registration.take() {
            registration.release();
        }
        if let Some(render) = self.render.take() {
            render.enabled.store(false, Ordering::SeqCst);
            drop(render);
            tracing::debug!("render node stopped");
        }
        self.state = GraphState::Stopped;
    }
}

impl Drop for DeviceGraph {
    fn drop(&mut self) {
        if self.state == GraphState::Running {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::quantum::ToneConfig;

    fn handler_for(graph: &DeviceGraph) -> QuantumHandler {
        QuantumHandler::new(
            graph.format(),
            &ToneConfig::default(),
            None,
            Arc::new(EngineStats::default()),
        )
    }

    #[test]
    fn test_latency_mode_buffer_frames() {
        assert_eq!(LatencyMode::Lowest.buffer_frames(), 128);
        assert_eq!(LatencyMode::Standard.buffer_frames(), 480);
        assert_eq!(LatencyMode::default(), LatencyMode::Standard);
    }

    #[test]
    fn test_create_negotiates_render_format() {
        let (backend, _controller) = MockBackend::duplex();
        let graph = DeviceGraph::create(&backend, &GraphSettings::default()).unwrap();
        assert_eq!(graph.state(), GraphState::Initializing);
        assert_eq!(graph.format().sample_rate, 48000);
        assert_eq!(graph.format().channels, 2);
    }

    #[test]
    fn test_create_fails_without_render_device() {
        let (backend, _controller) = MockBackend::without_render();
        let err = DeviceGraph::create(&backend, &GraphSettings::default()).unwrap_err();
        assert!(matches!(err, Error::GraphCreation(_)));
    }

    #[test]
    fn test_attach_capture_fails_independently() {
        let (backend, _controller) = MockBackend::without_capture();
        let mut graph = DeviceGraph::create(&backend, &GraphSettings::default()).unwrap();
        let stats = Arc::new(EngineStats::default());
        let err = graph
            .attach_capture(&backend, &GraphSettings::default(), &stats)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NodeCreation {
                role: NodeRole::Capture,
                ..
            }
        ));
        assert!(!graph.capture_active());
    }

    #[test]
    fn test_lifecycle_states() {
        let (backend, _controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let handler = handler_for(&graph);
        graph.attach_render(&backend, &settings, handler).unwrap();

        assert_eq!(graph.state(), GraphState::Initializing);
        graph.start();
        assert_eq!(graph.state(), GraphState::Running);
        graph.stop();
        assert_eq!(graph.state(), GraphState::Stopped);
        assert!(!graph.render_active());

        // Second stop is a no-op.
        graph.stop();
        assert_eq!(graph.state(), GraphState::Stopped);
    }

    #[test]
    fn test_render_gated_before_start() {
        let (backend, controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let handler = handler_for(&graph);
        graph.attach_render(&backend, &settings, handler).unwrap();

        // Gate closed: the endpoint exists but renders silence.
        let rendered = controller.render_quantum(960).unwrap();
        assert!(rendered.iter().all(|&s| s == 0.0));

        graph.start();
        let rendered = controller.render_quantum(960).unwrap();
        assert!(rendered.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_stop_silences_before_teardown_completes() {
        let (backend, controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let handler = handler_for(&graph);
        graph.attach_render(&backend, &settings, handler).unwrap();
        graph.start();

        assert!(controller.render_quantum(480).is_some());
        graph.stop();

        // Stream slot is cleared once the node is dropped.
        assert!(controller.render_quantum(480).is_none());
    }

    #[test]
    fn test_registration_disarms_on_release() {
        let armed = Arc::new(AtomicBool::new(true));
        let registration = QuantumRegistration {
            armed: Arc::clone(&armed),
        };
        registration.release();
        assert!(!armed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_registration_disarms_on_drop() {
        let armed = Arc::new(AtomicBool::new(true));
        drop(QuantumRegistration {
            armed: Arc::clone(&armed),
        });
        assert!(!armed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_capture_source_drains_newest() {
        let (backend, controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let stats = Arc::new(EngineStats::default());
        let mut source = graph
            .attach_capture(&backend, &settings, &stats)
            .unwrap();
        graph.start();

        assert!(controller.feed_capture(&[0.1; 960]));
        assert!(controller.feed_capture(&[0.2; 960]));

        let (frame, superseded) = source.drain_newest();
        let frame = frame.unwrap();
        assert_eq!(superseded, 1);
        assert_eq!(frame.lock_read().samples()[0], 0.2);

        let (frame, superseded) = source.drain_newest();
        assert!(frame.is_none());
        assert_eq!(superseded, 0);
    }

    #[test]
    fn test_capture_gate_discards_before_start() {
        let (backend, controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let stats = Arc::new(EngineStats::default());
        let mut source = graph
            .attach_capture(&backend, &settings, &stats)
            .unwrap();

        assert!(controller.feed_capture(&[0.5; 480]));
        let (frame, _) = source.drain_newest();
        assert!(frame.is_none());
    }

    #[test]
    fn test_capture_overflow_marks_discontinuity() {
        let (backend, controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let stats = Arc::new(EngineStats::default());
        let mut source = graph
            .attach_capture(&backend, &settings, &stats)
            .unwrap();
        graph.start();

        // Fill the queue past capacity; the overflowing buffer is dropped.
        for _ in 0..CAPTURE_QUEUE_FRAMES + 1 {
            controller.feed_capture(&[0.1; 64]);
        }
        assert_eq!(stats.dropped_frames.load(Ordering::Relaxed), 1);

        // Drain, then deliver one more: it must carry the gap flag.
        let _ = source.drain_newest();
        controller.feed_capture(&[0.3; 64]);
        let (frame, _) = source.drain_newest();
        assert!(frame.unwrap().is_discontinuous());
    }
}
