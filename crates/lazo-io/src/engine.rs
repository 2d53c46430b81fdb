//! Duplex engine facade.
//!
//! [`DuplexEngine`] is the surface a host program talks to: `start`,
//! `stop`, and the `run_for` convenience wrapper. Starting negotiates the
//! device graph, attaches whatever endpoints the machine offers, and
//! returns once audio is flowing; a machine with no microphone, or no
//! speakers, or neither, still reaches the running state in a degraded
//! mode rather than failing the call. The only outcome that leaves the
//! engine idle is failing to negotiate a graph format at all, and even
//! that is logged rather than surfaced, so `start` has no error path.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lazo_io::{DuplexEngine, GraphSettings, ToneConfig};
//!
//! let mut engine = DuplexEngine::new(GraphSettings::default(), ToneConfig::default());
//! engine.run_for(Duration::from_secs(4));
//! ```

use std::sync::Arc;
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use lazo_core::{AudioFormat, AudioFrame};

use crate::backend::DeviceBackend;
use crate::cpal_backend::CpalBackend;
use crate::graph::{DeviceGraph, GraphSettings, GraphState};
use crate::quantum::{EngineStats, QuantumHandler, StatsSnapshot, ToneConfig};

/// Real-time duplex audio engine.
///
/// Renders a continuous tone with the default output device while mixing
/// the default input device's first channel into both output channels.
/// Owns its backend, so a stopped engine can be started again; each start
/// builds a fresh graph and a fresh oscillator.
pub struct DuplexEngine {
    backend: Box<dyn DeviceBackend>,
    settings: GraphSettings,
    tone: ToneConfig,
    stats: Arc<EngineStats>,
    tap: Option<SyncSender<AudioFrame>>,
    graph: Option<DeviceGraph>,
}

impl DuplexEngine {
    /// Engine over the platform's default audio host.
    pub fn new(settings: GraphSettings, tone: ToneConfig) -> Self {
        Self::with_backend(Box::new(CpalBackend::new()), settings, tone)
    }

    /// Engine over an explicit backend.
    pub fn with_backend(
        backend: Box<dyn DeviceBackend>,
        settings: GraphSettings,
        tone: ToneConfig,
    ) -> Self {
        Self {
            backend,
            settings,
            tone,
            stats: Arc::new(EngineStats::default()),
            tap: None,
            graph: None,
        }
    }

    /// Install a monitor tap fed with a copy of every rendered quantum.
    ///
    /// Takes effect at the next [`start`](Self::start).
    pub fn set_monitor_tap(&mut self, tap: SyncSender<AudioFrame>) {
        self.tap = Some(tap);
    }

    /// Negotiate, build, and start the audio session.
    ///
    /// Blocks until the graph is running, possibly degraded: a failed
    /// capture node means tone-only output, a failed render node means a
    /// silent session. Degradations are logged, never returned. The one
    /// non-starting outcome is graph creation failure, after which the
    /// engine is still idle and [`stop`](Self::stop) remains safe.
    pub fn start(&mut self) {
        if self.state() == GraphState::Running {
            tracing::debug!("start requested while already running");
            return;
        }

        let mut graph = match DeviceGraph::create(self.backend.as_ref(), &self.settings) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::error!(error = %e, "audio graph creation failed; engine stays idle");
                return;
            }
        };

        let capture =
            match graph.attach_capture(self.backend.as_ref(), &self.settings, &self.stats) {
                Ok(source) => Some(source),
                Err(e) => {
                    tracing::warn!(error = %e, "capture unavailable; running tone-only");
                    None
                }
            };

        let mut handler = QuantumHandler::new(
            graph.format(),
            &self.tone,
            capture,
            Arc::clone(&self.stats),
        );
        if let Some(tap) = &self.tap {
            handler.set_tap(tap.clone());
        }

        if let Err(e) = graph.attach_render(self.backend.as_ref(), &self.settings, handler) {
            tracing::warn!(error = %e, "render unavailable; session will be silent");
        }

        graph.start();
        self.graph = Some(graph);
    }

    /// Stop the audio session.
    ///
    /// Tears the graph down in order: capture, callback registration,
    /// render, graph. Idempotent, and safe before any start or after a
    /// start that failed partway.
    pub fn stop(&mut self) {
        let Some(graph) = &mut self.graph else {
            tracing::debug!("stop requested with no graph");
            return;
        };
        let was_running = graph.state() == GraphState::Running;
        graph.stop();
        if was_running {
            let stats = self.stats.snapshot();
            tracing::info!(
                quanta = stats.quanta,
                mixed_frames = stats.mixed_frames,
                dropped_frames = stats.dropped_frames,
                discontinuities = stats.discontinuities,
                "engine stopped"
            );
        }
    }

    /// Start, hold for `duration`, then stop. Blocks throughout.
    pub fn run_for(&mut self, duration: Duration) {
        self.start();
        std::thread::sleep(duration);
        self.stop();
    }

    /// Current lifecycle state; [`GraphState::Uninitialized`] before the
    /// first successful start.
    pub fn state(&self) -> GraphState {
        self.graph
            .as_ref()
            .map(DeviceGraph::state)
            .unwrap_or(GraphState::Uninitialized)
    }

    /// The negotiated session format, once a graph exists.
    pub fn format(&self) -> Option<AudioFormat> {
        self.graph.as_ref().map(DeviceGraph::format)
    }

    /// Whether the running session has a render path.
    pub fn render_active(&self) -> bool {
        self.graph.as_ref().is_some_and(DeviceGraph::render_active)
    }

    /// Whether the running session has a capture path.
    pub fn capture_active(&self) -> bool {
        self.graph.as_ref().is_some_and(DeviceGraph::capture_active)
    }

    /// Counters accumulated since the engine was created.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
