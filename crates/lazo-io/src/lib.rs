//! Device graph and duplex engine for lazo.
//!
//! This crate connects the lazo-core signal path to real audio hardware:
//!
//! - **Backend seam**: [`DeviceBackend`] abstracts the platform audio API;
//!   [`CpalBackend`] is the production implementation, [`MockBackend`] the
//!   deterministic one for tests and CI
//! - **Device graph**: [`DeviceGraph`] negotiates formats and owns the
//!   capture and render paths and the routing between them
//! - **Quantum processing**: [`QuantumHandler`] runs once per render
//!   quantum, generating the tone and mixing in captured audio
//! - **Engine facade**: [`DuplexEngine`] is the start/stop surface a host
//!   calls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lazo_io::{DuplexEngine, GraphSettings, ToneConfig};
//! use std::time::Duration;
//!
//! let mut engine = DuplexEngine::new(GraphSettings::default(), ToneConfig::default());
//! engine.run_for(Duration::from_secs(4));
//! ```

mod backend;
mod cpal_backend;
mod engine;
mod graph;
pub mod mock;
mod quantum;
mod recorder;

pub use backend::{
    CaptureCallback, DeviceBackend, DeviceInfo, EndpointConfig, ErrorCallback, RenderCallback,
    StreamHandle,
};
pub use cpal_backend::CpalBackend;
pub use engine::DuplexEngine;
pub use graph::{
    CaptureSource, DeviceGraph, GraphSettings, GraphState, LatencyMode, QuantumRegistration,
};
pub use mock::{MockBackend, MockController};
pub use quantum::{EngineStats, QuantumHandler, StatsSnapshot, ToneConfig};
pub use recorder::{MONITOR_QUEUE_FRAMES, WavSink, monitor_channel};

/// Which half of the duplex graph an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// The input (microphone) path.
    Capture,
    /// The output (speaker) path.
    Render,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Capture => f.write_str("capture"),
            NodeRole::Render => f.write_str("render"),
        }
    }
}

/// Error types for device graph and engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The device graph itself could not be created: no audio subsystem or
    /// no render device to negotiate a format from. The engine continues
    /// without a graph.
    #[error("graph creation failed: {0}")]
    GraphCreation(String),

    /// A capture or render node could not be created. Node failures are
    /// independent; the other path continues in a degraded mode.
    #[error("{role} node creation failed: {reason}")]
    NodeCreation {
        /// The path that failed.
        role: NodeRole,
        /// Backend error description.
        reason: String,
    },

    /// Platform stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// A frame's byte size is not a whole number of sample-frames. Sizes
    /// are computed from the negotiated format, so this indicates a defect
    /// in the size computation, not a runtime condition to recover from.
    #[error("frame of {byte_len} bytes is not aligned to {bytes_per_frame}-byte sample-frames")]
    FrameAlignment {
        /// Actual byte length of the offending buffer.
        byte_len: usize,
        /// The format's block stride.
        bytes_per_frame: usize,
    },

    /// WAV recording error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),
}

/// Convenience result type for device graph and engine operations.
pub type Result<T> = std::result::Result<T, Error>;
