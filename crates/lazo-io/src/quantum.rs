//! Per-quantum render processing.
//!
//! [`QuantumHandler`] is the callback the render endpoint drives once per
//! quantum. Each invocation allocates an output buffer sized exactly for
//! the requested frame count, fills it with the continuous test tone,
//! then mixes in the newest captured buffer where the two overlap.
//!
//! The handler runs on the audio thread. It never blocks: the capture
//! queue is drained with `try_recv`, the monitor tap is fed with
//! `try_send`, and statistics are plain atomic counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;

use lazo_core::{
    AudioFormat, AudioFrame, DEFAULT_FREQUENCY_HZ, DEFAULT_GAIN, SineTone, mix_channel0,
};

use crate::Error;
use crate::graph::CaptureSource;

/// Test tone parameters.
#[derive(Debug, Clone, Copy)]
pub struct ToneConfig {
    /// Tone frequency in Hz.
    pub frequency_hz: f32,
    /// Linear gain applied to the tone.
    pub gain: f32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            gain: DEFAULT_GAIN,
        }
    }
}

/// Shared counters accumulated across the life of a session.
///
/// Updated lock-free from the audio threads; read from anywhere via
/// [`EngineStats::snapshot`].
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Render quanta processed.
    pub(crate) quanta: AtomicU64,
    /// Capture sample-frames mixed into the render output.
    pub(crate) mixed_frames: AtomicU64,
    /// Capture buffers discarded, either on queue overflow or because a
    /// newer buffer superseded them at drain time.
    pub(crate) dropped_frames: AtomicU64,
    /// Buffers consumed that followed a gap in the capture stream.
    pub(crate) discontinuities: AtomicU64,
}

impl EngineStats {
    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            quanta: self.quanta.load(Ordering::Relaxed),
            mixed_frames: self.mixed_frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            discontinuities: self.discontinuities.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Render quanta processed.
    pub quanta: u64,
    /// Capture sample-frames mixed into the render output.
    pub mixed_frames: u64,
    /// Capture buffers discarded.
    pub dropped_frames: u64,
    /// Buffers consumed that followed a capture gap.
    pub discontinuities: u64,
}

/// Per-quantum processor: continuous tone plus microphone monitor mix.
///
/// Owns the tone oscillator, so phase is continuous across quanta for as
/// long as the handler lives, and the consumer end of the capture queue.
pub struct QuantumHandler {
    format: AudioFormat,
    tone: SineTone,
    capture: Option<CaptureSource>,
    stats: Arc<EngineStats>,
    tap: Option<SyncSender<AudioFrame>>,
}

impl QuantumHandler {
    /// Create a handler for the given output format.
    ///
    /// `capture` is `None` when the session runs render-only; the handler
    /// then produces the bare tone.
    pub fn new(
        format: AudioFormat,
        tone: &ToneConfig,
        capture: Option<CaptureSource>,
        stats: Arc<EngineStats>,
    ) -> Self {
        let mut sine = SineTone::new(format.sample_rate as f32);
        sine.set_frequency(tone.frequency_hz);
        sine.set_gain(tone.gain);
        Self {
            format,
            tone: sine,
            capture,
            stats,
            tap: None,
        }
    }

    /// Install a monitor tap.
    ///
    /// Every produced quantum is offered to `tap` with a non-blocking
    /// send; copies are dropped when the tap consumer falls behind.
    pub fn set_tap(&mut self, tap: SyncSender<AudioFrame>) {
        self.tap = Some(tap);
    }

    /// Produce one output quantum of `required` sample-frames.
    ///
    /// The buffer is allocated at exactly `required` frames in the
    /// handler's format, filled with the tone, and the newest captured
    /// buffer (if any) is mixed in over the overlapping frame range. A
    /// quantum with nothing captured is normal and yields the bare tone.
    ///
    /// Returns `None` when `required` is zero.
    pub fn handle(&mut self, required: usize) -> Option<AudioFrame> {
        if required == 0 {
            return None;
        }

        let out_channels = usize::from(self.format.channels.max(1));
        let mut frame = AudioFrame::with_byte_len(self.format, self.format.byte_len(required));

        {
            let mut view = frame.lock_write();
            self.tone.fill(view.samples_mut(), out_channels);
        }

        if let Some(source) = &mut self.capture {
            let (captured, superseded) = source.drain_newest();
            if superseded > 0 {
                self.stats.dropped_frames.fetch_add(superseded, Ordering::Relaxed);
            }
            if let Some(captured) = captured {
                if captured.is_discontinuous() {
                    self.stats.discontinuities.fetch_add(1, Ordering::Relaxed);
                }

                let capture_format = source.format();
                if !capture_format.is_frame_aligned(captured.byte_len()) {
                    let err = Error::FrameAlignment {
                        byte_len: captured.byte_len(),
                        bytes_per_frame: capture_format.bytes_per_frame(),
                    };
                    tracing::error!(
                        error = %err,
                        "captured buffer is not frame aligned; mixing whole frames only"
                    );
                }

                let capture_channels = usize::from(capture_format.channels.max(1));
                let captured_view = captured.lock_read();
                let mut out_view = frame.lock_write();
                let mixed = mix_channel0(
                    out_view.samples_mut(),
                    out_channels,
                    captured_view.samples(),
                    capture_channels,
                );
                drop(out_view);
                self.stats.mixed_frames.fetch_add(mixed as u64, Ordering::Relaxed);
            }
        }

        if let Some(tap) = &self.tap {
            let _ = tap.try_send(frame.clone());
        }

        self.stats.quanta.fetch_add(1, Ordering::Relaxed);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DeviceGraph, GraphSettings};
    use crate::mock::MockBackend;
    use lazo_core::AudioFormat;
    use std::sync::mpsc::sync_channel;

    fn stereo_48k() -> AudioFormat {
        AudioFormat::stereo_f32(48000)
    }

    fn tone_only_handler() -> (QuantumHandler, Arc<EngineStats>) {
        let stats = Arc::new(EngineStats::default());
        let handler = QuantumHandler::new(
            stereo_48k(),
            &ToneConfig::default(),
            None,
            Arc::clone(&stats),
        );
        (handler, stats)
    }

    /// Handler with a live mono capture source behind a mock backend.
    fn duplex_handler() -> (QuantumHandler, Arc<EngineStats>, crate::mock::MockController, DeviceGraph)
    {
        let (backend, controller) = MockBackend::duplex();
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let stats = Arc::new(EngineStats::default());
        let source = graph
            .attach_capture(&backend, &settings, &stats)
            .unwrap();
        graph.start();
        let handler = QuantumHandler::new(
            graph.format(),
            &ToneConfig::default(),
            Some(source),
            Arc::clone(&stats),
        );
        (handler, stats, controller, graph)
    }

    #[test]
    fn test_required_zero_yields_nothing() {
        let (mut handler, _) = tone_only_handler();
        assert!(handler.handle(0).is_none());
    }

    #[test]
    fn test_output_sized_exactly() {
        let (mut handler, _) = tone_only_handler();
        let frame = handler.handle(960).unwrap();
        assert_eq!(frame.frame_count(), 960);
        assert_eq!(frame.byte_len(), 960 * 2 * 4);
    }

    #[test]
    fn test_tone_only_matches_reference() {
        let (mut handler, _) = tone_only_handler();
        let frame = handler.handle(960).unwrap();

        let mut reference = SineTone::new(48000.0);
        let mut expected = vec![0.0f32; 960 * 2];
        reference.fill(&mut expected, 2);

        let view = frame.lock_read();
        assert_eq!(view.samples(), expected.as_slice());
    }

    #[test]
    fn test_left_equals_right() {
        let (mut handler, _) = tone_only_handler();
        let frame = handler.handle(480).unwrap();
        let view = frame.lock_read();
        for pair in view.samples().chunks_exact(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_phase_continuous_across_quanta() {
        let (mut handler, _) = tone_only_handler();
        let first = handler.handle(480).unwrap();
        let second = handler.handle(480).unwrap();

        let mut reference = SineTone::new(48000.0);
        let mut expected = vec![0.0f32; 960 * 2];
        reference.fill(&mut expected, 2);

        assert_eq!(first.lock_read().samples(), &expected[..960]);
        assert_eq!(second.lock_read().samples(), &expected[960..]);
    }

    #[test]
    fn test_partial_capture_mixes_prefix_only() {
        let (mut handler, stats, controller, _graph) = duplex_handler();
        assert!(controller.feed_capture(&[0.1; 480]));

        let frame = handler.handle(960).unwrap();

        let mut reference = SineTone::new(48000.0);
        let mut tone = vec![0.0f32; 960 * 2];
        reference.fill(&mut tone, 2);

        let view = frame.lock_read();
        let samples = view.samples();
        for i in 0..480 {
            assert!((samples[2 * i] - (tone[2 * i] + 0.1)).abs() < 1e-6);
            assert!((samples[2 * i + 1] - (tone[2 * i + 1] + 0.1)).abs() < 1e-6);
        }
        for i in 480..960 {
            assert_eq!(samples[2 * i], tone[2 * i]);
            assert_eq!(samples[2 * i + 1], tone[2 * i + 1]);
        }
        assert_eq!(stats.snapshot().mixed_frames, 480);
    }

    #[test]
    fn test_empty_capture_quantum_is_bare_tone() {
        let (mut handler, stats, _controller, _graph) = duplex_handler();
        let frame = handler.handle(960).unwrap();

        let mut reference = SineTone::new(48000.0);
        let mut expected = vec![0.0f32; 960 * 2];
        reference.fill(&mut expected, 2);

        assert_eq!(frame.lock_read().samples(), expected.as_slice());
        assert_eq!(stats.snapshot().mixed_frames, 0);
    }

    #[test]
    fn test_surplus_capture_ignored_beyond_required() {
        let (mut handler, stats, controller, _graph) = duplex_handler();
        assert!(controller.feed_capture(&[0.2; 2000]));

        let frame = handler.handle(960).unwrap();
        assert_eq!(frame.frame_count(), 960);
        assert_eq!(stats.snapshot().mixed_frames, 960);
    }

    #[test]
    fn test_misaligned_stereo_capture_floor_mixes() {
        let (backend, controller) = MockBackend::with_formats(
            AudioFormat::stereo_f32(48000),
            AudioFormat::stereo_f32(48000),
        );
        let settings = GraphSettings::default();
        let mut graph = DeviceGraph::create(&backend, &settings).unwrap();
        let stats = Arc::new(EngineStats::default());
        let source = graph
            .attach_capture(&backend, &settings, &stats)
            .unwrap();
        graph.start();
        let mut handler = QuantumHandler::new(
            graph.format(),
            &ToneConfig::default(),
            Some(source),
            Arc::clone(&stats),
        );

        // 961 stereo samples: half a frame dangles and must be ignored.
        assert!(controller.feed_capture(&[0.1; 961]));
        let frame = handler.handle(960).unwrap();
        assert_eq!(frame.frame_count(), 960);
        assert_eq!(stats.snapshot().mixed_frames, 480);
    }

    #[test]
    fn test_quanta_counter_accumulates() {
        let (mut handler, stats) = tone_only_handler();
        for _ in 0..5 {
            handler.handle(128);
        }
        assert_eq!(stats.snapshot().quanta, 5);
    }

    #[test]
    fn test_tap_receives_copy() {
        let (mut handler, _) = tone_only_handler();
        let (tx, rx) = sync_channel(4);
        handler.set_tap(tx);

        let frame = handler.handle(256).unwrap();
        let tapped = rx.try_recv().unwrap();
        assert_eq!(tapped.lock_read().samples(), frame.lock_read().samples());
    }

    #[test]
    fn test_full_tap_never_blocks() {
        let (mut handler, _) = tone_only_handler();
        let (tx, rx) = sync_channel(1);
        handler.set_tap(tx);

        handler.handle(64);
        handler.handle(64);
        handler.handle(64);

        // Only the first copy fit; the rest were dropped without stalling.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
