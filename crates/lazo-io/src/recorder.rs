//! Monitor tap plumbing and WAV capture of rendered output.
//!
//! The engine can clone every rendered quantum into a bounded channel
//! (the monitor tap); this module provides that channel plus [`WavSink`],
//! which drains tapped frames into a 32-bit float WAV file. Draining
//! happens on the consumer's thread, so disk I/O never touches the audio
//! path.
//!
//! ```rust,no_run
//! use lazo_io::{DuplexEngine, GraphSettings, ToneConfig, WavSink, monitor_channel};
//!
//! # fn main() -> lazo_io::Result<()> {
//! let (tap, monitor) = monitor_channel();
//! let mut engine = DuplexEngine::new(GraphSettings::default(), ToneConfig::default());
//! engine.set_monitor_tap(tap);
//! engine.start();
//!
//! let format = engine.format().unwrap_or_default();
//! let mut sink = WavSink::create("monitor.wav", format)?;
//! while let Ok(frame) = monitor.recv() {
//!     sink.write_frame(&frame)?;
//! }
//! sink.finalize()?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use hound::{SampleFormat, WavWriter};
use lazo_core::{AudioFormat, AudioFrame};

use crate::Result;

/// Capacity of the monitor tap channel, in quanta.
///
/// Generous compared to the capture queue: the tap consumer writes to
/// disk and may stall briefly without costing audio.
pub const MONITOR_QUEUE_FRAMES: usize = 64;

/// Build the monitor tap channel.
///
/// The sender goes to [`DuplexEngine::set_monitor_tap`](crate::DuplexEngine::set_monitor_tap);
/// the receiver side is drained by the host, typically into a [`WavSink`].
pub fn monitor_channel() -> (SyncSender<AudioFrame>, Receiver<AudioFrame>) {
    sync_channel(MONITOR_QUEUE_FRAMES)
}

/// Streams audio frames into a 32-bit float WAV file.
pub struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    frames_written: u64,
}

impl WavSink {
    /// Create the file and write a header matching `format`.
    pub fn create<P: AsRef<Path>>(path: P, format: AudioFormat) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            frames_written: 0,
        })
    }

    /// Append one frame's interleaved samples.
    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        let view = frame.lock_read();
        for &sample in view.samples() {
            self.writer.write_sample(sample)?;
        }
        self.frames_written += frame.frame_count() as u64;
        Ok(())
    }

    /// Sample-frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and close the file, fixing up the header lengths.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sink_roundtrip() {
        let format = AudioFormat::stereo_f32(48000);
        let mut frame = AudioFrame::silent(format, 4);
        {
            let mut guard = frame.lock_write();
            for (i, sample) in guard.samples_mut().iter_mut().enumerate() {
                *sample = i as f32 / 8.0;
            }
        }

        let file = NamedTempFile::new().unwrap();
        let mut sink = WavSink::create(file.path(), format).unwrap();
        sink.write_frame(&frame).unwrap();
        assert_eq!(sink.frames_written(), 4);
        sink.finalize().unwrap();

        let reader = WavReader::open(file.path()).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.sample_format, SampleFormat::Float);

        let loaded: Vec<f32> = reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(loaded.len(), 8);
        for (i, sample) in loaded.iter().enumerate() {
            assert!((sample - i as f32 / 8.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sink_accumulates_frames() {
        let format = AudioFormat::new(48000, 1, 32);
        let file = NamedTempFile::new().unwrap();
        let mut sink = WavSink::create(file.path(), format).unwrap();

        for _ in 0..3 {
            let frame = AudioFrame::silent(format, 480);
            sink.write_frame(&frame).unwrap();
        }
        assert_eq!(sink.frames_written(), 1440);
        sink.finalize().unwrap();

        let reader = WavReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 1440);
    }

    #[test]
    fn test_monitor_channel_is_bounded() {
        let (tx, rx) = monitor_channel();
        let format = AudioFormat::stereo_f32(48000);
        for _ in 0..MONITOR_QUEUE_FRAMES {
            tx.try_send(AudioFrame::silent(format, 1)).unwrap();
        }
        assert!(tx.try_send(AudioFrame::silent(format, 1)).is_err());
        assert_eq!(rx.try_iter().count(), MONITOR_QUEUE_FRAMES);
    }
}
