//! Continuous sine tone generation.
//!
//! A single phase-accumulator sine generator that fills interleaved output
//! buffers quantum by quantum. Phase is carried in radians and survives
//! across calls of any chunking, so the tone is continuous for the lifetime
//! of the generator. A sine has a single harmonic, so no band-limiting is
//! needed; `libm::sinf` keeps it `no_std`-compatible.

use core::f32::consts::TAU;
use libm::sinf;

/// Default tone frequency in Hz.
pub const DEFAULT_FREQUENCY_HZ: f32 = 100.0;

/// Default linear gain. Leaves generous headroom for the mixed-in capture
/// signal, so the engine never needs a limiter.
pub const DEFAULT_GAIN: f32 = 0.3;

/// Stateful sine tone generator.
///
/// # Example
///
/// ```rust
/// use lazo_core::SineTone;
///
/// let mut tone = SineTone::new(48000.0);
/// tone.set_frequency(100.0);
/// tone.set_gain(0.3);
///
/// // Fill one stereo quantum; phase carries into the next call.
/// let mut quantum = vec![0.0f32; 960 * 2];
/// tone.fill(&mut quantum, 2);
/// ```
#[derive(Debug, Clone)]
pub struct SineTone {
    /// Current phase in radians, [0, 2π).
    phase: f32,
    /// Phase advance per sample in radians: 2π · frequency / sample_rate.
    phase_inc: f32,
    /// Sample rate in Hz.
    sample_rate: f32,
    /// Frequency in Hz.
    frequency: f32,
    /// Linear output gain.
    gain: f32,
}

impl Default for SineTone {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl SineTone {
    /// Create a generator at the given sample rate with the default
    /// frequency and gain.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: TAU * DEFAULT_FREQUENCY_HZ / sample_rate,
            sample_rate,
            frequency: DEFAULT_FREQUENCY_HZ,
            gain: DEFAULT_GAIN,
        }
    }

    /// Set frequency in Hz. Phase is not reset; the waveform bends to the
    /// new rate from wherever it is.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = freq_hz.max(0.0);
        self.phase_inc = TAU * self.frequency / self.sample_rate;
    }

    /// Get current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set linear output gain.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Get current linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set sample rate and recalculate the phase increment.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase_inc = TAU * self.frequency / self.sample_rate;
    }

    /// Get current sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current phase in radians.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Generate the next sample and advance the phase.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let output = sinf(self.phase) * self.gain;
        self.phase += self.phase_inc;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        output
    }

    /// Fill an interleaved buffer with the tone.
    ///
    /// Each sample-frame gets one generated value, written identically to
    /// channels 0 and 1. A mono buffer receives channel 0 only; channels
    /// beyond the first two are left untouched. The buffer length must be
    /// a whole number of sample-frames; a trailing partial frame is not
    /// written.
    pub fn fill(&mut self, samples: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        for frame in samples.chunks_exact_mut(channels) {
            let value = self.next();
            frame[0] = value;
            if channels > 1 {
                frame[1] = value;
            }
        }
    }
}
