//! Negotiated stream format and byte-stride arithmetic.
//!
//! Devices report their format (sample rate, channel count, bit depth) at
//! negotiation time; everything downstream derives buffer sizes from it.
//! All size math lives here so frame allocation and alignment checks agree
//! on a single definition of the block stride.

/// Format of an audio stream as negotiated with a device.
///
/// Immutable for the lifetime of a device graph: it is captured once when
/// the graph is created and every frame allocated afterwards is sized
/// against it.
///
/// # Example
///
/// ```rust
/// use lazo_core::AudioFormat;
///
/// let format = AudioFormat::new(48000, 2, 32);
/// assert_eq!(format.bytes_per_frame(), 8);
/// assert_eq!(format.byte_len(960), 7680);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per single sample (one channel). Always a multiple of 8.
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(48000, 2, 32)
    }
}

impl AudioFormat {
    /// Create a format. `bits_per_sample` must be a multiple of 8.
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        debug_assert!(bits_per_sample % 8 == 0, "fractional-byte sample widths are not supported");
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Stereo 32-bit float at the given sample rate, the common negotiated case.
    pub fn stereo_f32(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2, 32)
    }

    /// Bytes occupied by one sample of one channel.
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample) / 8
    }

    /// Bytes occupied by one sample-frame (one sample for every channel).
    ///
    /// This is the block stride: a valid frame buffer's byte length is
    /// always a whole multiple of it.
    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        usize::from(self.channels) * self.bytes_per_sample()
    }

    /// Byte length of a buffer holding `frames` sample-frames.
    #[inline]
    pub fn byte_len(&self, frames: usize) -> usize {
        frames * self.bytes_per_frame()
    }

    /// Number of whole sample-frames in a buffer of `byte_len` bytes.
    #[inline]
    pub fn frames_in(&self, byte_len: usize) -> usize {
        byte_len / self.bytes_per_frame()
    }

    /// Whether `byte_len` is a whole number of sample-frames.
    ///
    /// A buffer that fails this check is a programming defect somewhere in
    /// the size computation, not a runtime condition to recover from.
    #[inline]
    pub fn is_frame_aligned(&self, byte_len: usize) -> bool {
        byte_len % self.bytes_per_frame() == 0
    }
}
