//! Audio frame buffers and scoped sample access.
//!
//! An [`AudioFrame`] is an opaque buffer holding a whole number of
//! interleaved sample-frames in a fixed [`AudioFormat`]. Sample data is
//! reached only through the [`FrameRead`] / [`FrameWrite`] scope guards, so
//! a typed view can never outlive the access that produced it.
//!
//! Ownership follows the data flow: the capture path creates frames and
//! hands them over the routing edge, the render path creates output frames
//! and consumes them on submission. There is no shared mutation and no
//! refcounting.
//!
//! # Memory
//!
//! The sample buffer is heap-allocated at construction and never
//! reallocates. Samples are stored as `f32`; byte-level sizes and views are
//! derived, which keeps the typed view aligned by construction.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::format::AudioFormat;

/// A buffer of interleaved samples in a fixed format.
///
/// # Example
///
/// ```rust
/// use lazo_core::{AudioFormat, AudioFrame};
///
/// let format = AudioFormat::stereo_f32(48000);
/// let mut frame = AudioFrame::silent(format, 960);
/// assert_eq!(frame.frame_count(), 960);
/// assert_eq!(frame.byte_len(), 960 * 8);
///
/// {
///     let mut guard = frame.lock_write();
///     guard.samples_mut()[0] = 0.5;
/// } // typed view ends here
///
/// assert_eq!(frame.lock_read().samples()[0], 0.5);
/// ```
#[derive(Clone, Debug)]
pub struct AudioFrame {
    samples: Vec<f32>,
    format: AudioFormat,
    discontinuous: bool,
}

impl AudioFrame {
    /// Allocate a zeroed frame of exactly `byte_len` bytes.
    ///
    /// `byte_len` must be a whole number of sample-frames in `format`; a
    /// violation is a defect in the caller's size computation.
    pub fn with_byte_len(format: AudioFormat, byte_len: usize) -> Self {
        debug_assert!(format.is_frame_aligned(byte_len), "byte length is not frame-aligned");
        debug_assert!(format.bits_per_sample == 32, "frames store 32-bit float samples");
        Self {
            samples: vec![0.0; byte_len / format.bytes_per_sample()],
            format,
            discontinuous: false,
        }
    }

    /// Allocate a zeroed frame holding `frames` sample-frames.
    pub fn silent(format: AudioFormat, frames: usize) -> Self {
        Self::with_byte_len(format, format.byte_len(frames))
    }

    /// Wrap already-interleaved samples, as delivered by a capture callback.
    ///
    /// The sample count is taken as-is. A partial trailing sample-frame,
    /// should a device ever deliver one, is excluded from
    /// [`frame_count`](Self::frame_count) and ignored by consumers.
    pub fn from_samples(format: AudioFormat, samples: Vec<f32>) -> Self {
        Self {
            samples,
            format,
            discontinuous: false,
        }
    }

    /// Format this frame's samples are laid out in.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Total size of the sample data in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.samples.len() * core::mem::size_of::<f32>()
    }

    /// Number of whole sample-frames, derived from byte length and format.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.format.frames_in(self.byte_len())
    }

    /// Whether a gap precedes this frame in the captured stream.
    pub fn is_discontinuous(&self) -> bool {
        self.discontinuous
    }

    /// Flag a gap before this frame. Recorded, never corrected.
    pub fn mark_discontinuous(&mut self) {
        self.discontinuous = true;
    }

    /// Open the frame for reading. The typed view lives only as long as
    /// the returned guard.
    pub fn lock_read(&self) -> FrameRead<'_> {
        FrameRead {
            samples: &self.samples,
        }
    }

    /// Open the frame for writing. The typed view lives only as long as
    /// the returned guard, and the borrow rules keep it exclusive.
    pub fn lock_write(&mut self) -> FrameWrite<'_> {
        FrameWrite {
            samples: &mut self.samples,
        }
    }

    /// Consume the frame, yielding its interleaved samples.
    ///
    /// This is the submission edge: once a frame is handed to a playback
    /// buffer or a recorder sink it no longer exists as a frame.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Read access to a frame's samples, scoped to the guard's lifetime.
pub struct FrameRead<'a> {
    samples: &'a [f32],
}

impl FrameRead<'_> {
    /// Typed view of the interleaved samples.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        self.samples
    }

    /// Raw byte view of the same region, for size and alignment checks.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.samples)
    }
}

/// Write access to a frame's samples, scoped to the guard's lifetime.
pub struct FrameWrite<'a> {
    samples: &'a mut [f32],
}

impl FrameWrite<'_> {
    /// Typed view of the interleaved samples.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        self.samples
    }

    /// Mutable typed view of the interleaved samples.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        self.samples
    }
}
