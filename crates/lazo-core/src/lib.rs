//! Lazo Core - data model and signal primitives for the lazo duplex engine
//!
//! This crate holds everything the real-time path computes with and nothing
//! it talks to: stream formats, frame buffers, the tone generator, and the
//! monitor mix. No device I/O, no allocation beyond frame construction, no
//! std requirement.
//!
//! # Core Components
//!
//! ## Formats & Frames
//!
//! - [`AudioFormat`] - Negotiated sample rate / channels / bit depth, with
//!   all byte-stride arithmetic
//! - [`AudioFrame`] - Opaque interleaved sample buffer sized in whole
//!   sample-frames
//! - [`FrameRead`] / [`FrameWrite`] - Scope guards giving typed access to a
//!   frame's samples
//!
//! ```rust
//! use lazo_core::{AudioFormat, AudioFrame};
//!
//! let format = AudioFormat::stereo_f32(48000);
//! let mut frame = AudioFrame::with_byte_len(format, format.byte_len(960));
//! frame.lock_write().samples_mut()[0] = 0.25;
//! ```
//!
//! ## Signal Path
//!
//! - [`SineTone`] - Phase-continuous sine generator that fills interleaved
//!   quanta
//! - [`mix_channel0`] - Additive capture-to-output monitor mix
//!
//! ```rust
//! use lazo_core::{SineTone, mix_channel0};
//!
//! let mut tone = SineTone::new(48000.0);
//! let mut quantum = vec![0.0f32; 960 * 2];
//! tone.fill(&mut quantum, 2);
//!
//! let captured = [0.1f32; 480];
//! mix_channel0(&mut quantum, 2, &captured, 1);
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! lazo-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod format;
pub mod frame;
pub mod mix;
pub mod tone;

// Re-export main types at crate root
pub use format::AudioFormat;
pub use frame::{AudioFrame, FrameRead, FrameWrite};
pub use mix::mix_channel0;
pub use tone::{DEFAULT_FREQUENCY_HZ, DEFAULT_GAIN, SineTone};
