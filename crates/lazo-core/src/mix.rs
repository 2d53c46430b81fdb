//! Additive capture-into-output mixing.
//!
//! The monitor path takes captured channel 0 and adds it to output
//! channels 0 and 1, sample-frame by sample-frame, over the overlap of the
//! two buffers. Capture shortfall leaves the tail of the output untouched;
//! capture surplus is ignored. No clipping or limiting is applied; gain
//! staging upstream is expected to leave headroom.

/// Add captured channel 0 into output channels 0 and 1.
///
/// Both buffers are interleaved. Mixing covers
/// `min(output frames, captured frames)` sample-frames; higher captured
/// channels are dropped, and a mono output receives channel 0 only.
/// Returns the number of sample-frames mixed.
///
/// # Example
///
/// ```rust
/// use lazo_core::mix_channel0;
///
/// let mut output = vec![0.3f32; 4]; // 2 stereo frames of tone
/// let captured = [0.1f32; 1]; // 1 mono frame
/// let mixed = mix_channel0(&mut output, 2, &captured, 1);
/// assert_eq!(mixed, 1);
/// assert_eq!(output, [0.4, 0.4, 0.3, 0.3]);
/// ```
pub fn mix_channel0(
    output: &mut [f32],
    output_channels: usize,
    captured: &[f32],
    captured_channels: usize,
) -> usize {
    if output_channels == 0 || captured_channels == 0 {
        return 0;
    }

    let overlap = (output.len() / output_channels).min(captured.len() / captured_channels);

    let out_frames = output.chunks_exact_mut(output_channels);
    let captured_frames = captured.chunks_exact(captured_channels);
    for (out_frame, cap_frame) in out_frames.zip(captured_frames) {
        let mic = cap_frame[0];
        out_frame[0] += mic;
        if output_channels > 1 {
            out_frame[1] += mic;
        }
    }

    overlap
}

#[cfg(test)]
mod tests {
    #[cfg(not(feature = "std"))]
    extern crate alloc;

    #[cfg(feature = "std")]
    extern crate std as alloc;

    use alloc::vec;

    use super::*;

    #[test]
    fn test_partial_capture_mixes_prefix_only() {
        let mut output = vec![0.0f32; 960 * 2];
        let captured = vec![0.1f32; 480];

        let mixed = mix_channel0(&mut output, 2, &captured, 1);
        assert_eq!(mixed, 480);

        for (s, frame) in output.chunks_exact(2).enumerate() {
            let expected = if s < 480 { 0.1 } else { 0.0 };
            assert_eq!(frame[0], expected, "left at frame {}", s);
            assert_eq!(frame[1], expected, "right at frame {}", s);
        }
    }

    #[test]
    fn test_mix_is_additive() {
        let mut output = vec![0.5f32; 8];
        let captured = vec![0.25f32; 4];

        mix_channel0(&mut output, 2, &captured, 1);
        assert!(output.iter().all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_stereo_capture_uses_channel_zero_only() {
        let mut output = vec![0.0f32; 6];
        // Interleaved stereo capture: channel 0 carries 0.2, channel 1 carries 0.9
        let captured = vec![0.2f32, 0.9, 0.2, 0.9, 0.2, 0.9];

        let mixed = mix_channel0(&mut output, 2, &captured, 2);
        assert_eq!(mixed, 3);
        assert!(output.iter().all(|&s| (s - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_surplus_capture_ignored() {
        let mut output = vec![0.0f32; 4 * 2];
        let captured = vec![0.1f32; 1000];

        let mixed = mix_channel0(&mut output, 2, &captured, 1);
        assert_eq!(mixed, 4);
        assert!(output.iter().all(|&s| (s - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_mono_output_receives_channel_zero() {
        let mut output = vec![0.0f32; 4];
        let captured = vec![0.3f32; 4];

        let mixed = mix_channel0(&mut output, 1, &captured, 1);
        assert_eq!(mixed, 4);
        assert!(output.iter().all(|&s| (s - 0.3).abs() < 1e-6));
    }

    #[test]
    fn test_empty_capture_leaves_output_untouched() {
        let mut output = vec![0.7f32; 8];
        let mixed = mix_channel0(&mut output, 2, &[], 1);
        assert_eq!(mixed, 0);
        assert!(output.iter().all(|&s| s == 0.7));
    }

    #[test]
    fn test_zero_channel_counts_are_no_ops() {
        let mut output = vec![0.7f32; 8];
        assert_eq!(mix_channel0(&mut output, 0, &[0.1; 4], 1), 0);
        assert_eq!(mix_channel0(&mut output, 2, &[0.1; 4], 0), 0);
        assert!(output.iter().all(|&s| s == 0.7));
    }
}
