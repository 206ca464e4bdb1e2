use super::buffer::PlanarSource;
use crate::error::ProcessorError;

/// Writes planar lanes into `dest` frame by frame:
/// `[f0c0, f0c1, .., f0cK, f1c0, ..]`.
///
/// Every lane must have the same length and `dest` must hold exactly
/// `channels * frames` samples.
pub fn interleave<S: PlanarSource + ?Sized>(planar: &S, dest: &mut [f32]) -> Result<(), ProcessorError> {
    let channels = planar.channel_count();
    if channels == 0 {
        return if dest.is_empty() {
            Ok(())
        } else {
            Err(ProcessorError::ShapeMismatch {
                expected_channels: 0,
                expected_frames: 0,
                channels: 0,
                detail: "no lanes to interleave into a non-empty destination",
            })
        };
    }

    let frames = planar.lane(0).len();
    if (1..channels).any(|c| planar.lane(c).len() != frames) {
        return Err(ProcessorError::ragged(channels, frames));
    }
    if dest.len() != channels * frames {
        return Err(ProcessorError::ShapeMismatch {
            expected_channels: channels,
            expected_frames: frames,
            channels,
            detail: "interleave destination has the wrong length",
        });
    }
    if frames == 0 {
        return Ok(());
    }

    for channel in 0..channels {
        let lane = planar.lane(channel);
        for (slot, &sample) in dest[channel..].iter_mut().step_by(channels).zip(lane) {
            *slot = sample;
        }
    }
    Ok(())
}

/// Splits interleaved samples back into `channels` planar lanes.
///
/// `src.len()` must be a whole number of frames and every lane must hold
/// exactly `src.len() / channels` samples.
pub fn deinterleave(src: &[f32], channels: usize, dest: &mut [&mut [f32]]) -> Result<(), ProcessorError> {
    if channels == 0 || dest.len() != channels {
        return Err(ProcessorError::channels(channels, dest.len()));
    }
    if src.len() % channels != 0 {
        return Err(ProcessorError::ShapeMismatch {
            expected_channels: channels,
            expected_frames: src.len() / channels,
            channels,
            detail: "interleaved length is not a whole number of frames",
        });
    }
    let frames = src.len() / channels;
    if dest.iter().any(|lane| lane.len() != frames) {
        return Err(ProcessorError::ragged(channels, frames));
    }

    for (frame, samples) in src.chunks_exact(channels).enumerate() {
        for (lane, &sample) in dest.iter_mut().zip(samples) {
            lane[frame] = sample;
        }
    }
    Ok(())
}
