pub mod yin;

pub use yin::YinEstimator;

use crate::error::EstimatorError;

/// Everything an estimator gets for one analysis block.
#[derive(Debug, Clone, Copy)]
pub struct EstimateRequest<'a> {
    /// Frame-major interleaved samples, `channel_count` per frame.
    pub block: &'a [f32],
    pub channel_count: usize,
    pub sample_rate: f32,
    pub lowest_freq: f32,
    pub highest_freq: f32,
    pub frame_size: usize,
    pub hop_size: usize,
}

impl EstimateRequest<'_> {
    pub fn block_frames(&self) -> usize {
        if self.channel_count == 0 {
            0
        } else {
            self.block.len() / self.channel_count
        }
    }

    pub fn expected_frames(&self) -> usize {
        expected_frame_count(self.block_frames(), self.frame_size, self.hop_size)
    }
}

/// Frame-wise pitch tracker fed by the processor once per analysis block.
///
/// Implementations write one estimate in Hz per analysis frame into `pitches`
/// (after clearing it); values `<= 0` mean "unvoiced". The caller reserves
/// `expected_frame_count` slots up front, so an implementation running on the
/// audio thread must not grow the vector past its capacity.
pub trait PitchEstimator {
    fn estimate(
        &mut self,
        request: &EstimateRequest<'_>,
        pitches: &mut Vec<f32>,
    ) -> Result<(), EstimatorError>;
}

impl<E: PitchEstimator + ?Sized> PitchEstimator for Box<E> {
    fn estimate(
        &mut self,
        request: &EstimateRequest<'_>,
        pitches: &mut Vec<f32>,
    ) -> Result<(), EstimatorError> {
        (**self).estimate(request, pitches)
    }
}

/// Number of frames a `frame_size`/`hop_size` analysis produces over
/// `block_frames` samples.
pub fn expected_frame_count(block_frames: usize, frame_size: usize, hop_size: usize) -> usize {
    if frame_size == 0 || hop_size == 0 || block_frames < frame_size {
        return 0;
    }
    1 + (block_frames - frame_size) / hop_size
}

/// Mean of the voiced (strictly positive, finite) estimates, or `None` when no
/// frame was voiced.
pub fn voiced_mean(pitches: &[f32]) -> Option<f32> {
    let (sum, count) = pitches
        .iter()
        .filter(|p| p.is_finite() && **p > 0.0)
        .fold((0.0f64, 0usize), |(sum, count), &p| (sum + p as f64, count + 1));
    if count == 0 {
        return None;
    }
    let mean = (sum / count as f64) as f32;
    mean.is_finite().then_some(mean)
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Nearest equal-tempered note name for `hz`, e.g. `"A4"` for 440 Hz.
pub fn note_name(hz: f32) -> Option<String> {
    if !hz.is_finite() || hz <= 0.0 {
        return None;
    }
    let midi = (69.0 + 12.0 * (hz / 440.0).log2()).round() as i32;
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    Some(format!("{}{}", name, octave))
}
