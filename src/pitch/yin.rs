use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::{EstimateRequest, PitchEstimator};
use crate::error::EstimatorError;

const DEFAULT_THRESHOLD: f32 = 0.1;
// Frames quieter than this (mean square) are reported unvoiced.
const SILENCE_POWER: f32 = 1e-8;

/// YIN pitch tracker (de Cheveigné & Kawahara, 2002).
///
/// The difference function is built from an FFT autocorrelation so each frame
/// costs O(n log n). All scratch space is sized in `new` for the largest frame
/// the estimator will see; `estimate` itself does not allocate.
pub struct YinEstimator {
    max_frame_size: usize,
    threshold: f32,
    fft_size: usize,
    forward_fft: Arc<dyn Fft<f32>>,
    inverse_fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    mono: Vec<f32>,
    energy: Vec<f32>,
    difference: Vec<f32>,
}

impl YinEstimator {
    pub fn new(max_frame_size: usize) -> Self {
        let max_frame_size = max_frame_size.max(4);
        let fft_size = (max_frame_size * 2).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward_fft = planner.plan_fft_forward(fft_size);
        let inverse_fft = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward_fft
            .get_inplace_scratch_len()
            .max(inverse_fft.get_inplace_scratch_len());

        Self {
            max_frame_size,
            threshold: DEFAULT_THRESHOLD,
            fft_size,
            forward_fft,
            inverse_fft,
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            mono: vec![0.0; max_frame_size],
            energy: vec![0.0; max_frame_size + 1],
            difference: vec![0.0; max_frame_size / 2 + 2],
        }
    }

    /// Cumulative-mean-normalised difference threshold. Lower is stricter.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Pitch of the frame currently held in `self.mono[..frame_size]`, or 0.0.
    fn frame_pitch(&mut self, frame_size: usize, sample_rate: f32, lowest: f32, highest: f32) -> f32 {
        let x = &self.mono[..frame_size];

        self.energy[0] = 0.0;
        for (i, &s) in x.iter().enumerate() {
            self.energy[i + 1] = self.energy[i] + s * s;
        }
        let total = self.energy[frame_size];
        if total / (frame_size as f32) < SILENCE_POWER {
            return 0.0;
        }

        let max_tau = ((sample_rate / lowest).ceil() as usize).min(frame_size / 2);
        let min_tau = ((sample_rate / highest).floor() as usize).max(2);
        if min_tau + 1 >= max_tau {
            return 0.0;
        }

        // Linear autocorrelation through a zero-padded FFT.
        for (slot, &s) in self.spectrum.iter_mut().zip(x) {
            *slot = Complex::new(s, 0.0);
        }
        for slot in &mut self.spectrum[frame_size..] {
            *slot = Complex::new(0.0, 0.0);
        }
        self.forward_fft
            .process_with_scratch(&mut self.spectrum, &mut self.fft_scratch);
        for bin in &mut self.spectrum {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse_fft
            .process_with_scratch(&mut self.spectrum, &mut self.fft_scratch);
        let norm = 1.0 / self.fft_size as f32;

        // d(tau) = head energy + tail energy - 2 r(tau), then normalised by the
        // running mean over 1..=tau.
        self.difference[0] = 1.0;
        let mut running = 0.0f32;
        for tau in 1..=max_tau {
            let head = self.energy[frame_size - tau];
            let tail = total - self.energy[tau];
            let r = self.spectrum[tau].re * norm;
            let d = (head + tail - 2.0 * r).max(0.0);
            running += d;
            self.difference[tau] = if running > 0.0 {
                d * tau as f32 / running
            } else {
                1.0
            };
        }

        let cmnd = &self.difference[..=max_tau];
        let mut tau = min_tau;
        let mut found = None;
        while tau < max_tau {
            if cmnd[tau] < self.threshold {
                while tau + 1 < max_tau && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                found = Some(tau);
                break;
            }
            tau += 1;
        }
        let Some(tau) = found else {
            return 0.0;
        };

        let refined = {
            let a = cmnd[tau - 1];
            let b = cmnd[tau];
            let c = cmnd[tau + 1];
            let denom = a - 2.0 * b + c;
            if denom.abs() < 1e-8 {
                tau as f32
            } else {
                tau as f32 + (a - c) / (2.0 * denom)
            }
        };

        let hz = sample_rate / refined;
        if hz.is_finite() && hz >= lowest && hz <= highest {
            hz
        } else {
            0.0
        }
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(
        &mut self,
        request: &EstimateRequest<'_>,
        pitches: &mut Vec<f32>,
    ) -> Result<(), EstimatorError> {
        let channels = request.channel_count;
        if channels == 0 || request.block.len() % channels != 0 {
            return Err(EstimatorError::UnalignedBlock {
                got: request.block.len(),
                channels,
            });
        }
        if request.frame_size > self.max_frame_size {
            return Err(EstimatorError::FrameTooLarge {
                frame_size: request.frame_size,
                max: self.max_frame_size,
            });
        }
        if !(request.lowest_freq > 0.0 && request.lowest_freq < request.highest_freq) {
            return Err(EstimatorError::InvalidBounds {
                lowest: request.lowest_freq,
                highest: request.highest_freq,
            });
        }

        pitches.clear();
        let frames = request.expected_frames();
        let frame_size = request.frame_size;
        let gain = 1.0 / channels as f32;

        for index in 0..frames {
            let start = index * request.hop_size;
            let samples = &request.block[start * channels..(start + frame_size) * channels];
            for (mono, frame) in self.mono.iter_mut().zip(samples.chunks_exact(channels)) {
                *mono = frame.iter().sum::<f32>() * gain;
            }
            let hz = self.frame_pitch(
                frame_size,
                request.sample_rate,
                request.lowest_freq,
                request.highest_freq,
            );
            pitches.push(hz);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 44100.0;

    fn sine(freq: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (TAU * freq * i as f32 / SAMPLE_RATE).sin() * 0.5)
            .collect()
    }

    fn request(block: &[f32], channel_count: usize) -> EstimateRequest<'_> {
        EstimateRequest {
            block,
            channel_count,
            sample_rate: SAMPLE_RATE,
            lowest_freq: 80.0,
            highest_freq: 2000.0,
            frame_size: 1024,
            hop_size: 256,
        }
    }

    #[test]
    fn test_detects_sine_frequency() {
        let block = sine(440.0, 2048);
        let mut yin = YinEstimator::new(1024);
        let mut pitches = Vec::with_capacity(8);

        yin.estimate(&request(&block, 1), &mut pitches).unwrap();

        assert_eq!(pitches.len(), 5);
        for p in &pitches {
            assert!((p - 440.0).abs() < 4.0, "got {}", p);
        }
    }

    #[test]
    fn test_stereo_input_is_mixed_down() {
        let mono = sine(330.0, 2048);
        let mut block = Vec::with_capacity(mono.len() * 2);
        for &s in &mono {
            block.push(s);
            block.push(s * 0.5);
        }
        let mut yin = YinEstimator::new(1024);
        let mut pitches = Vec::new();

        yin.estimate(&request(&block, 2), &mut pitches).unwrap();

        assert_eq!(pitches.len(), 5);
        assert!(pitches.iter().all(|p| (p - 330.0).abs() < 3.0));
    }

    #[test]
    fn test_silence_and_noise_are_unvoiced() {
        let mut yin = YinEstimator::new(1024);
        let mut pitches = Vec::new();

        yin.estimate(&request(&vec![0.0; 2048], 1), &mut pitches).unwrap();
        assert!(pitches.iter().all(|&p| p == 0.0));

        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<f32> = (0..2048).map(|_| rng.random_range(-0.5..0.5)).collect();
        yin.estimate(&request(&noise, 1), &mut pitches).unwrap();
        let voiced = pitches.iter().filter(|&&p| p > 0.0).count();
        assert!(voiced <= 1, "noise produced {} voiced frames", voiced);
    }

    #[test]
    fn test_rejects_bad_requests() {
        let mut yin = YinEstimator::new(512);
        let mut pitches = Vec::new();
        let block = vec![0.0; 2048];

        assert!(matches!(
            yin.estimate(&request(&block, 1), &mut pitches),
            Err(EstimatorError::FrameTooLarge { .. })
        ));
        assert!(matches!(
            yin.estimate(&request(&block[..2047], 2), &mut pitches),
            Err(EstimatorError::UnalignedBlock { .. })
        ));
    }

    #[test]
    fn test_estimate_does_not_grow_reserved_output() {
        let block = sine(220.0, 2048);
        let mut yin = YinEstimator::new(1024);
        let mut pitches = Vec::with_capacity(5);
        let ptr = pitches.as_ptr();

        for _ in 0..3 {
            yin.estimate(&request(&block, 1), &mut pitches).unwrap();
        }

        assert_eq!(pitches.as_ptr(), ptr);
        assert_eq!(pitches.len(), 5);
    }
}
