//! Regroups device callbacks into render quanta.
//!
//! Input devices deliver interleaved buffers of whatever length the host
//! picked, sometimes varying from call to call. The processor wants fixed
//! planar quanta, so samples are carried over between callbacks until a full
//! quantum is collected.

use cpal::Sample;
use dasp_sample::FromSample;
use pitch_relay::audio::deinterleave;
use pitch_relay::config::{MAX_CHANNEL_COUNT, RENDER_QUANTUM_FRAMES};
use pitch_relay::{PitchEstimator, PitchProcessor};

pub(crate) struct Quantizer<E: PitchEstimator> {
    processor: PitchProcessor<E>,
    channels: usize,
    /// Interleaved samples collected towards the next quantum.
    carry: Vec<f32>,
    carry_frames: usize,
    planar: Vec<Vec<f32>>,
    pub(crate) call_count: usize,
}

impl<E: PitchEstimator> Quantizer<E> {
    pub(crate) fn new(processor: PitchProcessor<E>, channels: usize) -> Self {
        let channels = channels.clamp(1, MAX_CHANNEL_COUNT);
        Self {
            processor,
            channels,
            carry: vec![0.0; RENDER_QUANTUM_FRAMES * channels],
            carry_frames: 0,
            planar: vec![vec![0.0; RENDER_QUANTUM_FRAMES]; channels],
            call_count: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn processor(&self) -> &PitchProcessor<E> {
        &self.processor
    }

    /// Frames collected towards the next quantum.
    #[cfg(test)]
    pub(crate) fn pending_frames(&self) -> usize {
        self.carry_frames
    }

    /// Feeds one interleaved device buffer. Any trailing partial quantum is
    /// kept for the next call.
    pub(crate) fn push_interleaved<T>(&mut self, data: &[T]) -> Result<(), &'static str>
    where
        T: Sample,
        f32: FromSample<T>,
    {
        self.call_count += 1;
        if data.len() % self.channels != 0 {
            return Err("input buffer length not divisible by channel count");
        }

        let mut remaining = data;
        while !remaining.is_empty() {
            let offset = self.carry_frames * self.channels;
            let n = remaining.len().min(self.carry.len() - offset);
            for (slot, &sample) in self.carry[offset..offset + n].iter_mut().zip(remaining) {
                *slot = sample.to_sample::<f32>();
            }
            remaining = &remaining[n..];
            self.carry_frames += n / self.channels;

            if self.carry_frames == RENDER_QUANTUM_FRAMES {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), &'static str> {
        self.carry_frames = 0;
        {
            let mut lanes: [&mut [f32]; MAX_CHANNEL_COUNT] = Default::default();
            for (slot, lane) in lanes.iter_mut().zip(self.planar.iter_mut()) {
                *slot = lane.as_mut_slice();
            }
            deinterleave(&self.carry, self.channels, &mut lanes[..self.channels])
                .map_err(|_| "carry buffer does not match the channel layout")?;
        }

        let mut inputs: [&[f32]; MAX_CHANNEL_COUNT] = [&[]; MAX_CHANNEL_COUNT];
        for (slot, lane) in inputs.iter_mut().zip(&self.planar) {
            *slot = lane.as_slice();
        }
        // Input-only stream: nothing to render into.
        self.processor.process(&inputs[..self.channels], &mut []);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitch_relay::{ControlMessage, ProcessorConfig, YinEstimator};

    fn quantizer(channels: usize) -> Quantizer<YinEstimator> {
        let config = ProcessorConfig::new(512, 48000.0);
        let processor = PitchProcessor::new(config, YinEstimator::new(256)).unwrap();
        processor.apply_control(ControlMessage::mic(true)).unwrap();
        Quantizer::new(processor, channels)
    }

    #[test]
    fn test_odd_sized_callbacks_are_regrouped() {
        let mut q = quantizer(2);

        q.push_interleaved(&vec![0.1f32; 2 * 100]).unwrap();
        assert_eq!(q.pending_frames(), 100);
        assert_eq!(q.processor().frames_available(), 0);

        q.push_interleaved(&vec![0.1f32; 2 * 60]).unwrap();
        assert_eq!(q.pending_frames(), 32);
        assert_eq!(q.processor().frames_available(), RENDER_QUANTUM_FRAMES);
        assert_eq!(q.processor().channel_count(), Some(2));
    }

    #[test]
    fn test_integer_samples_are_converted() {
        let mut q = quantizer(1);
        q.push_interleaved(&vec![i16::MAX; RENDER_QUANTUM_FRAMES]).unwrap();
        assert_eq!(q.processor().stats().quanta, 1);
    }

    #[test]
    fn test_misaligned_buffer_is_rejected() {
        let mut q = quantizer(2);
        assert!(q.push_interleaved(&[0.0f32; 3]).is_err());
        assert_eq!(q.pending_frames(), 0);
    }
}
