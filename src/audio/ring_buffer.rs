use super::buffer::{PlanarSink, PlanarSource};
use crate::error::ProcessorError;

/// Fixed-capacity FIFO of planar audio, one lane per channel.
///
/// Pushing more frames than there is headroom for overwrites the oldest unread
/// frames. Pulling from an empty buffer leaves the destination untouched. The
/// channel count is fixed for the life of the buffer; a host that changes it
/// must build a new one.
pub struct CircularAudioBuffer {
    lanes: Vec<Box<[f32]>>,
    capacity: usize,
    write_index: usize,
    read_index: usize,
    frames_available: usize,
}

impl CircularAudioBuffer {
    pub fn new(capacity: usize, channel_count: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lanes: (0..channel_count)
                .map(|_| vec![0.0; capacity].into_boxed_slice())
                .collect(),
            capacity,
            write_index: 0,
            read_index: 0,
            frames_available: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channel_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn frames_available(&self) -> usize {
        self.frames_available
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Copies every frame of `block` into the ring.
    pub fn push<S: PlanarSource + ?Sized>(&mut self, block: &S) -> Result<(), ProcessorError> {
        let frames = self.check_source(block)?;
        if frames == 0 {
            return Ok(());
        }

        // Frames older than one capacity would be overwritten within this same
        // push, so only the tail is copied.
        let skipped = frames.saturating_sub(self.capacity);
        let start = (self.write_index + skipped) % self.capacity;
        for (channel, lane) in self.lanes.iter_mut().enumerate() {
            let src = &block.lane(channel)[skipped..];
            write_wrapped(lane, start, src);
        }

        self.write_index = (self.write_index + frames) % self.capacity;

        let total = self.frames_available + frames;
        if total > self.capacity {
            // Unread data was overwritten: the oldest surviving frame now sits
            // right after the newest one.
            self.read_index = self.write_index;
            self.frames_available = self.capacity;
        } else {
            self.frames_available = total;
        }
        Ok(())
    }

    /// Fills every lane of `destination` from the read position.
    ///
    /// Shape is validated before the emptiness check, so a malformed
    /// destination is reported even when there is nothing to read.
    pub fn pull<D: PlanarSink + ?Sized>(&mut self, destination: &mut D) -> Result<(), ProcessorError> {
        let frames = self.check_sink(destination)?;
        if self.frames_available == 0 || frames == 0 {
            return Ok(());
        }

        for (channel, lane) in self.lanes.iter().enumerate() {
            read_wrapped(lane, self.read_index, destination.lane_mut(channel));
        }

        self.read_index = (self.read_index + frames) % self.capacity;
        self.frames_available = self.frames_available.saturating_sub(frames);
        Ok(())
    }

    /// Drops all unread frames and rewinds both cursors.
    pub fn reset(&mut self) {
        for lane in &mut self.lanes {
            lane.fill(0.0);
        }
        self.write_index = 0;
        self.read_index = 0;
        self.frames_available = 0;
    }

    fn check_source<S: PlanarSource + ?Sized>(&self, block: &S) -> Result<usize, ProcessorError> {
        let channels = self.lanes.len();
        if block.channel_count() != channels {
            return Err(ProcessorError::channels(channels, block.channel_count()));
        }
        let frames = if channels == 0 { 0 } else { block.lane(0).len() };
        if (1..channels).any(|c| block.lane(c).len() != frames) {
            return Err(ProcessorError::ragged(channels, frames));
        }
        Ok(frames)
    }

    fn check_sink<D: PlanarSink + ?Sized>(&self, destination: &D) -> Result<usize, ProcessorError> {
        let channels = self.lanes.len();
        if destination.channel_count() != channels {
            return Err(ProcessorError::channels(channels, destination.channel_count()));
        }
        let frames = if channels == 0 { 0 } else { destination.lane_len(0) };
        if (1..channels).any(|c| destination.lane_len(c) != frames) {
            return Err(ProcessorError::ragged(channels, frames));
        }
        Ok(frames)
    }
}

/// Copies `src` into `lane` starting at `start`, wrapping as many times as
/// needed. `src` is never longer than `lane` when called from `push`.
fn write_wrapped(lane: &mut [f32], start: usize, src: &[f32]) {
    let capacity = lane.len();
    let mut pos = start;
    let mut remaining = src;
    while !remaining.is_empty() {
        let n = remaining.len().min(capacity - pos);
        lane[pos..pos + n].copy_from_slice(&remaining[..n]);
        remaining = &remaining[n..];
        pos = (pos + n) % capacity;
    }
}

/// Fills `dst` from `lane` starting at `start`. A destination longer than the
/// ring wraps around and repeats the lane.
fn read_wrapped(lane: &[f32], start: usize, dst: &mut [f32]) {
    let capacity = lane.len();
    let mut pos = start;
    let mut filled = 0;
    while filled < dst.len() {
        let n = (dst.len() - filled).min(capacity - pos);
        dst[filled..filled + n].copy_from_slice(&lane[pos..pos + n]);
        filled += n;
        pos = (pos + n) % capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBlock;

    fn ramp(start: f32, len: usize) -> Vec<f32> {
        (0..len).map(|i| start + i as f32).collect()
    }

    #[test]
    fn test_round_trip_preserves_order_per_channel() {
        let mut ring = CircularAudioBuffer::new(8, 2);
        let left = ramp(0.0, 3);
        let right = ramp(100.0, 3);
        ring.push(&[left.as_slice(), right.as_slice()][..]).unwrap();
        ring.push(&[&[3.0f32, 4.0][..], &[103.0f32, 104.0][..]][..]).unwrap();
        assert_eq!(ring.frames_available(), 5);

        let mut out = AudioBlock::new(2, 5);
        ring.pull(&mut out).unwrap();

        assert_eq!(out.channel(0), &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out.channel(1), &[100.0, 101.0, 102.0, 103.0, 104.0]);
        assert_eq!(ring.frames_available(), 0);
    }

    #[test]
    fn test_round_trip_across_wrap() {
        let mut ring = CircularAudioBuffer::new(4, 1);
        let mut out = AudioBlock::new(1, 3);

        ring.push(&[ramp(0.0, 3)][..]).unwrap();
        ring.pull(&mut out).unwrap();
        ring.push(&[ramp(10.0, 3)][..]).unwrap();
        ring.pull(&mut out).unwrap();

        assert_eq!(out.channel(0), &[10.0, 11.0, 12.0]);
        assert_eq!(ring.write_index(), 2);
        assert_eq!(ring.read_index(), 2);
    }

    #[test]
    fn test_single_push_overflow_keeps_latest_capacity_frames() {
        let mut ring = CircularAudioBuffer::new(4, 1);
        ring.push(&[ramp(0.0, 10)][..]).unwrap();
        assert_eq!(ring.frames_available(), 4);

        let mut out = AudioBlock::new(1, 4);
        ring.pull(&mut out).unwrap();
        assert_eq!(out.channel(0), &[6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_multi_push_overflow_keeps_latest_capacity_frames() {
        let mut ring = CircularAudioBuffer::new(4, 2);
        for start in [0.0, 3.0, 6.0] {
            let a = ramp(start, 3);
            let b = ramp(start + 50.0, 3);
            ring.push(&[a, b][..]).unwrap();
        }
        assert_eq!(ring.frames_available(), 4);

        let mut out = AudioBlock::new(2, 4);
        ring.pull(&mut out).unwrap();
        assert_eq!(out.channel(0), &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(out.channel(1), &[55.0, 56.0, 57.0, 58.0]);
    }

    #[test]
    fn test_empty_pull_leaves_destination_untouched() {
        let mut ring = CircularAudioBuffer::new(4, 2);
        let mut out = AudioBlock::from_value(2, 4, 0.25);
        let before = out.clone();

        ring.pull(&mut out).unwrap();

        assert_eq!(out, before);
        assert_eq!(ring.read_index(), 0);
    }

    #[test]
    fn test_pull_rejects_wrong_channel_count() {
        let mut ring = CircularAudioBuffer::new(4, 2);
        ring.push(&[ramp(0.0, 2), ramp(0.0, 2)][..]).unwrap();

        let mut out = AudioBlock::new(3, 2);
        let err = ring.pull(&mut out).unwrap_err();
        assert!(matches!(err, ProcessorError::ShapeMismatch { channels: 3, .. }));
        assert_eq!(ring.frames_available(), 2);
    }

    #[test]
    fn test_pull_rejects_ragged_destination_even_when_empty() {
        let mut ring = CircularAudioBuffer::new(4, 2);
        let mut out = vec![vec![0.0f32; 2], vec![0.0f32; 3]];
        let err = ring.pull(&mut out[..]).unwrap_err();
        assert!(matches!(err, ProcessorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_push_rejects_mismatched_block() {
        let mut ring = CircularAudioBuffer::new(4, 2);
        assert!(ring.push(&[ramp(0.0, 2)][..]).is_err());
        assert!(ring.push(&[ramp(0.0, 2), ramp(0.0, 1)][..]).is_err());
        assert_eq!(ring.frames_available(), 0);
        assert_eq!(ring.write_index(), 0);
    }

    #[test]
    fn test_over_pull_floors_available_at_zero() {
        let mut ring = CircularAudioBuffer::new(8, 1);
        ring.push(&[ramp(1.0, 2)][..]).unwrap();

        let mut out = AudioBlock::new(1, 4);
        ring.pull(&mut out).unwrap();
        assert_eq!(ring.frames_available(), 0);
        assert_eq!(&out.channel(0)[..2], &[1.0, 2.0]);
        assert_eq!(ring.read_index(), 4);
    }

    #[test]
    fn test_reset_discards_unread_frames() {
        let mut ring = CircularAudioBuffer::new(4, 1);
        ring.push(&[ramp(1.0, 3)][..]).unwrap();
        ring.reset();
        assert_eq!(ring.frames_available(), 0);
        assert_eq!(ring.write_index(), 0);
    }
}
