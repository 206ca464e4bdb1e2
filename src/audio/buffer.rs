/// Planar block of samples: `channels` lanes of `frames` samples each, stored
/// back to back in one allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBlock {
    data: Vec<f32>,
    channels: usize,
    frames: usize,
}

impl AudioBlock {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels * frames],
            channels,
            frames,
        }
    }

    pub fn from_value(channels: usize, frames: usize, value: f32) -> Self {
        Self {
            data: vec![value; channels * frames],
            channels,
            frames,
        }
    }

    pub fn from_channels(lanes: &[&[f32]]) -> Self {
        let frames = lanes.first().map_or(0, |lane| lane.len());
        let mut block = Self::new(lanes.len(), frames);
        for (dst, src) in block.channels_mut().zip(lanes) {
            let n = dst.len().min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
        }
        block
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        let start = index * self.frames;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// One lane per channel. A zero-frame block yields empty lanes.
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.channels).map(move |c| self.channel(c))
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let frames = self.frames;
        let mut rest = self.data.as_mut_slice();
        (0..self.channels).map(move |_| {
            let (lane, tail) = std::mem::take(&mut rest).split_at_mut(frames);
            rest = tail;
            lane
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn is_silent(&self) -> bool {
        self.data.iter().all(|&s| s == 0.0)
    }
}

/// Read access to planar multichannel audio, whether it lives in an owned
/// `AudioBlock` or in a host-provided slice of channel slices.
pub trait PlanarSource {
    fn channel_count(&self) -> usize;
    fn lane(&self, channel: usize) -> &[f32];
}

/// Write access to planar multichannel audio.
pub trait PlanarSink {
    fn channel_count(&self) -> usize;
    fn lane_len(&self, channel: usize) -> usize;
    fn lane_mut(&mut self, channel: usize) -> &mut [f32];
}

impl PlanarSource for AudioBlock {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn lane(&self, channel: usize) -> &[f32] {
        self.channel(channel)
    }
}

impl PlanarSink for AudioBlock {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn lane_len(&self, _channel: usize) -> usize {
        self.frames
    }

    fn lane_mut(&mut self, channel: usize) -> &mut [f32] {
        self.channel_mut(channel)
    }
}

impl<'a> PlanarSource for [&'a [f32]] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn lane(&self, channel: usize) -> &[f32] {
        self[channel]
    }
}

impl PlanarSource for [Vec<f32>] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn lane(&self, channel: usize) -> &[f32] {
        &self[channel]
    }
}

impl<'a> PlanarSink for [&'a mut [f32]] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn lane_len(&self, channel: usize) -> usize {
        self[channel].len()
    }

    fn lane_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self[channel][..]
    }
}

impl PlanarSink for [Vec<f32>] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn lane_len(&self, channel: usize) -> usize {
        self[channel].len()
    }

    fn lane_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self[channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_lanes_are_contiguous() {
        let mut block = AudioBlock::new(2, 3);
        block.channel_mut(1).copy_from_slice(&[4.0, 5.0, 6.0]);

        assert_eq!(block.channel(0), &[0.0, 0.0, 0.0]);
        assert_eq!(block.channel(1), &[4.0, 5.0, 6.0]);
        assert_eq!(block.as_slice(), &[0.0, 0.0, 0.0, 4.0, 5.0, 6.0]);
        assert_eq!(block.channels().count(), 2);
    }

    #[test]
    fn test_from_channels_and_clear() {
        let mut block = AudioBlock::from_channels(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert!(!block.is_silent());
        assert_eq!(PlanarSource::lane(&block, 1), &[3.0, 4.0]);

        block.clear();
        assert!(block.is_silent());
    }

    #[test]
    fn test_zero_frame_block_still_has_every_lane() {
        let mut block = AudioBlock::new(3, 0);
        assert_eq!(block.channels().count(), 3);
        assert!(block.channels().all(|lane| lane.is_empty()));
        assert_eq!(block.channels_mut().count(), 3);

        let empty = AudioBlock::new(0, 4);
        assert_eq!(empty.channels().count(), 0);
    }

    #[test]
    fn test_channels_mut_writes_each_lane() {
        let mut block = AudioBlock::new(2, 2);
        for (c, lane) in block.channels_mut().enumerate() {
            lane.fill(c as f32 + 1.0);
        }
        assert_eq!(block.as_slice(), &[1.0, 1.0, 2.0, 2.0]);
    }
}
