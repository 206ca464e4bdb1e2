use std::io::Read;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("could not read WAV data: {0}")]
    Hound(#[from] hound::Error),
    #[error("unsupported WAV format: bits_per_sample={bits} sample_format={format:?}")]
    Unsupported {
        bits: u16,
        format: hound::SampleFormat,
    },
    #[error("WAV file declares zero channels")]
    NoChannels,
}

/// Decoded audio, one lane per channel, samples normalised to [-1, 1].
#[derive(Debug, Clone)]
pub struct PlanarAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl PlanarAudio {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

pub fn load_planar<P: AsRef<Path>>(path: P) -> Result<PlanarAudio, WavError> {
    let reader = hound::WavReader::open(path)?;
    decode(reader)
}

pub fn read_planar<R: Read>(reader: R) -> Result<PlanarAudio, WavError> {
    decode(hound::WavReader::new(reader)?)
}

fn decode<R: Read>(mut wav_reader: hound::WavReader<R>) -> Result<PlanarAudio, WavError> {
    let spec = wav_reader.spec();
    let channel_count = spec.channels as usize;
    if channel_count == 0 {
        return Err(WavError::NoChannels);
    }

    let samples: Vec<f32> = match (spec.bits_per_sample, spec.sample_format) {
        (32, hound::SampleFormat::Float) => wav_reader.samples::<f32>().collect::<Result<_, _>>()?,
        (16, hound::SampleFormat::Int) => wav_reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>()?,
        (24, hound::SampleFormat::Int) => wav_reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 8_388_607.0))
            .collect::<Result<_, _>>()?,
        (32, hound::SampleFormat::Int) => wav_reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / i32::MAX as f32))
            .collect::<Result<_, _>>()?,
        (bits, format) => return Err(WavError::Unsupported { bits, format }),
    };

    let frames = samples.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (lane, &sample) in channels.iter_mut().zip(frame) {
            lane.push(sample);
        }
    }

    Ok(PlanarAudio {
        sample_rate: spec.sample_rate,
        channels,
    })
}
