use serde::Deserialize;

use crate::error::ConfigError;

/// Frames per callback in the Web Audio rendering model.
pub const RENDER_QUANTUM_FRAMES: usize = 128;

/// Channel ceiling of the Web Audio graph; also the most lanes the worklet
/// binding will split a flattened buffer into.
pub const MAX_CHANNEL_COUNT: usize = 32;

pub const DEFAULT_LOWEST_FREQ: f32 = 200.0;

/// B7, 38 semitones above A4.
pub const DEFAULT_HIGHEST_FREQ: f32 = 3951.066;

/// Construction options for a `PitchProcessor`.
///
/// Field names follow the worklet's `processorOptions` object so the same JSON
/// can be handed to either host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorConfig {
    /// Analysis block size in frames.
    pub buffer_size: usize,
    pub sample_rate: f32,
    /// Ring capacity in frames; defaults to `buffer_size`.
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default = "default_quantum")]
    pub quantum_size: usize,
    #[serde(default = "default_lowest")]
    pub lowest_freq: f32,
    #[serde(default = "default_highest")]
    pub highest_freq: f32,
}

fn default_quantum() -> usize {
    RENDER_QUANTUM_FRAMES
}

fn default_lowest() -> f32 {
    DEFAULT_LOWEST_FREQ
}

fn default_highest() -> f32 {
    DEFAULT_HIGHEST_FREQ
}

impl ProcessorConfig {
    pub fn new(buffer_size: usize, sample_rate: f32) -> Self {
        Self {
            buffer_size,
            sample_rate,
            capacity: None,
            quantum_size: RENDER_QUANTUM_FRAMES,
            lowest_freq: DEFAULT_LOWEST_FREQ,
            highest_freq: DEFAULT_HIGHEST_FREQ,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_quantum(mut self, quantum_size: usize) -> Self {
        self.quantum_size = quantum_size;
        self
    }

    pub fn with_bounds(mut self, lowest_freq: f32, highest_freq: f32) -> Self {
        self.lowest_freq = lowest_freq;
        self.highest_freq = highest_freq;
        self
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.quantum_size == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.buffer_size % self.quantum_size != 0 {
            return Err(ConfigError::NotQuantumMultiple {
                buffer_size: self.buffer_size,
                quantum: self.quantum_size,
            });
        }
        if self.hop_size() == 0 {
            return Err(ConfigError::BufferTooSmall(self.buffer_size));
        }
        if self.ring_capacity() < self.buffer_size {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.ring_capacity(),
                buffer_size: self.buffer_size,
            });
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !(self.lowest_freq > 0.0 && self.lowest_freq < self.highest_freq)
            || !self.highest_freq.is_finite()
        {
            return Err(ConfigError::InvalidBounds {
                lowest: self.lowest_freq,
                highest: self.highest_freq,
            });
        }
        Ok(())
    }

    pub fn ring_capacity(&self) -> usize {
        self.capacity.unwrap_or(self.buffer_size)
    }

    /// Analysis frame handed to the estimator: half a block.
    pub fn frame_size(&self) -> usize {
        self.buffer_size / 2
    }

    /// Step between estimator frames: a quarter frame.
    pub fn hop_size(&self) -> usize {
        self.frame_size() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worklet_options_parse_with_defaults() {
        let config =
            ProcessorConfig::from_json(r#"{"bufferSize": 1024, "sampleRate": 44100, "capacity": 2048}"#)
                .unwrap();
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.ring_capacity(), 2048);
        assert_eq!(config.quantum_size, 128);
        assert_eq!(config.frame_size(), 512);
        assert_eq!(config.hop_size(), 128);
        assert_eq!(config.lowest_freq, DEFAULT_LOWEST_FREQ);
        assert!((config.highest_freq - 3951.066).abs() < 0.01);
    }

    #[test]
    fn test_highest_default_is_b7() {
        let b7 = 440.0f32 * 2f32.powf(38.0 / 12.0);
        assert!((b7 - DEFAULT_HIGHEST_FREQ).abs() < 0.01);
    }

    #[test]
    fn test_validation_rejects_bad_shapes() {
        assert_eq!(
            ProcessorConfig::new(0, 48000.0).validate(),
            Err(ConfigError::ZeroBufferSize)
        );
        assert!(matches!(
            ProcessorConfig::new(1000, 48000.0).validate(),
            Err(ConfigError::NotQuantumMultiple { .. })
        ));
        assert!(matches!(
            ProcessorConfig::new(1024, 48000.0).with_capacity(512).validate(),
            Err(ConfigError::CapacityTooSmall { .. })
        ));
        assert!(matches!(
            ProcessorConfig::new(4, 48000.0).with_quantum(4).validate(),
            Err(ConfigError::BufferTooSmall(4))
        ));
        assert!(matches!(
            ProcessorConfig::new(1024, 0.0).validate(),
            Err(ConfigError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            ProcessorConfig::new(1024, 48000.0).with_bounds(500.0, 100.0).validate(),
            Err(ConfigError::InvalidBounds { .. })
        ));
        assert!(ProcessorConfig::from_json("{\"sampleRate\": 48000}").is_err());
    }
}
