use thiserror::Error;

/// Failures inside the per-quantum analysis path.
///
/// None of these leave `PitchProcessor::process`; they are counted, logged and
/// collapsed to a silent output quantum.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessorError {
    #[error("shape mismatch: expected {expected_channels} channels of {expected_frames} frames, got {channels} channels ({detail})")]
    ShapeMismatch {
        expected_channels: usize,
        expected_frames: usize,
        channels: usize,
        detail: &'static str,
    },
    #[error("pitch estimation failed: {0}")]
    Estimator(#[from] EstimatorError),
}

impl ProcessorError {
    pub(crate) fn channels(expected_channels: usize, channels: usize) -> Self {
        ProcessorError::ShapeMismatch {
            expected_channels,
            expected_frames: 0,
            channels,
            detail: "channel count differs",
        }
    }

    pub(crate) fn ragged(expected_channels: usize, expected_frames: usize) -> Self {
        ProcessorError::ShapeMismatch {
            expected_channels,
            expected_frames,
            channels: expected_channels,
            detail: "channel lengths differ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("block of {got} samples is not a whole number of {channels}-channel frames")]
    UnalignedBlock { got: usize, channels: usize },
    #[error("frame size {frame_size} exceeds the configured maximum of {max}")]
    FrameTooLarge { frame_size: usize, max: usize },
    #[error("invalid frequency bounds {lowest}..{highest} Hz")]
    InvalidBounds { lowest: f32, highest: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("bufferSize must be positive")]
    ZeroBufferSize,
    #[error("quantumSize must be positive")]
    ZeroQuantum,
    #[error("bufferSize {buffer_size} is not a multiple of the {quantum}-frame quantum")]
    NotQuantumMultiple { buffer_size: usize, quantum: usize },
    #[error("bufferSize {0} is too small to derive a frame and hop size")]
    BufferTooSmall(usize),
    #[error("capacity {capacity} is smaller than bufferSize {buffer_size}")]
    CapacityTooSmall { capacity: usize, buffer_size: usize },
    #[error("sampleRate must be finite and positive, got {0}")]
    InvalidSampleRate(f32),
    #[error("frequency bounds must satisfy 0 < lowestFreq < highestFreq, got {lowest}..{highest}")]
    InvalidBounds { lowest: f32, highest: f32 },
    #[error("could not parse processor options: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("a relay is already bound to this processor")]
    RelayAlreadyBound,
    #[error("relay buffer of {0} bytes does not hold a cursor header and at least two slots")]
    InvalidRelayBuffer(usize),
    #[error("could not parse control message: {0}")]
    Parse(String),
}
