pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod logging;
pub mod pitch;
pub mod processor;
pub mod relay;
pub mod wav;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod worklet;

pub use audio::{AudioBlock, CircularAudioBuffer};
pub use config::ProcessorConfig;
pub use control::{ControlMessage, ControlSnapshot, ControlState};
pub use error::{ConfigError, ControlError, EstimatorError, ProcessorError};
pub use pitch::{note_name, voiced_mean, EstimateRequest, PitchEstimator, YinEstimator};
pub use processor::{PitchProcessor, ProcessorStats};
pub use relay::{relay_channel, RelayConsumer, RelayProducer, RelayWriter, SharedRelay};

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use worklet::{WasmPitchProcessor, WasmRelay};
