pub mod buffer;
pub mod interleave;
pub mod ring_buffer;

pub use buffer::{AudioBlock, PlanarSink, PlanarSource};
pub use interleave::{deinterleave, interleave};
pub use ring_buffer::CircularAudioBuffer;
