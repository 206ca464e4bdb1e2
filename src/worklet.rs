//! JavaScript bindings for running the processor inside an `AudioWorkletProcessor`.
//!
//! The worklet hands over each render quantum as one flattened planar
//! `Float32Array` (channel 0, then channel 1, ...) and gets the output back the
//! same way.

use js_sys::{Reflect, SharedArrayBuffer};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::config::{ProcessorConfig, MAX_CHANNEL_COUNT};
use crate::control::ControlMessage;
use crate::logging::init_console_logging;
use crate::pitch::YinEstimator;
use crate::processor::PitchProcessor;
use crate::relay::shared::{self, JsSlots};
use crate::relay::{RelayWriter, SharedRelay};

// Control-message fields that may carry the relay region.
const RELAY_KEYS: [&str; 2] = ["sab", "relayHandle"];

fn to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn shared_writer(buffer: SharedArrayBuffer) -> Result<RelayWriter, JsValue> {
    let slots = JsSlots::new(buffer).map_err(to_js)?;
    Ok(RelayWriter::Shared(SharedRelay::new(slots)))
}

fn relay_from_message(message: &JsValue) -> Result<Option<RelayWriter>, JsValue> {
    for key in RELAY_KEYS {
        let value = Reflect::get(message, &JsValue::from_str(key))?;
        if value.is_undefined() || value.is_null() {
            continue;
        }
        let buffer = value
            .dyn_into::<SharedArrayBuffer>()
            .map_err(|_| JsValue::from_str(&format!("`{}` must be a SharedArrayBuffer", key)))?;
        return shared_writer(buffer).map(Some);
    }
    Ok(None)
}

/// Relay region in a `SharedArrayBuffer`, readable from any thread that maps
/// it (here, or with `ringbuf.js` on the other side).
#[wasm_bindgen]
pub struct WasmRelay {
    relay: SharedRelay<JsSlots>,
}

#[wasm_bindgen]
impl WasmRelay {
    #[wasm_bindgen(constructor)]
    pub fn new(capacity: usize) -> Result<WasmRelay, JsValue> {
        let buffer = SharedArrayBuffer::new(shared::byte_length(capacity) as u32);
        WasmRelay::from_buffer(buffer)
    }

    /// Wraps a region created elsewhere, e.g. received over a `MessagePort`.
    #[wasm_bindgen(js_name = fromBuffer)]
    pub fn from_buffer(buffer: SharedArrayBuffer) -> Result<WasmRelay, JsValue> {
        let slots = JsSlots::new(buffer).map_err(to_js)?;
        Ok(WasmRelay {
            relay: SharedRelay::new(slots),
        })
    }

    /// The shared region. Post it to the worklet as `{ sab }`.
    pub fn buffer(&self) -> SharedArrayBuffer {
        self.relay.storage().buffer().clone()
    }

    pub fn capacity(&self) -> usize {
        self.relay.capacity()
    }

    pub fn available_read(&self) -> usize {
        self.relay.available_read()
    }

    pub fn dequeue(&self) -> Option<f32> {
        self.relay.dequeue()
    }

    /// Everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.relay.available_read());
        self.relay.drain_into(&mut out);
        out
    }
}

#[wasm_bindgen]
pub struct WasmPitchProcessor {
    inner: PitchProcessor<YinEstimator>,
}

#[wasm_bindgen]
impl WasmPitchProcessor {
    /// `options` is the worklet's `processorOptions`:
    /// `{ bufferSize, sampleRate, capacity?, quantumSize?, lowestFreq?, highestFreq? }`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmPitchProcessor, JsValue> {
        init_console_logging();
        let config: ProcessorConfig = serde_wasm_bindgen::from_value(options).map_err(to_js)?;
        let estimator = YinEstimator::new(config.frame_size());
        let inner = PitchProcessor::new(config, estimator).map_err(to_js)?;
        Ok(WasmPitchProcessor { inner })
    }

    /// Runs one render quantum. Always returns `true`.
    pub fn process(
        &mut self,
        input: &[f32],
        input_channels: usize,
        output: &mut [f32],
        output_channels: usize,
    ) -> bool {
        output.fill(0.0);

        let input_channels = input_channels.min(MAX_CHANNEL_COUNT);
        let mut inputs: [&[f32]; MAX_CHANNEL_COUNT] = [&[]; MAX_CHANNEL_COUNT];
        if let Some(frames) = input.len().checked_div(input_channels).filter(|&f| f > 0) {
            for (slot, lane) in inputs.iter_mut().zip(input.chunks_exact(frames)) {
                *slot = lane;
            }
        }

        let output_channels = output_channels.min(MAX_CHANNEL_COUNT);
        let mut outputs: [&mut [f32]; MAX_CHANNEL_COUNT] = Default::default();
        if let Some(frames) = output.len().checked_div(output_channels).filter(|&f| f > 0) {
            for (slot, lane) in outputs.iter_mut().zip(output.chunks_exact_mut(frames)) {
                *slot = lane;
            }
        }

        self.inner
            .process(&inputs[..input_channels], &mut outputs[..output_channels])
    }

    /// Applies `{ sab?, isPlaying?, micActive? }`, where `sab` (or
    /// `relayHandle`) is the relay region as a `SharedArrayBuffer`.
    pub fn apply_control(&self, message: JsValue) -> Result<(), JsValue> {
        let relay = relay_from_message(&message)?;
        let mut parsed: ControlMessage = serde_wasm_bindgen::from_value(message).map_err(to_js)?;
        parsed.relay = relay;
        self.inner.apply_control(parsed).map_err(to_js)
    }

    /// Binds the relay results are written to. Only the first call succeeds.
    pub fn bind_relay(&self, relay: &WasmRelay) -> Result<(), JsValue> {
        let writer = shared_writer(relay.buffer())?;
        self.inner
            .apply_control(ControlMessage::bind(writer))
            .map_err(to_js)
    }

    pub fn cpu_usage(&self) -> f32 {
        self.inner.cpu_usage()
    }

    pub fn frames_available(&self) -> usize {
        self.inner.frames_available()
    }

    pub fn dropped(&self) -> u32 {
        self.inner.stats().dropped as u32
    }
}
