//! Per-quantum driver: accumulates host quanta into analysis blocks, runs the
//! pitch estimator and relays one value per voiced block.

mod stats;

pub use stats::{CpuLoad, ProcessorStats};

use std::sync::Arc;

use log::{info, warn};

use crate::audio::{interleave, AudioBlock, CircularAudioBuffer};
use crate::config::ProcessorConfig;
use crate::control::{ControlMessage, ControlState, RelayInbox};
use crate::error::{ConfigError, ControlError, ProcessorError};
use crate::logging::LogThrottle;
use crate::pitch::{expected_frame_count, voiced_mean, EstimateRequest, PitchEstimator};
use crate::relay::RelayWriter;

/// Everything sized by the input channel count. Rebuilt from scratch whenever
/// that count changes.
struct ChannelBuffers {
    ring: CircularAudioBuffer,
    accum: AudioBlock,
    interleaved: Vec<f32>,
    pitches: Vec<f32>,
}

impl ChannelBuffers {
    fn new(config: &ProcessorConfig, channels: usize) -> Self {
        let block = config.buffer_size;
        Self {
            ring: CircularAudioBuffer::new(config.ring_capacity(), channels),
            accum: AudioBlock::new(channels, block),
            interleaved: vec![0.0; block * channels],
            pitches: Vec::with_capacity(expected_frame_count(
                block,
                config.frame_size(),
                config.hop_size(),
            )),
        }
    }
}

/// Pitch-tracking audio processor.
///
/// `process` is meant to be called from a real-time audio callback. After the
/// first quantum (or a channel-count change) it neither allocates nor blocks,
/// and it never fails: every error path ends in a silent output quantum.
pub struct PitchProcessor<E: PitchEstimator> {
    config: ProcessorConfig,
    control: Arc<ControlState>,
    estimator: E,
    buffers: Option<ChannelBuffers>,
    relay_inbox: Option<RelayInbox>,
    relay: Option<RelayWriter>,
    stats: ProcessorStats,
    load: CpuLoad,
    throttle: LogThrottle,
}

impl<E: PitchEstimator> PitchProcessor<E> {
    pub fn new(config: ProcessorConfig, estimator: E) -> Result<Self, ConfigError> {
        Self::with_control(config, estimator, Arc::new(ControlState::new()))
    }

    /// Builds a processor that shares an existing control state, e.g. one
    /// already handed to a UI thread. Only the first processor built on a
    /// given state receives its relay.
    pub fn with_control(
        config: ProcessorConfig,
        estimator: E,
        control: Arc<ControlState>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let relay_inbox = control.take_relay_inbox();
        if relay_inbox.is_none() {
            warn!("control state already feeds another processor; relay binding disabled");
        }
        Ok(Self {
            config,
            control,
            estimator,
            buffers: None,
            relay_inbox,
            relay: None,
            stats: ProcessorStats::default(),
            load: CpuLoad::new(),
            throttle: LogThrottle::default(),
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Handle for updating flags and binding the relay from another context.
    pub fn control(&self) -> Arc<ControlState> {
        Arc::clone(&self.control)
    }

    pub fn apply_control(&self, message: ControlMessage) -> Result<(), ControlError> {
        self.control.apply(message)
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    pub fn cpu_usage(&self) -> f32 {
        self.load.usage()
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Channel count the buffers are currently sized for.
    pub fn channel_count(&self) -> Option<usize> {
        self.buffers.as_ref().map(|b| b.ring.channel_count())
    }

    pub fn frames_available(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| b.ring.frames_available())
    }

    /// The per-channel block that collects pulled audio for analysis.
    pub fn accumulation(&self) -> Option<&AudioBlock> {
        self.buffers.as_ref().map(|b| &b.accum)
    }

    /// Runs one callback quantum. `inputs` holds one lane per input channel,
    /// `outputs` one lane per output channel; every output lane is fully
    /// written. Always returns `true` so the host keeps the processor alive.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> bool {
        let started = stats::now_seconds();
        self.stats.quanta += 1;

        if self.channel_count() != Some(inputs.len()) {
            self.resize(inputs.len());
        }

        let control = self.control.snapshot();
        self.poll_relay();
        if control.is_active() {
            match self.analyze_quantum(inputs) {
                Ok(Some(pitch)) => self.send(pitch),
                Ok(None) => {}
                Err(err) => {
                    self.stats.failures += 1;
                    if self.throttle.ready() {
                        warn!("pitch processor error ({} so far): {}", self.stats.failures, err);
                    }
                }
            }
        }
        silence(outputs);

        if let (Some(start), Some(end)) = (started, stats::now_seconds()) {
            let frames = inputs.first().map_or(self.config.quantum_size, |lane| lane.len());
            self.load
                .record(end - start, frames as f64 / self.config.sample_rate as f64);
        }
        true
    }

    /// Picks up a relay bound since the last quantum.
    fn poll_relay(&mut self) {
        if self.relay.is_some() {
            return;
        }
        if let Some(inbox) = self.relay_inbox.as_mut() {
            self.relay = inbox.try_take();
        }
    }

    fn resize(&mut self, channels: usize) {
        self.buffers = Some(ChannelBuffers::new(&self.config, channels));
        self.stats.resizes += 1;
        info!("buffers initialized for {} channels", channels);
    }

    /// Push, and when a full block is buffered, analyse it. Returns the voiced
    /// mean of the block, or `None` when there was nothing (or nothing voiced)
    /// to report.
    fn analyze_quantum(&mut self, inputs: &[&[f32]]) -> Result<Option<f32>, ProcessorError> {
        let Some(buffers) = self.buffers.as_mut() else {
            return Ok(None);
        };

        buffers.ring.push(inputs)?;
        if buffers.ring.frames_available() < self.config.buffer_size {
            return Ok(None);
        }

        buffers.ring.pull(&mut buffers.accum)?;
        interleave(&buffers.accum, &mut buffers.interleaved)?;

        let request = EstimateRequest {
            block: &buffers.interleaved,
            channel_count: buffers.accum.channel_count(),
            sample_rate: self.config.sample_rate,
            lowest_freq: self.config.lowest_freq,
            highest_freq: self.config.highest_freq,
            frame_size: self.config.frame_size(),
            hop_size: self.config.hop_size(),
        };
        let estimated = self.estimator.estimate(&request, &mut buffers.pitches);
        buffers.accum.clear();
        estimated?;

        self.stats.analyses += 1;
        let mean = voiced_mean(&buffers.pitches);
        if mean.is_none() {
            self.stats.unvoiced += 1;
        }
        Ok(mean)
    }

    fn send(&mut self, pitch: f32) {
        let Some(relay) = self.relay.as_mut() else {
            self.stats.unbound += 1;
            return;
        };
        if relay.enqueue(pitch) {
            self.stats.relayed += 1;
        } else {
            self.stats.dropped += 1;
        }
    }
}

fn silence(outputs: &mut [&mut [f32]]) {
    for lane in outputs.iter_mut() {
        lane.fill(0.0);
    }
}
