//! Live pitch readout from the default microphone.
//!
//! Usage: `pitch_monitor [bufferSize] [host]`

mod input_host;
mod quantizer;

use std::time::Duration;

use anyhow::Context;
use log::info;
use pitch_relay::{
    note_name, relay_channel, ControlMessage, PitchProcessor, ProcessorConfig, YinEstimator,
};

use input_host::InputHost;

const DEFAULT_BUFFER_SIZE: usize = 2048;
const RELAY_CAPACITY: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let buffer_size = match args.next() {
        Some(text) => text
            .parse::<usize>()
            .with_context(|| format!("invalid bufferSize '{}'", text))?,
        None => DEFAULT_BUFFER_SIZE,
    };
    let preferred_host = args.next();

    let (producer, mut consumer) = relay_channel(RELAY_CAPACITY);

    let host = InputHost::with_host_preference(
        move |sample_rate| {
            let config = ProcessorConfig::new(buffer_size, sample_rate);
            let estimator = YinEstimator::new(config.frame_size());
            let processor = PitchProcessor::new(config, estimator)
                .context("invalid processor configuration")?;
            processor.apply_control(ControlMessage {
                relay: Some(producer.into()),
                is_playing: None,
                mic_active: Some(true),
            })?;
            Ok(processor)
        },
        preferred_host.as_deref(),
    )?;

    let config = host.config();
    info!(
        "listening on {} / {} at {} Hz ({} channels), press Ctrl+C to stop",
        config.host_name, config.device_name, config.sample_rate, config.channels
    );

    let mut pitches = Vec::with_capacity(RELAY_CAPACITY);
    loop {
        std::thread::sleep(POLL_INTERVAL);
        pitches.clear();
        consumer.drain_into(&mut pitches);
        for &hz in &pitches {
            println!("{:>7.1} Hz  {}", hz, note_name(hz).unwrap_or_default());
        }
    }
}
