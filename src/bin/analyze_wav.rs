//! Offline pitch track of a WAV file.
//!
//! Feeds the file through `PitchProcessor` one render quantum at a time, the
//! same way a live host would, and prints every value that reaches the relay.
//!
//! Usage: `analyze_wav <file.wav> [bufferSize]`

use anyhow::{bail, Context};
use log::info;
use pitch_relay::config::RENDER_QUANTUM_FRAMES;
use pitch_relay::wav;
use pitch_relay::{
    note_name, relay_channel, ControlMessage, PitchProcessor, ProcessorConfig, YinEstimator,
};

const DEFAULT_BUFFER_SIZE: usize = 2048;
const RELAY_CAPACITY: usize = 64;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: analyze_wav <file.wav> [bufferSize]");
    };
    let buffer_size = match args.next() {
        Some(text) => text
            .parse::<usize>()
            .with_context(|| format!("invalid bufferSize '{}'", text))?,
        None => DEFAULT_BUFFER_SIZE,
    };

    let audio = wav::load_planar(&path).with_context(|| format!("failed to read {}", path))?;
    let sample_rate = audio.sample_rate as f32;
    info!(
        "{}: {} channels, {} frames at {} Hz",
        path,
        audio.channels.len(),
        audio.frames(),
        audio.sample_rate
    );

    let config = ProcessorConfig::new(buffer_size, sample_rate).with_capacity(buffer_size * 2);
    let estimator = YinEstimator::new(config.frame_size());
    let mut processor =
        PitchProcessor::new(config, estimator).context("invalid processor configuration")?;

    let (producer, mut relay) = relay_channel(RELAY_CAPACITY);
    processor.apply_control(ControlMessage {
        relay: Some(producer.into()),
        is_playing: Some(true),
        mic_active: None,
    })?;

    let channel_count = audio.channels.len();
    let mut quantum = vec![vec![0.0f32; RENDER_QUANTUM_FRAMES]; channel_count];
    let mut output = vec![vec![0.0f32; RENDER_QUANTUM_FRAMES]; channel_count];

    println!("{:>9}  {:>9}  note", "time", "pitch");
    for start in (0..audio.frames()).step_by(RENDER_QUANTUM_FRAMES) {
        let end = (start + RENDER_QUANTUM_FRAMES).min(audio.frames());
        for (lane, source) in quantum.iter_mut().zip(&audio.channels) {
            lane[..end - start].copy_from_slice(&source[start..end]);
            lane[end - start..].fill(0.0);
        }

        let inputs: Vec<&[f32]> = quantum.iter().map(Vec::as_slice).collect();
        let mut outputs: Vec<&mut [f32]> = output.iter_mut().map(Vec::as_mut_slice).collect();
        processor.process(&inputs, &mut outputs);

        while let Some(hz) = relay.dequeue() {
            let seconds = end as f32 / sample_rate;
            let note = note_name(hz).unwrap_or_default();
            println!("{:>8.3}s  {:>6.1} Hz  {}", seconds, hz, note);
        }
    }

    let stats = processor.stats();
    info!(
        "{} blocks analysed, {} relayed, {} unvoiced, {} dropped, {} failures",
        stats.analyses, stats.relayed, stats.unvoiced, stats.dropped, stats.failures
    );
    Ok(())
}
