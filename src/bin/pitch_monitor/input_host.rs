//! CPAL capture host: device selection, stream configuration and sample
//! format conversion for the microphone side.

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, StreamConfig};
use dasp_sample::FromSample;
use log::{error, info, warn};
use pitch_relay::{PitchEstimator, PitchProcessor};

use crate::quantizer::Quantizer;

const PREFERRED_SAMPLE_RATE: u32 = 48000;

/// What the capture stream ended up running with.
#[derive(Debug, Clone)]
pub struct InputHostConfig {
    pub sample_rate: f32,
    pub channels: u16,
    pub device_name: String,
    pub host_name: String,
}

pub struct InputHost {
    _stream: cpal::Stream,
    config: InputHostConfig,
}

impl InputHost {
    /// Opens the default input device of the preferred host (or the first
    /// host that has one) and starts capturing.
    ///
    /// `factory` receives the negotiated sample rate and builds the processor
    /// that the audio thread will own.
    pub fn with_host_preference<E, F>(
        factory: F,
        preferred_host: Option<&str>,
    ) -> anyhow::Result<Self>
    where
        E: PitchEstimator + Send + 'static,
        F: FnOnce(f32) -> anyhow::Result<PitchProcessor<E>>,
    {
        let (device, config, sample_format, host_name) = select_input_device(preferred_host)?;

        let sample_rate = config.sample_rate.0 as f32;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());

        let processor = factory(sample_rate)?;
        let quantizer = Quantizer::new(processor, config.channels as usize);

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32, E>(&device, &config, quantizer)?,
            SampleFormat::I16 => build_stream::<i16, E>(&device, &config, quantizer)?,
            SampleFormat::U16 => build_stream::<u16, E>(&device, &config, quantizer)?,
            other => anyhow::bail!("unsupported sample format: {:?}", other),
        };
        stream.play().context("failed to start input stream")?;

        info!(
            "capturing from '{}' on {} ({} Hz, {} channels, {:?})",
            device_name, host_name, sample_rate, config.channels, sample_format
        );

        Ok(Self {
            _stream: stream,
            config: InputHostConfig {
                sample_rate,
                channels: config.channels,
                device_name,
                host_name,
            },
        })
    }

    pub fn config(&self) -> &InputHostConfig {
        &self.config
    }
}

fn select_input_device(
    preferred_host: Option<&str>,
) -> anyhow::Result<(cpal::Device, StreamConfig, SampleFormat, String)> {
    let available_hosts = cpal::available_hosts();
    let mut host_priority = Vec::new();
    if let Some(preferred) = preferred_host {
        match available_hosts.iter().find(|h| h.name() == preferred) {
            Some(&host_id) => host_priority.push(host_id),
            None => warn!("audio host '{}' not available", preferred),
        }
    }
    for host_id in available_hosts {
        if !host_priority.contains(&host_id) {
            host_priority.push(host_id);
        }
    }

    let mut last_error: Option<anyhow::Error> = None;
    for host_id in host_priority {
        let host = cpal::host_from_id(host_id)?;
        let host_name = host_id.name().to_string();

        let Some(device) = host.default_input_device() else {
            last_error = Some(anyhow::anyhow!(
                "host {} has no default input device",
                host_name
            ));
            continue;
        };

        if let Ok(configs) = device.supported_input_configs() {
            for supported in configs {
                let sample_format = supported.sample_format();
                if !matches!(
                    sample_format,
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                ) {
                    continue;
                }
                if supported.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                    && supported.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
                {
                    let config = supported
                        .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
                        .config();
                    return Ok((device, config, sample_format, host_name));
                }
            }
        }

        match device.default_input_config() {
            Ok(supported) => {
                let sample_format = supported.sample_format();
                return Ok((device, supported.config(), sample_format, host_name));
            }
            Err(err) => {
                last_error = Some(anyhow::anyhow!(
                    "failed to query default input config for host {}: {}",
                    host_name,
                    err
                ));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no usable input device found")))
}

fn build_stream<T, E>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut quantizer: Quantizer<E>,
) -> anyhow::Result<cpal::Stream>
where
    T: Sample + SizedSample,
    f32: FromSample<T>,
    E: PitchEstimator + Send + 'static,
{
    let mut error_reported = false;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _| {
                if quantizer.call_count == 0 {
                    info!("first input callback: {} samples", data.len());
                }
                if let Err(err) = quantizer.push_interleaved(data) {
                    if !error_reported {
                        error!("input callback error: {}", err);
                        error_reported = true;
                    }
                }
            },
            move |err| {
                error!("input stream error: {}", err);
            },
            None,
        )
        .context("failed to build input stream")?;

    Ok(stream)
}
