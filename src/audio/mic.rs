//! Live microphone capture through cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};

use super::decode::downmix_into;
use super::source::{SampleRing, SampleTap, SourceError};
use crate::config::AnalyserConfig;

/// An open input stream feeding a shared sample ring.
///
/// The stream stops when this is dropped; taps created from it then stop receiving data.
pub struct MicInput {
    ring: SampleRing,
    _stream: cpal::Stream,
}

impl MicInput {
    pub fn open(config: &AnalyserConfig) -> Result<Self, SourceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(SourceError::NoInputDevice)?;

        let supported = device
            .default_input_config()
            .map_err(|e| SourceError::UnsupportedConfig(e.to_string()))?;

        log::info!(
            "Microphone: {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            supported.sample_rate().0,
            supported.channels()
        );

        // A few windows of headroom so the tick thread never starves
        let ring = SampleRing::new(config.fft_size.max(2) * 4);
        let channels = supported.channels() as usize;
        let stream_config: cpal::StreamConfig = supported.config();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, channels, ring.clone()),
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, channels, ring.clone()),
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, channels, ring.clone()),
            other => Err(SourceError::UnsupportedConfig(format!("sample format {:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| SourceError::Stream(e.to_string()))?;

        Ok(Self {
            ring,
            _stream: stream,
        })
    }

    /// A `Send` spectrum source reading from this input
    pub fn tap(&self, config: &AnalyserConfig) -> SampleTap {
        SampleTap::new(self.ring.clone(), config)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    ring: SampleRing,
) -> Result<cpal::Stream, SourceError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut floats = Vec::new();
    let mut mono = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                floats.clear();
                floats.extend(data.iter().map(|&s| s.to_sample::<f32>()));
                mono.clear();
                downmix_into(&floats, channels, &mut mono);
                ring.push_slice(&mono);
            },
            |err| log::error!("Microphone stream error: {}", err),
            None,
        )
        .map_err(|e| SourceError::Stream(e.to_string()))
}
