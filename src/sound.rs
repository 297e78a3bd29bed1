use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use crate::error::FrontendError;
use crate::frontend::Buzzer;

const TONE_HZ: f32 = 440.0;
const VOLUME: f32 = 0.2;

/// Sine tone on the default output device, played while the sound timer
/// runs. The stream is built once and paused between beeps.
pub struct Sound {
    stream: cpal::Stream,
    playing: bool,
}

impl Sound {
    pub fn new() -> Result<Self, FrontendError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| FrontendError::Audio("no output device available".into()))?;
        let supported_config = device.default_output_config().map_err(audio)?;
        let format = supported_config.sample_format();
        let config: cpal::StreamConfig = supported_config.into();

        let stream = match format {
            cpal::SampleFormat::I8 => Self::build::<i8>(&device, &config),
            cpal::SampleFormat::I16 => Self::build::<i16>(&device, &config),
            cpal::SampleFormat::I32 => Self::build::<i32>(&device, &config),
            cpal::SampleFormat::I64 => Self::build::<i64>(&device, &config),
            cpal::SampleFormat::U8 => Self::build::<u8>(&device, &config),
            cpal::SampleFormat::U16 => Self::build::<u16>(&device, &config),
            cpal::SampleFormat::U32 => Self::build::<u32>(&device, &config),
            cpal::SampleFormat::U64 => Self::build::<u64>(&device, &config),
            cpal::SampleFormat::F32 => Self::build::<f32>(&device, &config),
            cpal::SampleFormat::F64 => Self::build::<f64>(&device, &config),
            sample_format => Err(FrontendError::Audio(format!(
                "unsupported sample format '{sample_format}'"
            ))),
        }?;
        // some backends start streams immediately
        stream.pause().map_err(audio)?;
        log::debug!("audio ready: {} Hz, {} channels", config.sample_rate.0, config.channels);

        Ok(Self {
            stream,
            playing: false,
        })
    }

    fn build<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream, FrontendError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        let mut sample_clock = 0f32;
        let mut next_value = move || {
            sample_clock = (sample_clock + 1.0) % sample_rate;
            VOLUME * (sample_clock * TONE_HZ * 2.0 * std::f32::consts::PI / sample_rate).sin()
        };

        let err_fn = |err| log::warn!("audio stream error: {err}");

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    write_data(data, channels, &mut next_value)
                },
                err_fn,
                None,
            )
            .map_err(audio)
    }
}

impl Buzzer for Sound {
    fn set_active(&mut self, on: bool) -> Result<(), FrontendError> {
        if on == self.playing {
            return Ok(());
        }
        if on {
            self.stream.play().map_err(audio)?;
        } else {
            self.stream.pause().map_err(audio)?;
        }
        self.playing = on;
        Ok(())
    }
}

fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: Sample + FromSample<f32>,
{
    for frame in output.chunks_mut(channels) {
        let value: T = T::from_sample(next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}

fn audio(err: impl std::fmt::Display) -> FrontendError {
    FrontendError::Audio(err.to_string())
}
