//! # Audio Device Glue
//!
//! Connects cpal input and output streams to the core session. The cpal
//! stream handle is not `Send`, so it stays on the main thread inside a
//! [`StreamGuard`] while the capture thread reads from a channel-backed
//! [`ChannelSource`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, bounded};

use transcriber_core::config::RuntimeConfig;
use transcriber_core::session::PcmSource;

/// Keeps a cpal stream alive for the duration of a session. Dropping the
/// guard stops the stream.
pub struct StreamGuard {
    _stream: cpal::Stream,
}

/// Sample source fed by the cpal input callback.
///
/// The callback pushes raw blocks into a bounded channel; `read` reassembles
/// them into exactly step-sized buffers. A second without any incoming
/// block is reported as a read failure, which the capture loop turns into
/// silence.
pub struct ChannelSource {
    receiver: Receiver<Vec<i16>>,
    pending: VecDeque<i16>,
    rate: u32,
    channels: u16,
}

impl PcmSource for ChannelSource {
    fn read(&mut self, buffer: &mut [i16]) -> bool {
        while self.pending.len() < buffer.len() {
            match self.receiver.recv_timeout(Duration::from_secs(1)) {
                Ok(block) => self.pending.extend(block),
                Err(_) => return false,
            }
        }
        for slot in buffer.iter_mut() {
            *slot = self.pending.pop_front().unwrap_or(0);
        }
        true
    }

    fn rate(&self) -> u32 {
        self.rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

/// Opens the default input device and starts capturing.
///
/// Native i16 input is preferred; f32 devices are converted in the
/// callback. The stream guard must outlive the session.
pub fn open_input(config: &RuntimeConfig) -> Result<(StreamGuard, ChannelSource)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;
    println!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, config.sample_rate)
        .ok_or_else(|| anyhow!("no suitable input format found"))?;
    let rate = config
        .sample_rate
        .clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let stream_config = supported.with_sample_rate(cpal::SampleRate(rate));
    let sample_format = stream_config.sample_format();
    let channels = stream_config.channels();
    let stream_config: cpal::StreamConfig = stream_config.into();
    println!("Selected sample rate: {rate} Hz");

    let (tx, rx) = bounded::<Vec<i16>>(32);
    let err_fn = |err| eprintln!("An error occurred on the audio stream: {err}");

    let stream = match sample_format {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                // Drop the block when the session falls behind.
                let _ = tx.try_send(data.to_vec());
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let block = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
                    .collect();
                let _ = tx.try_send(block);
            },
            err_fn,
            None,
        )?,
        other => bail!("unsupported input sample format {other}"),
    };
    stream.play()?;

    Ok((
        StreamGuard { _stream: stream },
        ChannelSource {
            receiver: rx,
            pending: VecDeque::new(),
            rate,
            channels,
        },
    ))
}

/// Opens the default output device and returns a tick callback that plays a
/// short click when invoked.
pub fn open_metronome() -> Result<(StreamGuard, Box<dyn FnMut() + Send>)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no output device available"))?;
    let supported = device.default_output_config()?;
    let rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let stream_config: cpal::StreamConfig = supported.config();

    // Samples of click left to play; the tick callback rearms it.
    let click_samples = (rate / 20) as usize;
    let remaining = Arc::new(AtomicUsize::new(0));
    let playing = Arc::clone(&remaining);
    let tone_step = 880.0 * std::f32::consts::TAU / rate as f32;
    let mut phase = 0.0f32;

    let err_fn = |err| eprintln!("An error occurred on the audio stream: {err}");
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let sample = if playing.load(Ordering::Relaxed) > 0 {
                    playing.fetch_sub(1, Ordering::Relaxed);
                    phase += tone_step;
                    0.3 * phase.sin()
                } else {
                    phase = 0.0;
                    0.0
                };
                for slot in frame.iter_mut() {
                    *slot = sample;
                }
            }
        },
        err_fn,
        None,
    )?;
    stream.play()?;

    let tick = Box::new(move || {
        remaining.store(click_samples, Ordering::Relaxed);
    });
    Ok((StreamGuard { _stream: stream }, tick))
}

/// Picks the input configuration closest to the target rate, preferring
/// native i16 over f32.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    for format in [cpal::SampleFormat::I16, cpal::SampleFormat::F32] {
        let best = configs
            .iter()
            .filter(|c| c.sample_format() == format)
            .min_by_key(|c| {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            })
            .cloned();
        if best.is_some() {
            return best;
        }
    }
    None
}
