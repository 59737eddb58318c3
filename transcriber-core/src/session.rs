//! # Recording Session
//!
//! Drives one capture/processing run. A spawned capture thread reads
//! step-sized blocks from the PCM source, timestamps them against the
//! session clock and sends them through the bounded capture channel; the
//! calling thread consumes the channel and runs the analysis chain on each
//! window. Dropping the sender ends the session, so no late chunk is lost:
//! the receiver drains everything buffered before it observes the
//! disconnect.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, select, tick};

use crate::config::RuntimeConfig;
use crate::queue::{self, AudioChunk, ChunkReceiver, ChunkSender};
use crate::{NoteEvent, Transcription, fft, pitch, spectrum, transcribe, window};

/// Chunks buffered between capture and processing. Processing keeps up at
/// normal throughput; the bound only matters when it stalls.
const QUEUE_BOUND: usize = 64;

/// A blocking PCM sample source.
///
/// A failed read is non-fatal: the capture loop substitutes a block of
/// silence and keeps going, so a stalled device degrades to rests instead
/// of aborting the session.
pub trait PcmSource: Send {
    /// Fills `buffer` with interleaved samples; returns false when the read
    /// failed and the buffer contents are unusable.
    fn read(&mut self, buffer: &mut [i16]) -> bool;
    /// Capture rate in Hz.
    fn rate(&self) -> u32;
    /// Interleaved channel count.
    fn channels(&self) -> u16;
}

/// The overlapping analysis window.
///
/// Holds `sample_size` normalized samples; every new chunk shifts the ring
/// left by the step size and writes the chunk into the freed tail, scaled
/// to `[-1, 1)`.
pub struct SlidingSampleWindow {
    samples: Vec<f64>,
    step: usize,
}

impl SlidingSampleWindow {
    pub fn new(sample_size: usize, step_size: usize) -> Self {
        Self {
            samples: vec![0.0; sample_size],
            step: step_size.min(sample_size),
        }
    }

    /// Shifts the window and appends one chunk. A chunk shorter than the
    /// step leaves silence in the remaining tail slots.
    pub fn slide(&mut self, chunk: &[i16]) {
        let tail = self.samples.len() - self.step;
        self.samples.copy_within(self.step.., 0);
        let incoming = chunk.len().min(self.step);
        for (slot, &sample) in self.samples[tail..].iter_mut().zip(&chunk[..incoming]) {
            *slot = sample as f64 / 32768.0;
        }
        for slot in &mut self.samples[tail + incoming..] {
            *slot = 0.0;
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

/// Runs one recording session to completion and returns the transcription.
///
/// When a metronome callback is given it is invoked once per beat on its
/// own thread for the duration of the session.
pub fn run_session(
    config: &RuntimeConfig,
    source: Box<dyn PcmSource>,
    metronome: Option<Box<dyn FnMut() + Send>>,
) -> Result<Transcription> {
    config.validate()?;
    let (chunk_tx, chunk_rx) = queue::capture_channel(QUEUE_BOUND);
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
    let metronome_thread = metronome.map(|tick_fn| {
        let interval = Duration::from_secs_f64(config.beat_ms() / 1000.0);
        thread::spawn(move || metronome_loop(tick_fn, interval, stop_rx))
    });

    let capture_config = config.clone();
    let capture_thread = thread::spawn(move || capture_loop(&capture_config, source, chunk_tx));

    let result = process_loop(config, &chunk_rx);

    // An early processing error must not leave capture blocked on a full
    // channel.
    drop(chunk_rx);
    capture_thread
        .join()
        .map_err(|_| anyhow!("capture thread panicked"))?;
    drop(stop_tx);
    if let Some(handle) = metronome_thread {
        handle
            .join()
            .map_err(|_| anyhow!("metronome thread panicked"))?;
    }
    result
}

/// One frame of the multi-peak detector: the note symbols of the `k`
/// loudest equal-tempered candidate bins at one capture timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordFrame {
    pub time_ms: f64,
    pub symbols: Vec<String>,
}

/// Runs a session in multi-peak mode, reporting the detected note set
/// whenever it changes. No segmentation or duration quantization is
/// applied; each frame is a raw fixed-cardinality snapshot.
pub fn run_chord_session(
    config: &RuntimeConfig,
    source: Box<dyn PcmSource>,
    num_bins: usize,
) -> Result<Vec<ChordFrame>> {
    config.validate()?;
    let (chunk_tx, chunk_rx) = queue::capture_channel(QUEUE_BOUND);
    let capture_config = config.clone();
    let capture_thread = thread::spawn(move || capture_loop(&capture_config, source, chunk_tx));

    let window_function = window::WindowFunction::from_name(&config.window_function);
    let mut sliding = SlidingSampleWindow::new(config.sample_size, config.step_size);
    let mut real = vec![0.0; config.sample_size];
    let mut imag = vec![0.0; config.sample_size];
    let mut frames: Vec<ChordFrame> = Vec::new();
    for chunk in chunk_rx.iter() {
        analyze_window(
            &window_function,
            &mut sliding,
            &chunk,
            &mut real,
            &mut imag,
        );
        let amps = spectrum::log_amplitude_spectrum(&real, &imag);
        let bins = spectrum::note_peak_bins(
            &amps,
            num_bins,
            config.sample_rate as f64,
            config.tuning_pitch,
        );
        let mut symbols: Vec<String> = bins
            .iter()
            .filter_map(|&bin| {
                let frequency =
                    bin as f64 * config.sample_rate as f64 / config.sample_size as f64;
                pitch::note_for_frequency(
                    frequency,
                    config.tuning_pitch,
                    config.pitch_resolution_cents,
                )
            })
            .collect();
        symbols.sort();
        symbols.dedup();
        if frames.last().is_none_or(|last| last.symbols != symbols) {
            frames.push(ChordFrame {
                time_ms: chunk.capture_time_ms(),
                symbols,
            });
        }
    }

    capture_thread
        .join()
        .map_err(|_| anyhow!("capture thread panicked"))?;
    Ok(frames)
}

fn capture_loop(config: &RuntimeConfig, mut source: Box<dyn PcmSource>, tx: ChunkSender) {
    let channels = source.channels().max(1) as usize;
    let step = config.step_size;
    let mut frame = vec![0i16; step * channels];
    let recording_ms = config.recording_time_secs as f64 * 1000.0;
    let started = Instant::now();
    loop {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if elapsed_ms >= recording_ms {
            break;
        }
        if !source.read(&mut frame) {
            eprintln!("[CAPTURE] device read failed, substituting silence");
            frame.fill(0);
        }
        let mut chunk = AudioChunk::with_capacity(step, elapsed_ms);
        for samples in frame.chunks(channels) {
            let sum: i32 = samples.iter().map(|&s| i32::from(s)).sum();
            if !chunk.push((sum / channels as i32) as i16) {
                break;
            }
        }
        if tx.send(chunk).is_err() {
            // Processing side is gone; nothing left to capture for.
            break;
        }
    }
    eprintln!(
        "[CAPTURE] finished after {:.1} s",
        started.elapsed().as_secs_f64()
    );
}

/// Slides the chunk into the analysis window and fills `real`/`imag` with
/// the windowed transform of its contents.
fn analyze_window(
    window_function: &window::WindowFunction,
    sliding: &mut SlidingSampleWindow,
    chunk: &AudioChunk,
    real: &mut [f64],
    imag: &mut [f64],
) {
    sliding.slide(chunk.samples());
    real.copy_from_slice(sliding.samples());
    imag.fill(0.0);
    window_function.apply(real);
    fft::transform(real, imag);
}

fn process_loop(config: &RuntimeConfig, rx: &ChunkReceiver) -> Result<Transcription> {
    let window_function = window::WindowFunction::from_name(&config.window_function);
    let mut sliding = SlidingSampleWindow::new(config.sample_size, config.step_size);
    let mut segmenter = transcribe::NoteSegmenter::new(config.min_note_ms() / 2.0);
    let mut events = Vec::new();
    let mut real = vec![0.0; config.sample_size];
    let mut imag = vec![0.0; config.sample_size];
    let mut last_time_ms = 0.0;
    for chunk in rx.iter() {
        analyze_window(
            &window_function,
            &mut sliding,
            &chunk,
            &mut real,
            &mut imag,
        );
        let mut amps = spectrum::log_amplitude_spectrum(&real, &imag);
        spectrum::bandpass(
            &mut amps,
            config.sample_rate as f64,
            config.low_frequency,
            config.high_frequency,
        );
        let bin = spectrum::peak_bin(&amps);
        let frequency = bin as f64 * config.sample_rate as f64 / config.sample_size as f64;
        let symbol = pitch::note_for_frequency(
            frequency,
            config.tuning_pitch,
            config.pitch_resolution_cents,
        );
        last_time_ms = chunk.capture_time_ms();
        if let Some(event) = segmenter.observe(frequency, symbol.as_deref(), amps[bin], last_time_ms)
        {
            eprintln!(
                "[PROCESS] note at {:.1} Hz held for {:.0} ms",
                event.frequency, event.duration_ms
            );
            events.push(event);
        }
    }
    if let Some(event) = segmenter.finish(last_time_ms) {
        eprintln!(
            "[PROCESS] final note at {:.1} Hz held for {:.0} ms",
            event.frequency, event.duration_ms
        );
        events.push(event);
    }
    let expression = render_expression(config, &events)?;
    Ok(Transcription { events, expression })
}

/// Renders every event as a note+duration expression and joins them for
/// the notation renderer. Events whose frequency no longer maps to a note
/// render as nothing and are skipped.
fn render_expression(config: &RuntimeConfig, events: &[NoteEvent]) -> Result<String> {
    let mut parts = Vec::new();
    for event in events {
        let symbol = pitch::note_for_frequency(
            event.frequency,
            config.tuning_pitch,
            config.pitch_resolution_cents,
        )
        .unwrap_or_default();
        let part = transcribe::note_length_expression(
            &symbol,
            event.duration_ms,
            config.rhythm_resolution,
            config.beats_per_minute,
            config.rhythm_denominator,
        )?;
        if !part.is_empty() {
            parts.push(part);
        }
    }
    Ok(parts.join(" "))
}

fn metronome_loop(mut tick_fn: Box<dyn FnMut() + Send>, interval: Duration, stop: Receiver<()>) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(ticker) -> _ => tick_fn(),
            recv(stop) -> message => {
                if message.is_err() {
                    break;
                }
            }
        }
    }
}
