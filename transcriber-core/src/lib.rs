// transcriber-core/src/lib.rs

//! The core logic for the melody transcriber.
//! This crate is responsible for audio windowing, the spectral transform,
//! pitch-to-note mapping and note segmentation. It is completely headless
//! and contains no terminal or device code beyond the `PcmSource` seam.

pub mod config;
pub mod fft;
pub mod pitch;
pub mod queue;
pub mod report;
pub mod session;
pub mod spectrum;
pub mod transcribe;
pub mod window;

/// A single transcribed note, as detected by the segmentation stage.
/// Events are appended to the session log and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// The detected fundamental frequency in Hz.
    pub frequency: f64,
    /// How long the note was held, in milliseconds of capture time.
    pub duration_ms: f64,
    /// Log-amplitude of the peak bin when the note was first held.
    pub amplitude: f64,
}

/// The result of one recording session.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Note events in capture order.
    pub events: Vec<NoteEvent>,
    /// The space-joined note+duration expression string for the renderer.
    pub expression: String,
}
