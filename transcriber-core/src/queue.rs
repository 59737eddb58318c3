//! # Capture Queue
//!
//! Fixed-capacity sample chunks and the bounded channel that carries them
//! from the capture thread to the processing thread. Dropping the sender
//! half is the end-of-session signal; the receiver drains whatever is still
//! buffered before observing the disconnect.

use crossbeam_channel::{Receiver, Sender, bounded};

/// One step-sized block of captured samples with its capture timestamp.
///
/// The capacity is fixed at creation; a full chunk rejects further samples
/// instead of growing.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    samples: Vec<i16>,
    capacity: usize,
    capture_time_ms: f64,
}

impl AudioChunk {
    pub fn with_capacity(capacity: usize, capture_time_ms: f64) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            capture_time_ms,
        }
    }

    /// Appends a sample; returns false when the chunk is already full.
    pub fn push(&mut self, sample: i16) -> bool {
        if self.samples.len() == self.capacity {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn capture_time_ms(&self) -> f64 {
        self.capture_time_ms
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }
}

pub type ChunkSender = Sender<AudioChunk>;
pub type ChunkReceiver = Receiver<AudioChunk>;

/// Bounded FIFO between the capture and processing threads. The bound keeps
/// a stalled processor from buffering unboundedly; at normal throughput the
/// queue stays near empty.
pub fn capture_channel(bound: usize) -> (ChunkSender, ChunkReceiver) {
    bounded(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn full_chunks_reject_samples_instead_of_growing() {
        let mut chunk = AudioChunk::with_capacity(2, 0.0);
        assert!(chunk.push(1));
        assert!(chunk.push(2));
        assert!(chunk.is_full());
        assert!(!chunk.push(3));
        assert_eq!(chunk.samples(), &[1, 2]);
    }

    #[test]
    fn chunks_arrive_in_capture_order() {
        let (tx, rx) = capture_channel(4);
        let producer = thread::spawn(move || {
            for i in 0..32i16 {
                let mut chunk = AudioChunk::with_capacity(1, i as f64 * 10.0);
                chunk.push(i);
                tx.send(chunk).unwrap();
            }
        });
        let mut last_time = f64::NEG_INFINITY;
        let mut count = 0;
        for chunk in rx.iter() {
            assert!(chunk.capture_time_ms() >= last_time);
            assert_eq!(chunk.samples()[0], count);
            last_time = chunk.capture_time_ms();
            count += 1;
        }
        producer.join().unwrap();
        assert_eq!(count, 32);
    }
}
