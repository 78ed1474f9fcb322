// SampleRing - lock-free hand-off from the device callback to the analysis tick
//
// The capture callback runs on the audio driver's thread and must never block
// or allocate. It pushes mono samples into an rtrb SPSC ring; the tick side
// drains whatever arrived since the previous frame into a rolling window of
// the most recent `fft_size` samples.
//
// Buffer flow:
// 1. Device callback de-interleaves channel 0 and pushes into the ring
// 2. On a full ring the callback drops the remaining samples and counts them
// 3. Each tick drains all available samples into the SampleWindow
// 4. The analyser reads the window in chronological order

use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Factory for the producer/consumer pair
pub struct SampleRing;

impl SampleRing {
    /// Create a ring holding up to `capacity` samples
    ///
    /// # Panics
    /// Panics if capacity is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> (SampleProducer, SampleConsumer) {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (producer, consumer) = RingBuffer::new(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        (
            SampleProducer {
                inner: producer,
                dropped: Arc::clone(&dropped),
            },
            SampleConsumer {
                inner: consumer,
                dropped,
            },
        )
    }
}

/// Callback-side handle
pub struct SampleProducer {
    inner: Producer<f32>,
    dropped: Arc<AtomicU64>,
}

impl SampleProducer {
    /// Push channel 0 of an interleaved buffer, converting each sample.
    ///
    /// Real-time safe: no locks, no allocation.
    pub fn push_interleaved<T: Copy>(
        &mut self,
        data: &[T],
        channels: usize,
        convert: impl Fn(T) -> f32,
    ) {
        let channels = channels.max(1);
        let mut frames = data.chunks(channels);
        for frame in frames.by_ref() {
            if self.inner.push(convert(frame[0])).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
        let remaining = frames.len() as u64;
        if remaining > 0 {
            self.dropped.fetch_add(remaining, Ordering::Relaxed);
        }
    }
}

/// Tick-side handle
pub struct SampleConsumer {
    inner: Consumer<f32>,
    dropped: Arc<AtomicU64>,
}

impl SampleConsumer {
    /// Move every available sample into `window`.
    ///
    /// # Returns
    /// Number of samples moved
    pub fn drain_into(&mut self, window: &mut SampleWindow) -> usize {
        let available = self.inner.slots();
        if available == 0 {
            return 0;
        }
        match self.inner.read_chunk(available) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                window.push_slice(first);
                window.push_slice(second);
                chunk.commit_all();
                available
            }
            Err(_) => 0,
        }
    }

    /// Samples lost to a full ring since the session opened
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Rolling window over the most recent samples
#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: Vec<f32>,
    write: usize,
    filled: usize,
}

impl SampleWindow {
    pub fn new(len: usize) -> Self {
        Self {
            buf: vec![0.0; len.max(1)],
            write: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of real samples held (saturates at capacity)
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn push_slice(&mut self, samples: &[f32]) {
        let cap = self.buf.len();
        // Only the tail can survive
        let samples = &samples[samples.len().saturating_sub(cap)..];
        for &sample in samples {
            self.buf[self.write] = sample;
            self.write = (self.write + 1) % cap;
        }
        self.filled = (self.filled + samples.len()).min(cap);
    }

    /// Copy the window, oldest sample first, into `out` (resized to capacity).
    /// Unfilled slots read as silence.
    pub fn copy_ordered(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend_from_slice(&self.buf[self.write..]);
        out.extend_from_slice(&self.buf[..self.write]);
    }

    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|s| *s = 0.0);
        self.write = 0;
        self.filled = 0;
    }
}
