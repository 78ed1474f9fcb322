// AudioFrame - one snapshot of byte-scaled frequency bin magnitudes

/// Frequency-domain snapshot produced by a single analysis tick.
///
/// Holds `fft_size / 2` magnitudes in `0..=255`, the sample rate the bins were
/// computed at, and the id of the capture session that produced it so late
/// frames from a closed session can be recognised and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    bins: Vec<u8>,
    sample_rate: u32,
    session_id: u64,
}

impl AudioFrame {
    pub fn new(bins: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            bins,
            sample_rate,
            session_id: 0,
        }
    }

    /// Tag the frame with the session that captured it.
    pub fn with_session(mut self, session_id: u64) -> Self {
        self.session_id = session_id;
        self
    }

    /// Frame with every bin at `magnitude`.
    pub fn uniform(bin_count: usize, magnitude: u8, sample_rate: u32) -> Self {
        Self::new(vec![magnitude; bin_count], sample_rate)
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn bins_mut(&mut self) -> &mut [u8] {
        &mut self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Transform size the frame was derived from.
    pub fn fft_size(&self) -> usize {
        self.bins.len() * 2
    }
}
