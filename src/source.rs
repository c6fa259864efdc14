use std::time::Instant;

// -------------------------------------------------------------------------------------------------

pub mod guarded;
pub mod synth;

// -------------------------------------------------------------------------------------------------

/// Timing info for [`Source`] impls.
#[derive(Debug, Clone, Copy)]
pub struct SourceTime {
    /// Frame position in the audio output stream.
    pub pos_in_frames: u64,
    /// Time instant that corresponds to `pos_in_frames`.
    pub pos_instant: Instant,
}

impl SourceTime {
    pub fn new() -> Self {
        Self {
            pos_in_frames: 0,
            pos_instant: Instant::now(),
        }
    }

    /// Create a new source time, which is moved ahead by the given number of frames.
    pub fn with_frames_added(&self, frames: u64) -> Self {
        Self {
            pos_in_frames: self.pos_in_frames + frames,
            pos_instant: self.pos_instant,
        }
    }
}

impl Default for SourceTime {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

/// Audio signal producer, generating interleaved `f32` samples. Sources get moved into an
/// [`OutputDevice`](crate::OutputDevice) and run in its real-time audio thread.
///
/// NB: `write` is called in realtime audio threads, so it must not block or allocate!
pub trait Source: Send + 'static {
    /// The source's output channel layout.
    fn channel_count(&self) -> usize;
    /// The source's output sample rate.
    fn sample_rate(&self) -> u32;

    /// True when the source no longer produces any output. Output devices stop writing
    /// exhausted sources.
    fn is_exhausted(&self) -> bool;

    /// Write at most `output.len()` samples into the interleaved `output` buffer. Returns
    /// the number of written samples, which should always be a multiple of the channel
    /// count.
    fn write(&mut self, output: &mut [f32], time: &SourceTime) -> usize;
}
