use std::panic::{catch_unwind, AssertUnwindSafe};

use super::{Source, SourceTime};

// -------------------------------------------------------------------------------------------------

/// A wrapper source that catches panics from an inner source and logs them.
///
/// After the wrapped source panicked it is no longer getting called: the guard then writes
/// silence, keeping the output stream alive.
pub struct GuardedSource<InputSource: Source + 'static> {
    source: InputSource,
    source_name: &'static str,
    panicked: bool,
}

impl<InputSource: Source + 'static> GuardedSource<InputSource> {
    pub fn new(source: InputSource, source_name: &'static str) -> Self {
        let panicked = false;
        Self {
            source,
            source_name,
            panicked,
        }
    }

    /// True when the wrapped source panicked.
    pub fn has_panicked(&self) -> bool {
        self.panicked
    }
}

impl<InputSource: Source + 'static> Source for GuardedSource<InputSource> {
    fn channel_count(&self) -> usize {
        self.source.channel_count()
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn is_exhausted(&self) -> bool {
        // a panicked source outputs silence, but remains alive
        !self.panicked && self.source.is_exhausted()
    }

    fn write(&mut self, output: &mut [f32], time: &SourceTime) -> usize {
        if !self.panicked {
            match catch_unwind(AssertUnwindSafe(|| self.source.write(output, time))) {
                Ok(written) => return written,
                Err(payload) => {
                    self.panicked = true;
                    log::error!(
                        "Ouch. {} source panicked: {}. Muting its output...",
                        self.source_name,
                        panic_message::panic_message(&payload)
                    );
                }
            }
        }
        let channel_count = self.channel_count().max(1);
        let written = output.len() / channel_count * channel_count;
        output[..written].fill(0.0);
        written
    }
}

// -------------------------------------------------------------------------------------------------
