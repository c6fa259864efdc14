use crate::source::Source;

// -------------------------------------------------------------------------------------------------

#[cfg(feature = "cpal-output")]
pub mod cpal;
#[cfg(feature = "wav-output")]
pub mod wav;

/// The default real-time audio output type.
#[cfg(feature = "cpal-output")]
pub type DefaultOutputDevice = cpal::CpalOutput;

// -------------------------------------------------------------------------------------------------

/// Audio output device, which runs a single [`Source`] in its audio thread.
pub trait OutputDevice {
    /// Actual device's output sample buffer channel count.
    fn channel_count(&self) -> usize;
    /// Actual device's output sample rate.
    fn sample_rate(&self) -> u32;
    /// Actual device's output playhead position in **samples** (NOT frames).
    fn sample_position(&self) -> u64;

    /// Get actual output volume.
    fn volume(&self) -> f32;
    /// Set a new output volume.
    fn set_volume(&mut self, volume: f32);

    /// True when the device is currently writing its source.
    fn is_running(&self) -> bool;

    /// Pause playback without dropping the output source.
    fn pause(&mut self);
    /// Resume from paused playback.
    fn resume(&mut self);

    /// Play given source as main output source. Sources with a sample rate or channel layout
    /// that does not match the device's are rejected.
    fn play(&mut self, source: Box<dyn Source>);
    /// Drop actual source, replacing it with silence.
    fn stop(&mut self);

    /// Release the audio device.
    fn close(&mut self);
}

// -------------------------------------------------------------------------------------------------

/// Test if a source matches the device's specs, logging mismatches.
pub(crate) fn source_matches_device(
    source: &dyn Source,
    sample_rate: u32,
    channel_count: usize,
) -> bool {
    if source.sample_rate() != sample_rate || source.channel_count() != channel_count {
        log::error!(
            "Source specs ({} Hz, {} channels) do not match the output's ({} Hz, {} channels)",
            source.sample_rate(),
            source.channel_count(),
            sample_rate,
            channel_count
        );
        false
    } else {
        true
    }
}
