use four_cc::FourCC;

use crate::{
    parameter::{Parameter, ParameterValueUpdate},
    Error,
};

// -------------------------------------------------------------------------------------------------

pub mod compressor;

// -------------------------------------------------------------------------------------------------

/// Effects manipulate interleaved audio samples in `f32` format in place and can be `Send` and
/// `Sync`ed across threads.
///
/// Effect parameters are described via [`Effect::parameters`] and get changed in the audio
/// thread via [`Effect::process_parameter_update`], so the processing state can not be mutated
/// outside of the audio thread.
///
/// NB: all `process_XXX` functions are called in realtime audio threads, so they must not
/// block or allocate! All other functions are called in the main thread to initialize the
/// effect.
pub trait Effect: Send + Sync + 'static {
    /// A unique, static name for the effect.
    fn name(&self) -> &'static str;

    /// Returns a list of parameter descriptors for this effect.
    fn parameters(&self) -> Vec<&dyn Parameter>;

    /// Initializes the effect with the audio output's properties. This is the place to
    /// allocate buffers.
    ///
    /// If an error is returned, the effect can't be used.
    fn initialize(&mut self, sample_rate: u32, channel_count: usize) -> Result<(), Error>;

    /// Processes an interleaved audio buffer in-place, applying the effect.
    fn process(&mut self, output: &mut [f32]);

    /// Handles a parameter update in the real-time thread. The implementation should match on
    /// the `id` and update its internal state by using the raw or normalized `value`.
    fn process_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error>;
}
