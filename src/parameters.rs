//! The synth's typed parameter tree, its addressable leaf registry and the shared, versioned
//! parameter store.

use crate::{chain::ChainParameters, operator::OperatorSlot};

// -------------------------------------------------------------------------------------------------

mod operator;
pub use operator::{
    DelayParameters, EnvelopeParameters, FeedbackParameters, OperatorParameters,
    PanLfoParameters, RampParameters,
};

mod registry;
pub use registry::ParameterLeaf;

mod store;
pub use store::{ParameterHandle, ParameterStore};

// -------------------------------------------------------------------------------------------------

/// Output stage settings: balance, limiter and final gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputParameters {
    /// Stereo balance in range `[-1, 1]`.
    pub pan: f32,
    /// Limiter threshold in dB.
    pub threshold: f32,
    pub ratio: f32,
    /// Limiter attack time in seconds.
    pub attack: f32,
    /// Limiter release time in seconds.
    pub release: f32,
    /// Limiter lookahead time in milliseconds.
    pub lookahead: f32,
    /// Soft knee width in dB.
    pub knee: f32,
    /// Final output gain.
    pub gain: f32,
}

impl Default for OutputParameters {
    fn default() -> Self {
        Self {
            pan: 0.0,
            threshold: -18.0,
            ratio: 25.0,
            attack: 0.001,
            release: 0.07,
            lookahead: 3.0,
            knee: 0.4,
            gain: 0.6,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Voice controller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParameters {
    /// Pitch bend range in semitones, up and down.
    pub pitch_bend_range: f32,
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            pitch_bend_range: 2.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Full parameter snapshot of a synth: modulator operators, carrier and global settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthParameters {
    pub operators: Vec<OperatorParameters>,
    pub carrier: OperatorParameters,
    pub chain: ChainParameters,
    pub output: OutputParameters,
    pub voice: VoiceParameters,
}

impl SynthParameters {
    /// Default parameters for the given number of modulator operators.
    pub fn with_operator_count(operator_count: usize) -> Self {
        Self {
            operators: (0..operator_count)
                .map(|index| OperatorParameters::default_for_slot(OperatorSlot::Modulator(index)))
                .collect(),
            carrier: OperatorParameters::carrier(),
            chain: ChainParameters::default(),
            output: OutputParameters::default(),
            voice: VoiceParameters::default(),
        }
    }

    /// Access operator parameters by slot.
    pub fn operator(&self, slot: OperatorSlot) -> Option<&OperatorParameters> {
        match slot {
            OperatorSlot::Carrier => Some(&self.carrier),
            OperatorSlot::Modulator(index) => self.operators.get(index),
        }
    }

    /// Mutable access to operator parameters by slot.
    pub fn operator_mut(&mut self, slot: OperatorSlot) -> Option<&mut OperatorParameters> {
        match slot {
            OperatorSlot::Carrier => Some(&mut self.carrier),
            OperatorSlot::Modulator(index) => self.operators.get_mut(index),
        }
    }

    /// All operator slots, modulators first.
    pub fn slots(&self) -> impl Iterator<Item = OperatorSlot> {
        (0..self.operators.len())
            .map(OperatorSlot::Modulator)
            .chain(std::iter::once(OperatorSlot::Carrier))
    }
}

impl Default for SynthParameters {
    fn default() -> Self {
        Self::with_operator_count(6)
    }
}
