//! Serial FM operator cascade with a terminal carrier.

use crate::{
    operator::{Operator, OperatorSlot, VoiceSignals},
    parameters::{OperatorParameters, SynthParameters},
};

// -------------------------------------------------------------------------------------------------

/// Order in which modulators feed each other before reaching the carrier.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::FromRepr,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ChainTopology {
    /// `op1 -> op2 -> ... -> opN -> carrier`
    #[default]
    Forward,
    /// `opN -> ... -> op2 -> op1 -> carrier`
    Reverse,
}

/// Reference frequency modulator amplitudes get scaled by.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::FromRepr,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum AmplitudeScaling {
    /// The operator's own base frequency: `pitch * ratio + offset`.
    #[default]
    BaseFrequency,
    /// The played pitch.
    Pitch,
}

// -------------------------------------------------------------------------------------------------

/// Wiring and scaling of a [`ModulationChain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParameters {
    pub topology: ChainTopology,
    pub amplitude_scaling: AmplitudeScaling,
    /// Amplitude multiplier for modulators which receive modulation themselves.
    pub operator_emphasis: f32,
    /// Multiplier for the modulation which reaches the carrier.
    pub carrier_coupling: f32,
    /// When set, modulation reaching an operator gets scaled by `1 + depth` of that operator.
    pub depth_coupling: bool,
    /// Global modulation gain, applied to all couplings.
    pub modulation_gain: f32,
}

impl ChainParameters {
    /// Plain serial FM: amplitudes scale with pitch, no emphasis, unity couplings.
    pub fn simple() -> Self {
        Self {
            topology: ChainTopology::Forward,
            amplitude_scaling: AmplitudeScaling::Pitch,
            operator_emphasis: 1.0,
            carrier_coupling: 1.0,
            depth_coupling: false,
            modulation_gain: 1.0,
        }
    }

    /// Default chain with reversed topology.
    pub fn reverse() -> Self {
        Self {
            topology: ChainTopology::Reverse,
            ..Self::default()
        }
    }
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self {
            topology: ChainTopology::Forward,
            amplitude_scaling: AmplitudeScaling::BaseFrequency,
            operator_emphasis: 1.5,
            carrier_coupling: 2.0,
            depth_coupling: true,
            modulation_gain: 1.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A fixed number of modulator [`Operator`]s plus a carrier, evaluated sample by sample.
///
/// Each modulator's output modulates the frequency of the next one in the chain's
/// [`ChainTopology`]; the last one modulates the carrier, which produces the chain's output.
#[derive(Debug, Clone)]
pub struct ModulationChain {
    operators: Vec<Operator>,
    carrier: Operator,
    parameters: ChainParameters,
}

impl ModulationChain {
    /// Create a new chain with one modulator per entry in `operators`.
    pub fn new(
        sample_rate: u32,
        operators: &[OperatorParameters],
        carrier: &OperatorParameters,
        parameters: ChainParameters,
    ) -> Self {
        let operators = operators
            .iter()
            .enumerate()
            .map(|(index, params)| {
                Operator::new(
                    OperatorSlot::Modulator(index),
                    sample_rate,
                    params,
                    index as u64 + 1,
                )
            })
            .collect();
        let carrier = Operator::new(OperatorSlot::Carrier, sample_rate, carrier, 0);
        Self {
            operators,
            carrier,
            parameters,
        }
    }

    /// Create a new chain from a full parameter snapshot.
    pub fn from_parameters(sample_rate: u32, parameters: &SynthParameters) -> Self {
        Self::new(
            sample_rate,
            &parameters.operators,
            &parameters.carrier,
            parameters.chain,
        )
    }

    /// The chain's modulators.
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// The chain's carrier.
    pub fn carrier(&self) -> &Operator {
        &self.carrier
    }

    pub fn parameters(&self) -> &ChainParameters {
        &self.parameters
    }

    /// Apply a new parameter snapshot. The number of modulators is fixed: surplus operator
    /// parameters are ignored, missing ones leave operators untouched.
    pub fn apply_parameters(&mut self, parameters: &SynthParameters) {
        for (operator, params) in self.operators.iter_mut().zip(&parameters.operators) {
            operator.set_parameters(params);
        }
        self.carrier.set_parameters(&parameters.carrier);
        self.parameters = parameters.chain;
    }

    /// Start a note on all operators.
    pub fn play(&mut self) {
        for operator in &mut self.operators {
            operator.play();
        }
        self.carrier.play();
    }

    /// Release all operators.
    pub fn stop(&mut self) {
        for operator in &mut self.operators {
            operator.stop();
        }
        self.carrier.stop();
    }

    /// Immediately silence all operators.
    pub fn reset(&mut self) {
        for operator in &mut self.operators {
            operator.reset();
        }
        self.carrier.reset();
    }

    /// True while the carrier produces sound.
    pub fn is_active(&self) -> bool {
        self.carrier.is_active()
    }

    /// Last processed carrier frequency in Hz.
    pub fn carrier_frequency(&self) -> f32 {
        self.carrier.frequency()
    }

    /// Compute one stereo output frame.
    #[inline]
    pub fn process(&mut self, signals: &VoiceSignals) -> [f32; 2] {
        let chain = self.parameters;
        let count = self.operators.len();
        let mut coupling = 0.0;
        for step in 0..count {
            let index = match chain.topology {
                ChainTopology::Forward => step,
                ChainTopology::Reverse => count - 1 - step,
            };
            let operator = &mut self.operators[index];
            let modulated = step > 0;
            let incoming = if modulated {
                let depth_factor = if chain.depth_coupling {
                    let params = operator.parameters();
                    1.0 + params.depth + params.depth_fine
                } else {
                    1.0
                };
                coupling * chain.modulation_gain * depth_factor
            } else {
                0.0
            };
            operator.process(signals, &chain, incoming, modulated);
            coupling = operator.coupling();
        }
        let incoming = coupling * chain.carrier_coupling * chain.modulation_gain;
        self.carrier.process(signals, &chain, incoming, false)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{EnvelopeParameters, RampParameters};

    const SAMPLE_RATE: u32 = 44100;

    fn signals() -> VoiceSignals {
        VoiceSignals {
            pitch: 440.0,
            velocity: 1.0,
            aftertouch: 0.0,
        }
    }

    fn steady_modulator(ratio: f32, depth: f32, sustain: f32) -> OperatorParameters {
        OperatorParameters {
            ratio,
            depth,
            amp_env: EnvelopeParameters::new(0.01, 0.1, sustain, 0.5, 1.0),
            freq_ramp: RampParameters::new(0.0, 0.0, 1.0),
            amp_ramp: RampParameters::new(1.0, 1.0, 1.0),
            ..OperatorParameters::modulator()
        }
    }

    #[test]
    fn carrier_deviation() {
        // A4 on a single modulator chain: carrier swings by pitch * depth * sustain
        let sustain = 0.8;
        let mut chain = ModulationChain::new(
            SAMPLE_RATE,
            &[steady_modulator(2.0, 5.0, sustain)],
            &OperatorParameters::carrier(),
            ChainParameters::simple(),
        );
        chain.play();
        for _ in 0..SAMPLE_RATE {
            chain.process(&signals());
        }
        let (mut min, mut max) = (f32::MAX, f32::MIN);
        for _ in 0..SAMPLE_RATE / 10 {
            let [l, r] = chain.process(&signals());
            assert!(l.abs() <= 1.0 && r.abs() <= 1.0);
            min = min.min(chain.carrier_frequency());
            max = max.max(chain.carrier_frequency());
        }
        let deviation = 440.0 * 5.0 * sustain;
        assert!((min - (440.0 - deviation)).abs() < deviation * 0.02, "min {min}");
        assert!((max - (440.0 + deviation)).abs() < deviation * 0.02, "max {max}");
    }

    #[test]
    fn carrier_deviation_default_chain() {
        // the default chain scales by the modulator's base frequency (pitch * ratio) and
        // doubles the modulation reaching the carrier
        let sustain = 0.8;
        let mut chain = ModulationChain::new(
            SAMPLE_RATE,
            &[steady_modulator(2.0, 5.0, sustain)],
            &OperatorParameters::carrier(),
            ChainParameters::default(),
        );
        chain.play();
        for _ in 0..SAMPLE_RATE {
            chain.process(&signals());
        }
        let (mut min, mut max) = (f32::MAX, f32::MIN);
        for _ in 0..SAMPLE_RATE / 10 {
            let [l, r] = chain.process(&signals());
            assert!(l.abs() <= 1.0 && r.abs() <= 1.0);
            min = min.min(chain.carrier_frequency());
            max = max.max(chain.carrier_frequency());
        }
        let deviation = 880.0 * 5.0 * sustain * 2.0;
        assert!((min - (440.0 - deviation)).abs() < deviation * 0.02, "min {min}");
        assert!((max - (440.0 + deviation)).abs() < deviation * 0.02, "max {max}");
    }

    #[test]
    fn topology() {
        let operators = [
            steady_modulator(1.0, 1.0, 1.0),
            steady_modulator(3.0, 1.0, 1.0),
        ];
        let forward = ChainParameters::simple();
        let reverse = ChainParameters {
            topology: ChainTopology::Reverse,
            ..forward
        };
        let carrier = OperatorParameters::carrier();
        let mut chain = ModulationChain::new(SAMPLE_RATE, &operators, &carrier, forward);
        let mut reversed = ModulationChain::new(SAMPLE_RATE, &operators, &carrier, reverse);
        chain.play();
        reversed.play();
        for _ in 0..2000 {
            chain.process(&signals());
            reversed.process(&signals());
        }
        // the unmodulated operator runs at its base frequency
        assert_eq!(chain.operators()[0].frequency(), 440.0);
        assert_ne!(chain.operators()[1].frequency(), 3.0 * 440.0);
        assert_eq!(reversed.operators()[1].frequency(), 3.0 * 440.0);
        assert_ne!(reversed.operators()[0].frequency(), 440.0);
    }

    #[test]
    fn couplings() {
        let operators = [steady_modulator(1.0, 2.0, 1.0)];
        let carrier = OperatorParameters::carrier();
        let mut chain =
            ModulationChain::new(SAMPLE_RATE, &operators, &carrier, ChainParameters::default());
        chain.play();
        for _ in 0..1000 {
            chain.process(&signals());
            let coupling = chain.operators()[0].coupling();
            let carrier_base = chain.carrier().base_frequency(440.0);
            let expected = carrier_base + coupling * 2.0;
            assert!((chain.carrier_frequency() - expected).abs() < 1e-2);
        }
        // a single modulator is never emphasized
        let amplitude = chain.operators()[0].amplitude();
        assert!((amplitude - 440.0 * 2.0).abs() < 1e-2);
    }

    #[test]
    fn parameter_updates() {
        let mut parameters = SynthParameters::with_operator_count(2);
        let mut chain = ModulationChain::from_parameters(SAMPLE_RATE, &parameters);
        parameters.operators[1].ratio = 7.0;
        parameters.operators.push(OperatorParameters::modulator());
        parameters.chain = ChainParameters::reverse();
        chain.apply_parameters(&parameters);
        assert_eq!(chain.operators().len(), 2);
        assert_eq!(chain.operators()[1].parameters().ratio, 7.0);
        assert_eq!(chain.parameters().topology, ChainTopology::Reverse);
    }

    #[test]
    fn silence_when_idle() {
        let mut chain = ModulationChain::from_parameters(SAMPLE_RATE, &SynthParameters::default());
        assert!(!chain.is_active());
        for _ in 0..100 {
            assert_eq!(chain.process(&signals()), [0.0, 0.0]);
        }
        chain.play();
        assert!(chain.is_active());
        chain.stop();
        for _ in 0..SAMPLE_RATE * 2 {
            chain.process(&signals());
        }
        assert!(!chain.is_active());
    }
}
