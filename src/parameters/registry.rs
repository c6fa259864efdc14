use std::sync::Arc;

use four_cc::FourCC;

use crate::{
    chain::{AmplitudeScaling, ChainTopology},
    effect::compressor::CompressorEffect,
    operator::OperatorSlot,
    output_stage::OutputStage,
    parameter::{BooleanParameter, EnumParameter, FloatParameter, Parameter, ParameterScaling},
    utils::dsp::lfo::LfoWaveform,
};

use super::{OperatorParameters, SynthParameters};

// -------------------------------------------------------------------------------------------------

type OperatorGetter = fn(&OperatorParameters) -> f32;
type OperatorSetter = fn(&mut OperatorParameters, f32);

type GlobalGetter = fn(&SynthParameters) -> f32;
type GlobalSetter = fn(&mut SynthParameters, f32);

#[derive(Debug, Clone, Copy)]
enum LeafTarget {
    Operator(OperatorSlot, OperatorGetter, OperatorSetter),
    Global(GlobalGetter, GlobalSetter),
}

// -------------------------------------------------------------------------------------------------

/// A single addressable, numeric parameter of the synth: a dotted path such as
/// `op1.amp_env.attack` or `chain.modulation_gain`, its descriptor, and accessors into the
/// typed [`SynthParameters`] tree.
///
/// Plain values are always `f32`: booleans are `0.0`/`1.0`, enums variant indices.
#[derive(Debug, Clone)]
pub struct ParameterLeaf {
    path: String,
    descriptor: Arc<dyn Parameter>,
    target: LeafTarget,
}

impl ParameterLeaf {
    fn global(
        path: &str,
        descriptor: impl Parameter + 'static,
        get: GlobalGetter,
        set: GlobalSetter,
    ) -> Self {
        Self {
            path: path.to_string(),
            descriptor: Arc::new(descriptor),
            target: LeafTarget::Global(get, set),
        }
    }

    /// The leaf's dotted path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The leaf's descriptor: id, name, range and display.
    pub fn descriptor(&self) -> &dyn Parameter {
        self.descriptor.as_ref()
    }

    /// The operator slot the leaf belongs to, if it's an operator parameter.
    pub fn slot(&self) -> Option<OperatorSlot> {
        match self.target {
            LeafTarget::Operator(slot, _, _) => Some(slot),
            LeafTarget::Global(_, _) => None,
        }
    }

    /// Read the leaf's plain value from the given parameter tree.
    pub(crate) fn get(&self, parameters: &SynthParameters) -> f32 {
        match self.target {
            LeafTarget::Operator(slot, get, _) => parameters
                .operator(slot)
                .map(get)
                .unwrap_or_else(|| self.descriptor.default_value()),
            LeafTarget::Global(get, _) => get(parameters),
        }
    }

    /// Write an already clamped plain value into the given parameter tree.
    pub(crate) fn set(&self, parameters: &mut SynthParameters, value: f32) {
        match self.target {
            LeafTarget::Operator(slot, _, set) => {
                if let Some(operator) = parameters.operator_mut(slot) {
                    set(operator, value);
                }
            }
            LeafTarget::Global(_, set) => set(parameters, value),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Builds the leaves of all given operator slots, followed by the global leaves.
pub(crate) fn build_leaves(slots: impl Iterator<Item = OperatorSlot>) -> Vec<ParameterLeaf> {
    let definitions = operator_leaf_definitions();
    let mut leaves = Vec::new();
    for slot in slots {
        for definition in &definitions {
            leaves.push(ParameterLeaf {
                path: format!("{}.{}", slot, definition.key),
                descriptor: Arc::clone(&definition.descriptor),
                target: LeafTarget::Operator(slot, definition.get, definition.set),
            });
        }
    }
    leaves.extend(global_leaves());
    leaves
}

// -------------------------------------------------------------------------------------------------

struct OperatorLeafDefinition {
    key: &'static str,
    descriptor: Arc<dyn Parameter>,
    get: OperatorGetter,
    set: OperatorSetter,
}

impl OperatorLeafDefinition {
    fn new(
        key: &'static str,
        descriptor: impl Parameter + 'static,
        get: OperatorGetter,
        set: OperatorSetter,
    ) -> Self {
        Self {
            key,
            descriptor: Arc::new(descriptor),
            get,
            set,
        }
    }
}

macro_rules! operator_leaf {
    ($key:literal, $descriptor:expr, $($field:tt)+) => {
        OperatorLeafDefinition::new(
            $key,
            $descriptor,
            |params: &OperatorParameters| params.$($field)+,
            |params: &mut OperatorParameters, value: f32| params.$($field)+ = value,
        )
    };
}

macro_rules! global_leaf {
    ($path:literal, $descriptor:expr, $($field:tt)+) => {
        ParameterLeaf::global(
            $path,
            $descriptor,
            |params: &SynthParameters| params.$($field)+,
            |params: &mut SynthParameters, value: f32| params.$($field)+ = value,
        )
    };
}

const fn float(id: &[u8; 4], name: &'static str, min: f32, max: f32, default: f32) -> FloatParameter {
    FloatParameter::new(FourCC(*id), name, min..=max, default)
}

const fn envelope_time(id: &[u8; 4], name: &'static str, max: f32, default: f32) -> FloatParameter {
    float(id, name, 0.001, max, default)
        .with_unit("s")
        .with_logarithmic_scaling()
}

const fn delay_time(id: &[u8; 4], name: &'static str, default: f32) -> FloatParameter {
    float(id, name, 0.01, 2.0, default)
        .with_unit("s")
        .with_logarithmic_scaling()
}

const fn trigger_delay(id: &[u8; 4], name: &'static str) -> FloatParameter {
    float(id, name, 0.0, 2.0, 0.0)
        .with_unit("s")
        .with_scaling(ParameterScaling::Exponential(3.0))
}

const fn ramp_time(id: &[u8; 4], name: &'static str) -> FloatParameter {
    float(id, name, 0.1, 300.0, 1.0)
        .with_unit("s")
        .with_logarithmic_scaling()
}

const fn ramp_time_fine(id: &[u8; 4], name: &'static str) -> FloatParameter {
    float(id, name, -0.099, 5.0, 0.0).with_unit("s")
}

fn operator_leaf_definitions() -> Vec<OperatorLeafDefinition> {
    vec![
        operator_leaf!(
            "ratio",
            float(b"rtio", "Ratio", 0.1, 20.0, 1.0).with_logarithmic_scaling(),
            ratio
        ),
        operator_leaf!(
            "ratio_fine",
            float(b"rtfn", "Ratio Fine", -0.1, 0.1, 0.0),
            ratio_fine
        ),
        operator_leaf!(
            "depth",
            float(b"dpth", "Depth", 0.01, 15.0, 1.0).with_logarithmic_scaling(),
            depth
        ),
        operator_leaf!(
            "depth_fine",
            float(b"dpfn", "Depth Fine", 0.0, 2.0, 0.0),
            depth_fine
        ),
        operator_leaf!(
            "tuning_offset",
            float(b"tune", "Tuning Offset", -100.0, 100.0, 0.0).with_unit("Hz"),
            tuning_offset
        ),
        operator_leaf!("phase", float(b"phas", "Phase", 0.0, 1.0, 0.0), phase),
        // frequency envelope
        operator_leaf!(
            "freq_env.attack",
            envelope_time(b"fatk", "Freq Attack", 10.0, 0.01),
            freq_env.attack
        ),
        operator_leaf!(
            "freq_env.decay",
            envelope_time(b"fdcy", "Freq Decay", 10.0, 0.1),
            freq_env.decay
        ),
        operator_leaf!(
            "freq_env.sustain",
            float(b"fsus", "Freq Sustain", 0.0, 1.0, 0.8),
            freq_env.sustain
        ),
        operator_leaf!(
            "freq_env.release",
            envelope_time(b"frel", "Freq Release", 20.0, 0.5),
            freq_env.release
        ),
        operator_leaf!(
            "freq_env.mul",
            float(b"fmul", "Freq Deviation", 0.0, 1000.0, 0.0).with_unit("Hz"),
            freq_env.mul
        ),
        // amplitude envelope
        operator_leaf!(
            "amp_env.attack",
            envelope_time(b"aatk", "Amp Attack", 10.0, 0.01),
            amp_env.attack
        ),
        operator_leaf!(
            "amp_env.decay",
            envelope_time(b"adcy", "Amp Decay", 10.0, 0.5),
            amp_env.decay
        ),
        operator_leaf!(
            "amp_env.sustain",
            float(b"asus", "Amp Sustain", 0.0, 1.0, 0.7),
            amp_env.sustain
        ),
        operator_leaf!(
            "amp_env.release",
            envelope_time(b"arel", "Amp Release", 20.0, 0.5),
            amp_env.release
        ),
        operator_leaf!(
            "amp_env.mul",
            float(b"amul", "Amp Gain", 0.0, 2.0, 0.5),
            amp_env.mul
        ),
        operator_leaf!(
            "freq_delay",
            trigger_delay(b"fdly", "Freq Env Delay"),
            freq_delay
        ),
        operator_leaf!(
            "amp_delay",
            trigger_delay(b"adly", "Amp Env Delay"),
            amp_delay
        ),
        // frequency ramp
        operator_leaf!(
            "freq_ramp.start",
            float(b"frst", "Freq Ramp Start", -12.0, 12.0, 0.0),
            freq_ramp.start
        ),
        operator_leaf!(
            "freq_ramp.end",
            float(b"fren", "Freq Ramp End", -12.0, 12.0, 0.0),
            freq_ramp.end
        ),
        operator_leaf!(
            "freq_ramp.time",
            ramp_time(b"frtm", "Freq Ramp Time"),
            freq_ramp.time
        ),
        operator_leaf!(
            "freq_ramp.time_fine",
            ramp_time_fine(b"frtf", "Freq Ramp Time Fine"),
            freq_ramp.time_fine
        ),
        operator_leaf!(
            "freq_ramp.start_random",
            float(b"frrn", "Freq Ramp Random", 0.0, 1.0, 0.0),
            freq_ramp.start_random
        ),
        // amplitude ramp
        operator_leaf!(
            "amp_ramp.start",
            float(b"arst", "Amp Ramp Start", 0.01, 5.0, 1.0),
            amp_ramp.start
        ),
        operator_leaf!(
            "amp_ramp.end",
            float(b"aren", "Amp Ramp End", 0.01, 5.0, 1.0),
            amp_ramp.end
        ),
        operator_leaf!(
            "amp_ramp.time",
            ramp_time(b"artm", "Amp Ramp Time"),
            amp_ramp.time
        ),
        operator_leaf!(
            "amp_ramp.time_fine",
            ramp_time_fine(b"artf", "Amp Ramp Time Fine"),
            amp_ramp.time_fine
        ),
        operator_leaf!(
            "amp_ramp.start_random",
            float(b"arrn", "Amp Ramp Random", 0.0, 1.0, 0.0),
            amp_ramp.start_random
        ),
        // feedback
        operator_leaf!(
            "feedback.amount",
            float(b"fbam", "Feedback", 0.0, 1.0, 0.0),
            feedback.amount
        ),
        operator_leaf!(
            "feedback.gain",
            float(b"fbgn", "Feedback Gain", 0.0, 5.0, 1.0),
            feedback.gain
        ),
        operator_leaf!(
            "feedback.freq_shift",
            float(b"fbsh", "Feedback Shift", -1000.0, 1000.0, 0.0).with_unit("Hz"),
            feedback.freq_shift
        ),
        // stereo delay
        OperatorLeafDefinition::new(
            "delay.enabled",
            BooleanParameter::new(FourCC(*b"dlon"), "Delay", false),
            |params| BooleanParameter::to_plain(params.delay.enabled),
            |params, value| params.delay.enabled = BooleanParameter::from_plain(value),
        ),
        operator_leaf!(
            "delay.dry_wet",
            float(b"dlmx", "Delay Mix", 0.0, 1.0, 0.3),
            delay.dry_wet
        ),
        operator_leaf!(
            "delay.time1",
            delay_time(b"dlt1", "Delay Time 1", 0.3),
            delay.times[0]
        ),
        operator_leaf!(
            "delay.time2",
            delay_time(b"dlt2", "Delay Time 2", 0.6),
            delay.times[1]
        ),
        operator_leaf!(
            "delay.time3",
            delay_time(b"dlt3", "Delay Time 3", 1.0),
            delay.times[2]
        ),
        operator_leaf!(
            "delay.gain1",
            float(b"dlg1", "Delay Gain 1", 0.0, 1.0, 1.0),
            delay.gains[0]
        ),
        operator_leaf!(
            "delay.gain2",
            float(b"dlg2", "Delay Gain 2", 0.0, 1.0, 0.7),
            delay.gains[1]
        ),
        operator_leaf!(
            "delay.gain3",
            float(b"dlg3", "Delay Gain 3", 0.0, 1.0, 0.5),
            delay.gains[2]
        ),
        operator_leaf!(
            "delay.feedback",
            float(b"dlfb", "Delay Feedback", 0.0, 0.99, 0.2),
            delay.feedback
        ),
        // pan lfo
        OperatorLeafDefinition::new(
            "pan_lfo.active",
            BooleanParameter::new(FourCC(*b"plon"), "Pan LFO", false),
            |params| BooleanParameter::to_plain(params.pan_lfo.active),
            |params, value| params.pan_lfo.active = BooleanParameter::from_plain(value),
        ),
        operator_leaf!(
            "pan_lfo.center",
            float(b"plcn", "Pan Center", 0.0, 1.0, 0.5),
            pan_lfo.center
        ),
        operator_leaf!(
            "pan_lfo.freq",
            float(b"plfq", "Pan LFO Rate", 0.01, 20.0, 0.25)
                .with_unit("Hz")
                .with_logarithmic_scaling(),
            pan_lfo.freq
        ),
        operator_leaf!(
            "pan_lfo.depth",
            float(b"pldp", "Pan LFO Depth", 0.0, 1.0, 0.5),
            pan_lfo.depth
        ),
        operator_leaf!(
            "pan_lfo.phase",
            float(b"plph", "Pan LFO Phase", 0.0, 1.0, 0.0),
            pan_lfo.phase
        ),
        OperatorLeafDefinition::new(
            "pan_lfo.waveform",
            EnumParameter::new(FourCC(*b"plwf"), "Pan LFO Waveform", LfoWaveform::Sine),
            |params| params.pan_lfo.waveform as usize as f32,
            |params, value| {
                params.pan_lfo.waveform = LfoWaveform::from_repr(value as usize).unwrap_or_default()
            },
        ),
    ]
}

fn global_leaves() -> Vec<ParameterLeaf> {
    vec![
        // chain
        ParameterLeaf::global(
            "chain.topology",
            EnumParameter::new(FourCC(*b"ctop"), "Topology", ChainTopology::Forward),
            |params| params.chain.topology as usize as f32,
            |params, value| {
                params.chain.topology = ChainTopology::from_repr(value as usize).unwrap_or_default()
            },
        ),
        ParameterLeaf::global(
            "chain.amplitude_scaling",
            EnumParameter::new(
                FourCC(*b"camp"),
                "Amplitude Scaling",
                AmplitudeScaling::BaseFrequency,
            ),
            |params| params.chain.amplitude_scaling as usize as f32,
            |params, value| {
                params.chain.amplitude_scaling =
                    AmplitudeScaling::from_repr(value as usize).unwrap_or_default()
            },
        ),
        global_leaf!(
            "chain.operator_emphasis",
            float(b"cemp", "Operator Emphasis", 0.0, 4.0, 1.5),
            chain.operator_emphasis
        ),
        global_leaf!(
            "chain.carrier_coupling",
            float(b"ccar", "Carrier Coupling", 0.0, 8.0, 2.0),
            chain.carrier_coupling
        ),
        ParameterLeaf::global(
            "chain.depth_coupling",
            BooleanParameter::new(FourCC(*b"cdep"), "Depth Coupling", true),
            |params| BooleanParameter::to_plain(params.chain.depth_coupling),
            |params, value| params.chain.depth_coupling = BooleanParameter::from_plain(value),
        ),
        global_leaf!(
            "chain.modulation_gain",
            float(b"cmod", "Modulation Gain", 0.1, 5.0, 1.0),
            chain.modulation_gain
        ),
        // output
        global_leaf!(
            "output.pan",
            OutputStage::PAN,
            output.pan
        ),
        global_leaf!(
            "output.threshold",
            CompressorEffect::threshold_parameter(),
            output.threshold
        ),
        global_leaf!(
            "output.ratio",
            CompressorEffect::ratio_parameter(),
            output.ratio
        ),
        global_leaf!(
            "output.attack",
            CompressorEffect::attack_parameter(),
            output.attack
        ),
        global_leaf!(
            "output.release",
            CompressorEffect::release_parameter(),
            output.release
        ),
        global_leaf!(
            "output.lookahead",
            CompressorEffect::lookahead_parameter(),
            output.lookahead
        ),
        global_leaf!(
            "output.knee",
            CompressorEffect::knee_parameter(),
            output.knee
        ),
        global_leaf!(
            "output.gain",
            OutputStage::GAIN,
            output.gain
        ),
        // voice
        global_leaf!(
            "voice.pitch_bend_range",
            float(b"vpbr", "Pitch Bend Range", 0.0, 24.0, 2.0).with_unit("st"),
            voice.pitch_bend_range
        ),
    ]
}

// -------------------------------------------------------------------------------------------------
