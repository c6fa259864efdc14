#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod chain;
mod control;
mod effect;
mod error;
mod event;
mod operator;
mod output;
mod output_stage;
mod parameter;
mod preset;
mod source;
mod synth;
mod voice;

// public, flat re-exports
pub use error::Error;

pub use parameter::{
    BooleanParameter, EnumParameter, FloatParameter, FloatParameterValue, Parameter,
    ParameterScaling, ParameterType, ParameterValueUpdate, SmoothedParameterValue,
};

pub use preset::{
    ChainPreset, DelayPreset, EnvelopePreset, FeedbackPreset, OperatorPreset, OutputPreset,
    PanLfoPreset, Preset, RampPreset, VoicePreset,
};

pub use operator::{Operator, OperatorRole, OperatorSlot, VoiceSignals};

pub use chain::{AmplitudeScaling, ChainParameters, ChainTopology, ModulationChain};

pub use voice::{VoiceAction, VoiceController, DEFAULT_RETRIGGER_VELOCITY};

pub use event::{
    event_source_or_fallback, ChannelEventSource, EventSource, MidiEvent, NullEventSource,
};

pub use control::{control_channel, ControlEndpoint, ControlMessage};

pub use effect::{compressor::CompressorEffect, Effect};

pub use output_stage::OutputStage;

pub use source::{guarded::GuardedSource, synth::FmSynthSource, Source, SourceTime};

pub use synth::{FmSynth, SynthConfig};

pub use output::OutputDevice;

// public mods
pub mod utils;

pub mod parameters;

pub mod outputs {
    //! Audio output devices, which play or write [`Source`](super::Source)s.

    #[cfg(feature = "cpal-output")]
    pub use super::output::{
        cpal::{AudioHostId, CpalOutput},
        DefaultOutputDevice,
    };

    #[cfg(feature = "wav-output")]
    pub use super::output::wav::WavOutput;
}
