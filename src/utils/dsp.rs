//! Common, shared DSP tools for operators and the output stage.

pub mod delay;
pub mod envelope;
pub mod lfo;
pub mod multitap;
