//! Parameter descriptors and value wrappers.

use std::{fmt::Debug, ops::RangeInclusive};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

/// Describes the type of a [`Parameter`] to e.g. select a proper visual representation in a UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    /// A continuous floating-point value.
    Float {
        range: RangeInclusive<f32>,
        scaling: ParameterScaling,
    },
    /// A choice from a list of strings (an enum). Plain values are variant indices.
    Enum { values: Vec<String> },
    /// A boolean toggle. Plain values are 0.0 (off) or 1.0 (on).
    Boolean,
}

// -------------------------------------------------------------------------------------------------

/// Describes a single synth parameter for UIs, presets or remote control.
///
/// All parameter types expose their values as plain `f32` numbers: floats as they are, booleans
/// as `0.0` or `1.0` and enums as variant index.
pub trait Parameter: Debug + Send + Sync {
    /// The id of the parameter kind.
    fn id(&self) -> FourCC;

    /// The display name of the parameter.
    fn name(&self) -> &'static str;

    /// The parameter type.
    fn parameter_type(&self) -> ParameterType;

    /// Default plain value.
    fn default_value(&self) -> f32;

    /// Clamp or round the given plain value into the parameter's valid value set.
    fn clamp_value(&self, value: f32) -> f32;

    /// Convert a plain value to a normalized value in range \[0,1\], applying the parameter's
    /// scaling curve.
    fn normalize_value(&self, value: f32) -> f32;

    /// Convert a normalized value in range \[0,1\] to a plain value.
    fn denormalize_value(&self, normalized: f32) -> f32;

    /// Convert the given plain value to a string value.
    fn value_to_string(&self, value: f32, include_unit: bool) -> String;

    /// Convert the given string value to a plain value.
    /// Returns `None` when conversion failed, else a valid, clamped plain value.
    fn string_to_value(&self, string: &str) -> Option<f32>;
}

// -------------------------------------------------------------------------------------------------

/// An update for a parameter's value, consumed by [`Effect`](crate::Effect)s in audio time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValueUpdate {
    /// A plain value.
    Value(f32),
    /// A float value in range `0.0..=1.0`.
    Normalized(f32),
}

// -------------------------------------------------------------------------------------------------

mod float;
pub use float::{FloatParameter, FloatParameterValue};

mod smoothed;
pub use smoothed::SmoothedParameterValue;

mod r#enum;
pub use r#enum::EnumParameter;

mod boolean;
pub use boolean::BooleanParameter;

mod scaling;
pub use scaling::ParameterScaling;
