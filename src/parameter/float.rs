use std::{
    fmt::{Debug, Display},
    ops::RangeInclusive,
    sync::Arc,
};

use four_cc::FourCC;

use super::{Parameter, ParameterScaling, ParameterType, ParameterValueUpdate};

// -------------------------------------------------------------------------------------------------

/// A continuous (float) parameter descriptor.
#[derive(Clone)]
pub struct FloatParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    unit: &'static str,
    scaling: ParameterScaling,
    #[allow(clippy::type_complexity)]
    value_to_string: Option<Arc<dyn Fn(f32) -> String + Send + Sync>>,
    #[allow(clippy::type_complexity)]
    string_to_value: Option<Arc<dyn Fn(&str) -> Option<f32> + Send + Sync>>,
}

impl Debug for FloatParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatParameter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("range", &self.range)
            .field("default", &self.default)
            .field("unit", &self.unit)
            .field("scaling", &self.scaling)
            .field("value_to_string", &self.value_to_string.is_some())
            .field("string_to_value", &self.string_to_value.is_some())
            .finish()
    }
}

impl FloatParameter {
    /// Create a new float parameter descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
    ) -> Self {
        assert!(
            *range.start() < *range.end(),
            "Invalid parameter range"
        );
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid parameter default value"
        );
        Self {
            id,
            name,
            range,
            default,
            unit: "",
            scaling: ParameterScaling::Linear,
            value_to_string: None,
            string_to_value: None,
        }
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Optional scaling for normalized values.
    pub const fn with_scaling(mut self, scaling: ParameterScaling) -> Self {
        scaling.validate();
        self.scaling = scaling;
        self
    }

    /// Logarithmic scaling over the parameter's full range. The range must start above zero.
    pub const fn with_logarithmic_scaling(self) -> Self {
        let scaling = ParameterScaling::Logarithmic(*self.range.start(), *self.range.end());
        self.with_scaling(scaling)
    }

    /// Optional custom conversion functions to convert a plain value to a string and string
    /// to a plain value.
    ///
    /// Returned strings should not contain a unit, if a unit already was set for this parameter.
    /// Parsed values get clamped automatically.
    pub fn with_display<
        ValueToString: Fn(f32) -> String + Send + Sync + 'static,
        StringToValue: Fn(&str) -> Option<f32> + Send + Sync + 'static,
    >(
        mut self,
        value_to_string: ValueToString,
        string_to_value: StringToValue,
    ) -> Self {
        self.value_to_string = Some(Arc::new(value_to_string));
        self.string_to_value = Some(Arc::new(string_to_value));
        self
    }

    /// The parameter's value range.
    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    /// The parameter's unit.
    pub fn unit(&self) -> &'static str {
        self.unit
    }

    /// The parameter's normalized value scaling.
    pub fn scaling(&self) -> &ParameterScaling {
        &self.scaling
    }
}

impl Parameter for FloatParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Float {
            range: self.range.clone(),
            scaling: self.scaling,
        }
    }

    fn default_value(&self) -> f32 {
        self.default
    }

    fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(*self.range.start(), *self.range.end())
        }
    }

    fn normalize_value(&self, value: f32) -> f32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        let linear = (self.clamp_value(value) - start) / (end - start);
        self.scaling.unscale(linear.clamp(0.0, 1.0))
    }

    fn denormalize_value(&self, normalized: f32) -> f32 {
        let (start, end) = (*self.range.start(), *self.range.end());
        let normalized = if normalized.is_nan() {
            0.0
        } else {
            normalized.clamp(0.0, 1.0)
        };
        self.clamp_value(start + self.scaling.scale(normalized) * (end - start))
    }

    fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        match (&self.value_to_string, include_unit && !self.unit.is_empty()) {
            (Some(f), true) => format!("{} {}", f(value), self.unit),
            (Some(f), false) => f(value),
            (None, true) => format!("{:.2} {}", value, self.unit),
            (None, false) => format!("{:.2}", value),
        }
    }

    fn string_to_value(&self, string: &str) -> Option<f32> {
        let value = match &self.string_to_value {
            Some(f) => f(string.trim()),
            None => string
                .trim()
                .trim_end_matches(self.unit)
                .trim()
                .parse::<f32>()
                .ok(),
        }?;
        Some(self.clamp_value(value))
    }
}

// -------------------------------------------------------------------------------------------------

/// Holds a float parameter value and its description.
#[derive(Debug, Clone)]
pub struct FloatParameterValue {
    /// The parameter's description and constraints.
    description: FloatParameter,
    /// The current value of the parameter.
    value: f32,
}

impl FloatParameterValue {
    /// Create a new parameter value with the given parameter description, initialized to the
    /// parameter's default value.
    pub fn from_description(description: FloatParameter) -> Self {
        let value = description.default_value();
        Self { value, description }
    }

    /// Create a new parameter value with the given value, clamped into the parameter's bounds.
    pub fn with_value(mut self, value: f32) -> Self {
        self.set_value(value);
        self
    }

    /// Access the parameter value's description.
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    /// Access to the current value.
    #[inline(always)]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Set a new value, clamping the given value into the parameter's bounds.
    pub fn set_value(&mut self, value: f32) {
        self.value = self.description.clamp_value(value);
    }

    /// Applies a parameter update.
    pub fn apply_update(&mut self, update: &ParameterValueUpdate) {
        match *update {
            ParameterValueUpdate::Value(value) => self.set_value(value),
            ParameterValueUpdate::Normalized(normalized) => {
                self.value = self.description.denormalize_value(normalized);
            }
        }
    }
}

impl Display for FloatParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let include_unit = true;
        f.write_str(&self.description.value_to_string(self.value, include_unit))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    const RATIO: FloatParameter =
        FloatParameter::new(FourCC(*b"rtio"), "Ratio", 0.1..=20.0, 1.0).with_logarithmic_scaling();

    #[test]
    fn clamping_and_strings() {
        let param = FloatParameter::new(FourCC(*b"gain"), "Gain", 0.0..=2.0, 1.0).with_unit("x");
        assert_eq!(param.clamp_value(3.0), 2.0);
        assert_eq!(param.clamp_value(-1.0), 0.0);
        assert_eq!(param.clamp_value(f32::NAN), 1.0);
        assert_eq!(param.value_to_string(0.5, true), "0.50 x");
        assert_eq!(param.value_to_string(0.5, false), "0.50");
        assert_eq!(param.string_to_value(" 1.5 x"), Some(1.5));
        assert_eq!(param.string_to_value("5"), Some(2.0));
        assert_eq!(param.string_to_value("abc"), None);

        let param = param.with_display(
            |v| format!("{:.0}%", v * 100.0),
            |s| s.trim_end_matches('%').parse::<f32>().ok().map(|v| v / 100.0),
        );
        assert_eq!(param.value_to_string(0.5, false), "50%");
        assert_eq!(param.string_to_value("150%"), Some(1.5));
    }

    #[test]
    fn normalization() {
        assert_eq_with_epsilon!(RATIO.denormalize_value(0.0), 0.1, 1e-6);
        assert_eq_with_epsilon!(RATIO.denormalize_value(1.0), 20.0, 1e-3);
        // log curve: the middle is the geometric mean
        assert_eq_with_epsilon!(RATIO.denormalize_value(0.5), (0.1f32 * 20.0).sqrt(), 1e-3);
        assert_eq_with_epsilon!(RATIO.normalize_value(RATIO.denormalize_value(0.3)), 0.3, 1e-4);
        assert!(matches!(
            RATIO.parameter_type(),
            ParameterType::Float {
                scaling: ParameterScaling::Logarithmic(_, _),
                ..
            }
        ));
    }

    #[test]
    fn parameter_value_updates() {
        let mut value = FloatParameterValue::from_description(RATIO.clone());
        assert_eq!(value.value(), 1.0);
        value.apply_update(&ParameterValueUpdate::Value(50.0));
        assert_eq!(value.value(), 20.0);
        value.apply_update(&ParameterValueUpdate::Normalized(0.0));
        assert_eq_with_epsilon!(value.value(), 0.1, 1e-6);
        assert_eq!(value.to_string(), "0.10");
    }
}
