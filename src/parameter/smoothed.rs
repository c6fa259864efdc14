use std::fmt::{Debug, Display};

use crate::utils::smoothed::{ExponentialSmoothedValue, SmoothedValue};

use super::{FloatParameter, Parameter, ParameterValueUpdate};

// -------------------------------------------------------------------------------------------------

/// Holds a float parameter value and its description, using a [`SmoothedValue`] instance to
/// smoothly update the value on changes.
#[derive(Debug, Clone)]
pub struct SmoothedParameterValue<Value: SmoothedValue = ExponentialSmoothedValue> {
    /// The parameter's description and constraints.
    description: FloatParameter,
    /// The smoothed value of the parameter.
    value: Value,
}

impl SmoothedParameterValue<ExponentialSmoothedValue> {
    /// Create a new exponentially smoothed value for the given sample rate, initialized to the
    /// parameter's default value.
    pub fn from_description(description: FloatParameter, sample_rate: u32) -> Self {
        let value = ExponentialSmoothedValue::new(description.default_value(), sample_rate);
        Self { description, value }
    }
}

impl<Value: SmoothedValue> SmoothedParameterValue<Value> {
    /// Create a smoothed value with the given smoother instance. The smoother gets initialized
    /// to the parameter's default value.
    pub fn with_smoother(description: FloatParameter, mut value: Value) -> Self {
        value.init(description.default_value());
        Self { description, value }
    }

    /// Access the parameter value's description.
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    /// Test if ramping is necessary. When not, `target_value` can be used directly without
    /// ramping to avoid processing overhead.
    pub fn value_need_ramp(&self) -> bool {
        self.value.need_ramp()
    }

    /// Apply smoothing, if needed, and return current value. Should be called once per
    /// sample frame.
    #[inline(always)]
    pub fn next_value(&mut self) -> f32 {
        self.value.next()
    }

    /// Access to the smoothed current value.
    #[inline(always)]
    pub fn current_value(&self) -> f32 {
        self.value.current()
    }

    /// Access to the smoothed target value.
    #[inline(always)]
    pub fn target_value(&self) -> f32 {
        self.value.target()
    }

    /// Mutable access to the smoother, e.g. to apply it to buffers.
    pub fn smoother_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Set a new smoothed target value, clamped into the parameter's bounds.
    pub fn set_target_value(&mut self, value: f32) {
        self.value.set_target(self.description.clamp_value(value));
    }

    /// Initialize the value so that no smoothing is performed, clamped into the parameter's
    /// bounds.
    pub fn init_value(&mut self, value: f32) {
        self.value.init(self.description.clamp_value(value));
    }

    /// Applies a parameter update by setting a new target value.
    pub fn apply_update(&mut self, update: &ParameterValueUpdate) {
        match *update {
            ParameterValueUpdate::Value(value) => self.set_target_value(value),
            ParameterValueUpdate::Normalized(normalized) => {
                let value = self.description.denormalize_value(normalized);
                self.set_target_value(value);
            }
        }
    }
}

impl<Value: SmoothedValue> Display for SmoothedParameterValue<Value> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let include_unit = true;
        f.write_str(
            &self
                .description
                .value_to_string(self.value.target(), include_unit),
        )
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use four_cc::FourCC;

    #[test]
    fn smoothed_updates() {
        let description = FloatParameter::new(FourCC(*b"gain"), "Gain", 0.0..=2.0, 0.6);
        let mut value = SmoothedParameterValue::from_description(description, 44100);
        assert_eq!(value.target_value(), 0.6);
        assert!(!value.value_need_ramp());

        value.apply_update(&ParameterValueUpdate::Value(5.0));
        assert_eq!(value.target_value(), 2.0);
        assert!(value.value_need_ramp());
        let next = value.next_value();
        assert!(next > 0.6 && next < 2.0);

        value.init_value(1.0);
        assert_eq!(value.current_value(), 1.0);
        assert_eq!(value.to_string(), "1.00");
    }
}
