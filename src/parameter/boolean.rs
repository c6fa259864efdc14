use std::fmt::Debug;

use four_cc::FourCC;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// A boolean parameter descriptor. Plain values are `0.0` (off) and `1.0` (on).
#[derive(Debug, Clone)]
pub struct BooleanParameter {
    id: FourCC,
    name: &'static str,
    default: bool,
}

impl BooleanParameter {
    /// Create a new boolean parameter descriptor.
    pub const fn new(id: FourCC, name: &'static str, default: bool) -> Self {
        Self { id, name, default }
    }

    /// Convert a bool to the parameter's plain value.
    pub const fn to_plain(value: bool) -> f32 {
        if value {
            1.0
        } else {
            0.0
        }
    }

    /// Convert a plain value to a bool.
    pub fn from_plain(value: f32) -> bool {
        value >= 0.5
    }
}

impl Parameter for BooleanParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Boolean
    }

    fn default_value(&self) -> f32 {
        Self::to_plain(self.default)
    }

    fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default_value()
        } else {
            Self::to_plain(Self::from_plain(value))
        }
    }

    fn normalize_value(&self, value: f32) -> f32 {
        self.clamp_value(value)
    }

    fn denormalize_value(&self, normalized: f32) -> f32 {
        self.clamp_value(normalized)
    }

    fn value_to_string(&self, value: f32, _include_unit: bool) -> String {
        if Self::from_plain(value) {
            "ON".to_string()
        } else {
            "OFF".to_string()
        }
    }

    fn string_to_value(&self, string: &str) -> Option<f32> {
        let string = string.trim();
        let value = if string.eq_ignore_ascii_case("ON") {
            true
        } else if string.eq_ignore_ascii_case("OFF") {
            false
        } else {
            string.parse::<bool>().ok()?
        };
        Some(Self::to_plain(value))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values() {
        let param = BooleanParameter::new(FourCC(*b"actv"), "Active", false);
        assert_eq!(param.default_value(), 0.0);
        assert_eq!(param.clamp_value(0.7), 1.0);
        assert_eq!(param.clamp_value(-3.0), 0.0);
        assert_eq!(param.value_to_string(1.0, true), "ON");
        assert_eq!(param.string_to_value("off"), Some(0.0));
        assert_eq!(param.string_to_value("true"), Some(1.0));
        assert_eq!(param.string_to_value("maybe"), None);
    }
}
