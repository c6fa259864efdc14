use std::fmt::Debug;

use four_cc::FourCC;
use strum::VariantNames;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor. Plain values are variant indices.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: Vec<String>,
    default_index: usize,
}

impl EnumParameter {
    /// Create a new enum parameter from an enum with strum `VariantNames` and `Display` impls.
    pub fn new<E: VariantNames + ToString>(id: FourCC, name: &'static str, default: E) -> Self {
        let values = E::VARIANTS
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>();
        let default_name = default.to_string();
        let default_index = values.iter().position(|v| *v == default_name).unwrap_or(0);
        Self {
            id,
            name,
            values,
            default_index,
        }
    }

    /// All variant names.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Index of the given variant name.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    fn max_index(&self) -> usize {
        self.values.len().saturating_sub(1)
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values.clone(),
        }
    }

    fn default_value(&self) -> f32 {
        self.default_index as f32
    }

    fn clamp_value(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default_value()
        } else {
            value.round().clamp(0.0, self.max_index() as f32)
        }
    }

    fn normalize_value(&self, value: f32) -> f32 {
        if self.max_index() == 0 {
            return 0.0;
        }
        self.clamp_value(value) / self.max_index() as f32
    }

    fn denormalize_value(&self, normalized: f32) -> f32 {
        let normalized = if normalized.is_nan() {
            0.0
        } else {
            normalized.clamp(0.0, 1.0)
        };
        (normalized * self.max_index() as f32).round()
    }

    fn value_to_string(&self, value: f32, _include_unit: bool) -> String {
        let index = self.clamp_value(value) as usize;
        self.values.get(index).cloned().unwrap_or_default()
    }

    fn string_to_value(&self, string: &str) -> Option<f32> {
        let string = string.trim();
        self.values
            .iter()
            .position(|v| v.eq_ignore_ascii_case(string))
            .map(|index| index as f32)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::dsp::lfo::LfoWaveform;

    #[test]
    fn variant_indices() {
        let param = EnumParameter::new(FourCC(*b"wave"), "Waveform", LfoWaveform::Triangle);
        assert_eq!(param.values(), ["Sine", "Triangle", "Sawtooth", "Square"]);
        assert_eq!(param.default_value(), 1.0);
        assert_eq!(param.clamp_value(7.0), 3.0);
        assert_eq!(param.clamp_value(1.4), 1.0);
        assert_eq!(param.normalize_value(3.0), 1.0);
        assert_eq!(param.denormalize_value(0.34), 1.0);
        assert_eq!(param.value_to_string(2.0, false), "Sawtooth");
        assert_eq!(param.string_to_value("square"), Some(3.0));
        assert_eq!(param.string_to_value("noise"), None);
        assert_eq!(param.index_of("Sine"), Some(0));
    }
}
