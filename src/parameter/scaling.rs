use std::fmt::Debug;

// -------------------------------------------------------------------------------------------------

/// Float parameter scaling, applied to convert normalized UI or automation values to the
/// parameter's plain value range.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum ParameterScaling {
    #[default]
    /// Linear scaling: `y = x` (no transformation applied)
    Linear,

    /// Exponential scaling: `y = x^factor`
    /// Factor must be > 0.0.
    ///
    /// Values > 1.0 create a curve that rises slowly at first then quickly, which gives short
    /// times more room on a time knob.
    Exponential(f32),

    /// Logarithmic scaling for a plain range `min..=max`: the normalized value `x` maps to
    /// `min * (max / min)^x`, so equal normalized steps are equal ratios.
    /// Parameters are (min, max); min must be > 0.0 and max > min.
    ///
    /// Used for frequency ratios, times and rates.
    Logarithmic(f32, f32),
}

impl ParameterScaling {
    /// Apply scaling to a normalized f32 value.
    pub fn scale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => value.powf(*factor),
            ParameterScaling::Logarithmic(min, max) => {
                let plain = min * (max / min).powf(value);
                ((plain - min) / (max - min)).clamp(0.0, 1.0)
            }
        }
    }

    /// Apply inverse scaling to a normalized f32 value.
    pub fn unscale(&self, value: f32) -> f32 {
        debug_assert!(
            (0.0..=1.0).contains(&value),
            "Expecting a normalized value here"
        );
        match self {
            ParameterScaling::Linear => value,
            ParameterScaling::Exponential(factor) => {
                let factor = factor.abs().max(0.001);
                value.powf(1.0 / factor)
            }
            ParameterScaling::Logarithmic(min, max) => {
                let plain = min + value * (max - min);
                ((plain / min).ln() / (max / min).ln()).clamp(0.0, 1.0)
            }
        }
    }

    pub(crate) const fn validate(&self) {
        match self {
            ParameterScaling::Linear => {}
            ParameterScaling::Exponential(factor) => {
                assert!(
                    *factor > 0.0,
                    "Invalid exponential parameter scaling factor (must be > 0)"
                );
            }
            ParameterScaling::Logarithmic(min, max) => {
                assert!(
                    *min > 0.0 && *min < *max,
                    "Invalid logarithmic parameter scaling range (must be 0 < min < max)"
                );
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    #[test]
    fn scale_unscale() {
        for scaling in [
            ParameterScaling::Linear,
            ParameterScaling::Exponential(3.0),
            ParameterScaling::Logarithmic(0.1, 20.0),
        ] {
            scaling.validate();
            assert_eq_with_epsilon!(scaling.scale(0.0), 0.0, 1e-6);
            assert_eq_with_epsilon!(scaling.scale(1.0), 1.0, 1e-5);
            for x in [0.1, 0.25, 0.5, 0.9] {
                assert_eq_with_epsilon!(scaling.unscale(scaling.scale(x)), x, 1e-4);
            }
        }
    }

    #[test]
    fn logarithmic_midpoint() {
        // geometric mean of the range in the middle
        let scaling = ParameterScaling::Logarithmic(0.01, 1.0);
        let plain = 0.01 + scaling.scale(0.5) * (1.0 - 0.01);
        assert_eq_with_epsilon!(plain, 0.1, 1e-5);
    }

    #[test]
    #[should_panic]
    fn invalid_logarithmic_range() {
        ParameterScaling::Logarithmic(0.0, 1.0).validate();
    }
}
