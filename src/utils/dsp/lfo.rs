//! Oscillators for modulation.

use std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Waveform types for LFO oscillators.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
    strum::FromRepr,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

// -------------------------------------------------------------------------------------------------

/// Simple non bandlimited oscillator, used to move the stereo position of an operator's signal.
#[derive(Debug, Default, Clone)]
pub struct Lfo {
    phase: f64,
    phase_inc: f64,
    waveform: LfoWaveform,
}

impl Lfo {
    pub fn new(sample_rate: u32, rate: f64, waveform: LfoWaveform) -> Self {
        let phase_inc = 2.0 * PI * rate / sample_rate as f64;
        Self {
            phase: 0.0,
            phase_inc,
            waveform,
        }
    }

    /// Set a new rate in Hz with the given sampling rate.
    pub fn set_rate(&mut self, sample_rate: u32, rate: f64) {
        self.phase_inc = 2.0 * PI * rate / sample_rate as f64;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }
    /// Set a new waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Set or reset the LFO's phase in cycles, wrapped into range `[0, 1)`.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase.rem_euclid(1.0) * 2.0 * PI;
    }

    /// Advances phase and returns new value in range `[-1, 1]`.
    pub fn next(&mut self) -> f64 {
        let val = match self.waveform {
            LfoWaveform::Sine => self.phase.sin(),
            LfoWaveform::Triangle => {
                let normalized_phase = self.phase / (2.0 * PI);
                if normalized_phase < 0.5 {
                    4.0 * normalized_phase - 1.0
                } else {
                    -4.0 * normalized_phase + 3.0
                }
            }
            LfoWaveform::Sawtooth => {
                let normalized_phase = self.phase / (2.0 * PI);
                2.0 * normalized_phase - 1.0
            }
            LfoWaveform::Square => {
                if self.phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
        };

        self.phase += self.phase_inc;
        if self.phase >= 2.0 * PI {
            self.phase = self.phase.rem_euclid(2.0 * PI);
        }
        val
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_phase() {
        let mut lfo = Lfo::new(1000, 1.0, LfoWaveform::Sine);
        assert_eq!(lfo.next(), 0.0);
        lfo.set_phase(0.25);
        assert!((lfo.next() - 1.0).abs() < 1e-9);
        lfo.set_phase(1.75);
        assert!((lfo.next() + 1.0).abs() < 1e-9);
        for _ in 0..10000 {
            let value = lfo.next();
            assert!((-1.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn waveform_names() {
        assert_eq!(LfoWaveform::Triangle.to_string(), "Triangle");
        assert_eq!(LfoWaveform::from_repr(3), Some(LfoWaveform::Square));
        let mut lfo = Lfo::new(4, 1.0, LfoWaveform::Square);
        assert_eq!(lfo.waveform(), LfoWaveform::Square);
        assert_eq!(lfo.next(), 1.0);
        assert_eq!(lfo.next(), 1.0);
        assert_eq!(lfo.next(), -1.0);
        lfo.set_waveform(LfoWaveform::Sawtooth);
        assert!((lfo.next() - 0.5).abs() < 1e-9);
    }
}
