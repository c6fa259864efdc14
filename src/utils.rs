//! Common DSP helpers, value conversions and building blocks used by the synth engine.

pub mod adsr;
pub mod buffer;
pub mod dsp;
pub mod ramp;
pub mod smoothed;

// -------------------------------------------------------------------------------------------------

/// Decibel value used for silence.
pub const MINUS_INF_IN_DB: f32 = -200.0f32;

const LIN_TO_DB_FACTOR: f32 = 20.0f32 / std::f32::consts::LN_10;
const DB_TO_LIN_FACTOR: f32 = std::f32::consts::LN_10 / 20.0f32;

// -------------------------------------------------------------------------------------------------

/// Compare two floats with the given tolerance, panicking with a descriptive message when
/// the values differ.
#[allow(unused_macros)]
macro_rules! assert_eq_with_epsilon {
    ($x:expr, $y:expr, $d:expr) => {{
        let (x, y, d) = ($x, $y, $d);
        if (x - y).abs() > d {
            panic!(
                "assertion failed: `{} ≈ {}` (difference {} exceeds {})",
                x,
                y,
                (x - y).abs(),
                d
            );
        }
    }};
}
#[allow(unused_imports)]
pub(crate) use assert_eq_with_epsilon;

// -------------------------------------------------------------------------------------------------

/// Convert a linear gain value to decibels.
pub fn linear_to_db(value: f32) -> f32 {
    if value == 1.0 {
        return 0.0; // avoid rounding errors at exactly 0 dB
    } else if value > 1e-12f32 {
        return value.ln() * LIN_TO_DB_FACTOR;
    }
    MINUS_INF_IN_DB
}

/// Convert a decibel value to a linear gain value.
pub fn db_to_linear(value: f32) -> f32 {
    if value == 0.0f32 {
        return 1.0f32; // avoid rounding errors at exactly 0 dB
    } else if value > MINUS_INF_IN_DB {
        return (value * DB_TO_LIN_FACTOR).exp();
    }
    0.0f32
}

// -------------------------------------------------------------------------------------------------

/// Balance panning factors for a stereo signal: `pan` is in range `[-1, 1]`, center is unity
/// gain on both channels.
pub fn panning_factors(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    let left = (1.0 - pan).min(1.0);
    let right = (1.0 + pan).min(1.0);
    (left, right)
}

/// Equal-power panning factors to place a mono signal in a stereo field: `position` is in
/// range `[0, 1]` (0 = left, 0.5 = center, 1 = right).
pub fn position_panning_factors(position: f32) -> (f32, f32) {
    let angle = position.clamp(0.0, 1.0) * std::f32::consts::FRAC_PI_2;
    (angle.cos(), angle.sin())
}

// -------------------------------------------------------------------------------------------------

/// Convert a MIDI note number into a frequency in Hz (A4 = note 69 = 440 Hz).
pub fn pitch_from_note(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

/// Convert a pitch bend offset in semitones into a frequency factor.
pub fn pitch_bend_factor(semitones: f32) -> f32 {
    2.0f32.powf(semitones / 12.0)
}

// -------------------------------------------------------------------------------------------------
