//! Stereo multi-tap delay with per tap panning spread.

use crate::utils::{dsp::delay::DelayLine, position_panning_factors};

// -------------------------------------------------------------------------------------------------

/// Number of taps in a [`MultiTapDelay`].
pub const TAP_COUNT: usize = 3;

/// Per tap stereo position offsets, relative to the panned source position.
pub const TAP_SPREAD: [f32; TAP_COUNT] = [-0.2, 0.0, 0.2];

// -------------------------------------------------------------------------------------------------

/// Three parallel delay taps, fed by a mono input, each panned around a shared stereo position
/// and mixed against the panned dry signal.
///
/// All delay buffers are allocated for [`MultiTapDelay::MAX_DELAY_TIME`] on creation.
#[derive(Debug, Clone)]
pub struct MultiTapDelay {
    taps: [DelayLine<1>; TAP_COUNT],
    sample_rate: u32,
}

impl MultiTapDelay {
    /// Max delay time of a tap in seconds.
    pub const MAX_DELAY_TIME: f32 = 2.0;
    /// Min delay time of a tap in seconds.
    pub const MIN_DELAY_TIME: f32 = 0.01;
    /// Max feedback amount.
    pub const MAX_FEEDBACK: f32 = 0.99;

    pub fn new(sample_rate: u32) -> Self {
        let max_frames = (Self::MAX_DELAY_TIME * sample_rate as f32).ceil() as usize + 1;
        Self {
            taps: std::array::from_fn(|_| DelayLine::new(max_frames)),
            sample_rate,
        }
    }

    /// Clear all delay buffers.
    pub fn flush(&mut self) {
        for tap in &mut self.taps {
            tap.flush();
        }
    }

    /// Process a single mono input sample, panned to `position` in range `[0, 1]`.
    ///
    /// Tap times are clamped to `[MIN_DELAY_TIME, MAX_DELAY_TIME]`, feedback to
    /// `[0, MAX_FEEDBACK]` and `dry_wet` to `[0, 1]`. Returns a stereo frame.
    #[inline]
    pub fn process(
        &mut self,
        input: f32,
        position: f32,
        times: &[f32; TAP_COUNT],
        gains: &[f32; TAP_COUNT],
        feedback: f32,
        dry_wet: f32,
    ) -> [f32; 2] {
        let feedback = feedback.clamp(0.0, Self::MAX_FEEDBACK);
        let dry_wet = dry_wet.clamp(0.0, 1.0);

        let (dry_l, dry_r) = position_panning_factors(position);
        let mut wet = [0.0; 2];
        for (index, tap) in self.taps.iter_mut().enumerate() {
            let time = times[index].clamp(Self::MIN_DELAY_TIME, Self::MAX_DELAY_TIME);
            let [delayed] =
                tap.process_sample([input], feedback, time * self.sample_rate as f32);
            let (tap_l, tap_r) = position_panning_factors(position + TAP_SPREAD[index]);
            wet[0] += delayed * gains[index] * tap_l;
            wet[1] += delayed * gains[index] * tap_r;
        }
        [
            input * dry_l * (1.0 - dry_wet) + wet[0] * dry_wet,
            input * dry_r * (1.0 - dry_wet) + wet[1] * dry_wet,
        ]
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    const TIMES: [f32; TAP_COUNT] = [0.01, 0.02, 0.03];
    const GAINS: [f32; TAP_COUNT] = [1.0, 0.7, 0.5];

    #[test]
    fn dry_only() {
        let mut delay = MultiTapDelay::new(1000);
        let [l, r] = delay.process(1.0, 0.5, &TIMES, &GAINS, 0.5, 0.0);
        assert_eq_with_epsilon!(l, std::f32::consts::FRAC_1_SQRT_2, 1e-6);
        assert_eq_with_epsilon!(r, std::f32::consts::FRAC_1_SQRT_2, 1e-6);
    }

    #[test]
    fn taps_are_delayed_and_spread() {
        let mut delay = MultiTapDelay::new(1000);
        let mut output = Vec::new();
        output.push(delay.process(1.0, 0.5, &TIMES, &GAINS, 0.0, 1.0));
        for _ in 0..40 {
            output.push(delay.process(0.0, 0.5, &TIMES, &GAINS, 0.0, 1.0));
        }
        // wet only: nothing before the first tap
        assert!(output[..10].iter().all(|f| f[0] == 0.0 && f[1] == 0.0));
        // first tap is panned to the left of center
        assert!(output[10][0] > output[10][1]);
        // second tap is centered
        assert_eq_with_epsilon!(output[20][0], output[20][1], 1e-6);
        // third tap is panned to the right of center
        assert!(output[30][1] > output[30][0]);
        assert!(output[31..].iter().all(|f| f[0] == 0.0 && f[1] == 0.0));
    }

    #[test]
    fn position_and_params_are_clamped() {
        let mut delay = MultiTapDelay::new(1000);
        let [l, r] = delay.process(1.0, -2.0, &[0.0, 10.0, 0.5], &GAINS, 5.0, -1.0);
        assert_eq!((l, r), (1.0, 0.0));
        for _ in 0..5000 {
            let [l, r] = delay.process(1.0, 3.0, &[0.0, 10.0, 0.5], &GAINS, 5.0, 2.0);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 1e3 && r.abs() < 1e3);
        }
    }
}
