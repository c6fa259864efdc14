use crate::{
    operator::OperatorSlot,
    utils::dsp::{
        lfo::LfoWaveform,
        multitap::{MultiTapDelay, TAP_COUNT},
    },
};

// -------------------------------------------------------------------------------------------------

/// ADSR envelope settings of an operator. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParameters {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    /// Output multiplier: a gain for amplitude envelopes, a deviation in Hz for frequency
    /// envelopes.
    pub mul: f32,
}

impl EnvelopeParameters {
    pub const fn new(attack: f32, decay: f32, sustain: f32, release: f32, mul: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            mul,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A macro + fine timed ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampParameters {
    pub start: f32,
    pub end: f32,
    /// Macro time in seconds.
    pub time: f32,
    /// Fine time offset in seconds, added to `time`.
    pub time_fine: f32,
    /// Max random offset applied to `start` on every note-on.
    pub start_random: f32,
}

impl RampParameters {
    pub const fn new(start: f32, end: f32, time: f32) -> Self {
        Self {
            start,
            end,
            time,
            time_fine: 0.0,
            start_random: 0.0,
        }
    }

    /// Resulting ramp duration: macro + fine time.
    pub fn duration(&self) -> f32 {
        self.time + self.time_fine
    }
}

// -------------------------------------------------------------------------------------------------

/// Self feedback settings of an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackParameters {
    pub amount: f32,
    pub gain: f32,
    /// Frequency offset in Hz of the secondary feedback oscillator. 0 feeds back directly.
    pub freq_shift: f32,
}

impl Default for FeedbackParameters {
    fn default() -> Self {
        Self {
            amount: 0.0,
            gain: 1.0,
            freq_shift: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Multi-tap delay settings of an operator's stereo stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayParameters {
    pub enabled: bool,
    pub dry_wet: f32,
    pub times: [f32; TAP_COUNT],
    pub gains: [f32; TAP_COUNT],
    pub feedback: f32,
}

impl Default for DelayParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            dry_wet: 0.3,
            times: [0.3, 0.6, 1.0],
            gains: [1.0, 0.7, 0.5],
            feedback: 0.2,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Stereo position LFO settings of an operator's stereo stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanLfoParameters {
    pub active: bool,
    /// Center position in range `[0, 1]`.
    pub center: f32,
    /// Rate in Hz.
    pub freq: f32,
    pub depth: f32,
    /// Start phase in cycles, applied on every note-on.
    pub phase: f32,
    pub waveform: LfoWaveform,
}

impl Default for PanLfoParameters {
    fn default() -> Self {
        Self {
            active: false,
            center: 0.5,
            freq: 0.25,
            depth: 0.5,
            phase: 0.0,
            waveform: LfoWaveform::Sine,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// All settings of a single modulator or carrier operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorParameters {
    pub ratio: f32,
    pub ratio_fine: f32,
    pub depth: f32,
    pub depth_fine: f32,
    /// Frequency offset in Hz, added after the ratio got applied.
    pub tuning_offset: f32,
    /// Oscillator phase offset in cycles.
    pub phase: f32,
    pub freq_env: EnvelopeParameters,
    pub amp_env: EnvelopeParameters,
    /// Trigger delay of the frequency envelope in seconds.
    pub freq_delay: f32,
    /// Trigger delay of the amplitude envelope in seconds.
    pub amp_delay: f32,
    pub freq_ramp: RampParameters,
    pub amp_ramp: RampParameters,
    pub feedback: FeedbackParameters,
    pub delay: DelayParameters,
    pub pan_lfo: PanLfoParameters,
}

impl OperatorParameters {
    /// Generic modulator defaults, used for slots without a dedicated default.
    pub fn modulator() -> Self {
        Self {
            ratio: 1.0,
            ratio_fine: 0.0,
            depth: 1.0,
            depth_fine: 0.0,
            tuning_offset: 0.0,
            phase: 0.0,
            freq_env: EnvelopeParameters::new(0.01, 0.1, 0.8, 0.5, 0.0),
            amp_env: EnvelopeParameters::new(0.01, 0.5, 0.7, 0.5, 0.5),
            freq_delay: 0.0,
            amp_delay: 0.0,
            freq_ramp: RampParameters::new(0.0, 0.0, 1.0),
            amp_ramp: RampParameters::new(1.0, 1.0, 1.0),
            feedback: FeedbackParameters::default(),
            delay: DelayParameters::default(),
            pan_lfo: PanLfoParameters::default(),
        }
    }

    /// Carrier defaults.
    pub fn carrier() -> Self {
        Self {
            amp_env: EnvelopeParameters::new(0.01, 0.1, 0.8, 0.5, 0.15),
            amp_ramp: RampParameters::new(1.0, 0.8, 1.5),
            ..Self::modulator()
        }
    }

    /// Defaults for the given operator slot.
    pub fn default_for_slot(slot: OperatorSlot) -> Self {
        // ratio, depth, amp ramp end, amp ramp time, amp envelope (a, d, s, r)
        const SLOT_DEFAULTS: [(f32, f32, f32, f32, [f32; 4]); 6] = [
            (3.0, 3.0, 0.5, 1.2, [0.005, 1.5, 0.1, 0.8]),
            (1.0, 2.5, 0.7, 0.9, [0.01, 0.8, 0.4, 0.6]),
            (2.0, 2.0, 0.6, 1.1, [0.02, 1.2, 0.3, 0.5]),
            (1.5, 1.5, 0.4, 0.8, [0.01, 0.6, 0.5, 0.7]),
            (5.0, 1.0, 0.3, 1.0, [0.015, 1.0, 0.2, 0.6]),
            (0.5, 0.5, 0.2, 1.3, [0.025, 0.9, 0.3, 0.9]),
        ];
        match slot {
            OperatorSlot::Carrier => Self::carrier(),
            OperatorSlot::Modulator(index) => match SLOT_DEFAULTS.get(index) {
                Some(&(ratio, depth, ramp_end, ramp_time, [a, d, s, r])) => Self {
                    ratio,
                    depth,
                    amp_ramp: RampParameters::new(1.0, ramp_end, ramp_time),
                    amp_env: EnvelopeParameters::new(a, d, s, r, 0.5),
                    ..Self::modulator()
                },
                None => Self::modulator(),
            },
        }
    }

    /// Clamp values which the audio path relies on. The parameter store clamps every leaf to
    /// its declared range; this only guards direct struct edits.
    pub(crate) fn sanitized(mut self) -> Self {
        self.delay.feedback = self.delay.feedback.clamp(0.0, MultiTapDelay::MAX_FEEDBACK);
        self.delay.dry_wet = self.delay.dry_wet.clamp(0.0, 1.0);
        self.pan_lfo.center = self.pan_lfo.center.clamp(0.0, 1.0);
        self.feedback.amount = self.feedback.amount.clamp(0.0, 1.0);
        self
    }
}

impl Default for OperatorParameters {
    fn default() -> Self {
        Self::modulator()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_defaults() {
        let op1 = OperatorParameters::default_for_slot(OperatorSlot::Modulator(0));
        assert_eq!(op1.ratio, 3.0);
        assert_eq!(op1.depth, 3.0);
        assert_eq!(op1.amp_ramp, RampParameters::new(1.0, 0.5, 1.2));
        assert_eq!(op1.amp_env, EnvelopeParameters::new(0.005, 1.5, 0.1, 0.8, 0.5));

        let op6 = OperatorParameters::default_for_slot(OperatorSlot::Modulator(5));
        assert_eq!((op6.ratio, op6.depth), (0.5, 0.5));

        let op7 = OperatorParameters::default_for_slot(OperatorSlot::Modulator(6));
        assert_eq!(op7, OperatorParameters::modulator());

        let carrier = OperatorParameters::default_for_slot(OperatorSlot::Carrier);
        assert_eq!(carrier.amp_env.mul, 0.15);
        assert_eq!(carrier.amp_ramp.duration(), 1.5);
        assert_eq!(carrier.freq_env.mul, 0.0);
    }

    #[test]
    fn sanitize() {
        let mut params = OperatorParameters::modulator();
        params.delay.feedback = 2.0;
        params.pan_lfo.center = -1.0;
        let params = params.sanitized();
        assert_eq!(params.delay.feedback, MultiTapDelay::MAX_FEEDBACK);
        assert_eq!(params.pan_lfo.center, 0.0);
    }
}
