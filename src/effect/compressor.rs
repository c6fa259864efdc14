use four_cc::FourCC;

use crate::{
    effect::Effect,
    parameter::{
        FloatParameter, FloatParameterValue, Parameter, ParameterValueUpdate,
        SmoothedParameterValue,
    },
    utils::{
        db_to_linear, linear_to_db,
        dsp::{delay::LookupDelayLine, envelope::EnvelopeFollower},
        MINUS_INF_IN_DB,
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Stereo compressor effect with limiter mode, lookahead and soft-knee.
///
/// When ratio is at or above [`Self::LIMITER_RATIO`] it acts as a limiter: gain reduction is
/// driven by the peak of the whole lookahead window and the output gets clamped to the
/// threshold ceiling.
/// Note that the compressor will introduce latency when lookahead is used.
pub struct CompressorEffect {
    // Effect configuration
    sample_rate: u32,
    // Parameters
    threshold: FloatParameterValue,
    ratio: FloatParameterValue,
    knee_width: FloatParameterValue,
    attack_time: FloatParameterValue,
    release_time: FloatParameterValue,
    makeup_gain: SmoothedParameterValue,
    lookahead_time: FloatParameterValue,
    // Internal state
    envelope_follower: EnvelopeFollower,
    delay_line: LookupDelayLine<2>,
}

impl CompressorEffect {
    pub const EFFECT_NAME: &str = "CompressorEffect";
    pub const THRESHOLD_ID: FourCC = FourCC(*b"thrs");
    pub const RATIO_ID: FourCC = FourCC(*b"rato");
    pub const ATTACK_ID: FourCC = FourCC(*b"attk");
    pub const RELEASE_ID: FourCC = FourCC(*b"rels");
    pub const MAKEUP_GAIN_ID: FourCC = FourCC(*b"gain");
    pub const KNEE_ID: FourCC = FourCC(*b"knee");
    pub const LOOKAHEAD_ID: FourCC = FourCC(*b"look");

    /// Ratios at or above this value switch to limiter mode.
    pub const LIMITER_RATIO: f32 = 20.0;
    /// Max lookahead time in milliseconds.
    pub const MAX_LOOKAHEAD: f32 = 10.0;

    /// Threshold in dB.
    pub fn threshold_parameter() -> FloatParameter {
        FloatParameter::new(Self::THRESHOLD_ID, "Threshold", -60.0..=0.0, -18.0).with_unit("dB")
    }

    /// Compression ratio. Displays as `LIMIT` in limiter mode.
    pub fn ratio_parameter() -> FloatParameter {
        let ratio_to_string = |value: f32| {
            if value >= Self::LIMITER_RATIO {
                "LIMIT".to_string()
            } else {
                format!("1:{:.2}", value)
            }
        };
        let string_to_ratio = |string: &str| {
            let trimmed = string.trim();
            if trimmed.eq_ignore_ascii_case("LIMIT") {
                Some(Self::LIMITER_RATIO)
            } else if let Some(ratio_str) = trimmed.strip_prefix("1:") {
                ratio_str.parse::<f32>().ok()
            } else {
                trimmed.parse::<f32>().ok()
            }
        };
        FloatParameter::new(Self::RATIO_ID, "Ratio", 1.0..=50.0, 25.0)
            .with_display(ratio_to_string, string_to_ratio)
    }

    /// Soft knee width in dB.
    pub fn knee_parameter() -> FloatParameter {
        FloatParameter::new(Self::KNEE_ID, "Knee", 0.0..=12.0, 0.4).with_unit("dB")
    }

    /// Envelope attack time in seconds.
    pub fn attack_parameter() -> FloatParameter {
        FloatParameter::new(Self::ATTACK_ID, "Attack", 0.0001..=0.5, 0.001).with_unit("s")
    }

    /// Envelope release time in seconds.
    pub fn release_parameter() -> FloatParameter {
        FloatParameter::new(Self::RELEASE_ID, "Release", 0.001..=2.0, 0.07).with_unit("s")
    }

    /// Makeup gain in dB.
    pub fn makeup_gain_parameter() -> FloatParameter {
        FloatParameter::new(Self::MAKEUP_GAIN_ID, "Makeup Gain", -24.0..=24.0, 0.0)
            .with_unit("dB")
    }

    /// Lookahead time in milliseconds.
    pub fn lookahead_parameter() -> FloatParameter {
        FloatParameter::new(
            Self::LOOKAHEAD_ID,
            "Lookahead",
            0.0..=Self::MAX_LOOKAHEAD,
            3.0,
        )
        .with_unit("ms")
    }

    /// Creates a new `CompressorEffect` with default limiter parameters: -18 dB threshold,
    /// 1:25 ratio, 1 ms attack, 70 ms release, 3 ms lookahead and a 0.4 dB soft knee.
    pub fn new_limiter() -> Self {
        Self {
            sample_rate: 0,
            threshold: FloatParameterValue::from_description(Self::threshold_parameter()),
            ratio: FloatParameterValue::from_description(Self::ratio_parameter()),
            knee_width: FloatParameterValue::from_description(Self::knee_parameter()),
            attack_time: FloatParameterValue::from_description(Self::attack_parameter()),
            release_time: FloatParameterValue::from_description(Self::release_parameter()),
            makeup_gain: SmoothedParameterValue::from_description(
                Self::makeup_gain_parameter(),
                44100,
            ),
            lookahead_time: FloatParameterValue::from_description(Self::lookahead_parameter()),
            envelope_follower: EnvelopeFollower::new(44100, 0.001, 0.07),
            delay_line: LookupDelayLine::<2>::default(),
        }
    }

    /// Creates a new `CompressorEffect` with the given parameters.
    pub fn with_parameters(
        threshold: f32,
        ratio: f32,
        knee_width: f32,
        attack_time: f32,
        release_time: f32,
        lookahead_time: f32,
    ) -> Self {
        let mut compressor = Self::new_limiter();
        compressor.threshold.set_value(threshold);
        compressor.ratio.set_value(ratio);
        compressor.knee_width.set_value(knee_width);
        compressor.attack_time.set_value(attack_time);
        compressor.release_time.set_value(release_time);
        compressor.lookahead_time.set_value(lookahead_time);
        compressor
    }

    /// True when running in limiter mode.
    pub fn is_limiter(&self) -> bool {
        self.ratio.value() >= Self::LIMITER_RATIO
    }

    /// Max absolute output value in limiter mode.
    pub fn ceiling(&self) -> f32 {
        db_to_linear(self.threshold.value() + self.makeup_gain.target_value())
    }

    fn update_envelope_follower(&mut self) {
        if self.sample_rate > 0 {
            self.envelope_follower
                .set_attack_time(self.attack_time.value());
            self.envelope_follower
                .set_release_time(self.release_time.value());
        }
    }

    fn update_lookahead(&mut self) {
        if self.sample_rate > 0 {
            self.delay_line
                .set_delay_time(self.sample_rate, self.lookahead_time.value() / 1000.0);
        }
    }

    #[inline]
    fn gain_reduction(&self, envelope: f32) -> f32 {
        let t = self.threshold.value();
        let w = self.knee_width.value();
        let slope = if self.is_limiter() {
            1.0
        } else {
            1.0 - 1.0 / self.ratio.value()
        };
        if w > 0.0 && envelope > (t - w / 2.0) && envelope < (t + w / 2.0) {
            // soft knee
            let knee_lower = t - w / 2.0;
            let x = (envelope - knee_lower) / w;
            x * x * slope * w / 2.0
        } else if envelope >= (t + w / 2.0) {
            (envelope - t) * slope
        } else {
            0.0
        }
    }
}

impl Default for CompressorEffect {
    fn default() -> Self {
        Self::new_limiter()
    }
}

impl Effect for CompressorEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn parameters(&self) -> Vec<&dyn Parameter> {
        vec![
            self.threshold.description(),
            self.ratio.description(),
            self.knee_width.description(),
            self.attack_time.description(),
            self.release_time.description(),
            self.makeup_gain.description(),
            self.lookahead_time.description(),
        ]
    }

    fn initialize(&mut self, sample_rate: u32, channel_count: usize) -> Result<(), Error> {
        if channel_count != 2 {
            return Err(Error::ParameterError(
                "CompressorEffect only supports stereo I/O".to_string(),
            ));
        }
        self.sample_rate = sample_rate;

        let makeup_gain = self.makeup_gain.target_value();
        self.makeup_gain =
            SmoothedParameterValue::from_description(Self::makeup_gain_parameter(), sample_rate);
        self.makeup_gain.init_value(makeup_gain);

        self.delay_line = LookupDelayLine::new(
            sample_rate,
            Self::MAX_LOOKAHEAD / 1000.0,
            self.lookahead_time.value() / 1000.0,
        );
        self.envelope_follower = EnvelopeFollower::new(
            sample_rate,
            self.attack_time.value(),
            self.release_time.value(),
        );
        let initial_envelope = if self.is_limiter() {
            MINUS_INF_IN_DB
        } else {
            0.0
        };
        self.envelope_follower.reset(initial_envelope);
        Ok(())
    }

    fn process(&mut self, output: &mut [f32]) {
        debug_assert!(self.sample_rate > 0, "Effect is not initialized");
        let limiter = self.is_limiter();
        let ceiling = self.ceiling();
        for frame in output.chunks_exact_mut(2) {
            let input_frame = [frame[0], frame[1]];
            let delayed_frame = self.delay_line.process(&input_frame);

            // limiters detect the peak of the whole lookahead window to prevent overshoots
            let peak = if limiter {
                self.delay_line.peak_value()
            } else {
                input_frame[0].abs().max(input_frame[1].abs())
            };
            let envelope = self.envelope_follower.process(linear_to_db(peak));

            let makeup_gain = self.makeup_gain.next_value();
            let gain = db_to_linear(makeup_gain - self.gain_reduction(envelope));

            if limiter {
                frame[0] = (delayed_frame[0] * gain).clamp(-ceiling, ceiling);
                frame[1] = (delayed_frame[1] * gain).clamp(-ceiling, ceiling);
            } else {
                frame[0] = delayed_frame[0] * gain;
                frame[1] = delayed_frame[1] * gain;
            }
        }
    }

    fn process_parameter_update(
        &mut self,
        id: FourCC,
        value: &ParameterValueUpdate,
    ) -> Result<(), Error> {
        match id {
            Self::THRESHOLD_ID => self.threshold.apply_update(value),
            Self::RATIO_ID => self.ratio.apply_update(value),
            Self::KNEE_ID => self.knee_width.apply_update(value),
            Self::ATTACK_ID => self.attack_time.apply_update(value),
            Self::RELEASE_ID => self.release_time.apply_update(value),
            Self::MAKEUP_GAIN_ID => self.makeup_gain.apply_update(value),
            Self::LOOKAHEAD_ID => self.lookahead_time.apply_update(value),
            _ => {
                return Err(Error::ParameterError(format!(
                    "Unknown parameter: '{id}' for effect '{}'",
                    self.name()
                )))
            }
        }
        self.update_envelope_follower();
        self.update_lookahead();
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------
