//! Linear ADSR envelope with a peak multiplier and click-free retriggering, plus a delayed
//! trigger helper to stagger envelope starts and stops.

// -------------------------------------------------------------------------------------------------

/// Current processing stage in a [`AdsrEnvelope`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum AdsrStage {
    #[default]
    /// Before attack and after release (zero volume).
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

// -------------------------------------------------------------------------------------------------

/// ADSR envelope parameters that define the envelope shape for a [`AdsrEnvelope`].
///
/// Times are in seconds and are clamped to [`Self::MIN_TIME`]. The sustain level is clamped
/// to `[0, 1]`. `peak_mul` scales the envelope's output and is not clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrParameters {
    sample_rate: u32,
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,
    peak_mul: f32,
}

impl AdsrParameters {
    /// Minimum time for attack, decay and release stages.
    pub const MIN_TIME: f32 = 0.001;

    /// Create new ADSR parameters for the given sample rate.
    pub fn new(
        sample_rate: u32,
        attack_time: f32,
        decay_time: f32,
        sustain_level: f32,
        release_time: f32,
        peak_mul: f32,
    ) -> Self {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        let mut parameters = Self {
            sample_rate: sample_rate.max(1),
            attack_time: Self::MIN_TIME,
            decay_time: Self::MIN_TIME,
            sustain_level: 1.0,
            release_time: Self::MIN_TIME,
            peak_mul: 1.0,
        };
        parameters.setup(attack_time, decay_time, sustain_level, release_time);
        parameters.set_peak_mul(peak_mul);
        parameters
    }

    /// Get the applied sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Attack time in seconds.
    pub fn attack_time(&self) -> f32 {
        self.attack_time
    }
    pub fn set_attack_time(&mut self, seconds: f32) {
        self.attack_time = Self::clamp_time(seconds);
    }

    /// Decay time in seconds.
    pub fn decay_time(&self) -> f32 {
        self.decay_time
    }
    pub fn set_decay_time(&mut self, seconds: f32) {
        self.decay_time = Self::clamp_time(seconds);
    }

    /// Sustain level in range `[0, 1]`.
    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }
    pub fn set_sustain_level(&mut self, level: f32) {
        self.sustain_level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
    }

    /// Release time in seconds.
    pub fn release_time(&self) -> f32 {
        self.release_time
    }
    pub fn set_release_time(&mut self, seconds: f32) {
        self.release_time = Self::clamp_time(seconds);
    }

    /// Output multiplier.
    pub fn peak_mul(&self) -> f32 {
        self.peak_mul
    }
    pub fn set_peak_mul(&mut self, peak_mul: f32) {
        self.peak_mul = if peak_mul.is_finite() { peak_mul } else { 0.0 };
    }

    /// Set attack, decay, sustain and release at once.
    pub fn setup(
        &mut self,
        attack_time: f32,
        decay_time: f32,
        sustain_level: f32,
        release_time: f32,
    ) {
        self.set_attack_time(attack_time);
        self.set_decay_time(decay_time);
        self.set_sustain_level(sustain_level);
        self.set_release_time(release_time);
    }

    fn clamp_time(seconds: f32) -> f32 {
        if seconds.is_finite() {
            seconds.max(Self::MIN_TIME)
        } else {
            Self::MIN_TIME
        }
    }

    #[inline]
    fn samples(&self, seconds: f32) -> f32 {
        (seconds * self.sample_rate as f32).max(1.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// Linear ADSR envelope with externally defined parameter state.
///
/// Stage rates are calculated when entering a stage, so parameter changes apply with the next
/// stage transition. Both [`Self::play`] and [`Self::stop`] continue from the current level.
#[derive(Debug, Default, Clone)]
pub struct AdsrEnvelope {
    stage: AdsrStage,
    level: f32,
    rate: f32,
    target: f32,
}

impl AdsrEnvelope {
    const SILENCE: f32 = 0.001; // -60dB
    const PEAK: f32 = 1.0;

    /// Create a new idle envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the envelope's current stage.
    #[inline(always)]
    pub fn stage(&self) -> AdsrStage {
        self.stage
    }

    /// Return the envelope's current level, without the peak multiplier applied.
    #[inline(always)]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Return the envelope's current output value: level × peak multiplier.
    #[inline(always)]
    pub fn output(&self, parameters: &AdsrParameters) -> f32 {
        self.level * parameters.peak_mul
    }

    /// (Re)enter the attack stage, starting from the current level.
    pub fn play(&mut self, parameters: &AdsrParameters) {
        self.stage = AdsrStage::Attack;
        self.rate = Self::PEAK / parameters.samples(parameters.attack_time);
    }

    /// Enter the release stage from the current level. Does nothing when idle or already
    /// releasing.
    pub fn stop(&mut self, parameters: &AdsrParameters) {
        match self.stage {
            AdsrStage::Attack | AdsrStage::Decay | AdsrStage::Sustain => {
                self.stage = AdsrStage::Release;
                self.rate = self.level / parameters.samples(parameters.release_time);
            }
            AdsrStage::Idle | AdsrStage::Release => (),
        }
    }

    /// Immediately silence the envelope and go idle.
    pub fn reset(&mut self) {
        self.stage = AdsrStage::Idle;
        self.level = 0.0;
        self.rate = 0.0;
        self.target = 0.0;
    }

    /// Compute and return one output sample with the peak multiplier applied.
    #[inline]
    pub fn run(&mut self, parameters: &AdsrParameters) -> f32 {
        match self.stage {
            AdsrStage::Idle | AdsrStage::Sustain => {}
            AdsrStage::Attack => {
                self.level += self.rate;
                if self.level >= Self::PEAK {
                    self.level = Self::PEAK;
                    self.stage = AdsrStage::Decay;
                    self.target = parameters.sustain_level;
                    self.rate =
                        (Self::PEAK - self.target) / parameters.samples(parameters.decay_time);
                }
            }
            AdsrStage::Decay => {
                self.level -= self.rate;
                if self.level <= self.target || self.rate <= 0.0 {
                    self.level = self.target;
                    self.stage = AdsrStage::Sustain;
                }
            }
            AdsrStage::Release => {
                self.level -= self.rate;
                if self.level <= Self::SILENCE {
                    self.level = 0.0;
                    self.stage = AdsrStage::Idle;
                }
            }
        }
        self.output(parameters)
    }
}

// -------------------------------------------------------------------------------------------------

/// Envelope commands which can be scheduled via a [`DelayedTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeTrigger {
    Play,
    Stop,
}

/// Schedules a single envelope command a number of samples ahead.
///
/// Holds one pending command only: scheduling a new command replaces a pending one.
#[derive(Debug, Default, Clone)]
pub struct DelayedTrigger {
    pending: Option<(EnvelopeTrigger, u64)>,
}

impl DelayedTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently pending command, if any.
    pub fn pending(&self) -> Option<EnvelopeTrigger> {
        self.pending.map(|(trigger, _)| trigger)
    }

    /// Schedule `trigger` after the given delay in seconds. Returns the trigger immediately
    /// when the delay is shorter than a sample, clearing any pending command.
    #[must_use]
    pub fn schedule(
        &mut self,
        trigger: EnvelopeTrigger,
        delay: f32,
        sample_rate: u32,
    ) -> Option<EnvelopeTrigger> {
        let delay_samples = if delay.is_finite() && delay > 0.0 {
            (delay * sample_rate as f32).round() as u64
        } else {
            0
        };
        if delay_samples == 0 {
            self.pending = None;
            Some(trigger)
        } else {
            self.pending = Some((trigger, delay_samples));
            None
        }
    }

    /// Drop a pending command.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Advance by one sample. Returns the pending command when its delay elapsed.
    #[inline]
    pub fn run(&mut self) -> Option<EnvelopeTrigger> {
        if let Some((trigger, remaining)) = self.pending.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                let trigger = *trigger;
                self.pending = None;
                return Some(trigger);
            }
        }
        None
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 1000;

    fn parameters() -> AdsrParameters {
        AdsrParameters::new(SAMPLE_RATE, 0.01, 0.1, 0.5, 0.1, 1.0)
    }

    #[test]
    fn parameter_clamping() {
        let mut parameters = AdsrParameters::new(SAMPLE_RATE, 0.0, -1.0, 2.0, f32::NAN, 0.15);
        assert_eq!(parameters.attack_time(), AdsrParameters::MIN_TIME);
        assert_eq!(parameters.decay_time(), AdsrParameters::MIN_TIME);
        assert_eq!(parameters.sustain_level(), 1.0);
        assert_eq!(parameters.release_time(), AdsrParameters::MIN_TIME);
        assert_eq!(parameters.peak_mul(), 0.15);
        parameters.set_sustain_level(-1.0);
        assert_eq!(parameters.sustain_level(), 0.0);
    }

    #[test]
    fn stage_sequence() {
        let parameters = parameters();
        let mut env = AdsrEnvelope::new();
        assert_eq!(env.run(&parameters), 0.0);

        env.play(&parameters);
        assert_eq!(env.stage(), AdsrStage::Attack);
        let mut attack_samples = 0;
        while env.stage() == AdsrStage::Attack {
            env.run(&parameters);
            attack_samples += 1;
        }
        assert!((10..=11).contains(&attack_samples));
        assert_eq!(env.stage(), AdsrStage::Decay);
        assert_eq!(env.level(), 1.0);
        for _ in 0..120 {
            env.run(&parameters);
        }
        assert_eq!(env.stage(), AdsrStage::Sustain);
        assert_eq!(env.level(), 0.5);

        env.stop(&parameters);
        assert_eq!(env.stage(), AdsrStage::Release);
        for _ in 0..120 {
            env.run(&parameters);
        }
        assert_eq!(env.stage(), AdsrStage::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn retrigger_continuity() {
        let parameters = parameters();
        let mut env = AdsrEnvelope::new();
        env.play(&parameters);
        for _ in 0..40 {
            env.run(&parameters);
        }
        assert_eq!(env.stage(), AdsrStage::Decay);
        let level = env.level();
        assert!(level < 1.0 && level > 0.5);

        env.play(&parameters);
        assert_eq!(env.stage(), AdsrStage::Attack);
        assert_eq!(env.level(), level);
        let next = env.run(&parameters);
        assert!(next >= level && next - level <= 0.1 + 1e-6);
    }

    #[test]
    fn release_from_attack() {
        let parameters = parameters();
        let mut env = AdsrEnvelope::new();
        env.play(&parameters);
        for _ in 0..5 {
            env.run(&parameters);
        }
        let level = env.level();
        env.stop(&parameters);
        assert_eq!(env.stage(), AdsrStage::Release);
        assert_eq!(env.level(), level);
        assert!(env.run(&parameters) < level);
    }

    #[test]
    fn changes_apply_on_next_stage() {
        let mut parameters = parameters();
        let mut env = AdsrEnvelope::new();
        env.play(&parameters);
        env.run(&parameters);
        // slowing down attack doesn't affect the running attack stage
        parameters.set_attack_time(10.0);
        for _ in 0..10 {
            env.run(&parameters);
        }
        assert_eq!(env.stage(), AdsrStage::Decay);
    }

    #[test]
    fn peak_multiplier() {
        let parameters = AdsrParameters::new(SAMPLE_RATE, 0.001, 0.001, 1.0, 0.1, 50.0);
        let mut env = AdsrEnvelope::new();
        env.play(&parameters);
        let mut output = 0.0;
        for _ in 0..3 {
            output = env.run(&parameters);
        }
        assert_eq!(env.stage(), AdsrStage::Sustain);
        assert_eq!(output, 50.0);
    }

    #[test]
    fn delayed_trigger() {
        let mut trigger = DelayedTrigger::new();
        assert_eq!(
            trigger.schedule(EnvelopeTrigger::Play, 0.0, SAMPLE_RATE),
            Some(EnvelopeTrigger::Play)
        );
        assert_eq!(trigger.pending(), None);

        assert_eq!(trigger.schedule(EnvelopeTrigger::Play, 0.005, SAMPLE_RATE), None);
        for _ in 0..4 {
            assert_eq!(trigger.run(), None);
        }
        assert_eq!(trigger.run(), Some(EnvelopeTrigger::Play));
        assert_eq!(trigger.run(), None);

        // a later command replaces the pending one
        assert_eq!(trigger.schedule(EnvelopeTrigger::Play, 0.005, SAMPLE_RATE), None);
        assert_eq!(trigger.schedule(EnvelopeTrigger::Stop, 0.002, SAMPLE_RATE), None);
        assert_eq!(trigger.pending(), Some(EnvelopeTrigger::Stop));
        assert_eq!(trigger.run(), None);
        assert_eq!(trigger.run(), Some(EnvelopeTrigger::Stop));
        for _ in 0..10 {
            assert_eq!(trigger.run(), None);
        }
    }
}
