//! A single FM operator: oscillator, envelopes, ramps, self feedback and stereo stage.

use std::{f64::consts::TAU, fmt, str::FromStr};

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    chain::{AmplitudeScaling, ChainParameters},
    parameters::{EnvelopeParameters, OperatorParameters, RampParameters},
    utils::{
        adsr::{AdsrEnvelope, AdsrParameters, AdsrStage, DelayedTrigger, EnvelopeTrigger},
        dsp::{delay::DelayLine, lfo::Lfo, multitap::MultiTapDelay},
        ramp::RampSegment,
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Role of an operator in a modulation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OperatorRole {
    /// Modulates the frequency of the next operator in the chain.
    Modulator,
    /// Terminal operator which produces the audible signal.
    Carrier,
}

// -------------------------------------------------------------------------------------------------

/// Identifies an operator in a modulation chain. Displays and parses as `op1`, `op2`, ... for
/// modulators and as `carrier` for the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorSlot {
    /// Zero based modulator index.
    Modulator(usize),
    Carrier,
}

impl OperatorSlot {
    pub fn role(&self) -> OperatorRole {
        match self {
            OperatorSlot::Modulator(_) => OperatorRole::Modulator,
            OperatorSlot::Carrier => OperatorRole::Carrier,
        }
    }
}

impl fmt::Display for OperatorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorSlot::Modulator(index) => write!(f, "op{}", index + 1),
            OperatorSlot::Carrier => f.write_str("carrier"),
        }
    }
}

impl FromStr for OperatorSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "carrier" {
            return Ok(OperatorSlot::Carrier);
        }
        s.strip_prefix("op")
            .and_then(|number| number.parse::<usize>().ok())
            .filter(|number| *number > 0)
            .map(|number| OperatorSlot::Modulator(number - 1))
            .ok_or_else(|| Error::ParameterError(format!("Invalid operator name '{s}'")))
    }
}

// -------------------------------------------------------------------------------------------------

/// Per voice control signals, driven by the voice controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSignals {
    /// Base frequency in Hz, including pitch bend.
    pub pitch: f32,
    /// Normalized note velocity in range `[0, 1]`.
    pub velocity: f32,
    /// Normalized aftertouch in range `[0, 1]`.
    pub aftertouch: f32,
}

impl Default for VoiceSignals {
    fn default() -> Self {
        Self {
            pitch: 440.0,
            velocity: 0.0,
            aftertouch: 0.0,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// One FM oscillator of a [`ModulationChain`](crate::ModulationChain), either a modulator or
/// the carrier.
///
/// The operator's frequency is `base + freq_ramp * pitch + freq_env + incoming + feedback`,
/// with `base = pitch * (ratio + ratio_fine) + tuning_offset`. Modulator amplitudes scale with
/// the frequency they are derived from, so the modulation index stays constant across the
/// keyboard. The carrier's amplitude follows its envelope, note velocity and aftertouch.
#[derive(Debug, Clone)]
pub struct Operator {
    slot: OperatorSlot,
    sample_rate: u32,
    parameters: OperatorParameters,
    freq_env_parameters: AdsrParameters,
    amp_env_parameters: AdsrParameters,
    freq_env: AdsrEnvelope,
    amp_env: AdsrEnvelope,
    freq_trigger: DelayedTrigger,
    amp_trigger: DelayedTrigger,
    freq_ramp: RampSegment,
    amp_ramp: RampSegment,
    phase: f64,
    feedback_delay: DelayLine<1>,
    feedback_delay_frames: f32,
    feedback_phase: f64,
    stereo_delay: MultiTapDelay,
    pan_lfo: Lfo,
    rng: SmallRng,
    frequency: f32,
    amplitude: f32,
    coupling: f32,
}

impl Operator {
    /// Min delay of the self feedback path in seconds.
    pub const FEEDBACK_DELAY: f32 = 0.001;

    /// Create a new operator for the given slot. `seed` initializes the random generator used
    /// for ramp start randomization.
    pub fn new(
        slot: OperatorSlot,
        sample_rate: u32,
        parameters: &OperatorParameters,
        seed: u64,
    ) -> Self {
        let parameters = parameters.sanitized();
        let feedback_delay_frames = (Self::FEEDBACK_DELAY * sample_rate as f32).max(1.0);
        let mut operator = Self {
            slot,
            sample_rate,
            parameters,
            freq_env_parameters: envelope_parameters(sample_rate, &parameters.freq_env),
            amp_env_parameters: envelope_parameters(sample_rate, &parameters.amp_env),
            freq_env: AdsrEnvelope::new(),
            amp_env: AdsrEnvelope::new(),
            freq_trigger: DelayedTrigger::new(),
            amp_trigger: DelayedTrigger::new(),
            freq_ramp: RampSegment::new(sample_rate),
            amp_ramp: RampSegment::new(sample_rate),
            phase: 0.0,
            feedback_delay: DelayLine::new(feedback_delay_frames.ceil() as usize),
            feedback_delay_frames,
            feedback_phase: 0.0,
            stereo_delay: MultiTapDelay::new(sample_rate),
            pan_lfo: Lfo::new(
                sample_rate,
                parameters.pan_lfo.freq as f64,
                parameters.pan_lfo.waveform,
            ),
            rng: SmallRng::seed_from_u64(seed),
            frequency: 0.0,
            amplitude: 0.0,
            coupling: 0.0,
        };
        operator.configure_ramps(false);
        operator
    }

    /// The operator's slot in the chain.
    pub fn slot(&self) -> OperatorSlot {
        self.slot
    }

    /// The operator's role in the chain.
    pub fn role(&self) -> OperatorRole {
        self.slot.role()
    }

    /// The operator's current parameters.
    pub fn parameters(&self) -> &OperatorParameters {
        &self.parameters
    }

    /// Apply new parameters. Envelope changes apply with the next envelope stage, ramp changes
    /// with the next note-on.
    pub fn set_parameters(&mut self, parameters: &OperatorParameters) {
        let parameters = parameters.sanitized();
        update_envelope_parameters(&mut self.freq_env_parameters, &parameters.freq_env);
        update_envelope_parameters(&mut self.amp_env_parameters, &parameters.amp_env);
        if parameters.pan_lfo.freq != self.parameters.pan_lfo.freq {
            self.pan_lfo
                .set_rate(self.sample_rate, parameters.pan_lfo.freq as f64);
        }
        self.pan_lfo.set_waveform(parameters.pan_lfo.waveform);
        self.parameters = parameters;
    }

    /// Frequency without ramp, envelope and modulation: `pitch * (ratio + ratio_fine) +
    /// tuning_offset`.
    #[inline]
    pub fn base_frequency(&self, pitch: f32) -> f32 {
        pitch * (self.parameters.ratio + self.parameters.ratio_fine) + self.parameters.tuning_offset
    }

    /// Instantaneous frequency for the given pitch and incoming modulation, using the current
    /// ramp and envelope state. Self feedback is not included.
    pub fn compute_frequency(&self, pitch: f32, incoming: f32) -> f32 {
        self.frequency_with(
            pitch,
            self.freq_ramp.value(),
            self.freq_env.output(&self.freq_env_parameters),
            incoming,
        )
    }

    /// Instantaneous amplitude for the given voice signals, using the current ramp and envelope
    /// state. `modulated` tells if the operator receives modulation from another operator.
    pub fn compute_amplitude(
        &self,
        signals: &VoiceSignals,
        chain: &ChainParameters,
        modulated: bool,
    ) -> f32 {
        self.amplitude_with(
            signals,
            chain,
            modulated,
            self.amp_env.output(&self.amp_env_parameters),
            self.amp_ramp.value(),
        )
    }

    /// Last processed frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Last processed amplitude.
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Last processed output, as passed on to the next operator in the chain.
    pub fn coupling(&self) -> f32 {
        self.coupling
    }

    /// True while the amplitude envelope is running or about to start.
    pub fn is_active(&self) -> bool {
        self.amp_env.stage() != AdsrStage::Idle
            || self.amp_trigger.pending() == Some(EnvelopeTrigger::Play)
    }

    /// Start a note: reconfigure and restart ramps, and trigger both envelopes after their
    /// configured delays.
    pub fn play(&mut self) {
        self.configure_ramps(true);
        self.pan_lfo.set_phase(self.parameters.pan_lfo.phase as f64);
        self.trigger(EnvelopeTrigger::Play);
    }

    /// Release both envelopes after their configured delays.
    pub fn stop(&mut self) {
        self.trigger(EnvelopeTrigger::Stop);
    }

    /// Immediately silence the operator and clear all internal state.
    pub fn reset(&mut self) {
        self.freq_env.reset();
        self.amp_env.reset();
        self.freq_trigger.cancel();
        self.amp_trigger.cancel();
        self.freq_ramp.restart();
        self.amp_ramp.restart();
        self.phase = 0.0;
        self.feedback_phase = 0.0;
        self.feedback_delay.flush();
        self.stereo_delay.flush();
        self.frequency = 0.0;
        self.amplitude = 0.0;
        self.coupling = 0.0;
    }

    /// Compute one stereo output frame. `incoming` is the frequency modulation from the
    /// previous operator in Hz, `modulated` tells if there is a previous operator.
    #[inline]
    pub fn process(
        &mut self,
        signals: &VoiceSignals,
        chain: &ChainParameters,
        incoming: f32,
        modulated: bool,
    ) -> [f32; 2] {
        if let Some(trigger) = self.freq_trigger.run() {
            apply_trigger(&mut self.freq_env, &self.freq_env_parameters, trigger);
        }
        if let Some(trigger) = self.amp_trigger.run() {
            apply_trigger(&mut self.amp_env, &self.amp_env_parameters, trigger);
        }
        let freq_env = self.freq_env.run(&self.freq_env_parameters);
        let amp_env = self.amp_env.run(&self.amp_env_parameters);
        let freq_ramp = self.freq_ramp.run();
        let amp_ramp = self.amp_ramp.run();

        let amplitude = self.amplitude_with(signals, chain, modulated, amp_env, amp_ramp);
        let feedback = self.process_feedback(signals.pitch, amplitude);
        let frequency = self.frequency_with(signals.pitch, freq_ramp, freq_env, incoming) + feedback;

        let phase = self.phase + self.parameters.phase as f64;
        let output = ((TAU * phase).sin() as f32) * amplitude;
        self.phase += frequency as f64 / self.sample_rate as f64;
        self.phase -= self.phase.floor();

        if self.parameters.feedback.amount > 0.0 {
            self.feedback_delay.write([output]);
        }

        self.frequency = frequency;
        self.amplitude = amplitude;

        let delay = &self.parameters.delay;
        if delay.enabled {
            let pan_lfo = &self.parameters.pan_lfo;
            let position = if pan_lfo.active {
                pan_lfo.center + 0.5 * pan_lfo.depth * self.pan_lfo.next() as f32
            } else {
                pan_lfo.center
            };
            let frame = self.stereo_delay.process(
                output,
                position,
                &delay.times,
                &delay.gains,
                delay.feedback,
                delay.dry_wet,
            );
            self.coupling = (frame[0] + frame[1]) * 0.5;
            frame
        } else {
            self.coupling = output;
            [output, output]
        }
    }

    #[inline]
    fn frequency_with(&self, pitch: f32, freq_ramp: f32, freq_env: f32, incoming: f32) -> f32 {
        self.base_frequency(pitch) + freq_ramp * pitch + freq_env + incoming
    }

    #[inline]
    fn amplitude_with(
        &self,
        signals: &VoiceSignals,
        chain: &ChainParameters,
        modulated: bool,
        amp_env: f32,
        amp_ramp: f32,
    ) -> f32 {
        match self.role() {
            OperatorRole::Carrier => {
                let touch = 0.5 + signals.aftertouch * signals.aftertouch * 2.0;
                amp_env * signals.velocity * touch * amp_ramp
            }
            OperatorRole::Modulator => {
                let basis = match chain.amplitude_scaling {
                    AmplitudeScaling::BaseFrequency => self.base_frequency(signals.pitch),
                    AmplitudeScaling::Pitch => signals.pitch,
                };
                let emphasis = if modulated {
                    chain.operator_emphasis
                } else {
                    1.0
                };
                let depth = self.parameters.depth + self.parameters.depth_fine;
                basis * depth * amp_env * amp_ramp * emphasis
            }
        }
    }

    /// Reads the delayed output and returns the resulting frequency offset. With a frequency
    /// shift, the delayed signal drives a secondary oscillator instead.
    #[inline]
    fn process_feedback(&mut self, pitch: f32, amplitude: f32) -> f32 {
        let feedback = &self.parameters.feedback;
        if feedback.amount <= 0.0 {
            return 0.0;
        }
        let [delayed] = self.feedback_delay.read(self.feedback_delay_frames);
        let scaled = delayed * feedback.amount * feedback.gain;
        if feedback.freq_shift == 0.0 {
            scaled
        } else {
            let frequency = self.base_frequency(pitch) + feedback.freq_shift + scaled;
            let output = (TAU * self.feedback_phase).sin() as f32;
            self.feedback_phase += frequency as f64 / self.sample_rate as f64;
            self.feedback_phase -= self.feedback_phase.floor();
            output * feedback.amount * feedback.gain * amplitude
        }
    }

    fn trigger(&mut self, trigger: EnvelopeTrigger) {
        let sample_rate = self.sample_rate;
        if let Some(trigger) =
            self.freq_trigger
                .schedule(trigger, self.parameters.freq_delay, sample_rate)
        {
            apply_trigger(&mut self.freq_env, &self.freq_env_parameters, trigger);
        }
        if let Some(trigger) =
            self.amp_trigger
                .schedule(trigger, self.parameters.amp_delay, sample_rate)
        {
            apply_trigger(&mut self.amp_env, &self.amp_env_parameters, trigger);
        }
    }

    fn configure_ramps(&mut self, randomize: bool) {
        let (freq_ramp, amp_ramp) = (self.parameters.freq_ramp, self.parameters.amp_ramp);
        let freq_start = self.ramp_start(&freq_ramp, randomize);
        let amp_start = self.ramp_start(&amp_ramp, randomize);
        self.freq_ramp
            .configure(freq_start, freq_ramp.end, freq_ramp.duration());
        self.freq_ramp.restart();
        self.amp_ramp
            .configure(amp_start.max(0.0), amp_ramp.end, amp_ramp.duration());
        self.amp_ramp.restart();
    }

    fn ramp_start(&mut self, ramp: &RampParameters, randomize: bool) -> f32 {
        let range = ramp.start_random;
        if randomize && range > 0.0 {
            ramp.start + self.rng.random_range(-range..=range)
        } else {
            ramp.start
        }
    }
}

// -------------------------------------------------------------------------------------------------

fn envelope_parameters(
    sample_rate: u32,
    envelope: &EnvelopeParameters,
) -> AdsrParameters {
    AdsrParameters::new(
        sample_rate,
        envelope.attack,
        envelope.decay,
        envelope.sustain,
        envelope.release,
        envelope.mul,
    )
}

fn update_envelope_parameters(
    parameters: &mut AdsrParameters,
    envelope: &EnvelopeParameters,
) {
    parameters.setup(
        envelope.attack,
        envelope.decay,
        envelope.sustain,
        envelope.release,
    );
    parameters.set_peak_mul(envelope.mul);
}

fn apply_trigger(
    envelope: &mut AdsrEnvelope,
    parameters: &AdsrParameters,
    trigger: EnvelopeTrigger,
) {
    match trigger {
        EnvelopeTrigger::Play => envelope.play(parameters),
        EnvelopeTrigger::Stop => envelope.stop(parameters),
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    const SAMPLE_RATE: u32 = 44100;

    fn signals(pitch: f32) -> VoiceSignals {
        VoiceSignals {
            pitch,
            velocity: 1.0,
            aftertouch: 0.0,
        }
    }

    #[test]
    fn slot_names() -> Result<(), Box<Error>> {
        assert_eq!(OperatorSlot::Modulator(0).to_string(), "op1");
        assert_eq!(OperatorSlot::Carrier.to_string(), "carrier");
        assert_eq!("op12".parse::<OperatorSlot>()?, OperatorSlot::Modulator(11));
        assert_eq!("carrier".parse::<OperatorSlot>()?, OperatorSlot::Carrier);
        assert!("op0".parse::<OperatorSlot>().is_err());
        assert!("opx".parse::<OperatorSlot>().is_err());
        assert_eq!(OperatorSlot::Carrier.role(), OperatorRole::Carrier);
        Ok(())
    }

    #[test]
    fn frequency_transposition() {
        let mut parameters = OperatorParameters::modulator();
        parameters.ratio = 2.0;
        parameters.ratio_fine = 0.05;
        parameters.tuning_offset = 10.0;
        parameters.freq_ramp = RampParameters::new(0.5, 0.5, 1.0);
        let operator = Operator::new(OperatorSlot::Modulator(0), SAMPLE_RATE, &parameters, 0);

        let low = operator.compute_frequency(440.0, 0.0);
        let high = operator.compute_frequency(880.0, 0.0);
        assert_eq_with_epsilon!(low, 440.0 * 2.05 + 10.0 + 0.5 * 440.0, 1e-3);
        // pitch dependent terms scale, the tuning offset does not
        assert_eq_with_epsilon!(high - 10.0, 2.0 * (low - 10.0), 1e-3);
        assert_eq_with_epsilon!(operator.base_frequency(880.0), 880.0 * 2.05 + 10.0, 1e-3);
        assert_eq_with_epsilon!(operator.compute_frequency(440.0, 25.0), low + 25.0, 1e-3);
    }

    #[test]
    fn amplitude_scaling() {
        let mut parameters = OperatorParameters::modulator();
        parameters.ratio = 2.0;
        parameters.depth = 3.0;
        parameters.amp_env.mul = 1.0;
        parameters.amp_env.attack = 0.001;
        parameters.amp_env.sustain = 1.0;
        let mut operator = Operator::new(OperatorSlot::Modulator(0), SAMPLE_RATE, &parameters, 0);
        let chain = ChainParameters::default();
        operator.play();
        for _ in 0..1000 {
            operator.process(&signals(220.0), &chain, 0.0, false);
        }
        let unmodulated = operator.compute_amplitude(&signals(220.0), &chain, false);
        assert_eq_with_epsilon!(unmodulated, 440.0 * 3.0, 1e-2);
        let modulated = operator.compute_amplitude(&signals(220.0), &chain, true);
        assert_eq_with_epsilon!(modulated, unmodulated * chain.operator_emphasis, 1e-2);
        let by_pitch = operator.compute_amplitude(&signals(220.0), &ChainParameters::simple(), true);
        assert_eq_with_epsilon!(by_pitch, 220.0 * 3.0, 1e-2);
    }

    #[test]
    fn carrier_amplitude() {
        let mut parameters = OperatorParameters::carrier();
        parameters.amp_env = EnvelopeParameters::new(0.001, 0.1, 1.0, 0.1, 1.0);
        parameters.amp_ramp = RampParameters::new(1.0, 1.0, 1.0);
        let mut operator = Operator::new(OperatorSlot::Carrier, SAMPLE_RATE, &parameters, 0);
        let chain = ChainParameters::default();
        operator.play();
        for _ in 0..1000 {
            operator.process(&signals(440.0), &chain, 0.0, false);
        }
        let mut touched = signals(440.0);
        touched.velocity = 0.5;
        assert_eq_with_epsilon!(operator.compute_amplitude(&touched, &chain, false), 0.25, 1e-4);
        touched.aftertouch = 1.0;
        assert_eq_with_epsilon!(operator.compute_amplitude(&touched, &chain, false), 1.25, 1e-4);
    }

    #[test]
    fn feedback_stability() {
        let mut parameters = OperatorParameters::modulator();
        parameters.feedback.amount = 1.0;
        parameters.feedback.gain = 2.0;
        parameters.feedback.freq_shift = 0.0;
        let mut operator = Operator::new(OperatorSlot::Modulator(0), SAMPLE_RATE, &parameters, 0);
        let chain = ChainParameters::default();
        operator.play();
        for _ in 0..SAMPLE_RATE {
            let [l, r] = operator.process(&signals(440.0), &chain, 0.0, false);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 1e6 && r.abs() < 1e6);
            assert!(operator.frequency().is_finite());
        }

        parameters.feedback.freq_shift = 100.0;
        operator.set_parameters(&parameters);
        for _ in 0..SAMPLE_RATE {
            let [l, _] = operator.process(&signals(440.0), &chain, 0.0, false);
            assert!(l.is_finite() && l.abs() < 1e6);
        }
    }

    #[test]
    fn delayed_envelopes() {
        let mut parameters = OperatorParameters::carrier();
        parameters.amp_delay = 0.01;
        let mut operator = Operator::new(OperatorSlot::Carrier, 1000, &parameters, 0);
        let chain = ChainParameters::default();
        operator.play();
        assert!(operator.is_active());
        for _ in 0..9 {
            operator.process(&signals(440.0), &chain, 0.0, false);
            assert_eq!(operator.amplitude(), 0.0);
        }
        for _ in 0..5 {
            operator.process(&signals(440.0), &chain, 0.0, false);
        }
        assert!(operator.amplitude() > 0.0);

        operator.stop();
        // stop is delayed as well
        operator.process(&signals(440.0), &chain, 0.0, false);
        assert!(operator.is_active());
        for _ in 0..2000 {
            operator.process(&signals(440.0), &chain, 0.0, false);
        }
        assert!(!operator.is_active());
    }

    #[test]
    fn random_ramp_start() {
        let mut parameters = OperatorParameters::modulator();
        parameters.freq_ramp = RampParameters::new(1.0, 0.0, 1.0);
        parameters.freq_ramp.start_random = 0.5;
        let mut operator = Operator::new(OperatorSlot::Modulator(0), SAMPLE_RATE, &parameters, 42);
        let mut starts = Vec::new();
        for _ in 0..8 {
            operator.play();
            let start = operator.compute_frequency(100.0, 0.0) - operator.base_frequency(100.0);
            assert!((50.0..=150.0).contains(&start));
            starts.push(start);
        }
        assert!(starts.iter().any(|s| (*s - starts[0]).abs() > 1e-3));
    }

    #[test]
    fn stereo_stage() {
        let mut parameters = OperatorParameters::carrier();
        parameters.delay.enabled = true;
        parameters.delay.dry_wet = 0.0;
        parameters.pan_lfo.center = 0.0;
        let mut operator = Operator::new(OperatorSlot::Carrier, SAMPLE_RATE, &parameters, 0);
        let chain = ChainParameters::default();
        operator.play();
        let mut peak_right = 0.0f32;
        for _ in 0..1000 {
            let [_, r] = operator.process(&signals(440.0), &chain, 0.0, false);
            peak_right = peak_right.max(r.abs());
        }
        // hard left
        assert!(peak_right < 1e-6);
        assert!(operator.coupling().abs() <= operator.amplitude());
    }
}
