use four_cc::FourCC;

use crate::{
    effect::{compressor::CompressorEffect, Effect},
    parameter::{FloatParameter, ParameterValueUpdate, SmoothedParameterValue},
    parameters::OutputParameters,
    utils::smoothed::{apply_smoothed_gain, apply_smoothed_panning},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Final processing stage of the synth's stereo output: balance, limiter and output gain.
pub struct OutputStage {
    pan: SmoothedParameterValue,
    gain: SmoothedParameterValue,
    limiter: CompressorEffect,
    parameters: OutputParameters,
}

impl OutputStage {
    pub const PAN: FloatParameter = FloatParameter::new(FourCC(*b"opan"), "Pan", -1.0..=1.0, 0.0);
    pub const GAIN: FloatParameter =
        FloatParameter::new(FourCC(*b"ogan"), "Output Gain", 0.0..=2.0, 0.6);

    /// Create a new output stage for the given sample rate, initialized to the given
    /// parameters without smoothing.
    pub fn new(sample_rate: u32, parameters: &OutputParameters) -> Result<Self, Error> {
        let mut pan = SmoothedParameterValue::from_description(Self::PAN, sample_rate);
        pan.init_value(parameters.pan);
        let mut gain = SmoothedParameterValue::from_description(Self::GAIN, sample_rate);
        gain.init_value(parameters.gain);

        let mut limiter = CompressorEffect::with_parameters(
            parameters.threshold,
            parameters.ratio,
            parameters.knee,
            parameters.attack,
            parameters.release,
            parameters.lookahead,
        );
        limiter.initialize(sample_rate, 2)?;

        Ok(Self {
            pan,
            gain,
            limiter,
            parameters: *parameters,
        })
    }

    /// Currently applied parameters.
    pub fn parameters(&self) -> &OutputParameters {
        &self.parameters
    }

    /// Max absolute sample value the stage emits. While a gain change is smoothed, the larger
    /// of the current and the target gain applies.
    pub fn ceiling(&self) -> f32 {
        let gain = self.gain.current_value().max(self.gain.target_value());
        self.limiter.ceiling() * gain
    }

    /// Apply new parameters. Pan and gain changes get smoothed, limiter settings apply
    /// immediately.
    pub fn apply_parameters(&mut self, parameters: &OutputParameters) {
        let current = self.parameters;
        if current.pan != parameters.pan {
            self.pan.set_target_value(parameters.pan);
        }
        if current.gain != parameters.gain {
            self.gain.set_target_value(parameters.gain);
        }
        let limiter_updates = [
            (CompressorEffect::THRESHOLD_ID, current.threshold, parameters.threshold),
            (CompressorEffect::RATIO_ID, current.ratio, parameters.ratio),
            (CompressorEffect::KNEE_ID, current.knee, parameters.knee),
            (CompressorEffect::ATTACK_ID, current.attack, parameters.attack),
            (CompressorEffect::RELEASE_ID, current.release, parameters.release),
            (CompressorEffect::LOOKAHEAD_ID, current.lookahead, parameters.lookahead),
        ];
        for (id, old, new) in limiter_updates {
            if old != new {
                if let Err(err) = self
                    .limiter
                    .process_parameter_update(id, &ParameterValueUpdate::Value(new))
                {
                    log::warn!("Failed to update limiter parameter '{id}': {err}");
                }
            }
        }
        self.parameters = *parameters;
    }

    /// Process an interleaved stereo buffer in place.
    pub fn process(&mut self, buffer: &mut [f32]) {
        apply_smoothed_panning(buffer, self.pan.smoother_mut());
        self.limiter.process(buffer);
        apply_smoothed_gain(buffer, 2, self.gain.smoother_mut());
    }
}

// -------------------------------------------------------------------------------------------------
