//! Hierarchical, JSON serializable preset documents.
//!
//! Every field of a preset is optional: missing or malformed values fall back to the operator
//! slot's default value when applying a preset, so partial documents always load.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::{
    chain::{AmplitudeScaling, ChainTopology},
    operator::OperatorSlot,
    parameters::{
        DelayParameters, EnvelopeParameters, FeedbackParameters, OperatorParameters,
        PanLfoParameters, RampParameters, SynthParameters,
    },
    utils::dsp::{lfo::LfoWaveform, multitap::TAP_COUNT},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Deserializes any value into `Some(T)`. Values which can't be converted into `T` are logged
/// and deserialized as `None`, so a single malformed entry doesn't invalidate a whole preset.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value::<T>(value.clone()) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            log::warn!("Ignoring malformed preset value '{value}': {err}");
            Ok(None)
        }
    }
}

/// Overwrite `target` with `value`, when present.
fn apply<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopePreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub attack: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub decay: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sustain: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub release: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mul: Option<f32>,
}

impl EnvelopePreset {
    fn from_parameters(params: &EnvelopeParameters) -> Self {
        Self {
            attack: Some(params.attack),
            decay: Some(params.decay),
            sustain: Some(params.sustain),
            release: Some(params.release),
            mul: Some(params.mul),
        }
    }

    fn apply_to(&self, params: &mut EnvelopeParameters) {
        apply(&mut params.attack, self.attack);
        apply(&mut params.decay, self.decay);
        apply(&mut params.sustain, self.sustain);
        apply(&mut params.release, self.release);
        apply(&mut params.mul, self.mul);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub start: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub end: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub time: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub time_fine: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub start_random: Option<f32>,
}

impl RampPreset {
    fn from_parameters(params: &RampParameters) -> Self {
        Self {
            start: Some(params.start),
            end: Some(params.end),
            time: Some(params.time),
            time_fine: Some(params.time_fine),
            start_random: Some(params.start_random),
        }
    }

    fn apply_to(&self, params: &mut RampParameters) {
        apply(&mut params.start, self.start);
        apply(&mut params.end, self.end);
        apply(&mut params.time, self.time);
        apply(&mut params.time_fine, self.time_fine);
        apply(&mut params.start_random, self.start_random);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub freq_shift: Option<f32>,
}

impl FeedbackPreset {
    fn from_parameters(params: &FeedbackParameters) -> Self {
        Self {
            amount: Some(params.amount),
            gain: Some(params.gain),
            freq_shift: Some(params.freq_shift),
        }
    }

    fn apply_to(&self, params: &mut FeedbackParameters) {
        apply(&mut params.amount, self.amount);
        apply(&mut params.gain, self.gain);
        apply(&mut params.freq_shift, self.freq_shift);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dry_wet: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub times: Option<[f32; TAP_COUNT]>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gains: Option<[f32; TAP_COUNT]>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f32>,
}

impl DelayPreset {
    fn from_parameters(params: &DelayParameters) -> Self {
        Self {
            enabled: Some(params.enabled),
            dry_wet: Some(params.dry_wet),
            times: Some(params.times),
            gains: Some(params.gains),
            feedback: Some(params.feedback),
        }
    }

    fn apply_to(&self, params: &mut DelayParameters) {
        apply(&mut params.enabled, self.enabled);
        apply(&mut params.dry_wet, self.dry_wet);
        apply(&mut params.times, self.times);
        apply(&mut params.gains, self.gains);
        apply(&mut params.feedback, self.feedback);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanLfoPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub center: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub freq: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub depth: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub phase: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<LfoWaveform>,
}

impl PanLfoPreset {
    fn from_parameters(params: &PanLfoParameters) -> Self {
        Self {
            active: Some(params.active),
            center: Some(params.center),
            freq: Some(params.freq),
            depth: Some(params.depth),
            phase: Some(params.phase),
            waveform: Some(params.waveform),
        }
    }

    fn apply_to(&self, params: &mut PanLfoParameters) {
        apply(&mut params.active, self.active);
        apply(&mut params.center, self.center);
        apply(&mut params.freq, self.freq);
        apply(&mut params.depth, self.depth);
        apply(&mut params.phase, self.phase);
        apply(&mut params.waveform, self.waveform);
    }
}

// -------------------------------------------------------------------------------------------------

/// Preset of a single modulator or carrier operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ratio_fine: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub depth: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub depth_fine: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tuning_offset: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub phase: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub freq_env: Option<EnvelopePreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub amp_env: Option<EnvelopePreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub freq_delay: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub amp_delay: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub freq_ramp: Option<RampPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub amp_ramp: Option<RampPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pan_lfo: Option<PanLfoPreset>,
}

impl OperatorPreset {
    pub fn from_parameters(params: &OperatorParameters) -> Self {
        Self {
            ratio: Some(params.ratio),
            ratio_fine: Some(params.ratio_fine),
            depth: Some(params.depth),
            depth_fine: Some(params.depth_fine),
            tuning_offset: Some(params.tuning_offset),
            phase: Some(params.phase),
            freq_env: Some(EnvelopePreset::from_parameters(&params.freq_env)),
            amp_env: Some(EnvelopePreset::from_parameters(&params.amp_env)),
            freq_delay: Some(params.freq_delay),
            amp_delay: Some(params.amp_delay),
            freq_ramp: Some(RampPreset::from_parameters(&params.freq_ramp)),
            amp_ramp: Some(RampPreset::from_parameters(&params.amp_ramp)),
            feedback: Some(FeedbackPreset::from_parameters(&params.feedback)),
            delay: Some(DelayPreset::from_parameters(&params.delay)),
            pan_lfo: Some(PanLfoPreset::from_parameters(&params.pan_lfo)),
        }
    }

    /// Overlay all present values onto the given parameters.
    pub fn apply_to(&self, params: &mut OperatorParameters) {
        apply(&mut params.ratio, self.ratio);
        apply(&mut params.ratio_fine, self.ratio_fine);
        apply(&mut params.depth, self.depth);
        apply(&mut params.depth_fine, self.depth_fine);
        apply(&mut params.tuning_offset, self.tuning_offset);
        apply(&mut params.phase, self.phase);
        if let Some(env) = &self.freq_env {
            env.apply_to(&mut params.freq_env);
        }
        if let Some(env) = &self.amp_env {
            env.apply_to(&mut params.amp_env);
        }
        apply(&mut params.freq_delay, self.freq_delay);
        apply(&mut params.amp_delay, self.amp_delay);
        if let Some(ramp) = &self.freq_ramp {
            ramp.apply_to(&mut params.freq_ramp);
        }
        if let Some(ramp) = &self.amp_ramp {
            ramp.apply_to(&mut params.amp_ramp);
        }
        if let Some(feedback) = &self.feedback {
            feedback.apply_to(&mut params.feedback);
        }
        if let Some(delay) = &self.delay {
            delay.apply_to(&mut params.delay);
        }
        if let Some(pan_lfo) = &self.pan_lfo {
            pan_lfo.apply_to(&mut params.pan_lfo);
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub topology: Option<ChainTopology>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub amplitude_scaling: Option<AmplitudeScaling>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub operator_emphasis: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub carrier_coupling: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub depth_coupling: Option<bool>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub modulation_gain: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pan: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub attack: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub release: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub lookahead: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub knee: Option<f32>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicePreset {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pitch_bend_range: Option<f32>,
}

// -------------------------------------------------------------------------------------------------

/// A complete or partial synth preset.
///
/// Operators are keyed by their slot names: `op1`, `op2`, ... and `carrier`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub operators: BTreeMap<String, OperatorPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputPreset>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoicePreset>,
}

impl Preset {
    /// Create a complete preset from the given parameters.
    pub fn from_parameters(params: &SynthParameters) -> Self {
        let operators = params
            .slots()
            .filter_map(|slot| {
                let operator = params.operator(slot)?;
                Some((slot.to_string(), OperatorPreset::from_parameters(operator)))
            })
            .collect();
        let chain = ChainPreset {
            topology: Some(params.chain.topology),
            amplitude_scaling: Some(params.chain.amplitude_scaling),
            operator_emphasis: Some(params.chain.operator_emphasis),
            carrier_coupling: Some(params.chain.carrier_coupling),
            depth_coupling: Some(params.chain.depth_coupling),
            modulation_gain: Some(params.chain.modulation_gain),
        };
        let output = OutputPreset {
            pan: Some(params.output.pan),
            threshold: Some(params.output.threshold),
            ratio: Some(params.output.ratio),
            attack: Some(params.output.attack),
            release: Some(params.output.release),
            lookahead: Some(params.output.lookahead),
            knee: Some(params.output.knee),
            gain: Some(params.output.gain),
        };
        let voice = VoicePreset {
            pitch_bend_range: Some(params.voice.pitch_bend_range),
        };
        Self {
            operators,
            chain: Some(chain),
            output: Some(output),
            voice: Some(voice),
        }
    }

    /// Convert the preset to parameters for the given number of modulator operators. Missing
    /// values use the slot defaults. Values are not clamped here: apply presets via
    /// [`ParameterStore::set_all`](crate::parameters::ParameterStore::set_all) to do so.
    pub fn to_parameters(&self, operator_count: usize) -> SynthParameters {
        let mut params = SynthParameters::with_operator_count(operator_count);
        for (name, operator) in &self.operators {
            match name.parse::<OperatorSlot>() {
                Ok(slot) => match params.operator_mut(slot) {
                    Some(target) => operator.apply_to(target),
                    None => log::warn!("Ignoring preset operator '{name}': no such slot"),
                },
                Err(_) => log::warn!("Ignoring unknown preset operator '{name}'"),
            }
        }
        if let Some(chain) = &self.chain {
            apply(&mut params.chain.topology, chain.topology);
            apply(&mut params.chain.amplitude_scaling, chain.amplitude_scaling);
            apply(&mut params.chain.operator_emphasis, chain.operator_emphasis);
            apply(&mut params.chain.carrier_coupling, chain.carrier_coupling);
            apply(&mut params.chain.depth_coupling, chain.depth_coupling);
            apply(&mut params.chain.modulation_gain, chain.modulation_gain);
        }
        if let Some(output) = &self.output {
            apply(&mut params.output.pan, output.pan);
            apply(&mut params.output.threshold, output.threshold);
            apply(&mut params.output.ratio, output.ratio);
            apply(&mut params.output.attack, output.attack);
            apply(&mut params.output.release, output.release);
            apply(&mut params.output.lookahead, output.lookahead);
            apply(&mut params.output.knee, output.knee);
            apply(&mut params.output.gain, output.gain);
        }
        if let Some(voice) = &self.voice {
            apply(&mut params.voice.pitch_bend_range, voice.pitch_bend_range);
        }
        params
    }

    /// Parse a preset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the preset into a pretty printed JSON string.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a preset from the given JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load a preset from the given JSON file, falling back to an empty preset (which results
    /// in default parameters) when the file does not exist or can't be parsed. Meant for
    /// startup, when there are no parameters to keep yet.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No preset found at '{}'. Using defaults...", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(preset) => {
                log::info!("Loaded preset '{}'", path.display());
                preset
            }
            Err(err) => {
                log::error!(
                    "Failed to load preset '{}': {err}. Using defaults...",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Write the preset to the given JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).inspect_err(|err| {
            log::error!("Failed to save preset '{}': {err}", path.display());
        })?;
        log::info!("Saved preset '{}'", path.display());
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterStore;

    #[test]
    fn round_trip() -> Result<(), Box<Error>> {
        let mut store = ParameterStore::new(6);
        store.set("op1.ratio", 7.25)?;
        store.set("op2.freq_ramp.start", -3.5)?;
        store.set("op3.delay.enabled", 1.0)?;
        store.set("op3.delay.time2", 0.123)?;
        store.set("op4.pan_lfo.waveform", 2.0)?;
        store.set("carrier.feedback.amount", 0.66)?;
        store.set("chain.topology", 1.0)?;
        store.set("output.gain", 0.42)?;

        let json = store.get_all().to_json()?;
        let mut other = ParameterStore::new(6);
        other.set_all(&Preset::from_json(&json)?);
        assert_eq!(other.parameters(), store.parameters());
        assert_eq!(other.get_all(), store.get_all());
        Ok(())
    }

    #[test]
    fn partial_presets() -> Result<(), Box<Error>> {
        let json = r#"{
            "operators": {
                "op2": { "ratio": 4.0, "amp_env": { "sustain": 0.25 } },
                "carrier": { "delay": { "enabled": true } }
            },
            "chain": { "modulation_gain": 2.0 }
        }"#;
        let mut store = ParameterStore::new(6);
        store.set_all(&Preset::from_json(json)?);

        assert_eq!(store.get("op2.ratio")?, 4.0);
        assert_eq!(store.get("op2.amp_env.sustain")?, 0.25);
        // missing leaves use slot defaults
        assert_eq!(store.get("op2.depth")?, 2.5);
        assert_eq!(store.get("op2.amp_env.attack")?, 0.01);
        assert_eq!(store.get("op1.ratio")?, 3.0);
        assert_eq!(store.get("carrier.amp_env.mul")?, 0.15);
        assert_eq!(store.get("carrier.delay.enabled")?, 1.0);
        assert_eq!(store.get("chain.modulation_gain")?, 2.0);
        assert_eq!(store.get("chain.carrier_coupling")?, 2.0);

        let empty = Preset::from_json("{}")?;
        assert_eq!(empty.to_parameters(6), SynthParameters::default());
        Ok(())
    }

    #[test]
    fn malformed_presets() -> Result<(), Box<Error>> {
        let json = r#"{
            "operators": {
                "op1": { "ratio": "fast", "depth": 2.0, "freq_ramp": 12 },
                "op9": { "ratio": 2.0 },
                "bogus": { "ratio": 2.0 }
            },
            "chain": { "topology": "Sideways", "operator_emphasis": 1.0 },
            "output": [1, 2, 3]
        }"#;
        let mut store = ParameterStore::new(6);
        store.set_all(&Preset::from_json(json)?);
        assert_eq!(store.get("op1.ratio")?, 3.0);
        assert_eq!(store.get("op1.depth")?, 2.0);
        assert_eq!(store.get("op1.freq_ramp.start")?, 0.0);
        assert_eq!(store.get("chain.topology")?, 0.0);
        assert_eq!(store.get("chain.operator_emphasis")?, 1.0);
        assert_eq!(store.get("output.gain")?, 0.6);

        // out of range values get clamped
        let json = r#"{ "operators": { "op1": { "depth": 100.0 } } }"#;
        store.set_all(&Preset::from_json(json)?);
        assert_eq!(store.get("op1.depth")?, 15.0);

        assert!(Preset::from_json("not json").is_err());
        Ok(())
    }

    #[test]
    fn files() -> Result<(), Box<Error>> {
        let path = std::env::temp_dir().join(format!("fmchain-preset-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);
        assert_eq!(Preset::load_or_default(&path), Preset::default());

        let mut params = SynthParameters::with_operator_count(2);
        params.operators[1].tuning_offset = 12.5;
        let preset = Preset::from_parameters(&params);
        preset.save(&path)?;
        assert_eq!(Preset::load_or_default(&path), preset);

        fs::write(&path, "{ broken").map_err(Error::from)?;
        assert_eq!(Preset::load_or_default(&path), Preset::default());
        fs::remove_file(&path).map_err(Error::from)?;
        Ok(())
    }
}
