use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{operator::OperatorSlot, preset::Preset, Error};

use super::{
    registry::{build_leaves, ParameterLeaf},
    SynthParameters,
};

// -------------------------------------------------------------------------------------------------

/// Shared, serialized access to a [`ParameterStore`] from multiple control-rate writers, such as
/// GUIs, preset loaders or network control channels.
pub type ParameterHandle = Arc<Mutex<ParameterStore>>;

// -------------------------------------------------------------------------------------------------

/// Addressable store of all synth parameters.
///
/// Each parameter is a [`ParameterLeaf`] with a dotted path, e.g. `op2.freq_ramp.time` or
/// `carrier.amp_env.sustain`. Values written into the store get clamped into the leaf's range.
/// Every write bumps the store's generation counter, which the synth uses to detect and
/// publish changes to the audio thread.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    parameters: SynthParameters,
    defaults: SynthParameters,
    leaves: Vec<ParameterLeaf>,
    leaf_indices: HashMap<String, usize>,
    generation: u64,
}

impl ParameterStore {
    /// Create a new store with slot defaults for the given number of modulator operators.
    pub fn new(operator_count: usize) -> Self {
        let defaults = SynthParameters::with_operator_count(operator_count);
        let leaves = build_leaves(defaults.slots());
        let leaf_indices = leaves
            .iter()
            .enumerate()
            .map(|(index, leaf)| (leaf.path().to_string(), index))
            .collect();
        Self {
            parameters: defaults.clone(),
            defaults,
            leaves,
            leaf_indices,
            generation: 0,
        }
    }

    /// Wrap the store into a shareable [`ParameterHandle`].
    pub fn into_handle(self) -> ParameterHandle {
        Arc::new(Mutex::new(self))
    }

    /// Number of modulator operators in the store.
    pub fn operator_count(&self) -> usize {
        self.parameters.operators.len()
    }

    /// Current parameter values.
    pub fn parameters(&self) -> &SynthParameters {
        &self.parameters
    }

    /// Copy of the current parameter values.
    pub fn snapshot(&self) -> SynthParameters {
        self.parameters.clone()
    }

    /// Change counter, incremented with every write.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// All parameter leaves: operator leaves in slot order, then global leaves.
    pub fn leaves(&self) -> &[ParameterLeaf] {
        &self.leaves
    }

    /// Look up a parameter leaf by path.
    pub fn leaf(&self, path: &str) -> Result<&ParameterLeaf, Error> {
        self.leaf_indices
            .get(path)
            .map(|index| &self.leaves[*index])
            .ok_or_else(|| Error::ParameterError(format!("Unknown parameter path '{path}'")))
    }

    /// Current plain value of the given parameter.
    pub fn get(&self, path: &str) -> Result<f32, Error> {
        Ok(self.leaf(path)?.get(&self.parameters))
    }

    /// Current value of the given parameter in range `[0, 1]`.
    pub fn get_normalized(&self, path: &str) -> Result<f32, Error> {
        let leaf = self.leaf(path)?;
        Ok(leaf.descriptor().normalize_value(leaf.get(&self.parameters)))
    }

    /// Current value of the given parameter as display string, including its unit.
    pub fn value_string(&self, path: &str) -> Result<String, Error> {
        let leaf = self.leaf(path)?;
        let include_unit = true;
        Ok(leaf
            .descriptor()
            .value_to_string(leaf.get(&self.parameters), include_unit))
    }

    /// Default value of the given parameter for its operator slot.
    pub fn default_value(&self, path: &str) -> Result<f32, Error> {
        Ok(self.leaf(path)?.get(&self.defaults))
    }

    /// Set a parameter's plain value. Out of range values get clamped, not rejected.
    /// Returns the applied value.
    pub fn set(&mut self, path: &str, value: f32) -> Result<f32, Error> {
        let index = *self
            .leaf_indices
            .get(path)
            .ok_or_else(|| Error::ParameterError(format!("Unknown parameter path '{path}'")))?;
        let leaf = &self.leaves[index];
        let clamped = leaf.descriptor().clamp_value(value);
        if clamped != value {
            log::warn!("Clamped value {value} of parameter '{path}' to {clamped}");
        }
        leaf.set(&mut self.parameters, clamped);
        self.generation += 1;
        Ok(clamped)
    }

    /// Set a parameter's value from a normalized value in range `[0, 1]`.
    pub fn set_normalized(&mut self, path: &str, normalized: f32) -> Result<f32, Error> {
        let value = self.leaf(path)?.descriptor().denormalize_value(normalized);
        self.set(path, value)
    }

    /// Set a parameter's value from a display string.
    pub fn set_string(&mut self, path: &str, string: &str) -> Result<f32, Error> {
        let value = self
            .leaf(path)?
            .descriptor()
            .string_to_value(string)
            .ok_or_else(|| {
                Error::ParameterError(format!("Invalid value '{string}' for parameter '{path}'"))
            })?;
        self.set(path, value)
    }

    /// Reset a single parameter to its slot default.
    pub fn reset(&mut self, path: &str) -> Result<f32, Error> {
        let value = self.default_value(path)?;
        self.set(path, value)
    }

    /// Reset all parameters to their slot defaults.
    pub fn reset_all(&mut self) {
        self.parameters = self.defaults.clone();
        self.generation += 1;
    }

    /// Set attack, decay, sustain and release of an operator's amplitude envelope.
    pub fn set_adsr(
        &mut self,
        slot: OperatorSlot,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    ) -> Result<(), Error> {
        self.set(&format!("{slot}.amp_env.attack"), attack)?;
        self.set(&format!("{slot}.amp_env.decay"), decay)?;
        self.set(&format!("{slot}.amp_env.sustain"), sustain)?;
        self.set(&format!("{slot}.amp_env.release"), release)?;
        Ok(())
    }

    /// Replace all values with the given typed parameters, clamping every leaf into its range.
    /// Operators beyond the store's operator count are ignored; missing ones use slot defaults.
    pub fn replace(&mut self, mut parameters: SynthParameters) {
        if parameters.operators.len() != self.operator_count() {
            log::warn!(
                "Got parameters for {} operators, but the store has {}",
                parameters.operators.len(),
                self.operator_count()
            );
            let count = self.operator_count();
            parameters.operators.truncate(count);
            let missing = self.defaults.operators[parameters.operators.len()..].to_vec();
            parameters.operators.extend(missing);
        }
        for leaf in &self.leaves {
            let value = leaf.get(&parameters);
            let clamped = leaf.descriptor().clamp_value(value);
            if clamped != value {
                log::warn!(
                    "Clamped value {value} of parameter '{}' to {clamped}",
                    leaf.path()
                );
                leaf.set(&mut parameters, clamped);
            }
        }
        self.parameters = parameters;
        self.generation += 1;
    }

    /// Export all values as preset document.
    pub fn get_all(&self) -> Preset {
        Preset::from_parameters(&self.parameters)
    }

    /// Apply a, possibly partial, preset document. Missing values use slot defaults.
    pub fn set_all(&mut self, preset: &Preset) {
        let parameters = preset.to_parameters(self.operator_count());
        self.replace(parameters);
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(SynthParameters::default().operators.len())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set() -> Result<(), Box<Error>> {
        let mut store = ParameterStore::new(6);
        assert_eq!(store.get("op1.ratio")?, 3.0);
        assert_eq!(store.get("carrier.amp_env.mul")?, 0.15);

        let generation = store.generation();
        assert_eq!(store.set("op1.ratio", 4.5)?, 4.5);
        assert_eq!(store.parameters().operators[0].ratio, 4.5);
        assert!(store.generation() > generation);

        // clamped, not rejected
        assert_eq!(store.set("op2.feedback.amount", 3.0)?, 1.0);
        assert_eq!(store.set("op2.delay.feedback", 1.5)?, 0.99);
        assert_eq!(store.set("op2.ratio", 0.0)?, 0.1);

        assert!(store.get("op7.ratio").is_err());
        assert!(store.set("chain.unknown", 1.0).is_err());
        Ok(())
    }

    #[test]
    fn normalized_and_strings() -> Result<(), Box<Error>> {
        let mut store = ParameterStore::new(2);
        store.set_normalized("op1.feedback.amount", 0.25)?;
        assert_eq!(store.get("op1.feedback.amount")?, 0.25);

        // logarithmic: the range's geometric mean sits at the center
        store.set_normalized("op1.ratio", 0.5)?;
        let ratio = store.get("op1.ratio")?;
        assert!((ratio - (0.1f32 * 20.0).sqrt()).abs() < 1e-3);
        assert!((store.get_normalized("op1.ratio")? - 0.5).abs() < 1e-4);

        store.set_string("op1.delay.enabled", "on")?;
        assert!(store.parameters().operators[0].delay.enabled);
        assert_eq!(store.value_string("op1.delay.enabled")?, "ON");
        store.set_string("chain.topology", "Reverse")?;
        assert_eq!(store.get("chain.topology")?, 1.0);
        assert!(store.set_string("chain.topology", "Sideways").is_err());
        Ok(())
    }

    #[test]
    fn slot_defaults() -> Result<(), Box<Error>> {
        let mut store = ParameterStore::new(6);
        assert_eq!(store.default_value("op5.ratio")?, 5.0);
        assert_eq!(store.default_value("op6.amp_ramp.end")?, 0.2);
        store.set("op5.ratio", 1.0)?;
        assert_eq!(store.reset("op5.ratio")?, 5.0);

        store.set("op3.depth", 9.0)?;
        store.reset_all();
        assert_eq!(store.get("op3.depth")?, 2.0);
        Ok(())
    }

    #[test]
    fn adsr() -> Result<(), Box<Error>> {
        let mut store = ParameterStore::new(1);
        store.set_adsr(OperatorSlot::Carrier, 0.2, 0.3, 1.5, 0.4)?;
        let env = store.parameters().carrier.amp_env;
        assert_eq!((env.attack, env.decay, env.sustain, env.release), (0.2, 0.3, 1.0, 0.4));
        Ok(())
    }

    #[test]
    fn replace_clamps_and_resizes() -> Result<(), Box<Error>> {
        let mut store = ParameterStore::new(3);
        let mut parameters = SynthParameters::with_operator_count(1);
        parameters.operators[0].ratio = 100.0;
        parameters.carrier.delay.feedback = -1.0;
        store.replace(parameters);
        assert_eq!(store.operator_count(), 3);
        assert_eq!(store.get("op1.ratio")?, 20.0);
        assert_eq!(store.get("carrier.delay.feedback")?, 0.0);
        assert_eq!(store.get("op3.ratio")?, 2.0);
        Ok(())
    }

    #[test]
    fn shared_handle() -> Result<(), Box<Error>> {
        let handle = ParameterStore::new(2).into_handle();
        let writer = {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || {
                let mut store = handle.lock().unwrap();
                store.set("op2.depth", 7.0).map(|_| ())
            })
        };
        writer.join().unwrap()?;
        assert_eq!(handle.lock().unwrap().get("op2.depth")?, 7.0);
        Ok(())
    }
}
