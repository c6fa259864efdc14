use std::{
    path::Path,
    sync::{Arc, PoisonError},
};

use basedrop::{Collector, Owned};
use crossbeam_queue::ArrayQueue;

use crate::{
    control::ControlMessage,
    event::{EventSource, MidiEvent},
    operator::OperatorSlot,
    parameters::{ParameterHandle, ParameterStore},
    preset::Preset,
    source::synth::{FmSynthSource, SynthMessage},
    voice::{VoiceAction, VoiceController},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Options to create a [`FmSynth`].
#[derive(Debug, Clone, Copy)]
pub struct SynthConfig {
    /// Output sample rate of the synth's source.
    pub sample_rate: u32,
    /// Output channel layout of the synth's source. By default 2.
    pub channel_count: usize,
    /// Number of modulator operators in the chain. By default 6.
    pub operator_count: usize,
    /// Max number of pending control messages. By default 256.
    pub message_queue_size: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channel_count: 2,
            operator_count: 6,
            message_queue_size: 256,
        }
    }
}

impl SynthConfig {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
    pub fn channel_count(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }
    pub fn operator_count(mut self, operator_count: usize) -> Self {
        self.operator_count = operator_count;
        self
    }
    pub fn message_queue_size(mut self, message_queue_size: usize) -> Self {
        self.message_queue_size = message_queue_size;
        self
    }

    /// Validate all options. Returns Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if !(8000..=384000).contains(&self.sample_rate) {
            return Err(Error::ParameterError(format!(
                "synth config 'sample_rate' value is '{}'",
                self.sample_rate
            )));
        }
        if self.channel_count == 0 {
            return Err(Error::ParameterError(
                "synth config 'channel_count' must be > 0".to_string(),
            ));
        }
        if self.message_queue_size < 4 {
            return Err(Error::ParameterError(format!(
                "synth config 'message_queue_size' value is '{}', but must be >= 4",
                self.message_queue_size
            )));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// The control side of a monophonic FM synth.
///
/// Owns the voice controller and publishes note events and parameter snapshots to the
/// synth's [`FmSynthSource`], which runs in the audio thread. All functions are meant to be
/// called from a single control thread. Parameters are shared via a [`ParameterHandle`], so
/// other threads may change them: call [`FmSynth::tick`] regularly to publish such changes
/// and to reclaim dropped snapshots.
pub struct FmSynth {
    config: SynthConfig,
    parameters: ParameterHandle,
    voice: VoiceController,
    message_queue: Arc<ArrayQueue<SynthMessage>>,
    collector: Collector,
    published_generation: u64,
}

impl FmSynth {
    /// Create a new synth with default parameters and its audio source.
    pub fn new(config: SynthConfig) -> Result<(Self, FmSynthSource), Error> {
        let parameters = ParameterStore::new(config.operator_count).into_handle();
        Self::with_parameters(config, parameters)
    }

    /// Create a new synth, which uses the given shared parameter store, and its audio
    /// source. The chain's operator count is taken from the store.
    pub fn with_parameters(
        config: SynthConfig,
        parameters: ParameterHandle,
    ) -> Result<(Self, FmSynthSource), Error> {
        let (snapshot, generation) = {
            let store = parameters.lock().unwrap_or_else(PoisonError::into_inner);
            (store.snapshot(), store.generation())
        };
        let config = SynthConfig {
            operator_count: snapshot.operators.len(),
            ..config
        };
        config.validate()?;

        let message_queue = Arc::new(ArrayQueue::new(config.message_queue_size));
        let source = FmSynthSource::new(
            config.sample_rate,
            config.channel_count,
            &snapshot,
            Arc::clone(&message_queue),
        )?;
        let voice = VoiceController::new(snapshot.voice.pitch_bend_range);
        log::info!(
            "Created FM synth with {} operators at {} Hz",
            config.operator_count,
            config.sample_rate
        );

        let synth = Self {
            config,
            parameters,
            voice,
            message_queue,
            collector: Collector::new(),
            published_generation: generation,
        };
        Ok((synth, source))
    }

    /// The synth's validated configuration.
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Shared access to the synth's parameter store.
    pub fn parameters(&self) -> ParameterHandle {
        Arc::clone(&self.parameters)
    }

    /// The synth's voice state.
    pub fn voice(&self) -> &VoiceController {
        &self.voice
    }

    /// Number of messages the audio source did not yet consume.
    pub fn pending_messages(&self) -> usize {
        self.message_queue.len()
    }

    /// Publish pending parameter changes and reclaim snapshots the audio source dropped.
    pub fn tick(&mut self) -> Result<(), Error> {
        let result = self.publish_parameters();
        self.collector.collect();
        result
    }

    /// Handle a single note or controller event. The voice state only changes when the
    /// resulting message got queued for the audio source.
    pub fn handle_event(&mut self, event: &MidiEvent) -> Result<(), Error> {
        let mut voice = self.voice.clone();
        if let Some(action) = voice.handle_event(event) {
            self.apply_voice_action(action)?;
        }
        // publishing may have changed the bend range
        voice.set_pitch_bend_range(self.voice.pitch_bend_range());
        self.voice = voice;
        Ok(())
    }

    /// Press a note.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Result<(), Error> {
        self.handle_event(&MidiEvent::NoteOn { note, velocity })
    }

    /// Release a note.
    pub fn note_off(&mut self, note: u8) -> Result<(), Error> {
        self.handle_event(&MidiEvent::NoteOff { note })
    }

    /// Handle all pending events of the given source without blocking. Returns the number of
    /// handled events.
    pub fn process_events(&mut self, source: &mut dyn EventSource) -> Result<usize, Error> {
        let mut count = 0;
        while let Some(event) = source.try_next() {
            self.handle_event(&event)?;
            count += 1;
        }
        Ok(count)
    }

    /// Play a note at the given frequency, bypassing the voice controller. Velocity is
    /// normalized.
    pub fn play_frequency(&mut self, frequency: f32, velocity: f32) -> Result<(), Error> {
        self.publish_parameters()?;
        log::debug!("Playing {frequency} Hz with velocity {velocity}");
        self.send(SynthMessage::NoteOn {
            pitch: frequency.max(0.0),
            velocity: velocity.clamp(0.0, 1.0),
        })
    }

    /// Release the sounding note and forget all held notes.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.send(SynthMessage::NoteOff)?;
        self.voice.all_notes_off();
        Ok(())
    }

    /// Immediately silence the synth and forget all held notes.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.send(SynthMessage::Reset)?;
        self.voice.all_notes_off();
        Ok(())
    }

    /// Apply a message from a remote controller.
    pub fn apply_control_message(&mut self, message: &ControlMessage) -> Result<(), Error> {
        match *message {
            ControlMessage::Note { freq, velocity } => {
                if freq > 0.0 {
                    self.play_frequency(freq, velocity)
                } else {
                    self.stop()
                }
            }
            ControlMessage::Touch { value } => {
                self.send(SynthMessage::Aftertouch(value.clamp(0.0, 1.0)))
            }
            ControlMessage::Adsr {
                attack,
                decay,
                sustain,
                release,
            } => {
                self.parameters
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_adsr(OperatorSlot::Carrier, attack, decay, sustain, release)?;
                self.publish_parameters()
            }
        }
    }

    /// Load the preset at the given path into the parameter store. A missing file keeps the
    /// current parameters. Unreadable or broken files are reported as
    /// [`Error::PresetError`] and keep the current parameters too.
    pub fn load_preset(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!(
                "No preset found at '{}'. Keeping current parameters...",
                path.display()
            );
            return Ok(());
        }
        let preset = Preset::load(path).map_err(|err| {
            log::error!("Failed to load preset '{}': {err}", path.display());
            match err {
                Error::IoError(err) => Error::PresetError(Box::new(err)),
                err => err,
            }
        })?;
        log::info!("Loaded preset '{}'", path.display());
        self.parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_all(&preset);
        self.publish_parameters()
    }

    /// Save the current parameters as preset to the given path.
    pub fn save_preset(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let preset = self
            .parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_all();
        preset.save(path)
    }

    fn apply_voice_action(&mut self, action: VoiceAction) -> Result<(), Error> {
        match action {
            VoiceAction::Play {
                pitch, velocity, ..
            } => {
                // note-ons always use the latest parameters
                self.publish_parameters()?;
                self.send(SynthMessage::NoteOn { pitch, velocity })
            }
            VoiceAction::Stop => self.send(SynthMessage::NoteOff),
            VoiceAction::Aftertouch(value) => self.send(SynthMessage::Aftertouch(value)),
            VoiceAction::PitchBend(factor) => self.send(SynthMessage::PitchBend(factor)),
        }
    }

    fn publish_parameters(&mut self) -> Result<(), Error> {
        let (snapshot, generation) = {
            let store = self
                .parameters
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if store.generation() == self.published_generation {
                return Ok(());
            }
            (store.snapshot(), store.generation())
        };
        self.voice
            .set_pitch_bend_range(snapshot.voice.pitch_bend_range);
        let snapshot = Owned::new(&self.collector.handle(), snapshot);
        self.send(SynthMessage::Parameters(snapshot))?;
        log::debug!("Published parameters generation {generation}");
        self.published_generation = generation;
        Ok(())
    }

    fn send(&self, message: SynthMessage) -> Result<(), Error> {
        self.message_queue.push(message).map_err(|_| {
            log::warn!("Synth message queue is full. Dropping message...");
            Error::SendError("synth message queue is full".to_string())
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::ChannelEventSource,
        source::{Source, SourceTime},
        utils::{assert_eq_with_epsilon, db_to_linear, pitch_from_note},
    };

    const SAMPLE_RATE: u32 = 44100;

    fn render(source: &mut FmSynthSource, frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames * source.channel_count()];
        let written = source.write(&mut buffer, &SourceTime::new());
        assert_eq!(written, buffer.len());
        buffer
    }

    #[test]
    fn config() {
        assert!(SynthConfig::default().validate().is_ok());
        assert!(SynthConfig::default().sample_rate(0).validate().is_err());
        assert!(SynthConfig::default().channel_count(0).validate().is_err());
        assert!(SynthConfig::default()
            .message_queue_size(1)
            .validate()
            .is_err());
        assert!(FmSynth::new(SynthConfig::default().sample_rate(1)).is_err());
    }

    #[test]
    fn silence_when_idle() -> Result<(), Box<Error>> {
        let (_synth, mut source) = FmSynth::new(SynthConfig::default())?;
        let buffer = render(&mut source, 1024);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert!(!source.is_exhausted());
        Ok(())
    }

    #[test]
    fn last_note_priority() -> Result<(), Box<Error>> {
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default())?;
        synth.note_on(60, 100)?;
        synth.note_on(64, 100)?;
        synth.note_off(64)?;
        let buffer = render(&mut source, 2048);

        assert_eq!(synth.voice().sounding_note(), Some(60));
        assert_eq_with_epsilon!(source.signals().pitch, pitch_from_note(60), 1e-3);
        assert_eq_with_epsilon!(source.signals().velocity, 100.0 / 127.0, 1e-6);
        assert!(source.chain().is_active());
        assert!(buffer.iter().any(|s| *s != 0.0));
        Ok(())
    }

    #[test]
    fn output_ceiling() -> Result<(), Box<Error>> {
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default())?;
        synth
            .parameters()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set("carrier.amp_env.mul", 1.0)?;
        synth.note_on(69, 127)?;
        let ceiling = source.output_stage().ceiling();
        let buffer = render(&mut source, SAMPLE_RATE as usize);
        assert!(buffer.iter().all(|s| s.abs() <= ceiling + 1e-6));
        assert_eq_with_epsilon!(ceiling, db_to_linear(-18.0) * 0.6, 1e-6);
        Ok(())
    }

    #[test]
    fn parameter_publishing() -> Result<(), Box<Error>> {
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default().operator_count(2))?;
        let parameters = synth.parameters();
        parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set("op2.ratio", 4.5)?;
        // not yet published
        render(&mut source, 64);
        assert_eq!(source.chain().operators()[1].parameters().ratio, 1.0);

        synth.tick()?;
        assert_eq!(synth.pending_messages(), 1);
        // nothing changed: nothing to publish
        synth.tick()?;
        assert_eq!(synth.pending_messages(), 1);

        render(&mut source, 64);
        assert_eq!(synth.pending_messages(), 0);
        assert_eq!(source.chain().operators()[1].parameters().ratio, 4.5);

        // note-ons publish pending changes first
        parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set("op1.ratio", 0.5)?;
        synth.note_on(60, 100)?;
        assert_eq!(synth.pending_messages(), 2);
        render(&mut source, 64);
        assert_eq!(source.chain().operators()[0].parameters().ratio, 0.5);
        synth.tick()?;
        Ok(())
    }

    #[test]
    fn queue_overflow() -> Result<(), Box<Error>> {
        let config = SynthConfig::default().message_queue_size(4);
        let (mut synth, mut source) = FmSynth::new(config)?;
        for note in 0..4 {
            synth.note_on(60 + note, 100)?;
        }
        assert!(matches!(
            synth.note_on(70, 100),
            Err(Error::SendError(_))
        ));
        render(&mut source, 16);
        assert!(synth.note_on(70, 100).is_ok());
        Ok(())
    }

    #[test]
    fn events_and_pitch_bend() -> Result<(), Box<Error>> {
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default())?;
        let (sender, mut events) = ChannelEventSource::new("Test");
        sender
            .send(MidiEvent::NoteOn { note: 69, velocity: 127 })
            .map_err(Error::from)?;
        sender
            .send(MidiEvent::PitchBend { value: 8191 })
            .map_err(Error::from)?;
        sender
            .send(MidiEvent::ChannelAftertouch { value: 127 })
            .map_err(Error::from)?;
        assert_eq!(synth.process_events(&mut events)?, 3);

        render(&mut source, 64);
        let bent = 440.0 * 2.0f32.powf(8191.0 / 8192.0 * 2.0 / 12.0);
        assert_eq_with_epsilon!(source.signals().pitch, bent, 1e-2);
        assert_eq!(source.signals().aftertouch, 1.0);

        // pitch bend range changes apply to following bends
        synth
            .parameters()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set("voice.pitch_bend_range", 12.0)?;
        synth.tick()?;
        synth.handle_event(&MidiEvent::PitchBend { value: -8192 })?;
        render(&mut source, 64);
        assert_eq_with_epsilon!(source.signals().pitch, 220.0, 1e-2);
        Ok(())
    }

    #[test]
    fn control_messages() -> Result<(), Box<Error>> {
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default())?;
        synth.apply_control_message(&ControlMessage::Note {
            freq: 330.0,
            velocity: 0.5,
        })?;
        synth.apply_control_message(&ControlMessage::Touch { value: 2.0 })?;
        synth.apply_control_message(&ControlMessage::Adsr {
            attack: 0.2,
            decay: 0.3,
            sustain: 0.4,
            release: 0.05,
        })?;
        render(&mut source, 64);
        assert_eq!(source.signals().pitch, 330.0);
        assert_eq!(source.signals().velocity, 0.5);
        assert_eq!(source.signals().aftertouch, 1.0);
        let envelope = source.chain().carrier().parameters().amp_env;
        assert_eq!(
            (envelope.attack, envelope.decay, envelope.sustain, envelope.release),
            (0.2, 0.3, 0.4, 0.05)
        );

        synth.apply_control_message(&ControlMessage::Note {
            freq: 0.0,
            velocity: 0.0,
        })?;
        // release is 50 ms
        render(&mut source, SAMPLE_RATE as usize / 2);
        assert!(!source.chain().is_active());
        Ok(())
    }

    #[test]
    fn mono_output() -> Result<(), Box<Error>> {
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default().channel_count(1))?;
        synth.note_on(57, 100)?;
        let buffer = render(&mut source, 1000);
        assert_eq!(buffer.len(), 1000);
        assert!(buffer.iter().any(|s| *s != 0.0));
        Ok(())
    }

    #[test]
    fn presets() -> Result<(), Box<Error>> {
        let path = std::env::temp_dir().join("fmchain-synth-preset.json");
        let (mut synth, mut source) = FmSynth::new(SynthConfig::default())?;
        synth
            .parameters()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set("op1.depth", 7.0)?;
        synth.save_preset(&path)?;

        let (mut other, _) = FmSynth::new(SynthConfig::default())?;
        other.load_preset(&path)?;
        let depth = other
            .parameters()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get("op1.depth")?;
        assert_eq!(depth, 7.0);
        std::fs::remove_file(&path).map_err(Error::from)?;

        // missing files keep the current parameters
        synth.load_preset(&path)?;
        synth.tick()?;
        render(&mut source, 16);
        assert_eq!(source.chain().operators()[0].parameters().depth, 7.0);
        Ok(())
    }

    #[test]
    fn broken_presets() -> Result<(), Box<Error>> {
        let path = std::env::temp_dir().join("fmchain-synth-broken-preset.json");
        std::fs::write(&path, "{ broken").map_err(Error::from)?;

        let (mut synth, mut source) = FmSynth::new(SynthConfig::default())?;
        let parameters = synth.parameters();
        parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set("op1.depth", 7.0)?;
        let generation = parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation();

        let result = synth.load_preset(&path);
        std::fs::remove_file(&path).map_err(Error::from)?;
        assert!(matches!(result, Err(Error::PresetError(_))));

        let store = parameters.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(store.get("op1.depth")?, 7.0);
        assert_eq!(store.generation(), generation);
        drop(store);

        synth.tick()?;
        render(&mut source, 16);
        assert_eq!(source.chain().operators()[0].parameters().depth, 7.0);
        Ok(())
    }

    #[test]
    fn failed_sends_keep_voice_state() -> Result<(), Box<Error>> {
        let config = SynthConfig::default().message_queue_size(4);
        let (mut synth, mut source) = FmSynth::new(config)?;
        synth.note_on(60, 100)?;
        for value in [10, 20, 30] {
            synth.handle_event(&MidiEvent::ChannelAftertouch { value })?;
        }
        assert_eq!(synth.pending_messages(), 4);

        // the release got dropped: the note still sounds
        assert!(matches!(synth.note_off(60), Err(Error::SendError(_))));
        assert_eq!(synth.voice().sounding_note(), Some(60));
        assert_eq!(synth.voice().held_notes(), [60]);

        // so retrying the release works
        render(&mut source, 16);
        synth.note_off(60)?;
        assert_eq!(synth.pending_messages(), 1);
        assert_eq!(synth.voice().sounding_note(), None);
        render(&mut source, SAMPLE_RATE as usize * 3);
        assert!(!source.chain().is_active());

        // same for stops
        synth.note_on(62, 100)?;
        for value in [10, 20, 30] {
            synth.handle_event(&MidiEvent::ChannelAftertouch { value })?;
        }
        assert!(synth.stop().is_err());
        assert_eq!(synth.voice().sounding_note(), Some(62));
        Ok(())
    }
}
