//! Monophonic, last-note priority voice control.

use crate::{
    event::MidiEvent,
    utils::{pitch_bend_factor, pitch_from_note},
};

// -------------------------------------------------------------------------------------------------

/// Velocity used when a held note gets re-triggered after the sounding note got released.
pub const DEFAULT_RETRIGGER_VELOCITY: u8 = 100;

// -------------------------------------------------------------------------------------------------

/// Voice transition, resulting from a [`MidiEvent`], to apply to the modulation chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceAction {
    /// (Re)start a note. `pitch` is in Hz without pitch bend, `velocity` in range `[0, 1]`.
    Play { note: u8, pitch: f32, velocity: f32 },
    /// Release the sounding note.
    Stop,
    /// New normalized aftertouch value.
    Aftertouch(f32),
    /// New pitch bend frequency factor.
    PitchBend(f32),
}

// -------------------------------------------------------------------------------------------------

/// Tracks held notes in press order and applies last-note priority: the most recently pressed
/// note sounds. Releasing the sounding note falls back to the most recent still held note,
/// which gets re-triggered with [`DEFAULT_RETRIGGER_VELOCITY`].
///
/// A pressed sustain pedal keeps the sounding note alive after all notes got released.
#[derive(Debug, Clone)]
pub struct VoiceController {
    held_notes: Vec<u8>,
    sounding: Option<u8>,
    sustain_pedal: bool,
    pitch_bend_range: f32,
    pitch_bend: f32,
}

impl VoiceController {
    pub fn new(pitch_bend_range: f32) -> Self {
        Self {
            held_notes: Vec::with_capacity(128),
            sounding: None,
            sustain_pedal: false,
            pitch_bend_range,
            pitch_bend: 0.0,
        }
    }

    /// Currently held notes, oldest first.
    pub fn held_notes(&self) -> &[u8] {
        &self.held_notes
    }

    /// The currently sounding note, if any.
    pub fn sounding_note(&self) -> Option<u8> {
        self.sounding
    }

    pub fn is_sustain_pedal_down(&self) -> bool {
        self.sustain_pedal
    }

    /// Current pitch bend in semitones.
    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    /// Pitch bend range in semitones.
    pub fn pitch_bend_range(&self) -> f32 {
        self.pitch_bend_range
    }
    pub fn set_pitch_bend_range(&mut self, semitones: f32) {
        self.pitch_bend_range = semitones.max(0.0);
    }

    /// Process a single event, returning the resulting voice transition, if any.
    pub fn handle_event(&mut self, event: &MidiEvent) -> Option<VoiceAction> {
        match *event {
            MidiEvent::NoteOn { note, velocity } => self.note_on(note, velocity),
            MidiEvent::NoteOff { note } => self.note_off(note),
            MidiEvent::PolyAftertouch { note, value } => self.poly_aftertouch(note, value),
            MidiEvent::ChannelAftertouch { value } => self.channel_aftertouch(value),
            MidiEvent::PitchBend { value } => Some(self.set_pitch_bend(value)),
            MidiEvent::ControlChange { controller, value } => {
                self.control_change(controller, value)
            }
        }
    }

    /// Press a note. A velocity of 0 releases the note instead.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Option<VoiceAction> {
        if velocity == 0 {
            return self.note_off(note);
        }
        let note = note.min(127);
        self.held_notes.retain(|held| *held != note);
        self.held_notes.push(note);
        self.sounding = Some(note);
        log::debug!("Note on {note} with velocity {velocity}");
        Some(Self::play_action(note, velocity))
    }

    /// Release a note. When other notes are still held, the most recently pressed one gets
    /// re-triggered, even when the released note was not the sounding one.
    pub fn note_off(&mut self, note: u8) -> Option<VoiceAction> {
        let was_held = self.held_notes.contains(&note);
        self.held_notes.retain(|held| *held != note);
        if !was_held && self.sounding != Some(note) {
            return None;
        }
        if let Some(&last) = self.held_notes.last() {
            log::debug!("Note off {note}: re-triggering held note {last}");
            self.sounding = Some(last);
            Some(Self::play_action(last, DEFAULT_RETRIGGER_VELOCITY))
        } else if self.sustain_pedal {
            log::debug!("Note off {note}: sustained");
            None
        } else {
            log::debug!("Note off {note}");
            self.sounding = None;
            Some(VoiceAction::Stop)
        }
    }

    /// Aftertouch of a single note. Only applies to the sounding note.
    pub fn poly_aftertouch(&mut self, note: u8, value: u8) -> Option<VoiceAction> {
        if self.sounding == Some(note) {
            Some(VoiceAction::Aftertouch(Self::normalize(value)))
        } else {
            None
        }
    }

    /// Channel aftertouch. Applies when any note sounds.
    pub fn channel_aftertouch(&mut self, value: u8) -> Option<VoiceAction> {
        if self.sounding.is_some() {
            Some(VoiceAction::Aftertouch(Self::normalize(value)))
        } else {
            None
        }
    }

    /// Set pitch bend from a 14-bit MIDI value in range `-8192..=8191`.
    pub fn set_pitch_bend(&mut self, value: i16) -> VoiceAction {
        let value = value.clamp(-8192, 8191);
        self.pitch_bend = value as f32 / 8192.0 * self.pitch_bend_range;
        VoiceAction::PitchBend(pitch_bend_factor(self.pitch_bend))
    }

    /// Press or release the sustain pedal. Releasing it stops a sustained note.
    pub fn set_sustain_pedal(&mut self, down: bool) -> Option<VoiceAction> {
        self.sustain_pedal = down;
        if !down && self.held_notes.is_empty() && self.sounding.is_some() {
            log::debug!("Sustain pedal up: releasing sustained note");
            self.sounding = None;
            Some(VoiceAction::Stop)
        } else {
            None
        }
    }

    /// Handle a control change. Handles the sustain pedal and all notes off only.
    pub fn control_change(&mut self, controller: u8, value: u8) -> Option<VoiceAction> {
        match controller {
            MidiEvent::SUSTAIN_PEDAL => self.set_sustain_pedal(value >= 64),
            MidiEvent::ALL_NOTES_OFF => self.all_notes_off(),
            _ => None,
        }
    }

    /// Forget all held notes and release the sounding note.
    pub fn all_notes_off(&mut self) -> Option<VoiceAction> {
        self.held_notes.clear();
        self.sounding.take().map(|_| VoiceAction::Stop)
    }

    fn play_action(note: u8, velocity: u8) -> VoiceAction {
        VoiceAction::Play {
            note,
            pitch: pitch_from_note(note),
            velocity: Self::normalize(velocity),
        }
    }

    fn normalize(value: u8) -> f32 {
        value.min(127) as f32 / 127.0
    }
}

impl Default for VoiceController {
    fn default() -> Self {
        Self::new(2.0)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    fn played_note(action: Option<VoiceAction>) -> Option<u8> {
        match action {
            Some(VoiceAction::Play { note, .. }) => Some(note),
            _ => None,
        }
    }

    #[test]
    fn last_note_priority() {
        let mut voice = VoiceController::default();
        assert_eq!(played_note(voice.note_on(60, 100)), Some(60));
        assert_eq!(played_note(voice.note_on(64, 100)), Some(64));
        let action = voice.note_off(64);
        assert_eq!(
            action,
            Some(VoiceAction::Play {
                note: 60,
                pitch: pitch_from_note(60),
                velocity: DEFAULT_RETRIGGER_VELOCITY as f32 / 127.0
            })
        );
        assert_eq!(voice.sounding_note(), Some(60));
        assert_eq!(voice.note_off(60), Some(VoiceAction::Stop));
        assert_eq!(voice.sounding_note(), None);
    }

    #[test]
    fn releasing_other_notes() {
        let mut voice = VoiceController::default();
        voice.note_on(60, 100);
        voice.note_on(64, 100);
        voice.note_on(67, 100);
        // releasing a held, not sounding note re-triggers the last held one
        let action = voice.note_off(60);
        assert_eq!(
            action,
            Some(VoiceAction::Play {
                note: 67,
                pitch: pitch_from_note(67),
                velocity: DEFAULT_RETRIGGER_VELOCITY as f32 / 127.0
            })
        );
        assert_eq!(voice.held_notes(), [64, 67]);
        assert_eq!(voice.sounding_note(), Some(67));
        assert_eq!(played_note(voice.note_off(67)), Some(64));
        // notes which are not held are ignored
        assert_eq!(voice.note_off(99), None);
        assert_eq!(voice.sounding_note(), Some(64));
    }

    #[test]
    fn repeated_notes() {
        let mut voice = VoiceController::default();
        voice.note_on(60, 100);
        voice.note_on(64, 100);
        voice.note_on(60, 90);
        assert_eq!(voice.held_notes(), [64, 60]);
        assert_eq!(played_note(voice.note_off(60)), Some(64));
    }

    #[test]
    fn zero_velocity_is_note_off() {
        let mut voice = VoiceController::default();
        voice.handle_event(&MidiEvent::NoteOn { note: 60, velocity: 100 });
        let action = voice.handle_event(&MidiEvent::NoteOn { note: 60, velocity: 0 });
        assert_eq!(action, Some(VoiceAction::Stop));
        assert!(voice.held_notes().is_empty());
    }

    #[test]
    fn sustain_pedal() {
        let mut voice = VoiceController::default();
        voice.note_on(60, 100);
        assert_eq!(voice.control_change(64, 127), None);
        assert!(voice.is_sustain_pedal_down());
        assert_eq!(voice.note_off(60), None);
        assert_eq!(voice.sounding_note(), Some(60));
        assert_eq!(voice.control_change(64, 0), Some(VoiceAction::Stop));
        assert_eq!(voice.sounding_note(), None);

        // pedal up while notes are held keeps them playing
        voice.note_on(62, 100);
        voice.set_sustain_pedal(true);
        assert_eq!(voice.set_sustain_pedal(false), None);
        assert_eq!(voice.sounding_note(), Some(62));
    }

    #[test]
    fn aftertouch_and_pitch_bend() {
        let mut voice = VoiceController::new(2.0);
        assert_eq!(voice.channel_aftertouch(64), None);
        voice.note_on(60, 100);
        assert_eq!(voice.poly_aftertouch(61, 127), None);
        assert_eq!(
            voice.poly_aftertouch(60, 127),
            Some(VoiceAction::Aftertouch(1.0))
        );
        assert_eq!(
            voice.handle_event(&MidiEvent::ChannelAftertouch { value: 0 }),
            Some(VoiceAction::Aftertouch(0.0))
        );

        match voice.handle_event(&MidiEvent::PitchBend { value: -8192 }) {
            Some(VoiceAction::PitchBend(factor)) => {
                assert_eq_with_epsilon!(factor, 2.0f32.powf(-2.0 / 12.0), 1e-6)
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(voice.pitch_bend(), -2.0);
        assert_eq!(voice.set_pitch_bend(0), VoiceAction::PitchBend(1.0));
    }

    #[test]
    fn all_notes_off() {
        let mut voice = VoiceController::default();
        voice.note_on(60, 100);
        voice.note_on(62, 100);
        assert_eq!(voice.control_change(123, 0), Some(VoiceAction::Stop));
        assert!(voice.held_notes().is_empty());
        assert_eq!(voice.control_change(123, 0), None);
        assert_eq!(voice.control_change(1, 64), None);
    }
}
