//! Note and controller events and the sources they come from.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// A MIDI-like channel voice event. Values use MIDI ranges: notes, velocities and controller
/// values are `0..=127`, pitch bend is `-8192..=8191`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Note on. A velocity of 0 is a note off.
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    PolyAftertouch { note: u8, value: u8 },
    ChannelAftertouch { value: u8 },
    PitchBend { value: i16 },
    ControlChange { controller: u8, value: u8 },
}

impl MidiEvent {
    /// Controller number of the sustain pedal.
    pub const SUSTAIN_PEDAL: u8 = 64;
    /// Controller number of the all notes off message.
    pub const ALL_NOTES_OFF: u8 = 123;
}

// -------------------------------------------------------------------------------------------------

/// A source of [`MidiEvent`]s, such as a MIDI input port or a virtual keyboard.
pub trait EventSource: Send {
    /// Display name of the source.
    fn name(&self) -> &str;

    /// Fetch the next pending event without blocking.
    fn try_next(&mut self) -> Option<MidiEvent>;

    /// Wait up to `timeout` for the next event. Returns `Ok(None)` on timeouts and an error
    /// when the source got disconnected.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<MidiEvent>, Error>;
}

// -------------------------------------------------------------------------------------------------

/// An [`EventSource`] fed via a channel [`Sender`].
pub struct ChannelEventSource {
    name: String,
    receiver: Receiver<MidiEvent>,
}

impl ChannelEventSource {
    /// Create a new channel source and the sender to feed it.
    pub fn new(name: &str) -> (Sender<MidiEvent>, Self) {
        let (sender, receiver) = unbounded();
        let name = name.to_string();
        (sender, Self { name, receiver })
    }
}

impl EventSource for ChannelEventSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_next(&mut self) -> Option<MidiEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<MidiEvent>, Error> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::EventSourceError(format!(
                "'{}' got disconnected",
                self.name
            ))),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// An [`EventSource`] which never produces events.
#[derive(Debug, Default, Clone)]
pub struct NullEventSource;

impl EventSource for NullEventSource {
    fn name(&self) -> &str {
        "None"
    }

    fn try_next(&mut self) -> Option<MidiEvent> {
        None
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<MidiEvent>, Error> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}

// -------------------------------------------------------------------------------------------------

/// Unwrap an opened event source or fall back to a [`NullEventSource`], logging the failure.
pub fn event_source_or_fallback(
    source: Result<Box<dyn EventSource>, Error>,
) -> Box<dyn EventSource> {
    match source {
        Ok(source) => {
            log::info!("Using event source '{}'", source.name());
            source
        }
        Err(err) => {
            log::warn!("{err}. Falling back to a silent event source...");
            Box::new(NullEventSource)
        }
    }
}

// -------------------------------------------------------------------------------------------------
