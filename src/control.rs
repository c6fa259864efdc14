//! Control messages between a controller and a synth worker, and a duplex channel to
//! transport them.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// A control message as sent by a remote controller to a synth worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Play a note at `freq` Hz with normalized velocity. A frequency of 0 stops the note.
    Note { freq: f32, velocity: f32 },
    /// Set normalized aftertouch.
    Touch { value: f32 },
    /// Set the carrier's amplitude envelope.
    Adsr {
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    },
}

impl ControlMessage {
    /// Decode a message from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the message as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

// -------------------------------------------------------------------------------------------------

/// One end of a duplex control channel, see [`control_channel`].
#[derive(Debug, Clone)]
pub struct ControlEndpoint {
    sender: Sender<ControlMessage>,
    receiver: Receiver<ControlMessage>,
}

impl ControlEndpoint {
    /// Send a message to the other end.
    pub fn send(&self, message: ControlMessage) -> Result<(), Error> {
        self.sender.send(message)?;
        Ok(())
    }

    /// Fetch the next message sent by the other end without blocking.
    pub fn try_recv(&self) -> Option<ControlMessage> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message. Returns `Ok(None)` on timeouts and an error
    /// when the other end got dropped.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ControlMessage>, Error> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::SendError("Control channel disconnected".to_string()))
            }
        }
    }

    /// Iterate over all pending messages without blocking.
    pub fn pending(&self) -> impl Iterator<Item = ControlMessage> + '_ {
        self.receiver.try_iter()
    }
}

/// Create a connected pair of control endpoints: a controller and a worker end.
pub fn control_channel() -> (ControlEndpoint, ControlEndpoint) {
    let (controller_sender, worker_receiver) = unbounded();
    let (worker_sender, controller_receiver) = unbounded();
    (
        ControlEndpoint {
            sender: controller_sender,
            receiver: controller_receiver,
        },
        ControlEndpoint {
            sender: worker_sender,
            receiver: worker_receiver,
        },
    )
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplex() -> Result<(), Box<Error>> {
        let (controller, worker) = control_channel();
        controller.send(ControlMessage::Note {
            freq: 440.0,
            velocity: 0.8,
        })?;
        controller.send(ControlMessage::Touch { value: 0.5 })?;
        assert_eq!(
            worker.try_recv(),
            Some(ControlMessage::Note {
                freq: 440.0,
                velocity: 0.8
            })
        );
        assert_eq!(
            worker.pending().collect::<Vec<_>>(),
            [ControlMessage::Touch { value: 0.5 }]
        );
        assert_eq!(worker.recv_timeout(Duration::from_millis(1))?, None);

        worker.send(ControlMessage::Touch { value: 1.0 })?;
        assert_eq!(
            controller.recv_timeout(Duration::from_millis(10))?,
            Some(ControlMessage::Touch { value: 1.0 })
        );

        drop(controller);
        assert!(worker.recv_timeout(Duration::from_millis(1)).is_err());
        assert!(worker.send(ControlMessage::Touch { value: 0.0 }).is_err());
        Ok(())
    }

    #[test]
    fn json() -> Result<(), Box<Error>> {
        let message = ControlMessage::Adsr {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.5,
            release: 1.0,
        };
        assert_eq!(ControlMessage::from_json(&message.to_json()?)?, message);
        assert_eq!(
            ControlMessage::from_json(r#"{"Note":{"freq":0.0,"velocity":0.0}}"#)?,
            ControlMessage::Note {
                freq: 0.0,
                velocity: 0.0
            }
        );
        assert!(ControlMessage::from_json(r#"{"Volume":1.0}"#).is_err());
        Ok(())
    }
}
