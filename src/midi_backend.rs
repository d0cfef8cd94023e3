//! Hardware MIDI output backend
//!
//! Wraps midir behind a byte-level message enum and a dedicated sender
//! thread, so note dispatch never blocks on the OS MIDI driver. All
//! traffic is scoped to one logical channel chosen at connect time.

use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

/// All-notes-off channel mode message
const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("MIDI subsystem init failed: {0}")]
    Init(String),
    #[error("MIDI output '{0}' not found")]
    DeviceNotFound(String),
    #[error("not connected to a MIDI output")]
    NotConnected,
    #[error("MIDI send failed: {0}")]
    Send(String),
}

/// Wire-level MIDI message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                vec![0x90 | (channel & 0x0F), *note & 0x7F, *velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note } => {
                vec![0x80 | (channel & 0x0F), *note & 0x7F, 0]
            }
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => {
                vec![0xB0 | (channel & 0x0F), *controller & 0x7F, *value & 0x7F]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), *program & 0x7F]
            }
        }
    }
}

enum MidiCommand {
    Message(MidiMessage),
    Shutdown,
}

/// A connected hardware MIDI output
pub struct HardwareMidi {
    sender: Sender<MidiCommand>,
    thread_handle: Option<thread::JoinHandle<()>>,
    device_name: String,
}

impl HardwareMidi {
    /// Names of every MIDI output port visible to the OS
    pub fn list_devices() -> Result<Vec<String>, MidiError> {
        let midi_out =
            MidiOutput::new("morphogen scanner").map_err(|e| MidiError::Init(e.to_string()))?;
        let mut names = Vec::new();
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Connect to the first output whose name contains `device_name`
    pub fn connect(device_name: &str) -> Result<Self, MidiError> {
        let midi_out =
            MidiOutput::new("morphogen output").map_err(|e| MidiError::Init(e.to_string()))?;

        let port = Self::find_port(&midi_out, device_name)?;
        let full_name = midi_out
            .port_name(&port)
            .unwrap_or_else(|_| device_name.to_string());

        let connection = midi_out
            .connect(&port, "morphogen-output")
            .map_err(|e| MidiError::Init(e.to_string()))?;

        let (sender, receiver) = channel();
        let connection = Arc::new(Mutex::new(connection));
        let handle = thread::spawn(move || midi_sender_thread(receiver, connection));

        info!("connected to MIDI output '{}'", full_name);
        Ok(Self {
            sender,
            thread_handle: Some(handle),
            device_name: full_name,
        })
    }

    fn find_port(midi_out: &MidiOutput, device_name: &str) -> Result<MidiOutputPort, MidiError> {
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if name.contains(device_name) {
                    return Ok(port);
                }
            }
        }
        Err(MidiError::DeviceNotFound(device_name.to_string()))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn send(&self, msg: MidiMessage) -> Result<(), MidiError> {
        debug!("midi send {:?}", msg);
        self.sender
            .send(MidiCommand::Message(msg))
            .map_err(|_| MidiError::NotConnected)
    }

    pub fn all_notes_off(&self, channel: u8) -> Result<(), MidiError> {
        self.send(MidiMessage::ControlChange {
            channel,
            controller: CC_ALL_NOTES_OFF,
            value: 0,
        })
    }
}

impl Drop for HardwareMidi {
    fn drop(&mut self) {
        let _ = self.sender.send(MidiCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("MIDI sender thread panicked during shutdown");
            }
        }
    }
}

fn midi_sender_thread(
    receiver: Receiver<MidiCommand>,
    connection: Arc<Mutex<MidiOutputConnection>>,
) {
    while let Ok(cmd) = receiver.recv() {
        match cmd {
            MidiCommand::Message(msg) => {
                let bytes = msg.to_bytes();
                if let Ok(mut conn) = connection.lock() {
                    if let Err(e) = conn.send(&bytes) {
                        warn!("MIDI send failed: {}", e);
                    }
                }
            }
            MidiCommand::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_bytes() {
        let msg = MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 100,
        };
        assert_eq!(msg.to_bytes(), vec![0x90, 60, 100]);
    }

    #[test]
    fn test_note_off_bytes() {
        let msg = MidiMessage::NoteOff {
            channel: 2,
            note: 64,
        };
        assert_eq!(msg.to_bytes(), vec![0x82, 64, 0]);
    }

    #[test]
    fn test_status_nibble_masks_channel() {
        let msg = MidiMessage::ControlChange {
            channel: 0x1F,
            controller: 7,
            value: 127,
        };
        assert_eq!(msg.to_bytes()[0], 0xBF);
    }

    #[test]
    fn test_data_bytes_stay_in_seven_bits() {
        let msg = MidiMessage::NoteOn {
            channel: 0,
            note: 200,
            velocity: 255,
        };
        let bytes = msg.to_bytes();
        assert!(bytes[1] <= 0x7F);
        assert!(bytes[2] <= 0x7F);
    }

    #[test]
    fn test_all_notes_off_is_cc_123() {
        let msg = MidiMessage::ControlChange {
            channel: 0,
            controller: CC_ALL_NOTES_OFF,
            value: 0,
        };
        assert_eq!(msg.to_bytes(), vec![0xB0, 123, 0]);
    }
}
