//! Backend selection and note dispatch
//!
//! One surface for note-on/note-off/all-notes-off/CC, regardless of
//! whether a hardware MIDI output or the software FM engine is behind it.
//! Hardware wins when a device is present; otherwise the FM engine is
//! initialized lazily, since opening an audio device can fail transiently
//! and a failed open must not take the whole instrument down.

use crate::cc_map;
use crate::fm::FmVoiceEngine;
use crate::midi_backend::{HardwareMidi, MidiError, MidiMessage};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Midi(#[from] MidiError),
    #[error("audio engine init failed: {0}")]
    AudioInit(String),
    #[error("no audio backend available")]
    NotInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Hardware,
    Software,
}

/// Result of [`AudioDispatch::initialize`]. `mode: None` with
/// `success: false` means no backend could be opened at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitStatus {
    pub mode: Option<DispatchMode>,
    pub success: bool,
}

/// The note-output seam. The scheduler talks to this trait, so tests can
/// substitute a recording or failing sink.
pub trait NoteSink {
    /// Velocity is normalized to [0, 1]
    fn note_on(&mut self, pitch: u8, velocity: f32, channel: u8) -> Result<(), DispatchError>;
    fn note_off(&mut self, pitch: u8, channel: u8) -> Result<(), DispatchError>;
    fn all_notes_off(&mut self) -> Result<(), DispatchError>;
    fn send_control_change(&mut self, cc: u8, value: u8, channel: u8)
        -> Result<(), DispatchError>;
}

/// How the software engine opens audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SoftwareAudio {
    /// cpal stream on the default output device
    Live,
    /// No device; samples are pulled via `render` (tests, WAV export)
    Offline(u32),
}

pub struct AudioDispatch {
    mode: Option<DispatchMode>,
    hardware: Option<HardwareMidi>,
    software: Option<FmVoiceEngine>,
    software_audio: SoftwareAudio,
}

impl AudioDispatch {
    pub fn new() -> Self {
        Self {
            mode: None,
            hardware: None,
            software: None,
            software_audio: SoftwareAudio::Live,
        }
    }

    /// Dispatch that never opens an audio device. The FM engine renders
    /// into buffers on demand.
    pub fn offline(sample_rate: u32) -> Self {
        Self {
            mode: None,
            hardware: None,
            software: None,
            software_audio: SoftwareAudio::Offline(sample_rate),
        }
    }

    /// Pick a backend. Hardware is preferred when any output port exists;
    /// `preferred_device` narrows the choice by substring match. Falling
    /// back to software only fails if the audio device cannot be opened,
    /// and even then later note attempts retry.
    pub fn initialize(&mut self, preferred_device: Option<&str>) -> InitStatus {
        // Offline dispatch never probes hardware
        if self.software_audio == SoftwareAudio::Live {
            if let Some(status) = self.try_hardware(preferred_device) {
                return status;
            }
        }

        self.mode = Some(DispatchMode::Software);
        match self.ensure_software() {
            Ok(()) => InitStatus {
                mode: Some(DispatchMode::Software),
                success: true,
            },
            Err(e) => {
                warn!("software audio init failed, will retry on next note: {e}");
                InitStatus {
                    mode: None,
                    success: false,
                }
            }
        }
    }

    fn try_hardware(&mut self, preferred_device: Option<&str>) -> Option<InitStatus> {
        let devices = match HardwareMidi::list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("MIDI enumeration failed: {e}");
                return None;
            }
        };

        let target = match preferred_device {
            Some(name) => devices.iter().find(|d| d.contains(name))?.clone(),
            None => devices.first()?.clone(),
        };

        match HardwareMidi::connect(&target) {
            Ok(hw) => {
                info!("dispatch mode: hardware ({})", hw.device_name());
                self.hardware = Some(hw);
                self.mode = Some(DispatchMode::Hardware);
                Some(InitStatus {
                    mode: Some(DispatchMode::Hardware),
                    success: true,
                })
            }
            Err(e) => {
                warn!("MIDI connect to '{target}' failed: {e}");
                None
            }
        }
    }

    /// Lazily create the FM engine
    fn ensure_software(&mut self) -> Result<(), DispatchError> {
        if self.software.is_some() {
            return Ok(());
        }
        let engine = match self.software_audio {
            SoftwareAudio::Live => {
                FmVoiceEngine::live().map_err(DispatchError::AudioInit)?
            }
            SoftwareAudio::Offline(rate) => FmVoiceEngine::offline(rate),
        };
        info!("dispatch mode: software FM at {} Hz", engine.sample_rate());
        self.software = Some(engine);
        Ok(())
    }

    /// A device appearing at runtime promotes us to hardware. The software
    /// backend gets an all-notes-off first so no voice is orphaned.
    pub fn switch_to_hardware(&mut self, device_name: &str) -> Result<(), DispatchError> {
        if let Some(engine) = &self.software {
            engine.all_notes_off();
        }
        let hw = HardwareMidi::connect(device_name)?;
        info!("switching dispatch to hardware ({})", hw.device_name());
        self.hardware = Some(hw);
        self.mode = Some(DispatchMode::Hardware);
        Ok(())
    }

    pub fn mode(&self) -> Option<DispatchMode> {
        self.mode
    }

    /// Preset select; hardware only, a silent no-op in software mode
    pub fn send_program_change(&mut self, program: u8, channel: u8) -> Result<(), DispatchError> {
        if self.mode == Some(DispatchMode::Hardware) {
            let hw = self.hardware.as_ref().ok_or(DispatchError::NotInitialized)?;
            hw.send(MidiMessage::ProgramChange {
                channel,
                program: program.min(127),
            })?;
        }
        Ok(())
    }

    /// Direct access to the software engine, for offline rendering
    pub fn fm_engine(&self) -> Option<&FmVoiceEngine> {
        self.software.as_ref()
    }
}

impl Default for AudioDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteSink for AudioDispatch {
    fn note_on(&mut self, pitch: u8, velocity: f32, channel: u8) -> Result<(), DispatchError> {
        match self.mode {
            Some(DispatchMode::Hardware) => {
                let hw = self.hardware.as_ref().ok_or(DispatchError::NotInitialized)?;
                hw.send(MidiMessage::NoteOn {
                    channel,
                    note: pitch.min(127),
                    velocity: (velocity.clamp(0.0, 1.0) * 127.0).round() as u8,
                })?;
                Ok(())
            }
            Some(DispatchMode::Software) => {
                self.ensure_software()?;
                if let Some(engine) = &self.software {
                    engine.note_on(pitch, velocity.clamp(0.0, 1.0));
                }
                Ok(())
            }
            None => Err(DispatchError::NotInitialized),
        }
    }

    fn note_off(&mut self, pitch: u8, channel: u8) -> Result<(), DispatchError> {
        match self.mode {
            Some(DispatchMode::Hardware) => {
                let hw = self.hardware.as_ref().ok_or(DispatchError::NotInitialized)?;
                hw.send(MidiMessage::NoteOff {
                    channel,
                    note: pitch.min(127),
                })?;
                Ok(())
            }
            Some(DispatchMode::Software) => {
                if let Some(engine) = &self.software {
                    engine.note_off(pitch);
                }
                Ok(())
            }
            None => Err(DispatchError::NotInitialized),
        }
    }

    fn all_notes_off(&mut self) -> Result<(), DispatchError> {
        match self.mode {
            Some(DispatchMode::Hardware) => {
                let hw = self.hardware.as_ref().ok_or(DispatchError::NotInitialized)?;
                hw.all_notes_off(0)?;
                Ok(())
            }
            Some(DispatchMode::Software) => {
                if let Some(engine) = &self.software {
                    engine.all_notes_off();
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn send_control_change(
        &mut self,
        cc: u8,
        value: u8,
        channel: u8,
    ) -> Result<(), DispatchError> {
        match self.mode {
            Some(DispatchMode::Hardware) => {
                let hw = self.hardware.as_ref().ok_or(DispatchError::NotInitialized)?;
                hw.send(MidiMessage::ControlChange {
                    channel,
                    controller: cc.min(127),
                    value: value.min(127),
                })?;
                Ok(())
            }
            Some(DispatchMode::Software) => {
                // Unmapped CCs are part of the hardware-only contract and
                // drop silently here
                if let Some(update) = cc_map::translate(cc, value) {
                    self.ensure_software()?;
                    if let Some(engine) = &self.software {
                        engine.update_params(update);
                    }
                }
                Ok(())
            }
            None => Err(DispatchError::NotInitialized),
        }
    }
}
