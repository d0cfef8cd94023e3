//! Engine facade
//!
//! Owns the scheduler and the dispatch layer and exposes the single
//! surface the outer layers (CLI, UI) talk to. Tempo, generator and
//! transport changes arrive as [`EngineEvent`]s; the engine forwards
//! them and keeps the two halves consistent (a mode or generator change
//! never leaves a note sounding).

use crate::clock::Clock;
use crate::dispatch::{AudioDispatch, InitStatus, NoteSink};
use crate::generators::GeneratorKind;
use crate::scheduler::{SchedulerState, StepScheduler};
use crate::viz::{self, VizEvent};
use tracing::{info, warn};

/// Change events from the outer layer. The engine does not own tempo or
/// algorithm selection; it is notified of them.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Play,
    Stop,
    SetTempo(f64),
    SetGenerator(GeneratorKind),
    ControlChange { cc: u8, value: u8 },
    ProgramChange(u8),
}

pub struct Engine<C: Clock> {
    scheduler: StepScheduler<C>,
    dispatch: AudioDispatch,
    channel: u8,
}

impl<C: Clock> Engine<C> {
    pub fn new(clock: C, generator: GeneratorKind, bpm: f64, dispatch: AudioDispatch) -> Self {
        Self {
            scheduler: StepScheduler::new(clock, generator, bpm),
            dispatch,
            channel: 0,
        }
    }

    /// Pick a backend; see [`AudioDispatch::initialize`]
    pub fn initialize(&mut self, preferred_device: Option<&str>) -> InitStatus {
        let status = self.dispatch.initialize(preferred_device);
        match status.mode {
            Some(mode) => info!("engine initialized, backend {:?}", mode),
            None => warn!("engine has no audio backend; notes will be silent"),
        }
        status
    }

    pub fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Play => self.scheduler.start(),
            EngineEvent::Stop => self.scheduler.stop(&mut self.dispatch),
            EngineEvent::SetTempo(bpm) => self.scheduler.set_tempo(bpm),
            EngineEvent::SetGenerator(generator) => {
                // Regeneration invalidates the sounding set's meaning, so
                // silence first
                if self.scheduler.state() == SchedulerState::Running {
                    if let Err(e) = self.dispatch.all_notes_off() {
                        warn!("all-notes-off before generator change failed: {e}");
                    }
                }
                self.scheduler.set_generator(generator);
            }
            EngineEvent::ControlChange { cc, value } => {
                if let Err(e) = self.dispatch.send_control_change(cc, value, self.channel) {
                    warn!("control change {cc}={value} failed: {e}");
                }
            }
            EngineEvent::ProgramChange(program) => {
                if let Err(e) = self.dispatch.send_program_change(program, self.channel) {
                    warn!("program change {program} failed: {e}");
                }
            }
        }
    }

    /// Frame callback; returns the number of steps fired
    pub fn tick(&mut self) -> usize {
        self.scheduler.tick(&mut self.dispatch)
    }

    /// Visualization events for the step the cursor currently points at
    pub fn current_step_events(&self) -> Vec<VizEvent> {
        match self.scheduler.sequence() {
            Some(sequence) => viz::step_events(sequence, self.scheduler.cursor()),
            None => Vec::new(),
        }
    }

    pub fn scheduler(&self) -> &StepScheduler<C> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut StepScheduler<C> {
        &mut self.scheduler
    }

    pub fn dispatch(&self) -> &AudioDispatch {
        &self.dispatch
    }

    pub fn dispatch_mut(&mut self) -> &mut AudioDispatch {
        &mut self.dispatch
    }
}
