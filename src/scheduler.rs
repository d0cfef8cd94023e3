//! Fixed-step playback scheduler
//!
//! Drives a cached [`Sequence`] against a monotonic clock on a
//! sixteenth-note grid. The tick uses a time accumulator: the per-tick
//! delta is capped (large gaps would otherwise fire a burst of catch-up
//! steps), and the accumulator is decremented by the step interval rather
//! than reset, which keeps phase accurate under jitter.
//!
//! The overriding invariant is "never leave a note stuck on": stopping is
//! synchronous and every step begins by silencing the previous step's
//! notes. A sink failure on one note is logged and never aborts the rest
//! of the step or the scheduler.

use crate::clock::Clock;
use crate::dispatch::NoteSink;
use crate::generators::GeneratorKind;
use crate::note::Sequence;
use tracing::{debug, warn};

/// Default cap on a single tick's delta, in milliseconds
pub const DEFAULT_MAX_DELTA_MS: f64 = 100.0;

/// Logical MIDI channel all scheduled notes use
const CHANNEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

pub struct StepScheduler<C: Clock> {
    clock: C,
    generator: GeneratorKind,
    sequence: Option<Sequence>,
    state: SchedulerState,
    cursor: usize,
    /// Pitches currently sounding, silenced at the next step or on stop
    sounding: Vec<u8>,
    accumulator_ms: f64,
    last_tick_ms: f64,
    step_interval_ms: f64,
    max_delta_ms: f64,
}

impl<C: Clock> StepScheduler<C> {
    pub fn new(clock: C, generator: GeneratorKind, bpm: f64) -> Self {
        Self {
            clock,
            generator,
            sequence: None,
            state: SchedulerState::Stopped,
            cursor: 0,
            sounding: Vec::new(),
            accumulator_ms: 0.0,
            last_tick_ms: 0.0,
            step_interval_ms: step_interval_for(bpm),
            max_delta_ms: DEFAULT_MAX_DELTA_MS,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn step_interval_ms(&self) -> f64 {
        self.step_interval_ms
    }

    pub fn sounding_notes(&self) -> &[u8] {
        &self.sounding
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Raise or lower the per-tick delta cap
    pub fn set_max_delta_ms(&mut self, cap_ms: f64) {
        self.max_delta_ms = cap_ms.max(1.0);
    }

    /// Tempo changes regenerate the sequence and reset the cursor, so the
    /// generator's timing metadata stays consistent with the new grid
    pub fn set_tempo(&mut self, bpm: f64) {
        self.step_interval_ms = step_interval_for(bpm);
        self.regenerate();
    }

    /// Swap the active generator; regenerates immediately
    pub fn set_generator(&mut self, generator: GeneratorKind) {
        self.generator = generator;
        self.regenerate();
    }

    pub fn generator(&self) -> &GeneratorKind {
        &self.generator
    }

    fn regenerate(&mut self) {
        self.sequence = Some(self.generator.generate_or_fallback());
        self.cursor = 0;
    }

    /// Stopped -> Running. Generates a sequence if none is cached.
    pub fn start(&mut self) {
        if self.state == SchedulerState::Running {
            return;
        }
        if self.sequence.is_none() {
            self.regenerate();
        }
        self.cursor = 0;
        self.accumulator_ms = 0.0;
        self.last_tick_ms = self.clock.now_ms();
        self.state = SchedulerState::Running;
        debug!(
            "scheduler running, step interval {:.2} ms",
            self.step_interval_ms
        );
    }

    /// Running -> Stopped. Synchronously silences every sounding note
    /// before returning; per-note failures are logged and skipped.
    pub fn stop<S: NoteSink>(&mut self, sink: &mut S) {
        for pitch in std::mem::take(&mut self.sounding) {
            if let Err(e) = sink.note_off(pitch, CHANNEL) {
                warn!("note-off for {pitch} failed during stop: {e}");
            }
        }
        self.state = SchedulerState::Stopped;
        self.accumulator_ms = 0.0;
    }

    /// One frame callback. Returns the number of steps fired.
    pub fn tick<S: NoteSink>(&mut self, sink: &mut S) -> usize {
        if self.state != SchedulerState::Running {
            return 0;
        }

        let now = self.clock.now_ms();
        let delta = (now - self.last_tick_ms).min(self.max_delta_ms).max(0.0);
        self.last_tick_ms = now;
        self.accumulator_ms += delta;

        let mut fired = 0;
        while self.accumulator_ms >= self.step_interval_ms {
            self.play_step(sink);
            self.accumulator_ms -= self.step_interval_ms;
            fired += 1;
        }
        fired
    }

    fn play_step<S: NoteSink>(&mut self, sink: &mut S) {
        let Some(sequence) = &self.sequence else {
            return;
        };

        for pitch in std::mem::take(&mut self.sounding) {
            if let Err(e) = sink.note_off(pitch, CHANNEL) {
                warn!("note-off for {pitch} failed: {e}");
            }
        }

        let step = sequence.step(self.cursor);
        for note in &step.notes {
            let velocity = note.velocity as f32 / 127.0;
            match sink.note_on(note.pitch, velocity, CHANNEL) {
                Ok(()) => self.sounding.push(note.pitch),
                Err(e) => warn!("note-on for {} failed: {e}", note.pitch),
            }
        }

        self.cursor = (self.cursor + 1) % sequence.len();
    }
}

fn step_interval_for(bpm: f64) -> f64 {
    let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 120.0 };
    60_000.0 / bpm / 4.0
}
