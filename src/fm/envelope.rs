//! Per-operator ADSR envelope
//!
//! Linear attack, exponential-feel decay/release via linear segments at
//! control accuracy good enough for operator gains. Each of a voice's four
//! operators runs one of these independently.

use serde::{Deserialize, Serialize};

/// Envelope timing/level parameters, times in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    /// Level, not time
    pub sustain: f32,
    pub release: f32,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.12,
            sustain: 0.7,
            release: 0.25,
        }
    }
}

impl AdsrParams {
    /// Clamp into usable ranges: minimum 1 ms segments, sustain in [0, 1]
    pub fn sanitized(self) -> Self {
        Self {
            attack: self.attack.max(0.001),
            decay: self.decay.max(0.001),
            sustain: self.sustain.clamp(0.0, 1.0),
            release: self.release.max(0.001),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Finished,
}

/// Running envelope instance
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    params: AdsrParams,
    stage: Stage,
    level: f32,
    time_in_stage: f32,
    /// Level when release began, so the ramp starts from wherever we were
    release_from: f32,
}

impl AdsrEnvelope {
    /// A freshly triggered envelope (gate on)
    pub fn triggered(params: AdsrParams) -> Self {
        Self {
            params: params.sanitized(),
            stage: Stage::Attack,
            level: 0.0,
            time_in_stage: 0.0,
            release_from: 0.0,
        }
    }

    /// Gate off: enter the release ramp from the current level
    pub fn release(&mut self) {
        if self.stage != Stage::Release && self.stage != Stage::Finished {
            self.release_from = self.level;
            self.stage = Stage::Release;
            self.time_in_stage = 0.0;
        }
    }

    /// Skip straight to silence (used when a voice is stolen)
    pub fn kill(&mut self) {
        self.stage = Stage::Finished;
        self.level = 0.0;
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// Advance one sample and return the gain in [0, 1]
    pub fn process(&mut self, sample_rate: f32) -> f32 {
        let dt = 1.0 / sample_rate;
        self.time_in_stage += dt;

        match self.stage {
            Stage::Attack => {
                if self.time_in_stage >= self.params.attack {
                    self.stage = Stage::Decay;
                    self.time_in_stage = 0.0;
                    self.level = 1.0;
                } else {
                    self.level = self.time_in_stage / self.params.attack;
                }
            }
            Stage::Decay => {
                if self.time_in_stage >= self.params.decay {
                    self.stage = Stage::Sustain;
                    self.time_in_stage = 0.0;
                    self.level = self.params.sustain;
                } else {
                    let progress = self.time_in_stage / self.params.decay;
                    self.level = 1.0 + (self.params.sustain - 1.0) * progress;
                }
            }
            Stage::Sustain => {
                self.level = self.params.sustain;
            }
            Stage::Release => {
                if self.time_in_stage >= self.params.release {
                    self.stage = Stage::Finished;
                    self.level = 0.0;
                } else {
                    let progress = self.time_in_stage / self.params.release;
                    self.level = self.release_from * (1.0 - progress);
                }
            }
            Stage::Finished => {
                self.level = 0.0;
            }
        }

        self.level
    }
}
