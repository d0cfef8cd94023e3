//! Visualization feed
//!
//! JSON event stream for external renderers. The core emits note events
//! and, for the cellular generators, raw grid generations with birth and
//! death deltas; how those get drawn is the consumer's problem.

use crate::generators::cellular2d::CellularTrace;
use crate::note::{NoteState, Sequence};
use crate::rules::CellDelta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEvent {
    NoteOn {
        pitch: u8,
        velocity: u8,
        column: u16,
        row: u16,
        state: NoteState,
    },
    NoteOff {
        pitch: u8,
    },
    StepAdvance {
        index: usize,
    },
    /// A full grid snapshot, cells in row-major order
    GridGeneration {
        generation: usize,
        width: usize,
        height: usize,
        cells: Vec<u8>,
    },
    /// Births and deaths between one generation and the next
    GridDeltas {
        generation: usize,
        changes: Vec<CellDelta>,
    },
}

pub fn encode(event: &VizEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

pub fn decode(json: &str) -> serde_json::Result<VizEvent> {
    serde_json::from_str(json)
}

/// Flatten a cellular trace into the event stream: each generation's
/// snapshot, followed by the deltas it produced
pub fn trace_events(trace: &CellularTrace) -> Vec<VizEvent> {
    let mut events = Vec::with_capacity(trace.generations.len() + trace.deltas.len());
    for (generation, cells) in trace.generations.iter().enumerate() {
        events.push(VizEvent::GridGeneration {
            generation,
            width: trace.width,
            height: trace.height,
            cells: cells.clone(),
        });
        if let Some(changes) = trace.deltas.get(generation) {
            if !changes.is_empty() {
                events.push(VizEvent::GridDeltas {
                    generation,
                    changes: changes.clone(),
                });
            }
        }
    }
    events
}

/// Events for one step: the advance marker, then its note-ons
pub fn step_events(sequence: &Sequence, index: usize) -> Vec<VizEvent> {
    let step = sequence.step(index);
    let mut events = vec![VizEvent::StepAdvance { index: step.index }];
    for note in &step.notes {
        events.push(VizEvent::NoteOn {
            pitch: note.pitch,
            velocity: note.velocity,
            column: note.column,
            row: note.row,
            state: note.state,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::cellular2d;
    use crate::generators::CellularParams;

    #[test]
    fn test_note_event_round_trip() {
        let event = VizEvent::NoteOn {
            pitch: 64,
            velocity: 100,
            column: 3,
            row: 7,
            state: NoteState::Birth,
        };
        let json = encode(&event).unwrap();
        assert_eq!(decode(&json).unwrap(), event);
    }

    #[test]
    fn test_event_json_shape_is_tagged() {
        let json = encode(&VizEvent::NoteOff { pitch: 60 }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "note_off");
        assert_eq!(value["pitch"], 60);
    }

    #[test]
    fn test_trace_produces_snapshot_per_generation() {
        let params = CellularParams::default();
        let (_, trace) = cellular2d::generate(&params).unwrap();
        let events = trace_events(&trace);

        let snapshots = events
            .iter()
            .filter(|e| matches!(e, VizEvent::GridGeneration { .. }))
            .count();
        assert_eq!(snapshots, trace.generations.len());

        for event in &events {
            if let VizEvent::GridGeneration { width, height, cells, .. } = event {
                assert_eq!(cells.len(), width * height);
            }
        }
    }

    #[test]
    fn test_step_events_carry_grid_coordinates() {
        let params = CellularParams::default();
        let (sequence, _) = cellular2d::generate(&params).unwrap();
        let events = step_events(&sequence, 0);
        assert!(matches!(events[0], VizEvent::StepAdvance { index: 0 }));
        for event in &events[1..] {
            match event {
                VizEvent::NoteOn { column, row, .. } => {
                    assert!((*column as usize) < params.width);
                    assert!((*row as usize) < params.height);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
