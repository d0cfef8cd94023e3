//! Fixed MIDI CC contract
//!
//! CC-number assignments shared with the hardware synth. These numbers are
//! an external contract: hardware presets address parameters by CC, so the
//! table must stay stable across releases. In software mode a subset of the
//! table translates into FM parameter updates; CCs with no software
//! counterpart (LFOs, voice mode) pass through unmapped and are ignored.

use crate::fm::FmParamUpdate;

pub const CC_MASTER_VOLUME: u8 = 7;

pub const CC_ALGORITHM: u8 = 90;
pub const CC_FEEDBACK: u8 = 91;
pub const CC_GLOBAL_DETUNE: u8 = 92;

/// First CC of operator 1's block; each operator occupies
/// [`OPERATOR_BLOCK_LEN`] consecutive numbers
pub const CC_OPERATOR_BASE: u8 = 20;
pub const OPERATOR_BLOCK_LEN: u8 = 7;

/// Offsets within an operator block
pub const OP_LEVEL: u8 = 0;
pub const OP_DETUNE: u8 = 1;
pub const OP_MULTIPLIER: u8 = 2;
pub const OP_ATTACK: u8 = 3;
pub const OP_DECAY: u8 = 4;
pub const OP_SUSTAIN: u8 = 5;
pub const OP_RELEASE: u8 = 6;

/// First CC of LFO 1's block (rate, depth, waveform, retrigger, loop)
pub const CC_LFO_BASE: u8 = 102;
pub const LFO_BLOCK_LEN: u8 = 5;
pub const LFO_COUNT: u8 = 3;

pub const CC_VOICE_MODE: u8 = 117;
pub const CC_MPE_ENABLE: u8 = 118;
pub const CC_NOTE_PRIORITY: u8 = 119;
pub const CC_PITCH_BEND_RANGE: u8 = 85;

/// CC number for one operator parameter, operators indexed 0-3
pub fn operator_cc(op: usize, offset: u8) -> u8 {
    CC_OPERATOR_BASE + (op as u8 & 3) * OPERATOR_BLOCK_LEN + offset
}

/// CC number for one LFO parameter, LFOs indexed 0-2
pub fn lfo_cc(lfo: usize, offset: u8) -> u8 {
    CC_LFO_BASE + (lfo as u8 % LFO_COUNT) * LFO_BLOCK_LEN + offset
}

fn unit(value: u8) -> f32 {
    value.min(127) as f32 / 127.0
}

/// Translate a CC message into a software FM update. `None` means the CC
/// has no software counterpart and should be dropped silently.
pub fn translate(cc: u8, value: u8) -> Option<FmParamUpdate> {
    if cc == CC_MASTER_VOLUME {
        return Some(FmParamUpdate::MasterVolume(unit(value)));
    }
    if cc == CC_ALGORITHM {
        // 127 steps folded onto algorithm ids 1-8
        return Some(FmParamUpdate::Algorithm(value.min(127) / 16 + 1));
    }
    if cc == CC_FEEDBACK {
        return Some(FmParamUpdate::Feedback(unit(value) * 1.5));
    }

    let op_span = 4 * OPERATOR_BLOCK_LEN;
    if (CC_OPERATOR_BASE..CC_OPERATOR_BASE + op_span).contains(&cc) {
        let rel = cc - CC_OPERATOR_BASE;
        let op = (rel / OPERATOR_BLOCK_LEN) as usize;
        return Some(match rel % OPERATOR_BLOCK_LEN {
            OP_LEVEL => FmParamUpdate::OperatorLevel {
                op,
                level: unit(value),
            },
            OP_DETUNE => FmParamUpdate::OperatorDetune {
                op,
                // Bipolar, centered at 64
                detune: (value.min(127) as f32 - 64.0),
            },
            OP_MULTIPLIER => FmParamUpdate::OperatorMultiplier {
                op,
                multiplier: 0.25 + unit(value) * 15.75,
            },
            OP_ATTACK => FmParamUpdate::OperatorAttack {
                op,
                seconds: 0.001 + unit(value) * 2.0,
            },
            OP_DECAY => FmParamUpdate::OperatorDecay {
                op,
                seconds: 0.001 + unit(value) * 2.0,
            },
            OP_SUSTAIN => FmParamUpdate::OperatorSustain {
                op,
                level: unit(value),
            },
            _ => FmParamUpdate::OperatorRelease {
                op,
                seconds: 0.001 + unit(value) * 4.0,
            },
        });
    }

    // Global detune, LFOs, voice mode, MPE, note priority and pitch-bend
    // range only exist on the hardware synth
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_blocks_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for op in 0..4 {
            for offset in 0..OPERATOR_BLOCK_LEN {
                assert!(seen.insert(operator_cc(op, offset)));
            }
        }
        assert_eq!(seen.len(), 28);
        assert!(!seen.contains(&CC_ALGORITHM));
        assert!(!seen.contains(&CC_MASTER_VOLUME));
    }

    #[test]
    fn test_lfo_blocks_stay_below_voice_mode() {
        assert_eq!(lfo_cc(0, 0), 102);
        assert_eq!(lfo_cc(2, LFO_BLOCK_LEN - 1), 116);
        assert!(lfo_cc(2, LFO_BLOCK_LEN - 1) < CC_VOICE_MODE);
    }

    #[test]
    fn test_algorithm_cc_spans_all_eight_ids() {
        assert_eq!(translate(CC_ALGORITHM, 0), Some(FmParamUpdate::Algorithm(1)));
        assert_eq!(
            translate(CC_ALGORITHM, 127),
            Some(FmParamUpdate::Algorithm(8))
        );
        assert_eq!(
            translate(CC_ALGORITHM, 64),
            Some(FmParamUpdate::Algorithm(5))
        );
    }

    #[test]
    fn test_operator_level_translation() {
        let cc = operator_cc(2, OP_LEVEL);
        match translate(cc, 127) {
            Some(FmParamUpdate::OperatorLevel { op, level }) => {
                assert_eq!(op, 2);
                assert!((level - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected translation {other:?}"),
        }
    }

    #[test]
    fn test_detune_is_bipolar_around_64() {
        match translate(operator_cc(0, OP_DETUNE), 64) {
            Some(FmParamUpdate::OperatorDetune { detune, .. }) => {
                assert_eq!(detune, 0.0);
            }
            other => panic!("unexpected translation {other:?}"),
        }
    }

    #[test]
    fn test_hardware_only_ccs_are_unmapped() {
        assert_eq!(translate(CC_GLOBAL_DETUNE, 64), None);
        assert_eq!(translate(CC_VOICE_MODE, 1), None);
        assert_eq!(translate(CC_MPE_ENABLE, 127), None);
        assert_eq!(translate(lfo_cc(1, 0), 100), None);
        assert_eq!(translate(CC_PITCH_BEND_RANGE, 12), None);
        assert_eq!(translate(3, 64), None);
    }
}
