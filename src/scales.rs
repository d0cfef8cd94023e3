//! Musical scale tables shared by all generators
//!
//! Scales are defined as semitone offsets from the root. Generators work in
//! "scale degrees": degree 0 is the root, degree `len()` is the root one
//! octave up, and so on. All pitch math clamps into the MIDI range.

use serde::{Deserialize, Serialize};

/// Major scale (Ionian mode): W-W-H-W-W-W-H
pub const MAJOR_SCALE: &[u8] = &[0, 2, 4, 5, 7, 9, 11];

/// Natural minor scale (Aeolian mode): W-H-W-W-H-W-W
pub const MINOR_SCALE: &[u8] = &[0, 2, 3, 5, 7, 8, 10];

/// Major pentatonic scale: W-W-m3-W-m3
pub const PENTATONIC_MAJOR: &[u8] = &[0, 2, 4, 7, 9];

/// Minor pentatonic scale: m3-W-W-m3-W
pub const PENTATONIC_MINOR: &[u8] = &[0, 3, 5, 7, 10];

/// Chromatic scale (all 12 semitones)
pub const CHROMATIC: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Blues scale: m3-W-H-H-m3-W
pub const BLUES_SCALE: &[u8] = &[0, 3, 5, 6, 7, 10];

/// Harmonic minor scale: W-H-W-W-H-Aug2-H
pub const HARMONIC_MINOR: &[u8] = &[0, 2, 3, 5, 7, 8, 11];

/// Dorian mode: W-H-W-W-W-H-W
pub const DORIAN: &[u8] = &[0, 2, 3, 5, 7, 9, 10];

/// Phrygian mode: H-W-W-W-H-W-W
pub const PHRYGIAN: &[u8] = &[0, 1, 3, 5, 7, 8, 10];

/// Lydian mode: W-W-W-H-W-W-H
pub const LYDIAN: &[u8] = &[0, 2, 4, 6, 7, 9, 11];

/// Mixolydian mode: W-W-H-W-W-H-W
pub const MIXOLYDIAN: &[u8] = &[0, 2, 4, 5, 7, 9, 10];

/// Whole tone scale: W-W-W-W-W-W
pub const WHOLE_TONE: &[u8] = &[0, 2, 4, 6, 8, 10];

/// Named musical scale, selectable per generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    Minor,
    PentatonicMajor,
    PentatonicMinor,
    Chromatic,
    Blues,
    HarmonicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    WholeTone,
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Minor
    }
}

impl Scale {
    /// Semitone offsets from the root
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Scale::Major => MAJOR_SCALE,
            Scale::Minor => MINOR_SCALE,
            Scale::PentatonicMajor => PENTATONIC_MAJOR,
            Scale::PentatonicMinor => PENTATONIC_MINOR,
            Scale::Chromatic => CHROMATIC,
            Scale::Blues => BLUES_SCALE,
            Scale::HarmonicMinor => HARMONIC_MINOR,
            Scale::Dorian => DORIAN,
            Scale::Phrygian => PHRYGIAN,
            Scale::Lydian => LYDIAN,
            Scale::Mixolydian => MIXOLYDIAN,
            Scale::WholeTone => WHOLE_TONE,
        }
    }

    /// Number of degrees per octave in this scale
    pub fn len(self) -> usize {
        self.intervals().len()
    }

    pub fn is_empty(self) -> bool {
        false
    }

    /// Map a scale degree (octave-spanning) onto a MIDI pitch.
    ///
    /// Degree `len()` is the root one octave up. The result is clamped to
    /// the MIDI range rather than wrapped.
    pub fn degree_to_pitch(self, root: u8, degree: usize) -> u8 {
        let intervals = self.intervals();
        let octave = (degree / intervals.len()) as i32;
        let step = intervals[degree % intervals.len()] as i32;
        clamp_pitch(root as i32 + octave * 12 + step)
    }

    /// The scale degree two steps up from `degree` (a diatonic third)
    pub fn third_above(self, root: u8, degree: usize) -> u8 {
        self.degree_to_pitch(root, degree + 2)
    }
}

/// Clamp an arbitrary semitone value into the MIDI pitch range
pub fn clamp_pitch(semitones: i32) -> u8 {
    semitones.clamp(0, 127) as u8
}

/// Clamp an arbitrary value into the MIDI velocity range
pub fn clamp_velocity(value: i32) -> u8 {
    value.clamp(0, 127) as u8
}

/// Fold a pitch into `[min, max]` by octave shifts, clamping if the range
/// is narrower than an octave
pub fn fold_into_range(pitch: u8, min: u8, max: u8) -> u8 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let mut p = pitch as i32;
    while p < min as i32 && p + 12 <= 127 {
        p += 12;
    }
    while p > max as i32 && p - 12 >= 0 {
        p -= 12;
    }
    p.clamp(min as i32, max as i32) as u8
}
