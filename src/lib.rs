//! # Morphogen - Generative Music Engine
//!
//! Morphogen turns mathematical processes into playable sequences and
//! drives them out to hardware FM synthesizers over MIDI, or to a
//! built-in 4-operator software FM engine when no hardware is attached.
//!
//! ## Core pieces
//!
//! - **Generators**: fractal midpoint displacement, 1D/2D cellular
//!   automata, Euclidean rhythms, number sequences, waveshapers, Markov
//!   chains and chord progressions, all producing the same [`note::Sequence`]
//!   shape.
//! - **StepScheduler**: fixed-step playback on a sixteenth-note grid with
//!   a jitter-resistant time accumulator.
//! - **AudioDispatch**: runtime backend selection between hardware MIDI
//!   and the software FM engine, behind one note surface.
//! - **FmVoiceEngine**: 4 operators, 8 routing algorithms, per-operator
//!   ADSR, FIFO voice stealing.
//!
//! ## Quick start
//!
//! ```rust
//! use morphogen::clock::ManualClock;
//! use morphogen::dispatch::AudioDispatch;
//! use morphogen::engine::{Engine, EngineEvent};
//! use morphogen::generators::{FractalParams, GeneratorKind};
//!
//! let generator = GeneratorKind::Fractal(FractalParams::default());
//! let dispatch = AudioDispatch::offline(44100);
//! let mut engine = Engine::new(ManualClock::new(), generator, 120.0, dispatch);
//! engine.initialize(None);
//!
//! engine.handle(EngineEvent::Play);
//! for _ in 0..10 {
//!     engine.scheduler_mut().clock_mut().advance(16.0);
//!     engine.tick();
//! }
//! engine.handle(EngineEvent::Stop);
//! ```

pub mod cc_map;
pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod fm;
pub mod generators;
pub mod grid;
pub mod midi_backend;
pub mod note;
pub mod pattern_detector;
pub mod rng;
pub mod rules;
pub mod scales;
pub mod scheduler;
pub mod viz;
