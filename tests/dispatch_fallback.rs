//! Backend selection, CC translation, and end-to-end offline rendering
//! through the software FM engine.

use morphogen::cc_map;
use morphogen::clock::ManualClock;
use morphogen::dispatch::{AudioDispatch, DispatchMode, NoteSink};
use morphogen::engine::{Engine, EngineEvent};
use morphogen::generators::{FractalParams, GeneratorKind};

fn software_dispatch() -> AudioDispatch {
    let mut dispatch = AudioDispatch::offline(44100);
    let status = dispatch.initialize(None);
    assert_eq!(status.mode, Some(DispatchMode::Software));
    assert!(status.success);
    dispatch
}

#[test]
fn software_fallback_reports_its_mode() {
    let dispatch = software_dispatch();
    assert_eq!(dispatch.mode(), Some(DispatchMode::Software));
    assert!(dispatch.fm_engine().is_some());
}

#[test]
fn notes_flow_to_fm_voices_and_back_off() {
    let mut dispatch = software_dispatch();
    dispatch.note_on(60, 0.8, 0).unwrap();
    dispatch.note_on(67, 0.8, 0).unwrap();
    assert_eq!(dispatch.fm_engine().unwrap().active_notes(), vec![60, 67]);

    dispatch.note_off(60, 0).unwrap();
    // Released voices ring through their tail, then disappear
    dispatch.fm_engine().unwrap().render(44100 / 2);
    assert_eq!(dispatch.fm_engine().unwrap().active_notes(), vec![67]);
}

#[test]
fn all_notes_off_silences_every_voice() {
    let mut dispatch = software_dispatch();
    for note in [48, 55, 60, 64] {
        dispatch.note_on(note, 0.9, 0).unwrap();
    }
    dispatch.all_notes_off().unwrap();
    dispatch.fm_engine().unwrap().render(44100 / 2);
    assert!(dispatch.fm_engine().unwrap().active_notes().is_empty());
}

#[test]
fn algorithm_cc_changes_fm_algorithm() {
    let mut dispatch = software_dispatch();
    dispatch
        .send_control_change(cc_map::CC_ALGORITHM, 127, 0)
        .unwrap();
    assert_eq!(dispatch.fm_engine().unwrap().params().algorithm, 8);

    dispatch
        .send_control_change(cc_map::CC_ALGORITHM, 0, 0)
        .unwrap();
    assert_eq!(dispatch.fm_engine().unwrap().params().algorithm, 1);
}

#[test]
fn operator_ccs_reach_their_operator() {
    let mut dispatch = software_dispatch();
    let cc = cc_map::operator_cc(1, cc_map::OP_SUSTAIN);
    dispatch.send_control_change(cc, 0, 0).unwrap();
    let params = dispatch.fm_engine().unwrap().params();
    assert_eq!(params.operators[1].adsr.sustain, 0.0);
    // Other operators untouched
    assert!(params.operators[0].adsr.sustain > 0.0);
}

#[test]
fn unmapped_cc_is_a_noop_not_an_error() {
    let mut dispatch = software_dispatch();
    let before = dispatch.fm_engine().unwrap().params();
    // Hardware-only assignments and an unassigned number
    for cc in [cc_map::CC_GLOBAL_DETUNE, cc_map::CC_VOICE_MODE, 3] {
        dispatch.send_control_change(cc, 99, 0).unwrap();
    }
    assert_eq!(dispatch.fm_engine().unwrap().params(), before);
}

#[test]
fn thirteenth_voice_steals_the_oldest() {
    let mut dispatch = software_dispatch();
    for note in 40..52 {
        dispatch.note_on(note, 0.7, 0).unwrap();
    }
    dispatch.note_on(80, 0.7, 0).unwrap();
    let notes = dispatch.fm_engine().unwrap().active_notes();
    assert_eq!(notes.len(), 12);
    assert!(!notes.contains(&40));
    assert!(notes.contains(&80));
}

#[test]
fn scheduled_sequence_renders_audibly_offline() {
    let generator = GeneratorKind::Fractal(FractalParams::default());
    let mut engine = Engine::new(
        ManualClock::new(),
        generator,
        120.0,
        AudioDispatch::offline(44100),
    );
    engine.initialize(None);
    engine.scheduler_mut().set_max_delta_ms(500.0);
    engine.handle(EngineEvent::Play);

    let mut buffer = Vec::new();
    for _ in 0..8 {
        engine.scheduler_mut().clock_mut().advance(125.0);
        engine.tick();
        buffer.extend(engine.dispatch().fm_engine().unwrap().render(5512));
    }
    engine.handle(EngineEvent::Stop);

    let rms = (buffer.iter().map(|s| s * s).sum::<f32>() / buffer.len() as f32).sqrt();
    assert!(rms > 0.005, "rendered sequence should be audible, rms={rms}");
    assert!(buffer.iter().all(|s| s.abs() <= 1.0));
}
