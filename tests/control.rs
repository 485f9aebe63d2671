//! Control surface behavior: argument validation, handle lifetime, slot
//! exhaustion, cursor clamping, bulk state changes, and the pan law.

use std::sync::Arc;
use wavemix::{mixer, Channels, Gain, LayerState, MixError, Mixer, Sound};

fn mono(samples: &[f32]) -> Arc<Sound> {
    Arc::new(Sound::new(Channels::Mono, samples).unwrap())
}

fn left(out: &[f32]) -> Vec<f32> {
    out.chunks_exact(2).map(|f| f[0]).collect()
}

#[test]
fn sounds_round_up_to_four_frame_multiples() {
    let snd = Sound::new(Channels::Mono, &[0.5; 5]).unwrap();
    assert_eq!(snd.frames(), 8);
    assert_eq!(snd.channels(), Channels::Mono);

    let snd = Sound::new(Channels::Stereo, &[0.5; 6]).unwrap();
    assert_eq!(snd.frames(), 4);
    assert_eq!(snd.channels(), Channels::Stereo);
}

#[test]
fn sound_rejects_empty_or_ragged_sample_data() {
    assert_eq!(
        Sound::new(Channels::Mono, &[]).unwrap_err(),
        MixError::BadArgument
    );
    assert_eq!(
        Sound::new(Channels::Stereo, &[0.0; 3]).unwrap_err(),
        MixError::BadArgument
    );
}

#[test]
fn play_rejects_bad_states_and_windows() {
    let snd = mono(&[1.0; 8]);
    let (mut control, _mixer) = mixer(1.0, 0);

    assert_eq!(
        control.play(&snd, LayerState::Free, 1.0, 0.0),
        Err(MixError::BadArgument)
    );
    // window shorter than 4 frames
    assert_eq!(
        control.play_adv(&snd, LayerState::Play, 1.0, 0.0, 0, 2, 0),
        Err(MixError::BadArgument)
    );
    // window ending before frame 4
    assert_eq!(
        control.play_adv(&snd, LayerState::Play, 1.0, 0.0, -8, 0, 0),
        Err(MixError::BadArgument)
    );
}

#[test]
fn exhausted_pool_reports_no_slot() {
    let snd = mono(&[1.0; 8]);
    let (mut control, _mixer) = Mixer::<4>::new(1.0, 0);

    let handles: Vec<_> = (0..4)
        .map(|_| control.play(&snd, LayerState::Loop, 1.0, 0.0).unwrap())
        .collect();
    assert_eq!(handles.len(), 4);

    assert_eq!(
        control.play(&snd, LayerState::Loop, 1.0, 0.0),
        Err(MixError::NoSlot)
    );
    assert_eq!(
        control.play(&snd, LayerState::Loop, 1.0, 0.0),
        Err(MixError::NoSlot)
    );

    // the earlier handles still address their layers
    for handle in handles {
        assert!(control.set_gain_pan(handle, 0.5, 0.0).is_ok());
    }
}

#[test]
fn stopped_layers_reject_control_calls() {
    let snd = mono(&[1.0; 8]);
    let (mut control, _mixer) = mixer(1.0, 0);

    // a layer started stopped only exists to fade out
    let handle = control.play(&snd, LayerState::Stop, 1.0, 0.0).unwrap();
    assert_eq!(
        control.set_gain_pan(handle, 1.0, 0.0),
        Err(MixError::InvalidHandle)
    );
    assert_eq!(
        control.set_state(handle, LayerState::Play),
        Err(MixError::InvalidHandle)
    );
}

#[test]
fn set_state_validates_and_tolerates_no_ops() {
    let snd = mono(&[1.0; 8]);
    let (mut control, _mixer) = mixer(1.0, 0);
    let handle = control.play(&snd, LayerState::Loop, 1.0, 0.0).unwrap();

    assert_eq!(
        control.set_state(handle, LayerState::Free),
        Err(MixError::BadArgument)
    );
    assert!(control.set_state(handle, LayerState::Loop).is_ok());
    assert!(control.set_state(handle, LayerState::Halt).is_ok());
    assert!(control.set_state(handle, LayerState::Play).is_ok());
}

#[test]
fn set_cursor_clamps_and_aligns() {
    let snd = mono(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    let (mut control, mut mixer) = mixer(1.0, 0);
    let handle = control.play(&snd, LayerState::Loop, 2.0, 0.0).unwrap();

    let mut out = [0.0; 8];
    mixer.mix(&mut out);
    assert_eq!(left(&out), [1.0, 2.0, 3.0, 4.0]);

    // 6 truncates down to frame 4
    control.set_cursor(handle, 6).unwrap();
    let mut out = [0.0; 8];
    mixer.mix(&mut out);
    assert_eq!(left(&out), [5.0, 6.0, 7.0, 8.0]);

    // far past the window clamps to its end, which a loop wraps to start
    control.set_cursor(handle, 1000).unwrap();
    let mut out = [0.0; 8];
    mixer.mix(&mut out);
    assert_eq!(left(&out), [1.0, 2.0, 3.0, 4.0]);

    // far before the window clamps to its start
    control.set_cursor(handle, -1000).unwrap();
    let mut out = [0.0; 8];
    mixer.mix(&mut out);
    assert_eq!(left(&out), [1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn stop_all_invalidates_and_drains_every_layer() {
    let snd = mono(&[0.5; 16]);
    let (mut control, mut mixer) = Mixer::<4>::new(1.0, 8);

    let handles: Vec<_> = (0..3)
        .map(|_| control.play(&snd, LayerState::Loop, 1.0, 0.0).unwrap())
        .collect();

    let mut out = [0.0; 32];
    mixer.mix(&mut out);

    control.stop_all();
    for handle in handles {
        assert_eq!(
            control.set_state(handle, LayerState::Play),
            Err(MixError::InvalidHandle)
        );
    }

    // one mix call longer than the fade sweeps every slot free
    let mut out = [0.0; 32];
    mixer.mix(&mut out);
    for _ in 0..4 {
        assert!(control.play(&snd, LayerState::Loop, 1.0, 0.0).is_ok());
    }
}

#[test]
fn halt_all_parks_layers_and_play_all_resumes_them() {
    let snd = mono(&[0.25; 32]);
    let (mut control, mut mixer) = mixer(1.0, 0);
    control
        .play_adv(&snd, LayerState::Loop, 2.0, 0.0, 0, 32, 0)
        .unwrap();
    control
        .play_adv(&snd, LayerState::Loop, 2.0, 0.0, 0, 32, 0)
        .unwrap();

    let mut out = [0.0; 16];
    mixer.mix(&mut out);
    assert!(out.iter().all(|&s| s == 0.5));

    control.halt_all();
    let mut out = [0.0; 16];
    mixer.mix(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));

    control.play_all();
    let mut out = [0.0; 16];
    mixer.mix(&mut out);
    assert!(out.iter().all(|&s| s == 0.5));
}

#[cfg(not(feature = "simd"))]
#[test]
fn default_fade_is_clamped_and_applied_to_new_layers() {
    let snd = mono(&[1.0; 16]);
    let (mut control, mut mixer) = mixer(1.0, 0);

    // 6 truncates to a 4 frame fade
    control.set_default_fade(6);
    control.play(&snd, LayerState::Play, 2.0, 0.0).unwrap();
    let mut out = [0.0; 16];
    mixer.mix(&mut out);
    assert_eq!(
        left(&out),
        [0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0]
    );
}

#[cfg(feature = "simd")]
#[test]
fn default_fade_is_clamped_and_applied_to_new_layers() {
    let snd = mono(&[1.0; 16]);
    let (mut control, mut mixer) = mixer(1.0, 0);

    // 6 truncates to a 4 frame fade
    control.set_default_fade(6);
    control.play(&snd, LayerState::Play, 2.0, 0.0).unwrap();
    let mut out = [0.0; 16];
    mixer.mix(&mut out);
    assert_eq!(
        left(&out),
        [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]
    );
}

#[test]
fn negative_default_fade_collapses_to_zero() {
    let snd = mono(&[1.0; 8]);
    let (mut control, mut mixer) = mixer(1.0, 0);

    control.set_default_fade(-100);
    control.play(&snd, LayerState::Play, 2.0, 0.0).unwrap();
    let mut out = [0.0; 8];
    mixer.mix(&mut out);
    assert_eq!(left(&out), [1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn pan_law_splits_gain_linearly() {
    assert_eq!(Gain::from_pan(2.0, 0.0), Gain { l: 1.0, r: 1.0 });
    assert_eq!(Gain::from_pan(1.0, -1.0), Gain { l: 1.0, r: 0.0 });
    assert_eq!(Gain::from_pan(1.0, 1.0), Gain { l: 0.0, r: 1.0 });

    // both sides always sum back to the input gain
    for gain in [0.5, 1.0, 2.0] {
        for pan in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let split = Gain::from_pan(gain, pan);
            assert_eq!(split.l + split.r, gain);
        }
    }

    // out-of-range pans clamp rather than overshoot
    assert_eq!(Gain::from_pan(1.0, 5.0), Gain::from_pan(1.0, 1.0));
    assert_eq!(Gain::from_pan(1.0, -5.0), Gain::from_pan(1.0, -1.0));
}
