//! Two-thread operation: one thread rendering continuously while the
//! other starts, retargets, halts and stops sounds.

use crossbeam_channel::bounded;
use std::{sync::Arc, thread};
use thread_priority as priority;
use wavemix::{mixer, Channels, LayerState, Sound};

#[test]
fn control_thread_and_mix_thread_run_in_parallel() {
    let snd = Arc::new(Sound::new(Channels::Mono, &[0.25; 480]).unwrap());
    let (mut control, mut mix) = mixer(1.0, 64);
    let (done_tx, done_rx) = bounded::<()>(0);

    let render = thread::spawn(move || {
        let _ = priority::set_current_thread_priority(priority::ThreadPriority::Max);

        let mut out = [0.0f32; 1024];
        let mut frames = 0usize;
        while done_rx.try_recv().is_err() {
            frames += mix.mix(&mut out);
            for &sample in &out {
                assert!(sample.is_finite());
                #[cfg(feature = "clip")]
                assert!((-1.0..=1.0).contains(&sample));
            }
        }
        (frames, mix)
    });

    let mut handles = Vec::new();
    for i in 0..2000u32 {
        if let Ok(handle) = control.play(&snd, LayerState::Loop, 1.0, (i % 3) as f32 - 1.0) {
            handles.push(handle);
        }
        if i % 5 == 0 {
            for &handle in &handles {
                let _ = control.set_gain_pan(handle, 0.5, 0.0);
            }
        }
        if i % 7 == 0 {
            for &handle in &handles {
                let _ = control.set_cursor(handle, (i as i32) % 512);
                let _ = control.set_state(handle, LayerState::Halt);
            }
        }
        if i % 11 == 0 {
            control.stop_all();
            handles.clear();
        }
        if i % 13 == 0 {
            control.halt_all();
            control.play_all();
        }
        if i % 17 == 0 {
            control.set_volume(0.5 + (i % 2) as f32);
        }
    }

    control.stop_all();
    done_tx.send(()).unwrap();
    let (frames, mut mix) = render.join().unwrap();
    assert!(frames > 0);

    // with the controller quiet, a couple of calls longer than any fade
    // sweep every layer back to silence
    let mut out = [0.0f32; 1024];
    mix.mix(&mut out);
    mix.mix(&mut out);
    assert!(out.iter().all(|&s| s == 0.0));
}
