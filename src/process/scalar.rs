use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

use super::commit_cursor;
use crate::{
    layer::{Binding, Gain, Layer, LayerState},
    sound::{Channels, Sound},
};

/// Accumulates one layer into the output buffer, one frame at a time.
#[inline]
pub(crate) fn mix_layer(layer: &Layer, volume: f32, out: &mut [f32]) {
    let flag = layer.flag.load(Acquire);
    if flag == LayerState::Free {
        return;
    }

    let cursor = layer.cursor.load(Acquire);
    let mut gain = layer.gain.load(Acquire);
    gain.l *= volume;
    gain.r *= volume;

    // SAFETY: the acquire load above saw a live flag
    let bind = unsafe { layer.bind() };
    let Some(snd) = bind.snd.as_deref() else {
        return;
    };

    if flag < LayerState::Play {
        // stopping or halting: ramp down unless already silent or at the
        // window end
        let cursor = if layer.fade.get() > 0 && cursor < bind.end {
            match snd.channels() {
                Channels::Mono => fade_mono(layer, bind, snd, cursor, gain, out),
                Channels::Stereo => fade_stereo(layer, bind, snd, cursor, gain, out),
            }
        } else {
            cursor
        };
        if flag == LayerState::Stop && (layer.fade.get() == 0 || cursor == bind.end) {
            layer.flag.store(LayerState::Free, Release);
        }
    } else {
        let looping = flag == LayerState::Loop;
        let cursor = match snd.channels() {
            Channels::Mono => play_mono(layer, bind, snd, looping, cursor, gain, out),
            Channels::Stereo => play_stereo(layer, bind, snd, looping, cursor, gain, out),
        };
        // release the slot at the window end, unless the controller got a
        // state change in first
        if flag == LayerState::Play && cursor == bind.end {
            let _ = layer
                .flag
                .compare_exchange(LayerState::Play, LayerState::Free, AcqRel, Acquire);
        }
    }
}

fn fade_mono(
    layer: &Layer,
    bind: &Binding,
    snd: &Sound,
    cursor: i32,
    gain: Gain,
    out: &mut [f32],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.end - cursor {
        // enough window left to ramp all the way down
        for i in (0..out.len()).step_by(2) {
            let fade = layer.fade.get();
            if fade == 0 {
                break;
            }
            if cursor >= 0 {
                let fmul = fade as f32 / bind.fmax as f32;
                let sam = snd.data[(cursor % len) as usize];
                out[i] += sam * fmul * gain.l;
                out[i + 1] += sam * fmul * gain.r;
            }
            layer.fade.set(fade - 1);
            cursor += 1;
        }
    } else {
        // too close to the end, play out at full gain instead
        for i in (0..out.len()).step_by(2) {
            if cursor == bind.end {
                break;
            }
            if cursor >= 0 {
                let sam = snd.data[(cursor % len) as usize];
                out[i] += sam * gain.l;
                out[i + 1] += sam * gain.r;
            }
            cursor += 1;
        }
    }

    commit_cursor(layer, cached, cursor)
}

fn fade_stereo(
    layer: &Layer,
    bind: &Binding,
    snd: &Sound,
    cursor: i32,
    gain: Gain,
    out: &mut [f32],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.end - cursor {
        for i in (0..out.len()).step_by(2) {
            let fade = layer.fade.get();
            if fade == 0 {
                break;
            }
            if cursor >= 0 {
                let fmul = fade as f32 / bind.fmax as f32;
                let off = ((cursor % len) << 1) as usize;
                out[i] += snd.data[off] * fmul * gain.l;
                out[i + 1] += snd.data[off + 1] * fmul * gain.r;
            }
            layer.fade.set(fade - 1);
            cursor += 1;
        }
    } else {
        for i in (0..out.len()).step_by(2) {
            if cursor == bind.end {
                break;
            }
            if cursor >= 0 {
                let off = ((cursor % len) << 1) as usize;
                out[i] += snd.data[off] * gain.l;
                out[i + 1] += snd.data[off + 1] * gain.r;
            }
            cursor += 1;
        }
    }

    commit_cursor(layer, cached, cursor)
}

fn play_mono(
    layer: &Layer,
    bind: &Binding,
    snd: &Sound,
    looping: bool,
    cursor: i32,
    gain: Gain,
    out: &mut [f32],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.fmax {
        // ramping in
        for i in (0..out.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let fmul = layer.fade.get() as f32 / bind.fmax as f32;
                let sam = snd.data[(cursor % len) as usize];
                out[i] += sam * fmul * gain.l;
                out[i + 1] += sam * fmul * gain.r;
            }
            // the ramp keeps counting through pre-roll
            if layer.fade.get() < bind.fmax {
                layer.fade.set(layer.fade.get() + 1);
            }
            cursor += 1;
        }
    } else {
        for i in (0..out.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let sam = snd.data[(cursor % len) as usize];
                out[i] += sam * gain.l;
                out[i + 1] += sam * gain.r;
            }
            cursor += 1;
        }
    }

    commit_cursor(layer, cached, cursor)
}

fn play_stereo(
    layer: &Layer,
    bind: &Binding,
    snd: &Sound,
    looping: bool,
    cursor: i32,
    gain: Gain,
    out: &mut [f32],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.fmax {
        for i in (0..out.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let fmul = layer.fade.get() as f32 / bind.fmax as f32;
                let off = ((cursor % len) << 1) as usize;
                out[i] += snd.data[off] * fmul * gain.l;
                out[i + 1] += snd.data[off + 1] * fmul * gain.r;
            }
            if layer.fade.get() < bind.fmax {
                layer.fade.set(layer.fade.get() + 1);
            }
            cursor += 1;
        }
    } else {
        for i in (0..out.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let off = ((cursor % len) << 1) as usize;
                out[i] += snd.data[off] * gain.l;
                out[i + 1] += snd.data[off + 1] * gain.r;
            }
            cursor += 1;
        }
    }

    commit_cursor(layer, cached, cursor)
}
