use std::simd::{f32x4, simd_swizzle};
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

use super::commit_cursor;
use crate::{
    layer::{Binding, Layer, LayerState},
    sound::{Channels, Sound},
};

/// Accumulates one layer into the scratch buffer, 4 frames per step.
#[inline]
pub(crate) fn mix_layer(layer: &Layer, volume: f32x4, acc: &mut [f32x4]) {
    let flag = layer.flag.load(Acquire);
    if flag == LayerState::Free {
        return;
    }

    let cursor = layer.cursor.load(Acquire);
    let gain = layer.gain.load(Acquire);
    let gain = f32x4::from_array([gain.l, gain.r, gain.l, gain.r]) * volume;

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
                Channels::Mono => fade_mono(layer, bind, snd, cursor, gain, acc),
                Channels::Stereo => fade_stereo(layer, bind, snd, cursor, gain, acc),
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
            Channels::Mono => play_mono(layer, bind, snd, looping, cursor, gain, acc),
            Channels::Stereo => play_stereo(layer, bind, snd, looping, cursor, gain, acc),
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

/// Duplicates 4 mono frames into two interleaved stereo vectors.
#[inline]
fn split_mono(sam: f32x4) -> (f32x4, f32x4) {
    (simd_swizzle!(sam, [0, 0, 1, 1]), simd_swizzle!(sam, [2, 2, 3, 3]))
}

fn fade_mono(
    layer: &Layer,
    bind: &Binding,
    snd: &Sound,
    cursor: i32,
    gain: f32x4,
    acc: &mut [f32x4],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.end - cursor {
        // enough window left to ramp all the way down
        for i in (0..acc.len()).step_by(2) {
            let fade = layer.fade.get();
            if fade == 0 {
                break;
            }
            if cursor >= 0 {
                let fmul = f32x4::splat(fade as f32 / bind.fmax as f32) * gain;
                let (lo, hi) = split_mono(snd.data[((cursor % len) >> 2) as usize]);
                acc[i] += lo * fmul;
                acc[i + 1] += hi * fmul;
            }
            layer.fade.set(fade - 4);
            cursor += 4;
        }
    } else {
        // too close to the end, play out at full gain instead
        for i in (0..acc.len()).step_by(2) {
            if cursor == bind.end {
                break;
            }
            if cursor >= 0 {
                let (lo, hi) = split_mono(snd.data[((cursor % len) >> 2) as usize]);
                acc[i] += lo * gain;
                acc[i + 1] += hi * gain;
            }
            cursor += 4;
        }
    }

    commit_cursor(layer, cached, cursor)
}

fn fade_stereo(
    layer: &Layer,
    bind: &Binding,
    snd: &Sound,
    cursor: i32,
    gain: f32x4,
    acc: &mut [f32x4],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.end - cursor {
        for i in (0..acc.len()).step_by(2) {
            let fade = layer.fade.get();
            if fade == 0 {
                break;
            }
            if cursor >= 0 {
                let fmul = f32x4::splat(fade as f32 / bind.fmax as f32) * gain;
                let off = ((cursor % len) >> 1) as usize;
                acc[i] += snd.data[off] * fmul;
                acc[i + 1] += snd.data[off + 1] * fmul;
            }
            layer.fade.set(fade - 4);
            cursor += 4;
        }
    } else {
        for i in (0..acc.len()).step_by(2) {
            if cursor == bind.end {
                break;
            }
            if cursor >= 0 {
                let off = ((cursor % len) >> 1) as usize;
                acc[i] += snd.data[off] * gain;
                acc[i + 1] += snd.data[off + 1] * gain;
            }
            cursor += 4;
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
    gain: f32x4,
    acc: &mut [f32x4],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.fmax {
        // ramping in
        for i in (0..acc.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let fmul = f32x4::splat(layer.fade.get() as f32 / bind.fmax as f32) * gain;
                let (lo, hi) = split_mono(snd.data[((cursor % len) >> 2) as usize]);
                acc[i] += lo * fmul;
                acc[i + 1] += hi * fmul;
            }
            // the ramp keeps counting through pre-roll
            if layer.fade.get() < bind.fmax {
                layer.fade.set(layer.fade.get() + 4);
            }
            cursor += 4;
        }
    } else {
        for i in (0..acc.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let (lo, hi) = split_mono(snd.data[((cursor % len) >> 2) as usize]);
                acc[i] += lo * gain;
                acc[i + 1] += hi * gain;
            }
            cursor += 4;
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
    gain: f32x4,
    acc: &mut [f32x4],
) -> i32 {
    let cached = cursor;
    let mut cursor = cursor;
    let len = snd.frames();

    if layer.fade.get() < bind.fmax {
        for i in (0..acc.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let fmul = f32x4::splat(layer.fade.get() as f32 / bind.fmax as f32) * gain;
                let off = ((cursor % len) >> 1) as usize;
                acc[i] += snd.data[off] * fmul;
                acc[i + 1] += snd.data[off + 1] * fmul;
            }
            if layer.fade.get() < bind.fmax {
                layer.fade.set(layer.fade.get() + 4);
            }
            cursor += 4;
        }
    } else {
        for i in (0..acc.len()).step_by(2) {
            if cursor == bind.end {
                if !looping {
                    break;
                }
                cursor = bind.start;
            }
            if cursor >= 0 {
                let off = ((cursor % len) >> 1) as usize;
                acc[i] += snd.data[off] * gain;
                acc[i + 1] += snd.data[off + 1] * gain;
            }
            cursor += 4;
        }
    }

    commit_cursor(layer, cached, cursor)
}
