use atomic::Atomic;
use std::{
    fmt,
    num::NonZeroU32,
    sync::{
        atomic::Ordering::{AcqRel, Acquire, Release},
        Arc,
    },
};

#[cfg(feature = "simd")]
use std::simd::f32x4;
#[cfg(all(feature = "simd", feature = "clip"))]
use std::simd::num::SimdFloat;

use crate::{
    layer::{Gain, Layer, LayerState},
    process,
    sound::Sound,
    MixError,
};

/// Layer count used by [`mixer`](crate::mixer) and the type defaults.
pub const DEFAULT_LAYERS: usize = 256;

/// Frames mixed per scratch pass in the SIMD path. Longer requests are
/// served in several passes over the same scratch buffer, so mixing never
/// allocates no matter the request size.
#[cfg(feature = "simd")]
const PASS_FRAMES: usize = 2048;

#[cfg(all(feature = "simd", feature = "clip"))]
const SIMD_ONE: f32x4 = f32x4::from_array([1.0; 4]);
#[cfg(all(feature = "simd", feature = "clip"))]
const SIMD_NEG_ONE: f32x4 = f32x4::from_array([-1.0; 4]);

/// Identifies one playback within a mixer.
///
/// The low bits select the layer slot and the full value is checked
/// against the slot's current owner, so a handle goes stale as soon as its
/// layer is released or recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Returns the raw handle value, always nonzero.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

/// State shared between the two halves of a mixer pair.
pub(crate) struct Shared<const LAYERS: usize> {
    layers: [Layer; LAYERS],
    volume: Atomic<f32>,
}

/// The control half of a mixer pair.
///
/// Starts sounds on free layers and adjusts or stops them through the
/// returned [`Handle`]s. Every operation is wait-free and safe to call
/// while the [`Mixer`] half is rendering on another thread.
pub struct MixerControl<const LAYERS: usize = DEFAULT_LAYERS> {
    shared: Arc<Shared<LAYERS>>,
    next_id: u32,
    default_fade: i32,
}

/// The rendering half of a mixer pair; hand it to the audio callback.
///
/// [`mix`](Self::mix) visits every layer and accumulates its contribution,
/// so one call costs O(layers x frames) regardless of how many layers are
/// audible.
pub struct Mixer<const LAYERS: usize = DEFAULT_LAYERS> {
    shared: Arc<Shared<LAYERS>>,
    #[cfg(feature = "simd")]
    scratch: Box<[f32x4]>,
    /// Frames produced by 4-frame alignment but not yet requested.
    #[cfg(feature = "simd")]
    carry: [f32; 6],
    #[cfg(feature = "simd")]
    carried: usize,
}

impl<const LAYERS: usize> Mixer<LAYERS> {
    /// Creates a connected control and render pair with `LAYERS` layers.
    ///
    /// `volume` scales all output and may be any float. A negative
    /// `default_fade` is treated as 0; fades are counted in frames and
    /// truncated to a multiple of 4.
    pub fn new(volume: f32, default_fade: i32) -> (MixerControl<LAYERS>, Self) {
        const { assert!(LAYERS.is_power_of_two()) }

        let shared = Arc::new(Shared {
            layers: std::array::from_fn(|_| Layer::new()),
            volume: Atomic::new(volume),
        });

        let control = MixerControl {
            shared: Arc::clone(&shared),
            next_id: 0,
            default_fade: mask_fade(default_fade),
        };
        let mixer = Self {
            shared,
            #[cfg(feature = "simd")]
            scratch: vec![f32x4::splat(0.0); PASS_FRAMES / 2].into_boxed_slice(),
            #[cfg(feature = "simd")]
            carry: [0.0; 6],
            #[cfg(feature = "simd")]
            carried: 0,
        };
        (control, mixer)
    }

    /// Mixes every live layer into `out` as interleaved stereo frames.
    ///
    /// The frame count is `out.len() / 2`; a trailing odd sample is left
    /// untouched. Always writes exactly that many frames and returns the
    /// count. Never blocks and never allocates.
    pub fn mix(&mut self, out: &mut [f32]) -> usize {
        let frames = out.len() / 2;
        let out = &mut out[..frames * 2];

        #[cfg(feature = "simd")]
        self.mix_simd(out);
        #[cfg(not(feature = "simd"))]
        self.mix_scalar(out);

        frames
    }

    #[cfg(feature = "simd")]
    fn mix_simd(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        let mut done = 0;

        // frames carried over from the previous call go out first
        if self.carried > 0 {
            let take = self.carried.min(frames);
            out[..take * 2].copy_from_slice(&self.carry[..take * 2]);
            self.carry.copy_within(take * 2..self.carried * 2, 0);
            self.carried -= take;
            if take == frames {
                return;
            }
            done = take;
        }

        loop {
            let n = (frames - done).min(PASS_FRAMES);
            self.mix_pass(&mut out[done * 2..(done + n) * 2]);
            done += n;
            if done >= frames {
                break;
            }
        }
    }

    /// One scratch-sized pass: accumulate, clip, copy out, and keep the
    /// 0..=3 frames of alignment spill for the next call.
    #[cfg(feature = "simd")]
    fn mix_pass(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;
        // one f32x4 holds two stereo frames
        let vectors = ((frames + 3) & !3) / 2;
        let scratch = &mut self.scratch[..vectors];
        scratch.fill(f32x4::splat(0.0));

        let volume = f32x4::splat(self.shared.volume.load(Acquire));
        for layer in &self.shared.layers {
            process::mix_layer(layer, volume, scratch);
        }

        #[cfg(feature = "clip")]
        for acc in scratch.iter_mut() {
            *acc = acc.simd_clamp(SIMD_NEG_ONE, SIMD_ONE);
        }

        let (head, tail) = out.split_at_mut(out.len() & !3);
        for (chunk, acc) in head.chunks_exact_mut(4).zip(scratch.iter()) {
            chunk.copy_from_slice(acc.as_array());
        }
        if !tail.is_empty() {
            tail.copy_from_slice(&scratch[head.len() / 4].as_array()[..tail.len()]);
        }

        self.carried = vectors * 2 - frames;
        for i in 0..self.carried * 2 {
            let spill = frames * 2 + i;
            self.carry[i] = scratch[spill / 4][spill % 4];
        }
    }

    #[cfg(not(feature = "simd"))]
    fn mix_scalar(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        let volume = self.shared.volume.load(Acquire);
        for layer in &self.shared.layers {
            process::mix_layer(layer, volume, out);
        }

        #[cfg(feature = "clip")]
        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}

impl<const LAYERS: usize> MixerControl<LAYERS> {
    /// Starts `snd` on a free layer over its full length.
    ///
    /// Equivalent to [`play_adv`](Self::play_adv) with the whole sound as
    /// the playback window and the mixer's default fade.
    pub fn play(
        &mut self,
        snd: &Arc<Sound>,
        state: LayerState,
        gain: f32,
        pan: f32,
    ) -> Result<Handle, MixError> {
        self.play_adv(snd, state, gain, pan, 0, snd.frames(), self.default_fade)
    }

    /// Starts `snd` on a free layer with an explicit playback window.
    ///
    /// `start` and `end` are frame positions truncated to multiples of 4,
    /// and the window must span at least 4 frames. A negative `start`
    /// delays the sound by that many frames of silence. An `end` beyond
    /// the sound's length reads it modulo its length, which repeats a
    /// short sound inside a single window; looping layers additionally
    /// wrap from `end` back to `start`.
    ///
    /// Layers started in [`LayerState::Play`] or [`LayerState::Loop`] fade
    /// in over `fade` frames. Layers started stopped or halted begin fully
    /// open instead, so that a later stop ramps them down.
    #[allow(clippy::too_many_arguments)]
    pub fn play_adv(
        &mut self,
        snd: &Arc<Sound>,
        state: LayerState,
        gain: f32,
        pan: f32,
        start: i32,
        end: i32,
        fade: i32,
    ) -> Result<Handle, MixError> {
        if state == LayerState::Free || end - start < 4 || end < 4 {
            return Err(MixError::BadArgument);
        }

        for _ in 0..LAYERS {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);

            let layer = &self.shared.layers[id as usize & (LAYERS - 1)];
            if layer.flag.load(Acquire) != LayerState::Free {
                continue;
            }

            // handle 0 is reserved as invalid; the substitute selects the
            // same slot because the layer count is a power of two
            let id = if id == 0 { LAYERS as u32 } else { id };
            layer.id.set(id);

            // SAFETY: the slot is free, so the control thread owns it
            let bind = unsafe { layer.bind_mut() };
            bind.snd = Some(Arc::clone(snd));
            bind.start = start & !3;
            bind.end = end & !3;
            bind.fmax = mask_fade(fade);
            layer.fade.set(if state < LayerState::Play { bind.fmax } else { 0 });

            layer.gain.store(Gain::from_pan(gain, pan), Release);
            layer.cursor.store(bind.start, Release);
            // the flag store publishes everything written above
            layer.flag.store(state, Release);

            // SAFETY: id 0 was substituted away above
            return Ok(Handle(unsafe { NonZeroU32::new_unchecked(id) }));
        }

        Err(MixError::NoSlot)
    }

    /// Replaces the gain and pan of a playing layer.
    pub fn set_gain_pan(&self, handle: Handle, gain: f32, pan: f32) -> Result<(), MixError> {
        let layer = self.layer_for(handle)?;
        layer.gain.store(Gain::from_pan(gain, pan), Release);
        Ok(())
    }

    /// Repositions a playing layer inside its window.
    ///
    /// The position is clamped to the window and truncated to a multiple
    /// of 4. The mix thread may be advancing the cursor at the same time,
    /// in which case either write can win; repositioning is best effort.
    pub fn set_cursor(&self, handle: Handle, cursor: i32) -> Result<(), MixError> {
        let layer = self.layer_for(handle)?;
        // SAFETY: layer_for saw a live flag, so the binding is published
        let bind = unsafe { layer.bind() };
        let cursor = if cursor < bind.start {
            bind.start
        } else if cursor > bind.end {
            bind.end
        } else {
            cursor & !3
        };
        layer.cursor.store(cursor, Release);
        Ok(())
    }

    /// Moves a playing layer to another active state.
    ///
    /// Stopping starts a fade-out after which the layer is released;
    /// halting fades out but keeps the slot claimed for a later resume.
    /// The transition is a single compare and swap, so it can lose to a
    /// concurrent release by the mix thread and report `InvalidHandle`.
    pub fn set_state(&self, handle: Handle, state: LayerState) -> Result<(), MixError> {
        if state == LayerState::Free {
            return Err(MixError::BadArgument);
        }

        let layer = &self.shared.layers[handle.get() as usize & (LAYERS - 1)];
        let current = layer.flag.load(Acquire);
        if layer.id.get() != handle.get() || current <= LayerState::Stop {
            return Err(MixError::InvalidHandle);
        }
        if current == state {
            return Ok(());
        }
        layer
            .flag
            .compare_exchange(current, state, AcqRel, Acquire)
            .map(|_| ())
            .map_err(|_| MixError::InvalidHandle)
    }

    /// Sets the global output volume, applied on the next mix call.
    pub fn set_volume(&self, volume: f32) {
        self.shared.volume.store(volume, Release);
    }

    /// Sets the fade length applied by [`play`](Self::play) from now on.
    /// Does not affect layers already started.
    pub fn set_default_fade(&mut self, fade: i32) {
        self.default_fade = mask_fade(fade);
    }

    /// Stops every live layer, invalidating all outstanding handles.
    ///
    /// Each layer fades out from the mix thread's next visit and releases
    /// its slot once the fade completes or its window ends.
    pub fn stop_all(&self) {
        for layer in &self.shared.layers {
            if layer.flag.load(Acquire) > LayerState::Stop {
                layer.flag.store(LayerState::Stop, Release);
            }
        }
    }

    /// Halts every playing or looping layer. Halted layers keep their
    /// slots and handles and can be resumed later.
    pub fn halt_all(&self) {
        for layer in &self.shared.layers {
            let flag = layer.flag.load(Acquire);
            if flag > LayerState::Halt {
                let _ = layer.flag.compare_exchange(flag, LayerState::Halt, AcqRel, Acquire);
            }
        }
    }

    /// Resumes every halted layer into ordinary playback.
    pub fn play_all(&self) {
        for layer in &self.shared.layers {
            let _ = layer
                .flag
                .compare_exchange(LayerState::Halt, LayerState::Play, AcqRel, Acquire);
        }
    }

    /// Looks up and validates the slot addressed by `handle`.
    fn layer_for(&self, handle: Handle) -> Result<&Layer, MixError> {
        let layer = &self.shared.layers[handle.get() as usize & (LAYERS - 1)];
        if layer.id.get() == handle.get() && layer.flag.load(Acquire) > LayerState::Stop {
            Ok(layer)
        } else {
            Err(MixError::InvalidHandle)
        }
    }
}

impl<const LAYERS: usize> fmt::Debug for MixerControl<LAYERS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixerControl")
            .field("layers", &LAYERS)
            .field("next_id", &self.next_id)
            .field("default_fade", &self.default_fade)
            .finish()
    }
}

impl<const LAYERS: usize> fmt::Debug for Mixer<LAYERS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixer").field("layers", &LAYERS).finish_non_exhaustive()
    }
}

/// Negative fades collapse to 0, positive ones truncate to a multiple
/// of 4.
fn mask_fade(fade: i32) -> i32 {
    fade.max(0) & !3
}
