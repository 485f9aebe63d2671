use atomic::Atomic;
use bytemuck::NoUninit;
use std::{
    cell::{Cell, UnsafeCell},
    sync::{atomic::AtomicI32, Arc},
};

use crate::sound::Sound;

/// Playback state of a mixer layer.
///
/// States are ordered: anything above `Stop` accepts control commands, and
/// anything above `Halt` plays forward.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerState {
    /// The slot is unused and may be claimed by the next play call.
    Free = 0,
    /// Fading out; the slot is released once the fade completes.
    Stop = 1,
    /// Fading out, then parked until resumed. The slot stays claimed.
    Halt = 2,
    /// Playing once through the start..end window.
    Play = 3,
    /// Playing and wrapping back to start at the window end.
    Loop = 4,
}

// SAFETY: fieldless repr(u8) enum, no padding or uninit bytes.
unsafe impl NoUninit for LayerState {}

/// A left/right gain pair, as produced by the pan law.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    pub l: f32,
    pub r: f32,
}

// SAFETY: two f32 fields, repr(C), no padding.
unsafe impl NoUninit for Gain {}

impl Gain {
    /// Splits a linear gain across both channels with a linear pan law.
    ///
    /// `pan` is clamped to `[-1.0, 1.0]`, where -1 is fully left and +1
    /// fully right. The two sides always sum to `gain`, so a centred pan
    /// puts half the gain on each channel.
    #[inline]
    pub fn from_pan(gain: f32, pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        Self { l: gain * (0.5 - pan / 2.0), r: gain * (0.5 + pan / 2.0) }
    }
}

/// Fields bound to a layer for the lifetime of one playback. The control
/// thread writes them while the slot is free, the release store of `flag`
/// publishes them, and they stay read-only until the slot is recycled.
pub(crate) struct Binding {
    pub snd: Option<Arc<Sound>>,
    pub start: i32,
    pub end: i32,
    pub fmax: i32,
}

/// One playback slot.
///
/// `flag`, `cursor` and `gain` are shared between the control and mix
/// threads and accessed with acquire/release ordering or CAS. `id` belongs
/// to the control thread alone, `fade` to the mix thread once the layer is
/// live, and the binding hands over from controller to mixer through
/// `flag`.
pub(crate) struct Layer {
    /// Handle owning this slot, 0 if the slot was never used.
    pub id: Cell<u32>,
    pub flag: Atomic<LayerState>,
    /// Frame position, negative while a delayed start plays pre-roll.
    pub cursor: AtomicI32,
    pub gain: Atomic<Gain>,
    /// Remaining fade frames, counting up to `fmax` in, down to 0 out.
    pub fade: Cell<i32>,
    bind: UnsafeCell<Binding>,
}

// SAFETY: the access protocol above keeps every non-atomic field exclusive
// to a single thread at any point in time, with handoffs ordered by the
// acquire/release pair on `flag`.
unsafe impl Sync for Layer {}

impl Layer {
    pub fn new() -> Self {
        Self {
            id: Cell::new(0),
            flag: Atomic::new(LayerState::Free),
            cursor: AtomicI32::new(0),
            gain: Atomic::new(Gain { l: 0.0, r: 0.0 }),
            fade: Cell::new(0),
            bind: UnsafeCell::new(Binding { snd: None, start: 0, end: 0, fmax: 0 }),
        }
    }

    /// Grants write access to the binding.
    ///
    /// # Safety
    ///
    /// Only the control thread may call this, and only after observing
    /// `flag == Free`, which makes it the sole owner of the binding.
    pub unsafe fn bind_mut(&self) -> &mut Binding {
        &mut *self.bind.get()
    }

    /// Reads the binding of a live layer.
    ///
    /// # Safety
    ///
    /// The caller must have acquire-loaded a non-free `flag`, which
    /// publishes the binding and freezes it until the slot is recycled.
    pub unsafe fn bind(&self) -> &Binding {
        &*self.bind.get()
    }
}
