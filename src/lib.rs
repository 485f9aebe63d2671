#![cfg_attr(feature = "simd", feature(portable_simd))]

//! Wait-free stereo audio mixing.
//!
//! A [`Mixer`] owns a fixed pool of playback layers, each bound to an
//! immutable [`Sound`], and renders interleaved stereo `f32` frames on
//! demand. Creating one yields a connected pair: the [`MixerControl`] half
//! stays with the application and starts, retargets and stops sounds, while
//! the [`Mixer`] half is moved into the audio callback and does nothing but
//! [`mix`](Mixer::mix). The two halves may run on different threads in
//! parallel; they coordinate through per-layer atomics, so neither side
//! ever locks, and the mix side never allocates.
//!
//! Positions, window bounds, fade lengths and sound lengths are counted in
//! frames (one sample per channel) and rounded to multiples of 4
//! internally, so values crossing the API do not need to be pre-aligned.
//!
//! Fading is automatic. A layer started in [`LayerState::Play`] or
//! [`LayerState::Loop`] ramps in over its fade length; stopping or halting
//! it ramps back out, after which a stopped layer releases its slot. A
//! layer too close to its window end to complete a fade-out simply plays
//! out instead. Fades of length 0 cut immediately.
//!
//! With the `simd` feature (on by default, nightly only) frames are mixed
//! four at a time and cursors advance in steps of 4; without it the scalar
//! path advances frame by frame. The `clip` feature clamps the final
//! output to `[-1.0, 1.0]`.

mod layer;
mod mixer;
mod process;
mod sound;

pub use layer::{Gain, LayerState};
pub use mixer::{Handle, Mixer, MixerControl, DEFAULT_LAYERS};
pub use sound::{Channels, Sound};

use std::fmt;

/// Errors reported by the control half of a mixer.
///
/// The mix entry point itself cannot fail; every fallible check happens on
/// the control thread before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixError {
    /// An input violated a documented precondition.
    BadArgument,
    /// Every layer is occupied; the play request was dropped.
    NoSlot,
    /// The handle's slot is owned by a different playback, or the layer
    /// has already been released.
    InvalidHandle,
}

impl fmt::Display for MixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::BadArgument => "invalid argument",
            Self::NoSlot => "no free layer available",
            Self::InvalidHandle => "stale or invalid layer handle",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for MixError {}

/// Creates a connected [`MixerControl`] and [`Mixer`] pair with the
/// default layer count of [`DEFAULT_LAYERS`].
///
/// Use [`Mixer::new`] directly to pick a different (power of two) layer
/// count.
pub fn mixer(volume: f32, default_fade: i32) -> (MixerControl, Mixer) {
    Mixer::new(volume, default_fade)
}
