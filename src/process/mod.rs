//! Per-layer mixing loops.
//!
//! Both paths share the same shape: load the layer's shared state once,
//! pick a kernel for the state and channel layout, accumulate into the
//! caller's buffer while advancing a local cursor, and publish the cursor
//! back with a single compare and swap.

use std::sync::atomic::Ordering::{AcqRel, Acquire};

use crate::layer::Layer;

#[cfg(feature = "simd")]
mod simd;
#[cfg(feature = "simd")]
pub(crate) use simd::mix_layer;

#[cfg(not(feature = "simd"))]
mod scalar;
#[cfg(not(feature = "simd"))]
pub(crate) use scalar::mix_layer;

/// Publishes a kernel's advanced cursor. The control thread may have
/// repositioned the layer mid-pass; when that happens its position wins
/// and the frames already accumulated stand as mixed.
#[inline]
fn commit_cursor(layer: &Layer, cached: i32, cursor: i32) -> i32 {
    match layer.cursor.compare_exchange(cached, cursor, AcqRel, Acquire) {
        Ok(_) => cursor,
        Err(moved) => moved,
    }
}
