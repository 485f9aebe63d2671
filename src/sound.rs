use crate::MixError;
#[cfg(feature = "simd")]
use std::simd::f32x4;

/// Channel layout of a [`Sound`]'s sample data.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono = 1,
    Stereo = 2,
}

impl Channels {
    /// Returns the number of samples per frame.
    pub const fn count(self) -> usize {
        self as usize
    }
}

/// An immutable PCM buffer, shared by any number of playing layers.
///
/// The sample data is copied at construction, so the source slice can be
/// dropped afterwards. The length is padded up to a multiple of 4 frames
/// with silence; [`frames`](Self::frames) reports the padded length.
#[derive(Debug, Clone)]
pub struct Sound {
    channels: Channels,
    frames: i32,
    #[cfg(feature = "simd")]
    pub(crate) data: Vec<f32x4>,
    #[cfg(not(feature = "simd"))]
    pub(crate) data: Vec<f32>,
}

impl Sound {
    /// Copies `samples` into a new sound with the given channel layout.
    ///
    /// `samples` holds interleaved frames, so its length must be a
    /// positive multiple of the channel count.
    pub fn new(channels: Channels, samples: &[f32]) -> Result<Self, MixError> {
        let stride = channels.count();
        if samples.is_empty() || samples.len() % stride != 0 {
            return Err(MixError::BadArgument);
        }

        // round up to a multiple of 4 frames, padding with silence
        let frames = (samples.len() / stride + 3) & !3;

        #[cfg(feature = "simd")]
        let data = {
            let mut data = vec![f32x4::splat(0.0); frames * stride / 4];
            for (i, &sample) in samples.iter().enumerate() {
                data[i / 4][i % 4] = sample;
            }
            data
        };
        #[cfg(not(feature = "simd"))]
        let data = {
            let mut data = vec![0.0; frames * stride];
            data[..samples.len()].copy_from_slice(samples);
            data
        };

        Ok(Self { channels, frames: frames as i32, data })
    }

    /// Returns the length of the sound in frames, always a multiple of 4.
    pub const fn frames(&self) -> i32 {
        self.frames
    }

    /// Returns the channel layout of the sound.
    pub const fn channels(&self) -> Channels {
        self.channels
    }
}
