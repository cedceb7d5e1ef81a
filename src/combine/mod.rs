// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stacking inverse-filtered coarse channels into one real voltage stream.
//!
//! Each block of every channel is Fourier transformed and its bins placed
//! around the channel's slot (see [ChannelRemapping]) in the half-spectrum
//! of a real signal `S` times longer, where `S` is the oversampling ratio.
//! An inverse real FFT then gives the block's contribution to the output.

mod remap;

pub use remap::{compute_channel_remapping, ChannelRemapping, RemapError, RemappedChannel};

use std::sync::Arc;

use num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner};
use rustfft::{Fft, FftPlanner};
use thiserror::Error;

pub struct ChannelCombiner {
    remapping: ChannelRemapping,
    block_len: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl std::fmt::Debug for ChannelCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCombiner")
            .field("remapping", &self.remapping)
            .field("block_len", &self.block_len)
            .finish()
    }
}

impl ChannelCombiner {
    /// `block_len` is the number of native samples per channel that are
    /// combined at a time.
    pub fn new(remapping: ChannelRemapping, block_len: usize) -> ChannelCombiner {
        let forward = FftPlanner::new().plan_fft_forward(block_len);
        let inverse =
            RealFftPlanner::new().plan_fft_inverse(block_len * remapping.oversampling_ratio());
        ChannelCombiner {
            remapping,
            block_len,
            forward,
            inverse,
        }
    }

    pub fn remapping(&self) -> &ChannelRemapping {
        &self.remapping
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// The number of real samples produced by [ChannelCombiner::combine].
    pub fn output_len_per_block(&self) -> usize {
        self.block_len * self.remapping.oversampling_ratio()
    }

    /// Combine one block of every channel. `channels` must be in the same
    /// order as [ChannelRemapping::channels], each holding exactly
    /// [ChannelCombiner::block_len] samples. The buffers are reused as FFT
    /// workspace.
    pub fn combine(&self, channels: Vec<Vec<Complex<f32>>>) -> Result<Vec<f32>, CombineError> {
        let n = self.block_len;
        if channels.len() != self.remapping.channels().len() {
            return Err(CombineError::ChannelCount {
                expected: self.remapping.channels().len(),
                got: channels.len(),
            });
        }

        let mut spectrum = self.inverse.make_input_vec();
        let mut scratch = vec![Complex::default(); self.forward.get_inplace_scratch_len()];
        for (mapping, mut samples) in self.remapping.channels().iter().zip(channels) {
            if samples.len() != n {
                return Err(CombineError::BlockLength {
                    channel: mapping.channel,
                    expected: n,
                    got: samples.len(),
                });
            }
            self.forward.process_with_scratch(&mut samples, &mut scratch);

            // Bins never reach DC or Nyquist; the closest a channel gets is
            // half a channel width away.
            let centre = (mapping.slot * n) as isize;
            for (k, x) in samples.into_iter().enumerate() {
                let f = if k < (n + 1) / 2 {
                    k as isize
                } else {
                    k as isize - n as isize
                };
                if mapping.flipped {
                    spectrum[(centre - f) as usize] += x.conj();
                } else {
                    spectrum[(centre + f) as usize] += x;
                }
            }
        }

        let mut output = self.inverse.make_output_vec();
        self.inverse.process(&mut spectrum, &mut output)?;
        let scale = 1.0 / n as f32;
        output.iter_mut().for_each(|v| *v *= scale);
        Ok(output)
    }
}

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Expected {expected} channels to combine, but got {got}")]
    ChannelCount { expected: usize, got: usize },

    #[error("Channel {channel} has {got} samples to combine, but {expected} were expected")]
    BlockLength {
        channel: u32,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Fft(#[from] realfft::FftError),
}
