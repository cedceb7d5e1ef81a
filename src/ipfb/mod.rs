// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The inverse poly-phase filter bank.
//!
//! Each row of the coefficient matrix is a branch: a FIR filter with one tap
//! per channelization factor. Output samples cycle through the branches, so
//! output sample `g` of a stream is
//!
//! `y[g] = Σ_j h[g mod R][j] · x[g - (K - 1) + j]`
//!
//! where `R` is the number of branches and `K` the number of taps. Samples
//! before the start of the stream are zero.

mod error;

pub use error::IpfbError;

use num_complex::Complex;

use crate::io::read::InverseFilterCoefficients;

/// The read-only filter bank, shared by every antenna input and channel.
#[derive(Debug, Clone)]
pub struct InverseFilterBank {
    /// The non-zero taps of each branch, as (tap index, coefficient).
    branches: Vec<Vec<(usize, f32)>>,
    num_taps: usize,
}

/// The part of a stream that a [InverseFilterBank] needs to carry across
/// blocks: the last `K - 1` input samples and which branch comes next.
#[derive(Debug, Clone)]
pub struct FilterState {
    history: Vec<Complex<f32>>,
    phase: usize,
}

impl FilterState {
    /// The number of samples processed so far, modulo the number of branches.
    pub fn phase(&self) -> usize {
        self.phase
    }
}

impl InverseFilterBank {
    pub fn new(
        coeffs: &InverseFilterCoefficients,
        channelization_factor: usize,
    ) -> Result<InverseFilterBank, IpfbError> {
        if coeffs.num_branches() == 0 || coeffs.num_taps() == 0 {
            return Err(IpfbError::Empty {
                branches: coeffs.num_branches(),
                taps: coeffs.num_taps(),
            });
        }
        if coeffs.num_taps() != channelization_factor {
            return Err(IpfbError::ChannelizationMismatch {
                taps: coeffs.num_taps(),
                channelization_factor,
            });
        }

        let branches = coeffs
            .view()
            .outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &c)| c != 0.0)
                    .map(|(j, &c)| (j, c))
                    .collect()
            })
            .collect();
        Ok(InverseFilterBank {
            branches,
            num_taps: channelization_factor,
        })
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn num_taps(&self) -> usize {
        self.num_taps
    }

    /// A state for the start of a stream.
    pub fn new_state(&self) -> FilterState {
        FilterState {
            history: vec![Complex::default(); self.num_taps - 1],
            phase: 0,
        }
    }

    /// Filter the next block of a stream. The output has as many samples as
    /// the input.
    pub fn process(&self, state: &mut FilterState, block: &[Complex<f32>]) -> Vec<Complex<f32>> {
        debug_assert_eq!(state.history.len(), self.num_taps - 1);
        let num_branches = self.branches.len();

        // `window[i + j]` is the input sample under tap `j` for output `i`.
        state.history.extend_from_slice(block);
        let window = &state.history;
        let out = (0..block.len())
            .map(|i| {
                self.branches[(state.phase + i) % num_branches]
                    .iter()
                    .map(|&(j, c)| window[i + j] * c)
                    .sum::<Complex<f32>>()
            })
            .collect();

        state.history.drain(..block.len());
        state.phase = (state.phase + block.len()) % num_branches;
        out
    }
}
