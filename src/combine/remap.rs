// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where coarse channels land in the reconstructed band.
//!
//! The receiver samples a real band at twice the channelization factor, so
//! coarse channel `c` is centred on frequency `c` (in units of the coarse
//! channel width). Resampling that band at `2n` aliases channel `c` to
//! `c mod 2n`; anything above the new Nyquist frequency `n` folds back to
//! `2n - (c mod 2n)` with its spectrum reversed. The output sample rate is
//! the smallest such `2n` that keeps every channel in its own slot strictly
//! between DC and Nyquist.

use std::collections::HashSet;

use itertools::Itertools;
use thiserror::Error;

/// Where one coarse channel goes in the reconstructed band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemappedChannel {
    /// The receiver channel number.
    pub channel: u32,
    /// The position of the channel's centre in the output band, in coarse
    /// channel widths above DC.
    pub slot: usize,
    /// Does the channel's spectrum need to be reversed?
    pub flipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRemapping {
    oversampling_ratio: usize,
    /// Ascending by channel number.
    channels: Vec<RemappedChannel>,
}

impl ChannelRemapping {
    /// The number of output samples per native coarse channel sample.
    pub fn oversampling_ratio(&self) -> usize {
        self.oversampling_ratio
    }

    /// The output Nyquist frequency, in coarse channel widths.
    pub fn nyquist_slot(&self) -> usize {
        self.oversampling_ratio / 2
    }

    pub fn channels(&self) -> &[RemappedChannel] {
        &self.channels
    }

    pub fn get(&self, channel: u32) -> Option<&RemappedChannel> {
        self.channels.iter().find(|c| c.channel == channel)
    }
}

fn alias(channel: usize, nyquist: usize) -> Option<(usize, bool)> {
    let a = channel % (2 * nyquist);
    if a == 0 || a == nyquist {
        None
    } else if a > nyquist {
        Some((2 * nyquist - a, true))
    } else {
        Some((a, false))
    }
}

/// Work out where each coarse channel goes in the reconstructed band.
/// Channel numbers must be in `1..=channelization_factor`.
pub fn compute_channel_remapping(
    channels: &[u32],
    channelization_factor: usize,
) -> Result<ChannelRemapping, RemapError> {
    if channels.is_empty() {
        return Err(RemapError::NoChannels);
    }
    let channels = channels.iter().copied().sorted().collect::<Vec<_>>();
    if let Some((&c, _)) = channels.iter().tuple_windows().find(|(a, b)| a == b) {
        return Err(RemapError::Duplicate(c));
    }
    if let Some(&c) = channels
        .iter()
        .find(|&&c| c == 0 || c as usize > channelization_factor)
    {
        return Err(RemapError::OutOfBand {
            channel: c,
            channelization_factor,
        });
    }

    // Slots 1..n-1 can hold at most n-1 channels. Once n exceeds the highest
    // channel, nothing aliases, so this always finishes.
    let mut nyquist = (channels.len() + 1).max(2);
    loop {
        let mapped = channels
            .iter()
            .map(|&c| {
                alias(c as usize, nyquist).map(|(slot, flipped)| RemappedChannel {
                    channel: c,
                    slot,
                    flipped,
                })
            })
            .collect::<Option<Vec<_>>>();
        if let Some(mapped) = mapped {
            let mut slots = HashSet::new();
            if mapped.iter().all(|m| slots.insert(m.slot)) {
                return Ok(ChannelRemapping {
                    oversampling_ratio: 2 * nyquist,
                    channels: mapped,
                });
            }
        }
        nyquist += 1;
    }
}

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("No coarse channels were given")]
    NoChannels,

    #[error("Coarse channel {0} was given more than once")]
    Duplicate(u32),

    #[error("Coarse channel {channel} is outside of the receiver's band (1 to {channelization_factor})")]
    OutOfBand {
        channel: u32,
        channelization_factor: usize,
    },
}
