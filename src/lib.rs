// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time-domain voltage reconstruction for Murchison Widefield Array (MWA) VCS
//! data.
//!
//! Raw VCS sub-files hold the receiver's coarse-channelised, 8-bit complex
//! voltages of every antenna input, one file per coarse channel. `mwa_tdr`
//! undoes the receiver's poly-phase filter bank ("de-ripples" each coarse
//! channel with an inverse filter), then restacks the coarse channels into a
//! single real-valued voltage stream per tile and polarisation.

mod cli;
mod combine;
mod constants;
mod error;
mod io;
mod ipfb;
mod metadata;
mod misc;
mod params;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This should only ever be enabled by CLI
    /// code.
    static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}

// Re-exports.
pub use cli::Tdr;
pub use combine::{compute_channel_remapping, ChannelCombiner, ChannelRemapping, RemappedChannel};
pub use error::TdrError;
pub use io::read::{
    CaptureHeader, ChannelBlock, ChannelStreamReader, InverseFilterCoefficients,
};
pub use io::write::{ObservationLog, TileOutputWriter};
pub use ipfb::{FilterState, InverseFilterBank};
pub use metadata::{AntennaInput, ArrayConfig, CaptureMetadata, Observation, Polarisation};
pub use params::{ReconstructParams, ReconstructionSummary};
