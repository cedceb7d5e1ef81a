// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Most of these describe the MWAX VCS sub-file format and the MWA receiver.
 */

/// The size of the ASCII header at the start of every VCS sub-file \[bytes\].
pub(crate) const CAPTURE_HEADER_SIZE: usize = 4096;

/// The only sample bit depth currently understood.
pub(crate) const SUPPORTED_NBIT: u32 = 8;

/// Each complex sample is a real and an imaginary component.
pub(crate) const COMPONENTS_PER_SAMPLE: usize = 2;

/// The number of blocks at the start of each sub-file that hold metadata (e.g.
/// delays) rather than voltages.
pub(crate) const NUM_METADATA_BLOCKS: usize = 1;

/// The number of coarse channels produced by the MWA receiver's poly-phase
/// filter bank. The receiver samples its band at twice this rate.
pub(crate) const MWA_CHANNELIZATION_FACTOR: usize = 256;

/// The file extension of VCS sub-files.
pub(crate) const CAPTURE_FILE_EXTENSION: &str = "sub";

/// The capacity of the channel between the block-reading thread and the
/// processing thread. Each slot holds one block of every coarse channel.
pub(crate) const BLOCK_QUEUE_DEPTH: usize = 1;
