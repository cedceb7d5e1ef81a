// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error-handling code associated with reading VCS sub-files.

use std::path::PathBuf;

use thiserror::Error;

use super::HeaderKey;

/// Problems with the contents of a sub-file's ASCII header, independent of
/// which file it came from.
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("The header contains non-ASCII bytes")]
    NotAscii,

    #[error("The header is missing the required key {0}")]
    MissingKey(HeaderKey),

    #[error("The header key {key} has the invalid value '{value}'")]
    BadValue { key: HeaderKey, value: String },

    #[error("The header key {0} appears more than once")]
    DuplicateKey(String),
}

#[derive(Error, Debug)]
pub enum CaptureReadError {
    #[error("{}: {err}", file.display())]
    Header { file: PathBuf, err: HeaderError },

    #[error("{}: header declares OBS_ID {got}, but observation {expected} was requested", file.display())]
    ObsIdMismatch {
        file: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("{}: header declares SUBOBS_ID {got}, but sub-observation {expected} was requested", file.display())]
    SubobsIdMismatch {
        file: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("{}: header declares COARSE_CHANNEL {got}, but the file is for coarse channel {expected}", file.display())]
    ChannelMismatch {
        file: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("{}: header declares HDR_SIZE {got}, but only {expected}-byte headers are supported", file.display())]
    HeaderSize {
        file: PathBuf,
        expected: usize,
        got: usize,
    },

    #[error("{}: header declares NBIT {got}, but only {expected}-bit samples are supported", file.display())]
    UnsupportedBitDepth {
        file: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("{}: header declares {got} antenna inputs (NINPUTS), but the array configuration has {expected}", file.display())]
    InputCount {
        file: PathBuf,
        expected: usize,
        got: usize,
    },

    #[error("{}: header declares {key} {got}, but the other sub-files of this observation declare {expected}", file.display())]
    FieldDisagreement {
        file: PathBuf,
        key: HeaderKey,
        expected: u64,
        got: u64,
    },

    #[error("{}: header declares {key} of 0", file.display())]
    ZeroField { file: PathBuf, key: HeaderKey },

    #[error("{}: header declares {num_inputs} antenna inputs (NINPUTS) of {samples_per_block} samples (NTIMESAMPLES); a block that large can't be addressed", file.display())]
    BlockSizeOverflow {
        file: PathBuf,
        num_inputs: usize,
        samples_per_block: usize,
    },

    #[error("{}: TRANSFER_SIZE {transfer_size} is not a whole number of {block_size}-byte blocks", file.display())]
    TransferSizeNotBlockMultiple {
        file: PathBuf,
        transfer_size: u64,
        block_size: u64,
    },

    #[error("{}: TRANSFER_SIZE {transfer_size} only covers {num_blocks} block(s); at least {min_blocks} are needed (the first holds metadata)", file.display())]
    TooFewBlocks {
        file: PathBuf,
        transfer_size: u64,
        num_blocks: u64,
        min_blocks: u64,
    },

    #[error("{}: TRANSFER_SIZE {transfer_size} does not match the {data_size} bytes following the header", file.display())]
    TransferSizeMismatch {
        file: PathBuf,
        transfer_size: u64,
        data_size: u64,
    },

    #[error("{}: file is truncated; expected {expected} bytes, but it has {got}", file.display())]
    Truncated {
        file: PathBuf,
        expected: u64,
        got: u64,
    },

    #[error("{}: ran out of blocks after reading {blocks_read}, but {expected} were expected", file.display())]
    UnexpectedEnd {
        file: PathBuf,
        blocks_read: usize,
        expected: usize,
    },

    #[error("{}: {err}", file.display())]
    IO {
        file: PathBuf,
        err: std::io::Error,
    },
}
