// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ASCII header at the start of each VCS sub-file.

use std::{path::Path, str::FromStr};

use hifitime::Epoch;
use indexmap::IndexMap;
use strum_macros::{Display, EnumString, IntoStaticStr};

use super::{CaptureReadError, HeaderError};
use crate::{
    constants::{CAPTURE_HEADER_SIZE, COMPONENTS_PER_SAMPLE, NUM_METADATA_BLOCKS, SUPPORTED_NBIT},
    misc::unix_time_to_epoch,
};

/// The header keys that must be present in every sub-file.
#[derive(Debug, Display, EnumString, IntoStaticStr, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKey {
    #[strum(serialize = "HDR_SIZE")]
    HdrSize,
    #[strum(serialize = "OBS_ID")]
    ObsId,
    #[strum(serialize = "SUBOBS_ID")]
    SubobsId,
    #[strum(serialize = "NBIT")]
    Nbit,
    #[strum(serialize = "NPOL")]
    Npol,
    #[strum(serialize = "NINPUTS")]
    Ninputs,
    #[strum(serialize = "NTIMESAMPLES")]
    NTimeSamples,
    #[strum(serialize = "TRANSFER_SIZE")]
    TransferSize,
    #[strum(serialize = "COARSE_CHANNEL")]
    CoarseChannel,
    #[strum(serialize = "CORR_COARSE_CHANNEL")]
    CorrCoarseChannel,
    #[strum(serialize = "INT_TIME_MSEC")]
    IntTimeMsec,
    #[strum(serialize = "SECS_PER_SUBOBS")]
    SecsPerSubobs,
    #[strum(serialize = "SAMPLE_RATE")]
    SampleRate,
    #[strum(serialize = "UNIXTIME")]
    UnixTime,
    #[strum(serialize = "UNIXTIME_MSEC")]
    UnixTimeMsec,
}

/// A decoded sub-file header. Everything needed to interpret the file is
/// pulled out into typed fields once; everything else is kept, in order, in
/// `other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureHeader {
    pub hdr_size: usize,
    pub obs_id: u32,
    pub subobs_id: u32,
    pub nbit: u32,
    pub npol: u32,
    /// The number of antenna inputs (tiles × polarisations) in every block.
    pub num_inputs: usize,
    /// The number of time samples per antenna input per block.
    pub samples_per_block: usize,
    /// The number of bytes following the header.
    pub transfer_size: u64,
    /// The receiver channel number.
    pub coarse_channel: u32,
    /// The correlator's (1-indexed) channel number.
    pub corr_coarse_channel: u32,
    pub int_time_msec: u32,
    pub secs_per_subobs: u32,
    /// Complex samples per second per antenna input \[Hz\].
    pub sample_rate: u64,
    pub unixtime: u64,
    pub unixtime_msec: u32,
    pub other: IndexMap<String, String>,
}

/// What a sub-file's header must agree with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CaptureExpectation {
    pub(crate) obs_id: u32,
    pub(crate) subobs_id: u32,
    pub(crate) channel: u32,
    pub(crate) num_inputs: usize,
    /// If known, the NTIMESAMPLES that all sub-files must share.
    pub(crate) samples_per_block: Option<usize>,
    /// If known, the TRANSFER_SIZE that all sub-files must share.
    pub(crate) transfer_size: Option<u64>,
}

/// How the blocks following a header are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockLayout {
    pub(crate) bytes_per_input: usize,
    pub(crate) bytes_per_block: usize,
    /// Including metadata blocks.
    pub(crate) num_blocks: usize,
}

impl BlockLayout {
    pub(crate) fn num_data_blocks(&self) -> usize {
        self.num_blocks - NUM_METADATA_BLOCKS
    }
}

fn take<T: FromStr>(fields: &mut IndexMap<String, String>, key: HeaderKey) -> Result<T, HeaderError> {
    let name: &'static str = key.into();
    let value = fields
        .shift_remove(name)
        .ok_or(HeaderError::MissingKey(key))?;
    value
        .parse()
        .map_err(|_| HeaderError::BadValue { key, value })
}

impl CaptureHeader {
    /// Decode the raw header bytes. The text is expected to be NUL padded.
    pub fn parse(bytes: &[u8]) -> Result<CaptureHeader, HeaderError> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = &bytes[..end];
        if !text.is_ascii() {
            return Err(HeaderError::NotAscii);
        }
        let text = std::str::from_utf8(text).map_err(|_| HeaderError::NotAscii)?;

        let mut fields = IndexMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k, v.trim()),
                None => (line, ""),
            };
            if fields.insert(key.to_string(), value.to_string()).is_some() {
                return Err(HeaderError::DuplicateKey(key.to_string()));
            }
        }

        Ok(CaptureHeader {
            hdr_size: take(&mut fields, HeaderKey::HdrSize)?,
            obs_id: take(&mut fields, HeaderKey::ObsId)?,
            subobs_id: take(&mut fields, HeaderKey::SubobsId)?,
            nbit: take(&mut fields, HeaderKey::Nbit)?,
            npol: take(&mut fields, HeaderKey::Npol)?,
            num_inputs: take(&mut fields, HeaderKey::Ninputs)?,
            samples_per_block: take(&mut fields, HeaderKey::NTimeSamples)?,
            transfer_size: take(&mut fields, HeaderKey::TransferSize)?,
            coarse_channel: take(&mut fields, HeaderKey::CoarseChannel)?,
            corr_coarse_channel: take(&mut fields, HeaderKey::CorrCoarseChannel)?,
            int_time_msec: take(&mut fields, HeaderKey::IntTimeMsec)?,
            secs_per_subobs: take(&mut fields, HeaderKey::SecsPerSubobs)?,
            sample_rate: take(&mut fields, HeaderKey::SampleRate)?,
            unixtime: take(&mut fields, HeaderKey::UnixTime)?,
            unixtime_msec: take(&mut fields, HeaderKey::UnixTimeMsec)?,
            other: fields,
        })
    }

    /// Get the value of a header key that doesn't have its own field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.other.get(key).map(|s| s.as_str())
    }

    /// The time of the first sample in this sub-file.
    pub fn start_epoch(&self) -> Epoch {
        unix_time_to_epoch(self.unixtime, self.unixtime_msec)
    }

    /// Check that this header belongs to the given observation,
    /// sub-observation and coarse channel. Disagreeing here means the wrong
    /// file was handed to us, not that the file is malformed.
    pub(crate) fn validate_ids(
        &self,
        file: &Path,
        obs_id: u32,
        subobs_id: u32,
        channel: u32,
    ) -> Result<(), CaptureReadError> {
        if self.obs_id != obs_id {
            return Err(CaptureReadError::ObsIdMismatch {
                file: file.to_path_buf(),
                expected: obs_id,
                got: self.obs_id,
            });
        }
        if self.subobs_id != subobs_id {
            return Err(CaptureReadError::SubobsIdMismatch {
                file: file.to_path_buf(),
                expected: subobs_id,
                got: self.subobs_id,
            });
        }
        if self.coarse_channel != channel {
            return Err(CaptureReadError::ChannelMismatch {
                file: file.to_path_buf(),
                expected: channel,
                got: self.coarse_channel,
            });
        }
        Ok(())
    }

    /// Check this header against what the observation expects, as well as the
    /// size of the file it came from.
    pub(crate) fn validate(
        &self,
        file: &Path,
        file_len: u64,
        expected: &CaptureExpectation,
    ) -> Result<BlockLayout, CaptureReadError> {
        self.validate_ids(file, expected.obs_id, expected.subobs_id, expected.channel)?;
        let file = file.to_path_buf();

        if self.hdr_size != CAPTURE_HEADER_SIZE {
            return Err(CaptureReadError::HeaderSize {
                file,
                expected: CAPTURE_HEADER_SIZE,
                got: self.hdr_size,
            });
        }
        if self.nbit != SUPPORTED_NBIT {
            return Err(CaptureReadError::UnsupportedBitDepth {
                file,
                expected: SUPPORTED_NBIT,
                got: self.nbit,
            });
        }
        if self.num_inputs == 0 {
            return Err(CaptureReadError::ZeroField {
                file,
                key: HeaderKey::Ninputs,
            });
        }
        if self.samples_per_block == 0 {
            return Err(CaptureReadError::ZeroField {
                file,
                key: HeaderKey::NTimeSamples,
            });
        }
        if self.num_inputs != expected.num_inputs {
            return Err(CaptureReadError::InputCount {
                file,
                expected: expected.num_inputs,
                got: self.num_inputs,
            });
        }
        if let Some(samples_per_block) = expected.samples_per_block {
            if self.samples_per_block != samples_per_block {
                return Err(CaptureReadError::FieldDisagreement {
                    file,
                    key: HeaderKey::NTimeSamples,
                    expected: samples_per_block as u64,
                    got: self.samples_per_block as u64,
                });
            }
        }
        if let Some(transfer_size) = expected.transfer_size {
            if self.transfer_size != transfer_size {
                return Err(CaptureReadError::FieldDisagreement {
                    file,
                    key: HeaderKey::TransferSize,
                    expected: transfer_size,
                    got: self.transfer_size,
                });
            }
        }

        let bytes_per_sample = COMPONENTS_PER_SAMPLE * self.nbit as usize / 8;
        let (bytes_per_input, bytes_per_block) = self
            .samples_per_block
            .checked_mul(bytes_per_sample)
            .and_then(|i| Some((i, i.checked_mul(self.num_inputs)?)))
            .filter(|&(_, b)| b > 0)
            .ok_or_else(|| CaptureReadError::BlockSizeOverflow {
                file: file.clone(),
                num_inputs: self.num_inputs,
                samples_per_block: self.samples_per_block,
            })?;
        let block_size = bytes_per_block as u64;
        if self.transfer_size % block_size != 0 {
            return Err(CaptureReadError::TransferSizeNotBlockMultiple {
                file,
                transfer_size: self.transfer_size,
                block_size,
            });
        }
        let num_blocks = self.transfer_size / block_size;
        let min_blocks = NUM_METADATA_BLOCKS as u64 + 1;
        if num_blocks < min_blocks {
            return Err(CaptureReadError::TooFewBlocks {
                file,
                transfer_size: self.transfer_size,
                num_blocks,
                min_blocks,
            });
        }

        // A transfer size this close to u64::MAX can't be backed by any file.
        let expected_len = (self.hdr_size as u64).saturating_add(self.transfer_size);
        match file_len.cmp(&expected_len) {
            std::cmp::Ordering::Less => {
                return Err(CaptureReadError::Truncated {
                    file,
                    expected: expected_len,
                    got: file_len,
                })
            }
            std::cmp::Ordering::Greater => {
                return Err(CaptureReadError::TransferSizeMismatch {
                    file,
                    transfer_size: self.transfer_size,
                    data_size: file_len - self.hdr_size as u64,
                })
            }
            std::cmp::Ordering::Equal => (),
        }

        Ok(BlockLayout {
            bytes_per_input,
            bytes_per_block,
            num_blocks: num_blocks as usize,
        })
    }
}
