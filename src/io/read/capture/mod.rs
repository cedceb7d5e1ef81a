// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read MWAX VCS sub-files, one coarse channel per file.
//!
//! A sub-file is a fixed-size ASCII header followed by equal-sized blocks.
//! Each block holds `NTIMESAMPLES` complex 8-bit samples for every antenna
//! input, input-major. The first block carries metadata and is skipped.

mod error;
mod header;

pub use error::{CaptureReadError, HeaderError};
pub(crate) use header::CaptureExpectation;
use header::BlockLayout;
pub use header::{CaptureHeader, HeaderKey};

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use log::trace;
use num_complex::Complex;

use crate::constants::{CAPTURE_HEADER_SIZE, COMPONENTS_PER_SAMPLE, NUM_METADATA_BLOCKS};

/// One block of voltages for a single coarse channel.
#[derive(Debug, Clone)]
pub struct ChannelBlock {
    channel: u32,
    index: usize,
    num_inputs: usize,
    samples_per_input: usize,
    data: Vec<u8>,
}

impl ChannelBlock {
    /// The receiver channel number this block belongs to.
    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// The position of this block among the data blocks of its file.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn samples_per_input(&self) -> usize {
        self.samples_per_input
    }

    /// The raw (real, imaginary) samples of one antenna input.
    ///
    /// # Panics
    ///
    /// If `input` is not less than [ChannelBlock::num_inputs].
    pub fn input_samples(&self, input: usize) -> &[[i8; 2]] {
        let stride = self.samples_per_input * COMPONENTS_PER_SAMPLE;
        bytemuck::cast_slice(&self.data[input * stride..(input + 1) * stride])
    }

    /// Decode the samples of one antenna input. 8-bit values are represented
    /// exactly.
    pub fn decode_input(&self, input: usize) -> Vec<Complex<f32>> {
        self.input_samples(input)
            .iter()
            .map(|&[re, im]| Complex::new(f32::from(re), f32::from(im)))
            .collect()
    }
}

/// Reads the data blocks of a single sub-file in order. The header is
/// validated against the observation when the file is opened; blocks are read
/// lazily by iterating.
#[derive(Debug)]
pub struct ChannelStreamReader {
    path: PathBuf,
    file: BufReader<File>,
    header: CaptureHeader,
    layout: BlockLayout,
    blocks_read: usize,
    failed: bool,
}

/// Open a sub-file and decode its header, leaving the reader at the start of
/// the first block. The length of the file is also returned.
fn open_with_header(
    path: &Path,
) -> Result<(BufReader<File>, CaptureHeader, u64), CaptureReadError> {
    let io_err = |err| CaptureReadError::IO {
        file: path.to_path_buf(),
        err,
    };

    let file = File::open(path).map_err(io_err)?;
    let file_len = file.metadata().map_err(io_err)?.len();
    if file_len < CAPTURE_HEADER_SIZE as u64 {
        return Err(CaptureReadError::Truncated {
            file: path.to_path_buf(),
            expected: CAPTURE_HEADER_SIZE as u64,
            got: file_len,
        });
    }

    let mut file = BufReader::new(file);
    let mut header_bytes = vec![0; CAPTURE_HEADER_SIZE];
    file.read_exact(&mut header_bytes).map_err(io_err)?;
    let header = CaptureHeader::parse(&header_bytes).map_err(|err| CaptureReadError::Header {
        file: path.to_path_buf(),
        err,
    })?;
    Ok((file, header, file_len))
}

/// Read only the header of a sub-file.
pub(crate) fn read_header(path: &Path) -> Result<CaptureHeader, CaptureReadError> {
    open_with_header(path).map(|(_, header, _)| header)
}

impl ChannelStreamReader {
    pub(crate) fn open(
        path: &Path,
        expected: &CaptureExpectation,
    ) -> Result<ChannelStreamReader, CaptureReadError> {
        let (mut file, header, file_len) = open_with_header(path)?;
        let layout = header.validate(path, file_len, expected)?;
        trace!(
            "{}: {} blocks of {} bytes",
            path.display(),
            layout.num_blocks,
            layout.bytes_per_block
        );

        let skip = (NUM_METADATA_BLOCKS * layout.bytes_per_block) as i64;
        file.seek(SeekFrom::Current(skip))
            .map_err(|err| CaptureReadError::IO {
                file: path.to_path_buf(),
                err,
            })?;

        Ok(ChannelStreamReader {
            path: path.to_path_buf(),
            file,
            header,
            layout,
            blocks_read: 0,
            failed: false,
        })
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of voltage blocks in this file (metadata blocks excluded).
    pub fn num_data_blocks(&self) -> usize {
        self.layout.num_data_blocks()
    }

    pub fn blocks_read(&self) -> usize {
        self.blocks_read
    }
}

impl Iterator for ChannelStreamReader {
    type Item = Result<ChannelBlock, CaptureReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.blocks_read == self.layout.num_data_blocks() {
            return None;
        }

        let mut data = vec![0; self.layout.bytes_per_block];
        if let Err(err) = self.file.read_exact(&mut data) {
            self.failed = true;
            let e = if err.kind() == std::io::ErrorKind::UnexpectedEof {
                CaptureReadError::UnexpectedEnd {
                    file: self.path.clone(),
                    blocks_read: self.blocks_read,
                    expected: self.layout.num_data_blocks(),
                }
            } else {
                CaptureReadError::IO {
                    file: self.path.clone(),
                    err,
                }
            };
            return Some(Err(e));
        }

        let block = ChannelBlock {
            channel: self.header.coarse_channel,
            index: self.blocks_read,
            num_inputs: self.header.num_inputs,
            samples_per_input: self.header.samples_per_block,
            data,
        };
        self.blocks_read += 1;
        Some(Ok(block))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.layout.num_data_blocks() - self.blocks_read;
        (0, Some(remaining))
    }
}
