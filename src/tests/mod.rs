// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests: synthetic sub-files, array configurations and
//! inverse filter coefficients.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::constants::{CAPTURE_HEADER_SIZE, COMPONENTS_PER_SAMPLE};

/// A description of a sub-file to be written to disk.
#[derive(Debug, Clone)]
pub(crate) struct SyntheticCapture {
    pub(crate) obs_id: u32,
    pub(crate) subobs_id: u32,
    pub(crate) channel: u32,
    pub(crate) num_inputs: usize,
    pub(crate) samples_per_block: usize,
    /// Including the metadata block.
    pub(crate) num_blocks: usize,
    pub(crate) nbit: u32,
    pub(crate) hdr_size: usize,
    /// If set, this is written to the header instead of the real size.
    pub(crate) transfer_size: Option<u64>,
    pub(crate) extra_header: Vec<(String, String)>,
}

impl SyntheticCapture {
    pub(crate) fn new(
        obs_id: u32,
        subobs_id: u32,
        channel: u32,
        num_inputs: usize,
        samples_per_block: usize,
        num_blocks: usize,
    ) -> SyntheticCapture {
        SyntheticCapture {
            obs_id,
            subobs_id,
            channel,
            num_inputs,
            samples_per_block,
            num_blocks,
            nbit: 8,
            hdr_size: CAPTURE_HEADER_SIZE,
            transfer_size: None,
            extra_header: vec![],
        }
    }

    pub(crate) fn bytes_per_block(&self) -> usize {
        self.num_inputs * self.samples_per_block * COMPONENTS_PER_SAMPLE
    }

    pub(crate) fn transfer_size(&self) -> u64 {
        self.transfer_size
            .unwrap_or((self.bytes_per_block() * self.num_blocks) as u64)
    }

    pub(crate) fn file_name(&self) -> String {
        format!("{}_{}_{}.sub", self.obs_id, self.subobs_id, self.channel)
    }

    pub(crate) fn header_text(&self) -> String {
        let mut text = format!(
            "HDR_SIZE {}\nPOPULATED 1\nOBS_ID {}\nSUBOBS_ID {}\nMODE MWAX_VCS\nUTC_START 2021-01-16-02:01:34\nOBS_OFFSET 0\nNBIT {}\nNPOL 2\nNTIMESAMPLES {}\nNINPUTS {}\nNINPUTS_XGPU {}\nAPPLY_PATH_WEIGHTS 0\nAPPLY_PATH_DELAYS 0\nINT_TIME_MSEC 500\nFSCRUNCH_FACTOR 50\nAPPLY_VIS_WEIGHTS 0\nTRANSFER_SIZE {}\nPROJ_ID G0024\nEXPOSURE_SECS 8\nCOARSE_CHANNEL {}\nCORR_COARSE_CHANNEL 1\nSECS_PER_SUBOBS 8\nUNIXTIME 1610762494\nUNIXTIME_MSEC 0\nFINE_CHAN_WIDTH_HZ 10000\nNFINE_CHAN 128\nBANDWIDTH_HZ 1280000\nSAMPLE_RATE 1280000\nMC_IP 0.0.0.0\nMC_PORT 0\nMC_SRC_IP 0.0.0.0\n",
            self.hdr_size,
            self.obs_id,
            self.subobs_id,
            self.nbit,
            self.samples_per_block,
            self.num_inputs,
            self.num_inputs,
            self.transfer_size(),
            self.channel,
        );
        for (k, v) in &self.extra_header {
            text.push_str(&format!("{k} {v}\n"));
        }
        text
    }

    pub(crate) fn header_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header_text().into_bytes();
        assert!(bytes.len() <= CAPTURE_HEADER_SIZE);
        bytes.resize(CAPTURE_HEADER_SIZE, 0);
        bytes
    }

    /// Write the sub-file into `dir`. `sample` is given the data block index
    /// (metadata block excluded), the input index and the sample index. The
    /// metadata block is filled with junk.
    pub(crate) fn write_with<F>(&self, dir: &Path, sample: F) -> PathBuf
    where
        F: Fn(usize, usize, usize) -> [i8; 2],
    {
        let path = dir.join(self.file_name());
        let mut f = File::create(&path).unwrap();
        f.write_all(&self.header_bytes()).unwrap();
        f.write_all(&vec![0x55; self.bytes_per_block()]).unwrap();
        for block in 0..self.num_blocks.saturating_sub(1) {
            let mut data = Vec::with_capacity(self.bytes_per_block());
            for input in 0..self.num_inputs {
                for s in 0..self.samples_per_block {
                    let [re, im] = sample(block, input, s);
                    data.push(re as u8);
                    data.push(im as u8);
                }
            }
            f.write_all(&data).unwrap();
        }
        path
    }

    pub(crate) fn write_zeros(&self, dir: &Path) -> PathBuf {
        self.write_with(dir, |_, _, _| [0, 0])
    }
}

/// Write `{obs_id}.toml` into `dir`. Each input is (tile, pol, flagged).
pub(crate) fn write_toml_config(
    dir: &Path,
    obs_id: u32,
    channels: &[u32],
    inputs: &[(u32, &str, bool)],
) -> PathBuf {
    let mut text = format!("obs_id = {obs_id}\nchannels = {channels:?}\n");
    for (tile, pol, flagged) in inputs {
        text.push_str(&format!(
            "\n[[inputs]]\ntile = {tile}\npol = \"{pol}\"\nflagged = {flagged}\n"
        ));
    }
    let path = dir.join(format!("{obs_id}.toml"));
    std::fs::write(&path, text).unwrap();
    path
}

/// Write little-endian f32 coefficients, row-major.
pub(crate) fn write_coefficients(path: &Path, values: &[f32]) {
    let mut f = File::create(path).unwrap();
    for &v in values {
        f.write_f32::<LittleEndian>(v).unwrap();
    }
}

/// Row-major identity coefficients: every branch passes its newest sample.
pub(crate) fn identity_coefficients(rows: usize, taps: usize) -> Vec<f32> {
    let mut values = vec![0.0; rows * taps];
    for r in 0..rows {
        values[r * taps + taps - 1] = 1.0;
    }
    values
}
