// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod reconstruct;

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

const OBS_ID: u32 = 1294797712;
const SUBOBS_ID: u32 = 1294797720;

fn mwa_tdr() -> Command {
    Command::cargo_bin("mwa_tdr").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// The shape of the sub-files of a test sub-observation.
#[derive(Clone, Copy)]
struct SubFileShape {
    num_inputs: usize,
    samples_per_block: usize,
    /// Including the metadata block.
    num_blocks: usize,
}

impl SubFileShape {
    fn bytes_per_block(&self) -> usize {
        self.num_inputs * self.samples_per_block * 2
    }
}

/// Write a sub-file full of `fill`. `header_obs_id` lets the header disagree
/// with the file name.
fn write_sub_file(
    dir: &Path,
    header_obs_id: u32,
    channel: u32,
    shape: SubFileShape,
    fill: [i8; 2],
) -> PathBuf {
    let transfer_size = shape.bytes_per_block() * shape.num_blocks;
    let header = format!(
        "HDR_SIZE 4096\nPOPULATED 1\nOBS_ID {header_obs_id}\nSUBOBS_ID {SUBOBS_ID}\nMODE MWAX_VCS\nUTC_START 2021-01-16-02:01:34\nOBS_OFFSET 8\nNBIT 8\nNPOL 2\nNTIMESAMPLES {}\nNINPUTS {}\nNINPUTS_XGPU {}\nAPPLY_PATH_WEIGHTS 0\nAPPLY_PATH_DELAYS 0\nINT_TIME_MSEC 500\nFSCRUNCH_FACTOR 50\nAPPLY_VIS_WEIGHTS 0\nTRANSFER_SIZE {transfer_size}\nPROJ_ID G0024\nEXPOSURE_SECS 8\nCOARSE_CHANNEL {channel}\nCORR_COARSE_CHANNEL {}\nSECS_PER_SUBOBS 8\nUNIXTIME 1610762494\nUNIXTIME_MSEC 0\nFINE_CHAN_WIDTH_HZ 10000\nNFINE_CHAN 128\nBANDWIDTH_HZ 1280000\nSAMPLE_RATE 1280000\nMC_IP 0.0.0.0\nMC_PORT 0\nMC_SRC_IP 0.0.0.0\n",
        shape.samples_per_block,
        shape.num_inputs,
        shape.num_inputs,
        channel.saturating_sub(108),
    );
    let mut header = header.into_bytes();
    header.resize(4096, 0);

    let path = dir.join(format!("{OBS_ID}_{SUBOBS_ID}_{channel}.sub"));
    let mut f = File::create(&path).unwrap();
    f.write_all(&header).unwrap();
    // The metadata block.
    f.write_all(&vec![0xaa; shape.bytes_per_block()]).unwrap();
    let block = fill
        .iter()
        .map(|&c| c as u8)
        .cycle()
        .take(shape.bytes_per_block())
        .collect::<Vec<u8>>();
    for _ in 1..shape.num_blocks {
        f.write_all(&block).unwrap();
    }
    path
}

/// Write `{OBS_ID}.toml` describing `num_tiles` tiles, numbered from 1, with
/// `flagged_tiles` flagged.
fn write_array_config(dir: &Path, channels: &[u32], num_tiles: u32, flagged_tiles: &[u32]) {
    let mut text = format!("obs_id = {OBS_ID}\nchannels = {channels:?}\n");
    for tile in 1..=num_tiles {
        for pol in ["X", "Y"] {
            text.push_str(&format!(
                "\n[[inputs]]\ntile = {tile}\npol = \"{pol}\"\nflagged = {}\n",
                flagged_tiles.contains(&tile)
            ));
        }
    }
    std::fs::write(dir.join(format!("{OBS_ID}.toml")), text).unwrap();
}

/// An identity inverse filter: every branch passes its newest sample.
fn write_identity_ipfb(path: &Path, rows: usize, taps: usize) {
    let mut values = vec![0.0f32; rows * taps];
    for r in 0..rows {
        values[r * taps + taps - 1] = 1.0;
    }
    let bytes = values
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect::<Vec<u8>>();
    std::fs::write(path, bytes).unwrap();
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}
