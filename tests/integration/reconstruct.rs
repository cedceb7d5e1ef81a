// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against the mwa_tdr binary.

use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

use crate::*;

const SHAPE: SubFileShape = SubFileShape {
    num_inputs: 8,
    samples_per_block: 64,
    num_blocks: 4,
};

struct Inputs {
    dir: TempDir,
    ipfb: PathBuf,
}

/// 24 contiguous channels of zeros, 4 tiles, identity inverse filter.
fn zero_inputs(flagged_tiles: &[u32]) -> Inputs {
    let dir = tempdir().unwrap();
    let channels = (109..=132).collect::<Vec<u32>>();
    write_array_config(dir.path(), &channels, 4, flagged_tiles);
    for &channel in &channels {
        write_sub_file(dir.path(), OBS_ID, channel, SHAPE, [0, 0]);
    }
    let ipfb = dir.path().join("ipfb_coeffs.bin");
    write_identity_ipfb(&ipfb, 13, 256);
    Inputs { dir, ipfb }
}

fn run(inputs: &Inputs, output_dir: &Path) -> (bool, String, String) {
    let result = mwa_tdr()
        .arg(inputs.dir.path())
        .arg(OBS_ID.to_string())
        .arg(SUBOBS_ID.to_string())
        .arg(&inputs.ipfb)
        .arg(output_dir)
        .arg("false")
        .arg("--no-progress-bars")
        .ok();
    let success = result.is_ok();
    let (stdout, stderr) = get_cmd_output(result);
    (success, stdout, stderr)
}

fn tile_file(tile: u32, pol: &str) -> String {
    format!("{OBS_ID}_{SUBOBS_ID}_{tile}_{pol}.bin")
}

fn log_file() -> String {
    format!("{OBS_ID}_{SUBOBS_ID}_outputlog.txt")
}

#[test]
fn test_zeros_through_identity_filter() {
    let inputs = zero_inputs(&[2]);
    let output = tempdir().unwrap();
    let (success, stdout, stderr) = run(&inputs, output.path());
    assert!(success, "stdout: {stdout}\nstderr: {stderr}");

    let mut expected = vec![log_file()];
    for tile in [1, 3, 4] {
        expected.push(tile_file(tile, "X"));
        expected.push(tile_file(tile, "Y"));
    }
    expected.sort();
    assert_eq!(dir_entries(output.path()), expected);

    // 3 data blocks of 64 samples, oversampled by 54 for 24 channels.
    let expected_len = 3 * 64 * 54;
    for name in expected.iter().filter(|n| n.ends_with(".bin")) {
        let bytes = std::fs::read(output.path().join(name)).unwrap();
        assert_eq!(bytes.len(), expected_len * 2, "{name}");
        assert!(bytes.iter().all(|&b| b == 0), "{name}");
    }

    let log = std::fs::read_to_string(output.path().join(log_file())).unwrap();
    assert!(log.contains("Tile 2 X: SKIPPED (flagged)"));
    assert!(log.contains("Tile 2 Y: SKIPPED (flagged)"));
    assert!(!log.contains("Tile 2 X: OK"));
    assert!(log.contains("Oversampling ratio 54"));
    assert!(log.trim_end().ends_with("Run succeeded"));
}

#[test]
fn test_output_length_ignores_flags() {
    let flag_sets: [&[u32]; 2] = [&[], &[1, 2, 3]];
    let lengths = flag_sets
        .iter()
        .map(|flagged| {
            let inputs = zero_inputs(flagged);
            let output = tempdir().unwrap();
            let (success, stdout, stderr) = run(&inputs, output.path());
            assert!(success, "stdout: {stdout}\nstderr: {stderr}");
            std::fs::metadata(output.path().join(tile_file(4, "Y")))
                .unwrap()
                .len()
        })
        .collect::<Vec<_>>();
    assert_eq!(lengths[0], lengths[1]);
}

#[test]
fn test_reruns_are_byte_identical() {
    let inputs = zero_inputs(&[]);
    // Something other than zeros.
    write_sub_file(inputs.dir.path(), OBS_ID, 120, SHAPE, [5, -3]);

    let output = tempdir().unwrap();
    let (success, _, stderr) = run(&inputs, output.path());
    assert!(success, "{stderr}");
    let first = std::fs::read(output.path().join(tile_file(1, "X"))).unwrap();
    assert!(first.iter().any(|&b| b != 0));

    let (success, _, stderr) = run(&inputs, output.path());
    assert!(success, "{stderr}");
    let second = std::fs::read(output.path().join(tile_file(1, "X"))).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_wrong_obs_id_in_header() {
    let inputs = zero_inputs(&[]);
    write_sub_file(inputs.dir.path(), OBS_ID + 1, 115, SHAPE, [0, 0]);

    let output = tempdir().unwrap();
    let (success, _, stderr) = run(&inputs, output.path());
    assert!(!success);
    assert!(stderr.starts_with("Error:"), "{stderr}");
    assert!(dir_entries(output.path()).is_empty());
}

#[test]
fn test_truncated_sub_file() {
    let inputs = zero_inputs(&[]);
    let path = inputs
        .dir
        .path()
        .join(format!("{OBS_ID}_{SUBOBS_ID}_130.sub"));
    let len = std::fs::metadata(&path).unwrap().len();
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 100)
        .unwrap();

    let output = tempdir().unwrap();
    let (success, _, stderr) = run(&inputs, output.path());
    assert!(!success);
    assert!(stderr.contains("truncated"), "{stderr}");
    assert!(dir_entries(output.path()).is_empty());
}

#[test]
fn test_malformed_ipfb() {
    let inputs = zero_inputs(&[]);
    std::fs::write(&inputs.ipfb, [0u8; 4 * 255]).unwrap();

    let output = tempdir().unwrap();
    let (success, _, _) = run(&inputs, output.path());
    assert!(!success);
    assert!(dir_entries(output.path()).is_empty());
}

#[test]
fn test_missing_arguments() {
    let result = mwa_tdr().arg("somewhere").ok();
    assert!(result.is_err());
}
