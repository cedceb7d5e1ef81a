// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use tempfile::tempdir;

use super::*;
use crate::metadata::{AntennaInput, Polarisation};

const INPUT: AntennaInput = AntennaInput {
    tile: 51,
    pol: Polarisation::Y,
    flagged: false,
};

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn test_tile_file_name() {
    assert_eq!(
        tile_output_file_name(1294797712, 1294797720, &INPUT),
        "1294797712_1294797720_51_Y.bin"
    );
}

#[test]
fn test_write_and_finish() {
    let dir = tempdir().unwrap();
    let mut writer = TileOutputWriter::create(dir.path(), 100, 108, &INPUT).unwrap();
    assert_eq!(dir_entries(dir.path()), vec![".100_108_51_Y.bin.partial"]);

    writer.write_segment(&[0.4, -1.6, 2.5]).unwrap();
    writer.write_segment(&[300.0]).unwrap();
    let path = writer.path().to_path_buf();
    let stats = writer.finish().unwrap();

    assert_eq!(dir_entries(dir.path()), vec!["100_108_51_Y.bin"]);
    let bytes = std::fs::read(path).unwrap();
    // Round half away from zero, little-endian.
    assert_eq!(bytes, vec![0, 0, 0xfe, 0xff, 3, 0, 0x2c, 0x01]);

    assert_eq!(stats.num_samples, 4);
    assert_eq!(stats.min, -2);
    assert_eq!(stats.max, 300);
    assert_eq!(stats.clipped, 0);
}

#[test]
fn test_clipping_is_counted() {
    let dir = tempdir().unwrap();
    let mut writer = TileOutputWriter::create(dir.path(), 100, 108, &INPUT).unwrap();
    writer.write_segment(&[40000.0, -40000.0, 1.0]).unwrap();
    assert_eq!(writer.stats().clipped, 2);
    let path = writer.path().to_path_buf();
    let stats = writer.finish().unwrap();
    assert_eq!(stats.min, i16::MIN);
    assert_eq!(stats.max, i16::MAX);

    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..2], &i16::MAX.to_le_bytes());
    assert_eq!(&bytes[2..4], &i16::MIN.to_le_bytes());
}

#[test]
fn test_unfinished_writer_leaves_nothing_behind() {
    let dir = tempdir().unwrap();
    {
        let mut writer = TileOutputWriter::create(dir.path(), 100, 108, &INPUT).unwrap();
        writer.write_segment(&[1.0; 16]).unwrap();
    }
    assert!(dir_entries(dir.path()).is_empty());
}

#[test]
fn test_empty_stats() {
    let stats = SignalStats::default();
    assert_eq!(stats.rms(), 0.0);
    assert_eq!(
        stats.to_string(),
        "0 samples, min 0, max 0, rms 0.000, clipped 0"
    );
}

#[test]
fn test_observation_log_lines() {
    let dir = tempdir().unwrap();
    let log = ObservationLog::create(dir.path(), 100, 108).unwrap();
    assert_eq!(log.path(), dir.path().join("100_108_outputlog.txt"));
    log.info("Starting").unwrap();
    log.warn("Tile 51 Y: SKIPPED (flagged)").unwrap();
    log.error("Run failed").unwrap();

    let text = std::fs::read_to_string(log.path()).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);

    let (ts, rest) = lines[0].split_once(' ').unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    assert_eq!(rest, "INFO  Starting");
    assert!(lines[1].ends_with("WARN  Tile 51 Y: SKIPPED (flagged)"));
    assert!(lines[2].ends_with("ERROR Run failed"));
}

#[test]
fn test_can_write_to_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("new").join("dir").join("out.bin");
    can_write_to_file(&file).unwrap();
    assert!(file.parent().unwrap().is_dir());
    assert!(!file.exists());

    std::fs::write(&file, b"abc").unwrap();
    can_write_to_file(&file).unwrap();
    // Existing contents are untouched by the check.
    assert_eq!(std::fs::read(&file).unwrap(), b"abc");
}

#[test]
fn test_remove_output() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("out.bin");
    std::fs::write(&file, b"abc").unwrap();
    assert!(remove_output(&file));
    assert!(!file.exists());

    // Already gone is fine.
    assert!(remove_output(&file));

    // A directory can't be removed as a file; it's reported, not hidden.
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    assert!(!remove_output(&sub));
    assert!(sub.is_dir());
}
