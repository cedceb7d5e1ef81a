// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;

use super::*;

#[test]
fn test_positional_arguments() {
    let args = Tdr::try_parse_from([
        "mwa_tdr",
        "/data/in",
        "1294797712",
        "1294797720",
        "/data/ipfb.bin",
        "/data/out",
        "false",
    ])
    .unwrap();
    assert_eq!(args.input_dir, PathBuf::from("/data/in"));
    assert_eq!(args.obs_id, 1294797712);
    assert_eq!(args.subobs_id, 1294797720);
    assert_eq!(args.ipfb_path, PathBuf::from("/data/ipfb.bin"));
    assert_eq!(args.output_dir, PathBuf::from("/data/out"));
    assert!(!args.ignore_errors);
    assert!(!args.no_progress_bars);
    assert_eq!(args.verbosity, 0);
}

#[test]
fn test_flags_and_toggle() {
    let args = Tdr::try_parse_from([
        "mwa_tdr",
        "in",
        "1",
        "2",
        "ipfb.bin",
        "out",
        "True",
        "--no-progress-bars",
        "-vv",
    ])
    .unwrap();
    assert!(args.ignore_errors);
    assert!(args.no_progress_bars);
    assert_eq!(args.verbosity, 2);
}

#[test]
fn test_bad_arguments() {
    assert!(Tdr::try_parse_from(["mwa_tdr", "in", "1", "2", "ipfb.bin", "out"]).is_err());
    assert!(Tdr::try_parse_from(["mwa_tdr", "in", "1", "2", "ipfb.bin", "out", "maybe"]).is_err());
    assert!(Tdr::try_parse_from(["mwa_tdr", "in", "one", "2", "ipfb.bin", "out", "true"]).is_err());
}

#[test]
fn test_parse_bool() {
    assert_eq!(parse_bool("TRUE"), Ok(true));
    assert_eq!(parse_bool("0"), Ok(false));
    assert_eq!(parse_bool(" no "), Ok(false));
    assert!(parse_bool("").is_err());
}
