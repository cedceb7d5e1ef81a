// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob files.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use glob::{glob, Pattern};
use log::{debug, trace};
use regex::Regex;
use thiserror::Error;

use crate::constants::CAPTURE_FILE_EXTENSION;

lazy_static::lazy_static! {
    /// e.g. "1294797712_1294797712_118.sub"
    static ref CAPTURE_FILE_NAME: Regex =
        Regex::new(&format!(r"^(\d+)_(\d+)_(\d+)\.{CAPTURE_FILE_EXTENSION}$")).unwrap();
}

/// Given a glob pattern, get all of the matches from the filesystem.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    Ok(entries)
}

/// Pull the (observation ID, sub-observation ID, coarse channel) out of a VCS
/// sub-file name. `None` is returned if the name doesn't follow the
/// `{obsid}_{subobsid}_{channel}.sub` convention.
pub(crate) fn parse_capture_file_name(file: &Path) -> Option<(u32, u32, u32)> {
    let name = file.file_name()?.to_str()?;
    let caps = CAPTURE_FILE_NAME.captures(name)?;
    let obs_id = caps[1].parse().ok()?;
    let subobs_id = caps[2].parse().ok()?;
    let channel = caps[3].parse().ok()?;
    Some((obs_id, subobs_id, channel))
}

/// Find all of the non-empty VCS sub-files in `dir` belonging to the given
/// observation and sub-observation. The returned paths are keyed by their
/// coarse channel number.
pub(crate) fn find_capture_files(
    dir: &Path,
    obs_id: u32,
    subobs_id: u32,
) -> Result<BTreeMap<u32, PathBuf>, GlobError> {
    let g = format!(
        "{}/{obs_id}_{subobs_id}_*.{CAPTURE_FILE_EXTENSION}",
        Pattern::escape(&dir.display().to_string())
    );
    trace!("Looking for VCS sub-files with glob '{g}'");

    let mut files = BTreeMap::new();
    for file in get_all_matches_from_glob(&g)? {
        let channel = match parse_capture_file_name(&file) {
            Some((o, s, c)) if o == obs_id && s == subobs_id => c,
            _ => {
                trace!("Ignoring {}; not a sub-file name", file.display());
                continue;
            }
        };
        // Empty files can't be anything useful.
        let len = std::fs::metadata(&file)?.len();
        if len == 0 {
            debug!("Ignoring empty sub-file {}", file.display());
            continue;
        }
        if let Some(other) = files.insert(channel, file.clone()) {
            return Err(GlobError::DuplicateChannel {
                channel,
                first: other,
                second: file,
            });
        }
    }
    Ok(files)
}

/// Find the array configuration for an observation in `dir`. In order of
/// preference, this is `{obsid}.metafits`, `{obsid}.toml` or `{obsid}.json`.
pub(crate) fn find_array_config(dir: &Path, obs_id: u32) -> Result<PathBuf, GlobError> {
    for ext in ["metafits", "toml", "json"] {
        let candidate = dir.join(format!("{obs_id}.{ext}"));
        if candidate.is_file() {
            // An empty file is as good as a missing one.
            if std::fs::metadata(&candidate)?.len() == 0 {
                debug!("Ignoring empty array configuration {}", candidate.display());
                continue;
            }
            return Ok(candidate);
        }
    }
    Err(GlobError::NoArrayConfig {
        dir: dir.to_path_buf(),
        obs_id,
    })
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error("No metafits or array configuration file for observation {obs_id} was found in {}", dir.display())]
    NoArrayConfig { dir: PathBuf, obs_id: u32 },

    #[error("Coarse channel {channel} has two sub-files: {} and {}", first.display(), second.display())]
    DuplicateChannel {
        channel: u32,
        first: PathBuf,
        second: PathBuf,
    },

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
