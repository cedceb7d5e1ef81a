// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading observation metadata.

use std::path::PathBuf;

use thiserror::Error;

use super::Polarisation;
use crate::io::{read::CaptureReadError, GlobError};

#[derive(Error, Debug)]
pub enum ArrayConfigError {
    #[error("Don't know how to read array configuration {}; expected a metafits, toml or json file", .0.display())]
    UnknownFormat(PathBuf),

    #[error("Couldn't parse {} as toml: {err}", file.display())]
    Toml {
        file: PathBuf,
        err: toml::de::Error,
    },

    #[error("Couldn't parse {} as json: {err}", file.display())]
    Json {
        file: PathBuf,
        err: serde_json::Error,
    },

    #[error("mwalib error: {0}")]
    Mwalib(#[from] Box<mwalib::MwalibError>),

    #[error("{}: no antenna inputs are listed", .0.display())]
    NoInputs(PathBuf),

    #[error("{}: no coarse channels are listed", .0.display())]
    NoChannels(PathBuf),

    #[error("{}: tile {tile} polarisation {pol} is listed more than once", file.display())]
    DuplicateInput {
        file: PathBuf,
        tile: u32,
        pol: Polarisation,
    },

    #[error("{}: the channelization factor must be positive", .0.display())]
    ZeroChannelizationFactor(PathBuf),

    #[error("Couldn't read {}: {err}", file.display())]
    IO { file: PathBuf, err: std::io::Error },
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    ArrayConfig(#[from] ArrayConfigError),

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error("Array configuration {} is for observation {got}, but observation {expected} was requested", file.display())]
    ObsIdMismatch {
        file: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("Coarse channel {channel} is part of observation {obs_id}, but there is no sub-file for it (sub-observation {subobs_id})")]
    MissingChannelFile {
        channel: u32,
        obs_id: u32,
        subobs_id: u32,
    },

    #[error(transparent)]
    Capture(#[from] CaptureReadError),
}
