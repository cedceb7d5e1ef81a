// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything known about an observation before any voltages are read.

mod array_config;
mod error;

pub use array_config::ArrayConfig;
pub use error::{ArrayConfigError, MetadataError};

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use vec1::Vec1;

use crate::{
    cli::Warn,
    io::{
        find_array_config, find_capture_files,
        read::{read_header, CaptureExpectation, CaptureHeader},
    },
};

#[derive(
    Debug,
    Display,
    EnumString,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum Polarisation {
    X,
    Y,
}

/// A single tile and polarisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntennaInput {
    pub tile: u32,
    pub pol: Polarisation,
    /// Flagged inputs are never processed.
    #[serde(default)]
    pub flagged: bool,
}

/// A coarse channel and the sub-file that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureChannel {
    /// The receiver channel number.
    pub number: u32,
    /// The correlator's channel number, as reported by the sub-file.
    pub corr_number: u32,
    pub path: PathBuf,
}

/// The validated catalog of an observation's channels and antenna inputs.
#[derive(Debug, Clone)]
pub struct Observation {
    pub obs_id: u32,
    pub subobs_id: u32,
    pub channelization_factor: usize,
    /// Ascending by channel number.
    pub channels: Vec1<CaptureChannel>,
    /// In sub-file order.
    pub inputs: Vec<AntennaInput>,
    /// Taken from the lowest channel's sub-file; every other sub-file must
    /// agree.
    pub samples_per_block: usize,
    /// Taken from the lowest channel's sub-file; every other sub-file must
    /// agree.
    pub transfer_size: u64,
    /// Complex samples per second per coarse channel \[Hz\].
    pub sample_rate: u64,
    pub start: Epoch,
}

impl Observation {
    pub fn channel_numbers(&self) -> Vec<u32> {
        self.channels.iter().map(|c| c.number).collect()
    }

    /// The unflagged inputs, along with their position in the sub-files.
    pub fn unflagged_inputs(&self) -> impl Iterator<Item = (usize, &AntennaInput)> {
        self.inputs.iter().enumerate().filter(|(_, i)| !i.flagged)
    }

    pub fn flagged_inputs(&self) -> impl Iterator<Item = (usize, &AntennaInput)> {
        self.inputs.iter().enumerate().filter(|(_, i)| i.flagged)
    }

    /// What the sub-file of `channel` must look like.
    pub(crate) fn expectation_for(&self, channel: &CaptureChannel) -> CaptureExpectation {
        CaptureExpectation {
            obs_id: self.obs_id,
            subobs_id: self.subobs_id,
            channel: channel.number,
            num_inputs: self.inputs.len(),
            samples_per_block: Some(self.samples_per_block),
            transfer_size: Some(self.transfer_size),
        }
    }
}

/// An array configuration and the sub-files of one sub-observation, checked
/// against each other.
#[derive(Debug, Clone)]
pub struct CaptureMetadata {
    config_path: PathBuf,
    observation: Observation,
    first_header: CaptureHeader,
    ignored_files: Vec<PathBuf>,
}

impl CaptureMetadata {
    /// Find the array configuration and sub-files in `input_dir`, then check
    /// them.
    pub fn discover(
        input_dir: &Path,
        obs_id: u32,
        subobs_id: u32,
    ) -> Result<CaptureMetadata, MetadataError> {
        let config_path = find_array_config(input_dir, obs_id)?;
        let capture_files = find_capture_files(input_dir, obs_id, subobs_id)?;
        debug!(
            "Found {} sub-file(s) for {obs_id}_{subobs_id}",
            capture_files.len()
        );
        CaptureMetadata::new(&config_path, &capture_files, obs_id, subobs_id)
    }

    /// `capture_files` maps receiver channel numbers to sub-files. Sub-files
    /// of channels that aren't part of the observation are ignored.
    pub fn new(
        config_path: &Path,
        capture_files: &BTreeMap<u32, PathBuf>,
        obs_id: u32,
        subobs_id: u32,
    ) -> Result<CaptureMetadata, MetadataError> {
        let config = ArrayConfig::read(config_path)?;
        if config.obs_id != obs_id {
            return Err(MetadataError::ObsIdMismatch {
                file: config_path.to_path_buf(),
                expected: obs_id,
                got: config.obs_id,
            });
        }

        let mut channel_numbers = config.channels.clone();
        channel_numbers.sort_unstable();
        channel_numbers.dedup();

        let mut channels = Vec::with_capacity(channel_numbers.len());
        let mut first_header = None;
        for &number in &channel_numbers {
            let path = capture_files
                .get(&number)
                .ok_or(MetadataError::MissingChannelFile {
                    channel: number,
                    obs_id,
                    subobs_id,
                })?;
            let header = read_header(path)?;
            header.validate_ids(path, obs_id, subobs_id, number)?;
            channels.push(CaptureChannel {
                number,
                corr_number: header.corr_coarse_channel,
                path: path.clone(),
            });
            if first_header.is_none() {
                first_header = Some(header);
            }
        }

        let ignored_files = capture_files
            .iter()
            .filter(|(c, _)| channel_numbers.binary_search(*c).is_err())
            .map(|(_, p)| p.clone())
            .collect::<Vec<_>>();
        for f in &ignored_files {
            format!(
                "Ignoring {}; its channel isn't part of observation {obs_id}",
                f.display()
            )
            .warn();
        }

        // The array configuration always has at least one channel, and every
        // channel has a header by now.
        let (channels, first_header) = match (Vec1::try_from_vec(channels), first_header) {
            (Ok(c), Some(h)) => (c, h),
            _ => {
                return Err(ArrayConfigError::NoChannels(config_path.to_path_buf()).into());
            }
        };

        let observation = Observation {
            obs_id,
            subobs_id,
            channelization_factor: config.channelization_factor,
            channels,
            inputs: config.inputs,
            samples_per_block: first_header.samples_per_block,
            transfer_size: first_header.transfer_size,
            sample_rate: first_header.sample_rate,
            start: first_header.start_epoch(),
        };
        Ok(CaptureMetadata {
            config_path: config_path.to_path_buf(),
            observation,
            first_header,
            ignored_files,
        })
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The header of the lowest channel's sub-file.
    pub fn header(&self) -> &CaptureHeader {
        &self.first_header
    }

    /// Sub-files that were given but aren't part of the observation.
    pub fn ignored_files(&self) -> &[PathBuf] {
        &self.ignored_files
    }
}
