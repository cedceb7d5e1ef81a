// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The array configuration of an observation: which coarse channels were
//! recorded, and which antenna inputs are in the sub-files (and in what
//! order).

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use log::{debug, trace};
use mwalib::{MetafitsContext, Pol};
use serde::{Deserialize, Serialize};

use super::{AntennaInput, ArrayConfigError, Polarisation};
use crate::{constants::MWA_CHANNELIZATION_FACTOR, misc::expensive_op};

fn default_channelization_factor() -> usize {
    MWA_CHANNELIZATION_FACTOR
}

/// An array configuration, as read from a metafits file or a hand-written
/// toml/json equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayConfig {
    pub obs_id: u32,

    /// The number of coarse channels the receiver splits its band into.
    #[serde(default = "default_channelization_factor")]
    pub channelization_factor: usize,

    /// Receiver channel numbers.
    #[serde(default)]
    pub channels: Vec<u32>,

    /// In the same order as the data in each sub-file block.
    #[serde(default)]
    pub inputs: Vec<AntennaInput>,
}

impl ArrayConfig {
    /// Read an array configuration. The format is determined by the file's
    /// extension.
    pub fn read(path: &Path) -> Result<ArrayConfig, ArrayConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let config = match ext.as_deref() {
            Some("metafits") | Some("fits") => Self::from_metafits(path)?,
            Some("toml") => {
                let text = read_to_string(path)?;
                toml::from_str(&text).map_err(|err| ArrayConfigError::Toml {
                    file: path.to_path_buf(),
                    err,
                })?
            }
            Some("json") => {
                let text = read_to_string(path)?;
                serde_json::from_str(&text).map_err(|err| ArrayConfigError::Json {
                    file: path.to_path_buf(),
                    err,
                })?
            }
            _ => return Err(ArrayConfigError::UnknownFormat(path.to_path_buf())),
        };
        config.validate(path)?;
        debug!(
            "{}: observation {}, {} channels, {} inputs",
            path.display(),
            config.obs_id,
            config.channels.len(),
            config.inputs.len()
        );
        Ok(config)
    }

    fn from_metafits(path: &Path) -> Result<ArrayConfig, ArrayConfigError> {
        trace!("Creating mwalib metafits context");
        let context = expensive_op(
            || MetafitsContext::new(path, None).map_err(Box::new),
            "Still reading metafits file",
        )?;

        let inputs = inputs_in_subfile_order(context.rf_inputs.iter().map(|rf| {
            let pol = match rf.pol {
                Pol::X => Polarisation::X,
                Pol::Y => Polarisation::Y,
            };
            (rf.subfile_order, rf.tile_id, pol, rf.flagged)
        }));
        let channels = context
            .metafits_coarse_chans
            .iter()
            .map(|cc| cc.rec_chan_number as u32)
            .collect();

        Ok(ArrayConfig {
            obs_id: context.obs_id,
            channelization_factor: MWA_CHANNELIZATION_FACTOR,
            channels,
            inputs,
        })
    }

    fn validate(&self, file: &Path) -> Result<(), ArrayConfigError> {
        if self.channelization_factor == 0 {
            return Err(ArrayConfigError::ZeroChannelizationFactor(
                file.to_path_buf(),
            ));
        }
        if self.inputs.is_empty() {
            return Err(ArrayConfigError::NoInputs(file.to_path_buf()));
        }
        if self.channels.is_empty() {
            return Err(ArrayConfigError::NoChannels(file.to_path_buf()));
        }
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert((input.tile, input.pol)) {
                return Err(ArrayConfigError::DuplicateInput {
                    file: file.to_path_buf(),
                    tile: input.tile,
                    pol: input.pol,
                });
            }
        }
        Ok(())
    }
}

/// Order metafits RF inputs the way their data appears in sub-files. Each RF
/// input is (subfile order, tile ID, polarisation, flagged).
pub(super) fn inputs_in_subfile_order<I>(rf_inputs: I) -> Vec<AntennaInput>
where
    I: IntoIterator<Item = (u32, u32, Polarisation, bool)>,
{
    rf_inputs
        .into_iter()
        .sorted_unstable_by_key(|&(order, ..)| order)
        .map(|(_, tile, pol, flagged)| AntennaInput { tile, pol, flagged })
        .collect()
}

fn read_to_string(path: &Path) -> Result<String, ArrayConfigError> {
    std::fs::read_to_string(path).map_err(|err| ArrayConfigError::IO {
        file: PathBuf::from(path),
        err,
    })
}
