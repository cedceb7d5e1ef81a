// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing the reconstructed voltages of a single tile and polarisation.

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use super::{remove_output, TileWriteError};
use crate::metadata::AntennaInput;

/// The name of the file holding the voltages of `input`.
pub(crate) fn tile_output_file_name(obs_id: u32, subobs_id: u32, input: &AntennaInput) -> String {
    format!("{obs_id}_{subobs_id}_{}_{}.bin", input.tile, input.pol)
}

/// A summary of everything written for one antenna input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalStats {
    pub num_samples: u64,
    pub min: i16,
    pub max: i16,
    sum_sq: f64,
    /// The number of samples that didn't fit into an `i16`.
    pub clipped: u64,
}

impl SignalStats {
    pub fn rms(&self) -> f64 {
        if self.num_samples == 0 {
            0.0
        } else {
            (self.sum_sq / self.num_samples as f64).sqrt()
        }
    }

    fn add(&mut self, v: i16) {
        if self.num_samples == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.sum_sq += f64::from(v) * f64::from(v);
        self.num_samples += 1;
    }
}

impl fmt::Display for SignalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples, min {}, max {}, rms {:.3}, clipped {}",
            self.num_samples,
            self.min,
            self.max,
            self.rms(),
            self.clipped
        )
    }
}

/// Round to the nearest integer and saturate into an `i16`.
fn quantise(v: f32) -> (i16, bool) {
    let r = v.round();
    let clipped = r > f32::from(i16::MAX) || r < f32::from(i16::MIN);
    (r as i16, clipped)
}

/// Streams little-endian `i16` samples to a hidden file next to the final
/// output, and moves it into place only once everything has been written. A
/// writer that is dropped without being finished deletes its file.
#[derive(Debug)]
pub struct TileOutputWriter {
    path: PathBuf,
    partial_path: PathBuf,
    writer: Option<BufWriter<File>>,
    stats: SignalStats,
    bytes: Vec<u8>,
}

impl TileOutputWriter {
    pub fn create(
        output_dir: &Path,
        obs_id: u32,
        subobs_id: u32,
        input: &AntennaInput,
    ) -> Result<TileOutputWriter, TileWriteError> {
        let name = tile_output_file_name(obs_id, subobs_id, input);
        let path = output_dir.join(&name);
        let partial_path = output_dir.join(format!(".{name}.partial"));
        trace!("Writing {} via {}", path.display(), partial_path.display());
        let file = File::create(&partial_path).map_err(|err| TileWriteError::Create {
            file: partial_path.clone(),
            err,
        })?;
        Ok(TileOutputWriter {
            path,
            partial_path,
            writer: Some(BufWriter::new(file)),
            stats: SignalStats::default(),
            bytes: vec![],
        })
    }

    /// Where the voltages end up after [TileOutputWriter::finish].
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> &SignalStats {
        &self.stats
    }

    /// Append samples, in time order.
    pub fn write_segment(&mut self, samples: &[f32]) -> Result<(), TileWriteError> {
        let writer = match self.writer.as_mut() {
            Some(w) => w,
            None => return Ok(()),
        };

        let quantised = samples
            .iter()
            .map(|&v| {
                let (q, clipped) = quantise(v);
                if clipped {
                    self.stats.clipped += 1;
                }
                self.stats.add(q);
                q
            })
            .collect::<Vec<i16>>();
        self.bytes.resize(quantised.len() * 2, 0);
        LittleEndian::write_i16_into(&quantised, &mut self.bytes);
        writer
            .write_all(&self.bytes)
            .map_err(|err| TileWriteError::Write {
                file: self.partial_path.clone(),
                err,
            })
    }

    /// Flush everything and move the file into its final place.
    pub fn finish(mut self) -> Result<SignalStats, TileWriteError> {
        let writer = match self.writer.take() {
            Some(w) => w,
            None => return Ok(self.stats),
        };

        let result = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(|err| TileWriteError::Write {
                file: self.partial_path.clone(),
                err,
            })
            .and_then(|()| {
                std::fs::rename(&self.partial_path, &self.path).map_err(|err| {
                    TileWriteError::Rename {
                        from: self.partial_path.clone(),
                        to: self.path.clone(),
                        err,
                    }
                })
            });
        if result.is_err() {
            remove_output(&self.partial_path);
        }
        result.map(|()| self.stats)
    }
}

impl Drop for TileOutputWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            drop(writer);
            trace!("Removing unfinished {}", self.partial_path.display());
            remove_output(&self.partial_path);
        }
    }
}
