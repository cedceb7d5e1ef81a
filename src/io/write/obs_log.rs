// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The plain-text log kept alongside the reconstructed voltages of an
//! observation.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{SecondsFormat, Utc};
use log::Level;

use super::TileWriteError;

pub(crate) fn observation_log_file_name(obs_id: u32, subobs_id: u32) -> String {
    format!("{obs_id}_{subobs_id}_outputlog.txt")
}

/// Many threads may write to this at once; every line is flushed as soon as
/// it is written.
#[derive(Debug)]
pub struct ObservationLog {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl ObservationLog {
    pub fn create(
        output_dir: &Path,
        obs_id: u32,
        subobs_id: u32,
    ) -> Result<ObservationLog, TileWriteError> {
        let path = output_dir.join(observation_log_file_name(obs_id, subobs_id));
        let file = File::create(&path).map_err(|err| TileWriteError::Create {
            file: path.clone(),
            err,
        })?;
        Ok(ObservationLog {
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a line: `{timestamp} {level} {message}`.
    pub fn record(&self, level: Level, message: &str) -> Result<(), TileWriteError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        // Only a panic while writing a line can poison this.
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{timestamp} {level:5} {message}")
            .and_then(|()| file.flush())
            .map_err(|err| TileWriteError::Write {
                file: self.path.clone(),
                err,
            })
    }

    pub fn info(&self, message: &str) -> Result<(), TileWriteError> {
        self.record(Level::Info, message)
    }

    pub fn warn(&self, message: &str) -> Result<(), TileWriteError> {
        self.record(Level::Warn, message)
    }

    pub fn error(&self, message: &str) -> Result<(), TileWriteError> {
        self.record(Level::Error, message)
    }
}
