// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write out reconstructed voltages and the observation log.

mod error;
mod obs_log;
mod tile;
#[cfg(test)]
mod tests;

pub use error::TileWriteError;
pub(crate) use obs_log::observation_log_file_name;
pub use obs_log::ObservationLog;
pub(crate) use tile::tile_output_file_name;
pub use tile::{SignalStats, TileOutputWriter};

use std::path::Path;

use log::{trace, warn};

use crate::cli::Warn;

/// Remove an output that must not be left behind. A failure is only logged;
/// the caller is already dealing with a bigger problem. Returns whether the
/// file is gone.
pub(crate) fn remove_output(file: &Path) -> bool {
    match std::fs::remove_file(file) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Couldn't remove {}: {e}", file.display());
            false
        }
    }
}

/// Test whether `file` can be written to, creating any missing parent
/// directories along the way. A warning is emitted if the file already exists.
pub(crate) fn can_write_to_file(file: &Path) -> Result<(), TileWriteError> {
    trace!("Testing whether we can write to {}", file.display());

    let exists = can_write_to_file_inner(file)?;
    if exists {
        format!("Will overwrite the existing file '{}'", file.display()).warn();
    }

    Ok(())
}

fn can_write_to_file_inner(file: &Path) -> Result<bool, TileWriteError> {
    let file_exists = file.exists();

    match std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .append(true)
        .open(file)
        .map_err(|e| e.kind())
    {
        // File is writable.
        Ok(_) => {
            // Don't leave a 0-sized file behind if there wasn't one before.
            if !file_exists {
                std::fs::remove_file(file)?;
            }
        }

        // File doesn't exist. Attempt to make the directories leading up to the
        // file; if this fails, then we can't write the file anyway.
        Err(std::io::ErrorKind::NotFound) => {
            if let Some(p) = file.parent() {
                match std::fs::DirBuilder::new()
                    .recursive(true)
                    .create(p)
                    .map_err(|e| e.kind())
                {
                    Ok(()) => (),
                    Err(std::io::ErrorKind::PermissionDenied) => {
                        return Err(TileWriteError::NewDirectory(p.to_path_buf()))
                    }
                    Err(e) => return Err(TileWriteError::IO(e.into())),
                }
            }
        }

        Err(std::io::ErrorKind::PermissionDenied) => {
            return Err(TileWriteError::FileNotWritable(file.to_path_buf()))
        }

        Err(e) => {
            return Err(TileWriteError::IO(e.into()));
        }
    }

    Ok(file_exists)
}
