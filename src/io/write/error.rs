// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error-handling code associated with writing reconstructed voltages and
//! the observation log.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileWriteError {
    #[error("Couldn't create {}: {err}", file.display())]
    Create { file: PathBuf, err: std::io::Error },

    #[error("Couldn't write to {}: {err}", file.display())]
    Write { file: PathBuf, err: std::io::Error },

    #[error("Couldn't move {} to {}: {err}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        err: std::io::Error,
    },

    #[error("Cannot write to the specified file '{}'", .0.display())]
    FileNotWritable(PathBuf),

    #[error("Cannot create directory '{}' due to a permissions issue", .0.display())]
    NewDirectory(PathBuf),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
