// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. The arguments are the positional
//! "process boundary" of a reconstruction; everything else happens in
//! [ReconstructParams].
//!
//! Only 2 things should be public in this module: `Tdr` and `Tdr::run`.

mod printers;
#[cfg(test)]
mod tests;

pub(crate) use printers::{display_warnings, InfoPrinter, Warn};

use std::path::PathBuf;

use clap::{AppSettings, Parser};
use log::info;

use crate::{params::ReconstructParams, TdrError, PROGRESS_BARS};

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Reconstruct time-domain voltages (inverse PFB) from Murchison Widefield Array (MWA) VCS data.
Each unflagged tile and polarisation is written to its own file of 16-bit samples."#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(infer_long_args = true)]
pub struct Tdr {
    /// The directory containing the VCS sub-files
    /// ({obsid}_{subobsid}_{channel}.sub) and the array configuration
    /// ({obsid}.metafits, {obsid}.toml or {obsid}.json).
    #[clap(name = "INPUT_DIR", parse(from_os_str))]
    input_dir: PathBuf,

    /// The observation ID.
    #[clap(name = "OBSID")]
    obs_id: u32,

    /// The sub-observation ID.
    #[clap(name = "SUBOBSID")]
    subobs_id: u32,

    /// The inverse filter coefficients; a flat file of little-endian 32-bit
    /// floats, one row of taps per branch.
    #[clap(name = "IPFB_FILE", parse(from_os_str))]
    ipfb_path: PathBuf,

    /// Where to write the reconstructed voltages and the log. It is created
    /// if it doesn't exist.
    #[clap(name = "OUTPUT_DIR", parse(from_os_str))]
    output_dir: PathBuf,

    /// "true" or "false". This is recorded in the log; any error still stops
    /// the run.
    #[clap(name = "IGNORE_ERRORS", parse(try_from_str = parse_bool))]
    ignore_errors: bool,

    /// Don't draw progress bars.
    #[clap(long)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,
}

impl Tdr {
    pub fn run(self) -> Result<(), TdrError> {
        let Tdr {
            input_dir,
            obs_id,
            subobs_id,
            ipfb_path,
            output_dir,
            ignore_errors,
            no_progress_bars,
            verbosity,
        } = self;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        // Print the version of mwa_tdr and its build-time information.
        info!("mwa_tdr {}", env!("CARGO_PKG_VERSION"));
        display_build_info();

        let params = ReconstructParams {
            input_dir,
            obs_id,
            subobs_id,
            ipfb_path,
            output_dir,
            ignore_errors,
        };
        let result = params.run();
        display_warnings();
        result?;

        info!("mwa_tdr complete.");
        Ok(())
    }
}

/// Booleans come from scripts as well as people.
fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(format!("'{s}' is neither true nor false")),
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
