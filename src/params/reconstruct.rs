// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reconstruct the time-domain voltages of every unflagged antenna input of a
//! sub-observation.

use std::{
    path::PathBuf,
    thread::{self, ScopedJoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use scopeguard::defer_on_unwind;
use thiserror::Error;

use crate::{
    cli::InfoPrinter,
    combine::{compute_channel_remapping, ChannelCombiner, CombineError, RemapError},
    constants::BLOCK_QUEUE_DEPTH,
    io::{
        read::{
            CaptureReadError, ChannelBlock, ChannelStreamReader, CoefficientsError,
            InverseFilterCoefficients,
        },
        write::{
            can_write_to_file, observation_log_file_name, remove_output, tile_output_file_name,
            ObservationLog, TileOutputWriter, TileWriteError,
        },
    },
    ipfb::{FilterState, InverseFilterBank, IpfbError},
    metadata::{AntennaInput, CaptureMetadata, MetadataError, Observation},
    misc::gps_id_to_epoch,
    TdrError, PROGRESS_BARS,
};

/// Everything needed to reconstruct one sub-observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructParams {
    /// The directory containing the sub-files and the array configuration.
    pub input_dir: PathBuf,
    pub obs_id: u32,
    pub subobs_id: u32,
    /// The inverse filter coefficients (raw little-endian `f32`s).
    pub ipfb_path: PathBuf,
    pub output_dir: PathBuf,
    /// Recorded in the log. Every error is still fatal.
    pub ignore_errors: bool,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionSummary {
    /// One per unflagged antenna input, in sub-file order.
    pub output_files: Vec<PathBuf>,
    pub log_file: PathBuf,
    /// Flagged inputs, which have no output.
    pub skipped: Vec<AntennaInput>,
    pub oversampling_ratio: usize,
    /// The number of samples in each output file.
    pub samples_per_output: u64,
    /// The total number of samples that didn't fit into an `i16`.
    pub clipped_samples: u64,
}

#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Remap(#[from] RemapError),

    #[error(transparent)]
    Coefficients(#[from] CoefficientsError),

    #[error(transparent)]
    Ipfb(#[from] IpfbError),

    #[error(transparent)]
    Capture(#[from] CaptureReadError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    TileWrite(#[from] TileWriteError),
}

/// One block of every coarse channel, in channel order.
struct BlockSet {
    index: usize,
    blocks: Vec<ChannelBlock>,
}

/// An unflagged antenna input and everything that belongs exclusively to it.
struct TileJob {
    /// The input's position in the sub-file blocks.
    input_index: usize,
    input: AntennaInput,
    /// One per channel, in channel order.
    states: Vec<FilterState>,
    writer: TileOutputWriter,
}

impl TileJob {
    fn process(
        &mut self,
        blocks: &[ChannelBlock],
        bank: &InverseFilterBank,
        combiner: &ChannelCombiner,
    ) -> Result<(), ReconstructError> {
        let filtered = blocks
            .iter()
            .zip(self.states.iter_mut())
            .map(|(block, state)| bank.process(state, &block.decode_input(self.input_index)))
            .collect();
        let combined = combiner.combine(filtered)?;
        self.writer.write_segment(&combined)?;
        Ok(())
    }

    fn describe(&self) -> String {
        describe_input(&self.input)
    }
}

fn describe_input(input: &AntennaInput) -> String {
    format!("Tile {} {}", input.tile, input.pol)
}

/// Everything that was checked before any output was written.
struct Preflight {
    metadata: CaptureMetadata,
    combiner: ChannelCombiner,
    bank: InverseFilterBank,
    readers: Vec<ChannelStreamReader>,
    num_data_blocks: usize,
}

impl ReconstructParams {
    /// Reconstruct the voltages. Nothing is written to the output directory
    /// unless the array configuration, every sub-file header and the inverse
    /// filter coefficients are valid.
    pub fn run(&self) -> Result<ReconstructionSummary, TdrError> {
        let preflight = self.preflight()?;
        self.print_info(&preflight);

        let log = ObservationLog::create(&self.output_dir, self.obs_id, self.subobs_id)?;
        match self.reconstruct(preflight, &log) {
            Ok(summary) => {
                log.info("Run succeeded")?;
                info!(
                    "Wrote {} voltage file(s) of {} samples to {}",
                    summary.output_files.len(),
                    summary.samples_per_output,
                    self.output_dir.display()
                );
                if summary.clipped_samples > 0 {
                    warn!(
                        "{} sample(s) were clipped to fit into 16 bits",
                        summary.clipped_samples
                    );
                }
                Ok(summary)
            }
            Err(e) => {
                log_failure(&log, &format!("Run failed: {e}"));
                Err(e.into())
            }
        }
    }

    fn preflight(&self) -> Result<Preflight, ReconstructError> {
        let metadata = CaptureMetadata::discover(&self.input_dir, self.obs_id, self.subobs_id)?;
        let obs = metadata.observation();

        let remapping =
            compute_channel_remapping(&obs.channel_numbers(), obs.channelization_factor)?;
        debug!(
            "Oversampling ratio {} for {} channel(s)",
            remapping.oversampling_ratio(),
            obs.channels.len()
        );

        let coeffs = InverseFilterCoefficients::read(&self.ipfb_path, obs.channelization_factor)?;
        let bank = InverseFilterBank::new(&coeffs, obs.channelization_factor)?;

        let readers = obs
            .channels
            .iter()
            .map(|c| ChannelStreamReader::open(&c.path, &obs.expectation_for(c)))
            .collect::<Result<Vec<_>, _>>()?;
        // All sub-files agree on their transfer size, so they all have the
        // same number of blocks.
        let num_data_blocks = readers[0].num_data_blocks();

        for (_, input) in obs.unflagged_inputs() {
            let name = tile_output_file_name(self.obs_id, self.subobs_id, input);
            can_write_to_file(&self.output_dir.join(name))?;
        }
        can_write_to_file(
            &self
                .output_dir
                .join(observation_log_file_name(self.obs_id, self.subobs_id)),
        )?;

        let combiner = ChannelCombiner::new(remapping, obs.samples_per_block);
        Ok(Preflight {
            metadata,
            combiner,
            bank,
            readers,
            num_data_blocks,
        })
    }

    fn print_info(&self, preflight: &Preflight) {
        let obs = preflight.metadata.observation();
        let remapping = preflight.combiner.remapping();

        let mut printer = InfoPrinter::new(
            format!("Reconstructing {}_{}", self.obs_id, self.subobs_id).into(),
        );
        printer.push_block(vec![
            format!("Array configuration: {}", preflight.metadata.config_path().display()).into(),
            format!(
                "Start: {} ({} after the observation start)",
                obs.start,
                obs.start - gps_id_to_epoch(obs.obs_id)
            )
            .into(),
            format!("{} Hz per coarse channel", obs.sample_rate).into(),
        ]);
        printer.push_block(vec![
            format!(
                "{} coarse channel(s): {}",
                obs.channels.len(),
                obs.channel_numbers().iter().join(", ")
            )
            .into(),
            format!(
                "{} data block(s) of {} samples",
                preflight.num_data_blocks, obs.samples_per_block
            )
            .into(),
            format!("Oversampling ratio: {}", remapping.oversampling_ratio()).into(),
        ]);
        printer.push_block(vec![
            format!(
                "{} antenna input(s), {} flagged",
                obs.inputs.len(),
                obs.flagged_inputs().count()
            )
            .into(),
            format!(
                "Inverse filter: {}x{} from {}",
                preflight.bank.num_branches(),
                preflight.bank.num_taps(),
                self.ipfb_path.display()
            )
            .into(),
        ]);
        printer.push_block(vec![
            format!("Output directory: {}", self.output_dir.display()).into(),
            format!("Ignore errors: {}", self.ignore_errors).into(),
        ]);
        printer.display();
    }

    fn reconstruct(
        &self,
        preflight: Preflight,
        log: &ObservationLog,
    ) -> Result<ReconstructionSummary, ReconstructError> {
        let Preflight {
            metadata,
            combiner,
            bank,
            mut readers,
            num_data_blocks,
        } = preflight;
        let obs = metadata.observation();

        self.log_preamble(obs, &combiner, &readers, log)?;

        let mut skipped = vec![];
        for (_, input) in obs.flagged_inputs() {
            log.info(&format!("{}: SKIPPED (flagged)", describe_input(input)))?;
            skipped.push(*input);
        }

        let mut jobs = obs
            .unflagged_inputs()
            .map(|(input_index, input)| {
                Ok(TileJob {
                    input_index,
                    input: *input,
                    states: obs.channels.iter().map(|_| bank.new_state()).collect(),
                    writer: TileOutputWriter::create(
                        &self.output_dir,
                        self.obs_id,
                        self.subobs_id,
                        input,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, TileWriteError>>()?;

        let (tx, rx) = bounded(BLOCK_QUEUE_DEPTH);
        let progress = ProgressBar::with_draw_target(
            Some(num_data_blocks as _),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:17}: [{wide_bar:.blue}] {pos:3}/{len:3} blocks ({elapsed_precise}<{eta_precise})").unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Reconstructing");

        // Use a variable to track whether any threads have an issue.
        let error = AtomicCell::new(false);

        info!("Reading, filtering and combining {num_data_blocks} block(s)");
        thread::scope(|scope| -> Result<(), ReconstructError> {
            let read_handle: ScopedJoinHandle<Result<(), CaptureReadError>> =
                thread::Builder::new()
                    .name("read".to_string())
                    .spawn_scoped(scope, || {
                        // If a panic happens, update our atomic error.
                        defer_on_unwind! { error.store(true); }

                        let result = read_blocks(&mut readers, num_data_blocks, tx, &error, log);
                        if result.is_err() {
                            error.store(true);
                        }
                        result
                    })
                    .expect("OS can create threads");

            let process_result = process_blocks(
                rx,
                &mut jobs,
                &bank,
                &combiner,
                &error,
                &progress,
                log,
            );
            if process_result.is_err() {
                error.store(true);
            }

            // Join the reading thread. This propagates any errors; the reader's
            // error is the root cause if both sides failed.
            read_handle.join().unwrap()?;
            process_result
        })?;
        progress.abandon_with_message("Finished reconstructing");

        for reader in &readers {
            let channel = reader.header().coarse_channel;
            log.info(&format!(
                "Channel {channel}: finished, {} block(s) read",
                reader.blocks_read()
            ))?;
        }

        let mut output_files = Vec::with_capacity(jobs.len());
        let mut clipped_samples = 0;
        for job in jobs {
            let description = job.describe();
            match job.writer.finish() {
                Ok(stats) => {
                    log.info(&format!("{description}: OK ({stats})"))?;
                    clipped_samples += stats.clipped;
                    output_files.push(
                        self.output_dir
                            .join(tile_output_file_name(self.obs_id, self.subobs_id, &job.input)),
                    );
                }
                Err(e) => {
                    log_failure(log, &format!("{description}: FAILED: {e}"));
                    // Don't leave a partial set of outputs behind.
                    for f in &output_files {
                        remove_output(f);
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(ReconstructionSummary {
            output_files,
            log_file: log.path().to_path_buf(),
            skipped,
            oversampling_ratio: combiner.remapping().oversampling_ratio(),
            samples_per_output: (num_data_blocks * combiner.output_len_per_block()) as u64,
            clipped_samples,
        })
    }

    fn log_preamble(
        &self,
        obs: &Observation,
        combiner: &ChannelCombiner,
        readers: &[ChannelStreamReader],
        log: &ObservationLog,
    ) -> Result<(), TileWriteError> {
        log.info(&format!(
            "mwa_tdr {}: input_dir={} obs_id={} subobs_id={} ipfb={} output_dir={} ignore_errors={}",
            env!("CARGO_PKG_VERSION"),
            self.input_dir.display(),
            self.obs_id,
            self.subobs_id,
            self.ipfb_path.display(),
            self.output_dir.display(),
            self.ignore_errors
        ))?;
        let remapping = combiner.remapping();
        log.info(&format!(
            "Oversampling ratio {} ({} samples per block become {})",
            remapping.oversampling_ratio(),
            combiner.block_len(),
            combiner.output_len_per_block()
        ))?;
        for (channel, reader) in obs.channels.iter().zip(readers) {
            // Every channel was remapped.
            let (slot, flipped) = remapping
                .get(channel.number)
                .map(|m| (m.slot, m.flipped))
                .unwrap_or_default();
            log.info(&format!(
                "Channel {} (correlator channel {}): opened {}, {} data block(s), slot {slot}{}",
                channel.number,
                channel.corr_number,
                reader.path().display(),
                reader.num_data_blocks(),
                if flipped { " (flipped)" } else { "" }
            ))?;
        }
        Ok(())
    }
}

/// Pull the next block out of every sub-file and send them as one set.
fn read_blocks(
    readers: &mut [ChannelStreamReader],
    num_data_blocks: usize,
    tx: Sender<BlockSet>,
    error: &AtomicCell<bool>,
    log: &ObservationLog,
) -> Result<(), CaptureReadError> {
    for index in 0..num_data_blocks {
        let mut blocks = Vec::with_capacity(readers.len());
        for reader in readers.iter_mut() {
            match reader.next() {
                Some(Ok(block)) => blocks.push(block),
                Some(Err(e)) => {
                    log_failure(
                        log,
                        &format!("Channel {}: FAILED: {e}", reader.header().coarse_channel),
                    );
                    return Err(e);
                }
                None => {
                    return Err(CaptureReadError::UnexpectedEnd {
                        file: reader.path().to_path_buf(),
                        blocks_read: reader.blocks_read(),
                        expected: num_data_blocks,
                    })
                }
            }
        }

        // Should we continue?
        if error.load() {
            return Ok(());
        }

        trace!("Sending block {index}");
        match tx.send(BlockSet { index, blocks }) {
            Ok(()) => (),
            // If we can't send the message, it's because the channel has been
            // closed on the other side. That should only happen because the
            // processing has stopped due to error; in that case, just exit
            // this thread.
            Err(_) => return Ok(()),
        }
    }

    debug!("Finished reading");
    Ok(())
}

/// Filter, combine and write every block set for every job.
fn process_blocks(
    rx: Receiver<BlockSet>,
    jobs: &mut [TileJob],
    bank: &InverseFilterBank,
    combiner: &ChannelCombiner,
    error: &AtomicCell<bool>,
    progress: &ProgressBar,
    log: &ObservationLog,
) -> Result<(), ReconstructError> {
    progress.tick();
    for BlockSet { index, blocks } in rx.iter() {
        if error.load() {
            break;
        }

        trace!("Processing block {index}");
        jobs.par_iter_mut().try_for_each(|job| {
            let result = job.process(&blocks, bank, combiner);
            if let Err(e) = &result {
                log_failure(log, &format!("{}: FAILED: {e}", job.describe()));
            }
            result
        })?;
        progress.inc(1);
    }

    Ok(())
}

/// Failures are already being propagated; a log that can't be written to
/// shouldn't hide them.
fn log_failure(log: &ObservationLog, message: &str) {
    if let Err(e) = log.error(message) {
        warn!("Couldn't write to {}: {e}", log.path().display());
    }
}
