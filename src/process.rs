//! Driving the smoothing of a whole dataset.
//!
//! Tables are only touched by the calling thread. Each baseline is read and
//! sent to the rayon pool to be smoothed, and smoothed baselines are written
//! by the calling thread as they come back, in whatever order they finish.

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, trace, warn};
use rayon::prelude::*;

use crate::{
    averaging::{estimate_kernel, smooth_baseline, BaselineVis, KernelProfile, SmoothedVis},
    baselines::BaselineGroup,
    config::{OutputPolicy, SmoothConfig},
    read::{ms::MsReader, VisRead},
    write::{ms::MsWriter, VisWrite, VisWriteError},
    BlavgError,
};

/// How many read baselines may wait to be smoothed.
const JOB_QUEUE_LEN: usize = 8;

type Job = (usize, BaselineVis);
type JobResult = (usize, KernelProfile, SmoothedVis);

/// What happened over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmoothSummary {
    /// Baselines smoothed and written.
    pub num_baselines: usize,

    /// Baselines that were passed through unsmoothed because their kernel
    /// couldn't be estimated.
    pub num_degenerate: usize,

    /// Samples with no weight anywhere in their smoothing window. These are
    /// written as NaN.
    pub num_invalid_samples: usize,

    /// Baselines that couldn't be written.
    pub num_failed_writes: usize,
}

/// Smooth the measurement set `input` according to `config`. If the output
/// isn't the input, it is made as a copy of the input first.
pub fn smooth_ms(input: &Path, config: &SmoothConfig) -> Result<SmoothSummary, BlavgError> {
    config.validate()?;
    if !input.exists() {
        return Err(BlavgError::InputNotFound(input.to_path_buf()));
    }
    let output = prepare_output(input, &config.output)?;
    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());

    let mut reader = MsReader::new(input, &config.data_col_name)?;
    let mut writer = MsWriter::new(&output, &config.data_col_name)?;
    smooth_vis(&mut reader, &mut writer, config)
}

/// Get the dataset that smoothed visibilities will be written into. For a new
/// dataset, this means copying the input (removing whatever is at the output
/// path first, if allowed).
pub fn prepare_output(input: &Path, policy: &OutputPolicy) -> Result<PathBuf, BlavgError> {
    match policy {
        OutputPolicy::InPlace => Ok(input.to_path_buf()),

        OutputPolicy::NewDataset { path, clobber } => {
            if path.exists() {
                if !clobber {
                    return Err(BlavgError::OutputConflict(path.clone()));
                }
                info!("Removing existing {}", path.display());
                if path.is_dir() {
                    fs::remove_dir_all(path)?;
                } else {
                    fs::remove_file(path)?;
                }
            }

            info!("Copying {} to {}", input.display(), path.display());
            if input.is_dir() {
                copy_dir(input, path)?;
            } else {
                fs::copy(input, path)?;
            }
            Ok(path.clone())
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            trace!("Copying {}", entry.path().display());
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Smooth every baseline of `reader`, writing the results with `writer`. The
/// reader and writer may be views of the same dataset.
///
/// Baselines that can't be written are reported and skipped; if there were
/// any, [`BlavgError::FailedWrites`] is returned once everything else has been
/// written.
pub fn smooth_vis(
    reader: &mut dyn VisRead,
    writer: &mut dyn VisWrite,
    config: &SmoothConfig,
) -> Result<SmoothSummary, BlavgError> {
    config.validate()?;
    let chan_freqs = reader.get_chan_freqs().clone();
    let groups = reader.get_baseline_groups().to_vec();
    let ion_factor = config.ion_factor;
    info!(
        "Smoothing {} baselines over {} channels (ionosphere factor {ion_factor})",
        groups.len(),
        chan_freqs.len()
    );

    let progress = ProgressBar::with_draw_target(
        Some(groups.len() as _),
        if config.progress_bars {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} baselines ({elapsed_precise}<{eta_precise})").unwrap()
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message("Smoothing");
    progress.tick();

    let error = AtomicCell::new(false);
    let (tx_job, rx_job) = bounded::<Job>(JOB_QUEUE_LEN);
    let (tx_result, rx_result) = unbounded::<JobResult>();
    let mut summary = SmoothSummary::default();

    let result = thread::scope(|s| {
        let groups = &groups;
        let chan_freqs = &chan_freqs;
        let error = &error;
        s.spawn(move || {
            rx_job
                .into_iter()
                .par_bridge()
                .for_each_with(tx_result, |tx, (i_group, vis)| {
                    // Don't bother if the I/O thread has given up.
                    if error.load() {
                        return;
                    }
                    let group = &groups[i_group];
                    let profile =
                        estimate_kernel(&vis.uvws, group.time_res(), chan_freqs, ion_factor);
                    let smoothed = smooth_baseline(&vis, &profile);
                    if tx.send((i_group, profile, smoothed)).is_err() {
                        error.store(true);
                    }
                });
        });

        let result = read_and_write(
            reader,
            writer,
            groups,
            tx_job,
            rx_result,
            &mut summary,
            &progress,
        );
        if result.is_err() {
            error.store(true);
        }
        result
    });
    progress.abandon_with_message("Finished smoothing");

    info!(
        "Smoothed {} baselines ({} degenerate, {} invalid samples, {} failed writes)",
        summary.num_baselines,
        summary.num_degenerate,
        summary.num_invalid_samples,
        summary.num_failed_writes
    );
    result?;
    if summary.num_failed_writes > 0 {
        return Err(BlavgError::FailedWrites {
            num_failed: summary.num_failed_writes,
        });
    }
    Ok(summary)
}

/// The I/O half of [`smooth_vis`]. `tx_job` is dropped on return, which lets
/// the smoothing workers finish.
fn read_and_write(
    reader: &mut dyn VisRead,
    writer: &mut dyn VisWrite,
    groups: &[BaselineGroup],
    tx_job: Sender<Job>,
    rx_result: Receiver<JobResult>,
    summary: &mut SmoothSummary,
    progress: &ProgressBar,
) -> Result<(), BlavgError> {
    for (i_group, group) in groups.iter().enumerate() {
        trace!(
            "Reading baseline {} - {} ({} rows)",
            group.ant1,
            group.ant2,
            group.num_rows()
        );
        let vis = reader.read_baseline(group)?;
        if tx_job.send((i_group, vis)).is_err() {
            // The workers are gone; whatever killed them will be reported when
            // the thread is joined.
            break;
        }

        for result in rx_result.try_iter() {
            write_result(writer, groups, result, summary)?;
            progress.inc(1);
        }
    }

    // Wait for the stragglers.
    drop(tx_job);
    for result in rx_result.iter() {
        write_result(writer, groups, result, summary)?;
        progress.inc(1);
    }
    Ok(())
}

fn write_result(
    writer: &mut dyn VisWrite,
    groups: &[BaselineGroup],
    (i_group, profile, smoothed): JobResult,
    summary: &mut SmoothSummary,
) -> Result<(), BlavgError> {
    let group = &groups[i_group];
    let (ant1, ant2) = (group.ant1, group.ant2);
    debug!(
        "For baseline {ant1} - {ant2} (dist = {:.3} km): sigma = {:.2} samples",
        profile.dist_km,
        profile.sigmas.first()
    );
    if let Some(reason) = profile.degeneracy {
        warn!("Baseline {ant1} - {ant2} is degenerate ({reason}); leaving it unsmoothed");
        summary.num_degenerate += 1;
    }
    if smoothed.num_invalid > 0 {
        warn!(
            "Baseline {ant1} - {ant2}: {} samples have no unflagged data in their window; writing NaN",
            smoothed.num_invalid
        );
        summary.num_invalid_samples += smoothed.num_invalid;
    }

    match writer.write_baseline(group, &smoothed) {
        Ok(()) => summary.num_baselines += 1,
        Err(
            e @ (VisWriteError::BaselineNotFound { .. }
            | VisWriteError::RowCountMismatch { .. }
            | VisWriteError::ShapeMismatch { .. }),
        ) => {
            error!("Couldn't write baseline {ant1} - {ant2}: {e}");
            summary.num_failed_writes += 1;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
