//! Run configuration.
//!
//! A [`SmoothConfig`] is built once (usually from the command line) and handed
//! by reference to everything that needs it; nothing here is mutated after
//! construction.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::BlavgError;

/// The default ionosphere factor. Larger values assume a more disturbed
/// ionosphere and so smooth more.
pub const DEFAULT_ION_FACTOR: f64 = 0.2;

/// The default column to smooth.
pub const DEFAULT_DATA_COL_NAME: &str = "DATA";

/// The weights column. Unlike the data column, this isn't configurable.
pub const WEIGHT_COL_NAME: &str = "WEIGHT_SPECTRUM";

/// Appended to the stem of the input when no output is specified.
const OUTPUT_SUFFIX: &str = "-BLavg";

/// Where smoothed visibilities end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Overwrite the input dataset.
    InPlace,

    /// Write into a copy of the input dataset.
    NewDataset {
        path: PathBuf,

        /// Delete `path` first if it already exists.
        clobber: bool,
    },
}

#[derive(Debug, Clone)]
pub struct SmoothConfig {
    /// How strong the ionosphere is assumed to be.
    pub ion_factor: f64,

    /// The name of the column containing the visibilities to be smoothed.
    /// Smoothed visibilities are written back into a column of the same name.
    pub data_col_name: String,

    pub output: OutputPolicy,

    /// Draw a progress bar on stdout.
    pub progress_bars: bool,
}

impl SmoothConfig {
    /// A config that writes to the derived output path of `input` (see
    /// [`derive_output_path`]) when `overwrite` is false. Progress bars are
    /// off.
    pub fn new(
        input: &Path,
        ion_factor: f64,
        overwrite: bool,
        clobber: bool,
        data_col_name: String,
    ) -> SmoothConfig {
        let output = if overwrite {
            OutputPolicy::InPlace
        } else {
            OutputPolicy::NewDataset {
                path: derive_output_path(input),
                clobber,
            }
        };
        SmoothConfig {
            ion_factor,
            data_col_name,
            output,
            progress_bars: false,
        }
    }

    /// Check the parts of the config that don't need the filesystem.
    pub fn validate(&self) -> Result<(), BlavgError> {
        if !self.ion_factor.is_finite() || self.ion_factor < 0.0 {
            return Err(BlavgError::InvalidIonFactor(self.ion_factor));
        }
        if self.data_col_name.trim().is_empty() {
            return Err(BlavgError::EmptyColumnName);
        }
        Ok(())
    }
}

impl Default for SmoothConfig {
    fn default() -> Self {
        SmoothConfig {
            ion_factor: DEFAULT_ION_FACTOR,
            data_col_name: DEFAULT_DATA_COL_NAME.to_string(),
            output: OutputPolicy::InPlace,
            progress_bars: false,
        }
    }
}

/// Get the output path used when the input isn't overwritten, e.g.
/// "/data/obs.MS" becomes "/data/obs-BLavg.MS". A trailing slash on the input
/// is ignored.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    let mut name = OsString::with_capacity(stem.len() + OUTPUT_SUFFIX.len() + 4);
    name.push(&stem);
    name.push(OUTPUT_SUFFIX);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}
