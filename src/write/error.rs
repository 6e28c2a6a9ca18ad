//! Errors associated with writing visibilities.

use std::path::PathBuf;

use marlu::rubbl_casatables;
use thiserror::Error;

use crate::read::VisReadError;

#[derive(Error, Debug)]
pub enum VisWriteError {
    #[error("Supplied output path {0} does not exist")]
    BadFile(PathBuf),

    #[error("There is no column called {0} in the output")]
    NoSuchColumn(String),

    #[error("Baseline {ant1} - {ant2} isn't in the output")]
    BaselineNotFound { ant1: usize, ant2: usize },

    #[error("Baseline {ant1} - {ant2} has {found} rows in the output, but {expected} time samples were smoothed")]
    RowCountMismatch {
        ant1: usize,
        ant2: usize,
        expected: usize,
        found: usize,
    },

    #[error("Smoothed {array_type} have shape {found:?} per row, but the output expects {expected:?}")]
    ShapeMismatch {
        array_type: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error(transparent)]
    Read(#[from] VisReadError),

    #[error("Error when trying to interface with measurement set: {0}")]
    Table(#[from] rubbl_casatables::TableError),

    #[error("Error from casacore: {0}")]
    Casacore(#[from] rubbl_casatables::CasacoreError),
}
