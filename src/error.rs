//! Error type for all run-level errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::{read::VisReadError, write::VisWriteError};

#[derive(Error, Debug)]
pub enum BlavgError {
    #[error("Cannot find the input measurement set {0}")]
    InputNotFound(PathBuf),

    #[error("Output {0} exists and clobbering was not requested")]
    OutputConflict(PathBuf),

    #[error("The ionosphere factor must be a non-negative number; got {0}")]
    InvalidIonFactor(f64),

    #[error("The name of the data column to smooth was empty")]
    EmptyColumnName,

    #[error("{num_failed} baseline(s) could not be written to the output")]
    FailedWrites { num_failed: usize },

    #[error(transparent)]
    Read(#[from] VisReadError),

    #[error(transparent)]
    Write(#[from] VisWriteError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
