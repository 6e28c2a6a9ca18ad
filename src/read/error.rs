//! Errors associated with reading visibilities.

use std::path::PathBuf;

use marlu::rubbl_casatables;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisReadError {
    #[error("Supplied file path {0} does not exist or is not readable!")]
    BadFile(PathBuf),

    #[error("The main table of the measurement set contains no rows!")]
    MainTableEmpty,

    #[error("The SPECTRAL_WINDOW table contained no channel frequencies")]
    NoChannelFreqs,

    #[error("The SPECTRAL_WINDOW table has {0} rows, but only measurement sets with a single spectral window can be smoothed")]
    MultipleSpectralWindows(u64),

    #[error("The main table uses {0} different DATA_DESC_IDs, but only measurement sets with a single data description can be smoothed")]
    MultipleDataDescriptions(usize),

    #[error("Found a negative antenna number ({0}); all antenna numbers must be positive")]
    AntennaNumNegative(i32),

    #[error("Row {row_index} has {found} UVW elements, but 3 are expected")]
    BadUvw { row_index: u64, found: usize },

    #[error("{array_type} from row {row_index} did not have expected {expected_len} elements on axis {axis_num}!")]
    BadArraySize {
        array_type: &'static str,
        row_index: u64,
        expected_len: usize,
        axis_num: usize,
    },

    #[error("There is no column called {0}")]
    NoSuchColumn(String),

    #[error("A baseline with no rows ({ant1} - {ant2}) can't be read")]
    EmptyBaseline { ant1: usize, ant2: usize },

    #[error("Error when trying to interface with measurement set: {0}")]
    Table(#[from] rubbl_casatables::TableError),

    #[error("Error from casacore: {0}")]
    Casacore(#[from] rubbl_casatables::CasacoreError),
}
