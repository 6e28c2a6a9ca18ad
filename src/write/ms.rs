//! Code to write smoothed visibilities into CASA measurement sets.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use marlu::{c32, rubbl_casatables};
use ndarray::prelude::*;
use rubbl_casatables::{Table, TableOpenMode};

use super::{VisWrite, VisWriteError};
use crate::{
    averaging::SmoothedVis, baselines::BaselineGroup, config::WEIGHT_COL_NAME,
    read::ms::read_baseline_groups,
};

/// Writes into the data and weights columns of an existing measurement set.
/// The output must have the same baselines and times as the data being
/// smoothed, i.e. be the input itself or a copy of it.
pub struct MsWriter {
    /// The path to the measurement set on disk.
    pub ms: PathBuf,

    main_table: Table,

    data_col_name: String,

    /// The shape of each row's visibilities; `[channel][polarisation]`.
    row_dim: (usize, usize),

    /// The time-ordered rows of each antenna pair.
    rows: HashMap<(usize, usize), Vec<u64>>,
}

impl MsWriter {
    pub fn new<P: AsRef<Path>>(ms: P, data_col_name: &str) -> Result<MsWriter, VisWriteError> {
        let ms = ms.as_ref();
        debug!("Writing to measurement set: {}", ms.display());
        if !ms.exists() {
            return Err(VisWriteError::BadFile(ms.to_path_buf()));
        }

        let mut main_table = Table::open(ms, TableOpenMode::ReadWrite)?;
        let col_names = main_table.column_names()?;
        for col in [data_col_name, WEIGHT_COL_NAME] {
            if !col_names.iter().any(|c| c == col) {
                return Err(VisWriteError::NoSuchColumn(col.to_string()));
            }
        }

        let rows: HashMap<(usize, usize), Vec<u64>> = read_baseline_groups(&mut main_table)?
            .into_iter()
            .map(|g| ((g.ant1, g.ant2), g.rows))
            .collect();
        let mut row_dim = (0, 0);
        if let Some(&row) = rows.values().flatten().next() {
            main_table.for_each_row_in_range(row..row + 1, |ms_row| {
                let cell: Array2<c32> = ms_row.get_cell(data_col_name)?;
                row_dim = cell.dim();
                Ok(())
            })?;
        }
        trace!(
            "Output has {} cross-correlation baselines, row shape {row_dim:?}",
            rows.len()
        );

        Ok(MsWriter {
            ms: ms.to_path_buf(),
            main_table,
            data_col_name: data_col_name.to_string(),
            row_dim,
            rows,
        })
    }

    fn check_row_dim(
        &self,
        array_type: &'static str,
        dim: (usize, usize, usize),
    ) -> Result<(), VisWriteError> {
        let found = (dim.1, dim.2);
        if found != self.row_dim {
            return Err(VisWriteError::ShapeMismatch {
                array_type,
                expected: self.row_dim,
                found,
            });
        }
        Ok(())
    }
}

impl VisWrite for MsWriter {
    fn write_baseline(
        &mut self,
        group: &BaselineGroup,
        smoothed: &SmoothedVis,
    ) -> Result<(), VisWriteError> {
        let (ant1, ant2) = (group.ant1, group.ant2);
        let rows = self
            .rows
            .get(&(ant1, ant2))
            .ok_or(VisWriteError::BaselineNotFound { ant1, ant2 })?;
        let num_times = smoothed.data.len_of(Axis(0));
        if rows.len() != num_times {
            return Err(VisWriteError::RowCountMismatch {
                ant1,
                ant2,
                expected: num_times,
                found: rows.len(),
            });
        }
        self.check_row_dim("visibilities", smoothed.data.dim())?;
        // Weights may not have been broadcast along polarisations.
        let weights = smoothed
            .weights
            .broadcast(smoothed.data.dim())
            .ok_or(VisWriteError::ShapeMismatch {
                array_type: "weights",
                expected: self.row_dim,
                found: (
                    smoothed.weights.len_of(Axis(1)),
                    smoothed.weights.len_of(Axis(2)),
                ),
            })?;

        for (&row, data, weights) in itertools::izip!(
            rows,
            smoothed.data.outer_iter(),
            weights.outer_iter()
        ) {
            self.main_table
                .put_cell(&self.data_col_name, row, &data.to_owned())?;
            self.main_table
                .put_cell(WEIGHT_COL_NAME, row, &weights.to_owned())?;
        }
        Ok(())
    }
}
