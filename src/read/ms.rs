//! Code to read visibilities from CASA measurement sets.
//!
//! More info: https://casa.nrao.edu/Memos/229.html#SECTION00060000000000000000

use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, trace};
use marlu::{c32, rubbl_casatables, UVW};
use ndarray::prelude::*;
use rubbl_casatables::{Table, TableOpenMode};
use vec1::Vec1;

use super::{VisRead, VisReadError};
use crate::{
    averaging::BaselineVis,
    baselines::{group_baselines, BaselineGroup},
    config::WEIGHT_COL_NAME,
};

/// Open a measurement set table read only. If `table` is `None`, then open the
/// base table.
pub(crate) fn read_table(ms: &Path, table: Option<&str>) -> Result<Table, VisReadError> {
    let t = Table::open(
        format!("{}/{}", ms.display(), table.unwrap_or("")),
        TableOpenMode::Read,
    )?;
    Ok(t)
}

/// Group the rows of a main table by baseline.
pub(crate) fn read_baseline_groups(
    main_table: &mut Table,
) -> Result<Vec<BaselineGroup>, VisReadError> {
    let to_index = |a: i32| usize::try_from(a).map_err(|_| VisReadError::AntennaNumNegative(a));
    let ant1 = main_table
        .get_col_as_vec::<i32>("ANTENNA1")?
        .into_iter()
        .map(to_index)
        .collect::<Result<Vec<_>, _>>()?;
    let ant2 = main_table
        .get_col_as_vec::<i32>("ANTENNA2")?
        .into_iter()
        .map(to_index)
        .collect::<Result<Vec<_>, _>>()?;
    let times: Vec<f64> = main_table.get_col_as_vec("TIME")?;
    Ok(group_baselines(&ant1, &ant2, &times))
}

/// Complain if `array_type` from `row_index` doesn't have the `expected`
/// shape.
fn check_shape(
    array_type: &'static str,
    row_index: u64,
    shape: (usize, usize),
    expected: (usize, usize),
) -> Result<(), VisReadError> {
    if shape.0 != expected.0 {
        return Err(VisReadError::BadArraySize {
            array_type,
            row_index,
            expected_len: expected.0,
            axis_num: 0,
        });
    }
    if shape.1 != expected.1 {
        return Err(VisReadError::BadArraySize {
            array_type,
            row_index,
            expected_len: expected.1,
            axis_num: 1,
        });
    }
    Ok(())
}

pub struct MsReader {
    /// The path to the measurement set on disk.
    pub ms: PathBuf,

    main_table: Table,

    /// The name of the column containing the visibilities to be read.
    data_col_name: String,

    /// The centre frequency of each channel \[Hz\].
    chan_freqs: Vec1<f64>,

    baseline_groups: Vec<BaselineGroup>,
}

impl MsReader {
    /// Open a measurement set and group its rows by baseline.
    ///
    /// Measurement sets with more than one spectral window or data description
    /// are rejected.
    pub fn new<P: AsRef<Path>>(ms: P, data_col_name: &str) -> Result<MsReader, VisReadError> {
        let ms = ms.as_ref();
        debug!("Using measurement set: {}", ms.display());
        if !ms.exists() {
            return Err(VisReadError::BadFile(ms.to_path_buf()));
        }

        let mut main_table = read_table(ms, None)?;
        if main_table.n_rows() == 0 {
            return Err(VisReadError::MainTableEmpty);
        }
        let col_names = main_table.column_names()?;
        for col in [data_col_name, WEIGHT_COL_NAME, "FLAG", "UVW"] {
            if !col_names.iter().any(|c| c == col) {
                return Err(VisReadError::NoSuchColumn(col.to_string()));
            }
        }

        if col_names.iter().any(|c| c == "DATA_DESC_ID") {
            let num_data_descs = main_table
                .get_col_as_vec::<i32>("DATA_DESC_ID")?
                .into_iter()
                .unique()
                .count();
            if num_data_descs > 1 {
                return Err(VisReadError::MultipleDataDescriptions(num_data_descs));
            }
        }

        let baseline_groups = read_baseline_groups(&mut main_table)?;
        trace!(
            "{} rows over {} cross-correlation baselines",
            main_table.n_rows(),
            baseline_groups.len()
        );

        let mut spectral_window_table = read_table(ms, Some("SPECTRAL_WINDOW"))?;
        let num_spws = spectral_window_table.n_rows();
        if num_spws > 1 {
            return Err(VisReadError::MultipleSpectralWindows(num_spws));
        }
        let chan_freqs: Vec<f64> = spectral_window_table.get_cell_as_vec("CHAN_FREQ", 0)?;
        let chan_freqs = Vec1::try_from_vec(chan_freqs).map_err(|_| VisReadError::NoChannelFreqs)?;
        debug!(
            "{} channels, {:.3} MHz to {:.3} MHz",
            chan_freqs.len(),
            chan_freqs.first() / 1e6,
            chan_freqs.last() / 1e6
        );

        Ok(MsReader {
            ms: ms.to_path_buf(),
            main_table,
            data_col_name: data_col_name.to_string(),
            chan_freqs,
            baseline_groups,
        })
    }
}

impl VisRead for MsReader {
    fn get_chan_freqs(&self) -> &Vec1<f64> {
        &self.chan_freqs
    }

    fn get_baseline_groups(&self) -> &[BaselineGroup] {
        &self.baseline_groups
    }

    fn read_baseline(&mut self, group: &BaselineGroup) -> Result<BaselineVis, VisReadError> {
        let num_rows = group.num_rows();
        if num_rows == 0 {
            return Err(VisReadError::EmptyBaseline {
                ant1: group.ant1,
                ant2: group.ant2,
            });
        }
        let num_chans = self.chan_freqs.len();

        let mut uvws = Vec::with_capacity(num_rows);
        let mut cubes: Option<(Array3<c32>, Array3<bool>, Array3<f32>)> = None;
        let data_col_name = &self.data_col_name;
        for (i_time, &row) in group.rows.iter().enumerate() {
            let mut uvw: Vec<f64> = vec![];
            // The arrays are arranged [frequency][polarisation].
            let mut row_data: Array2<c32> = Array2::zeros((0, 0));
            let mut row_flags: Array2<bool> = Array2::from_elem((0, 0), false);
            let mut row_weights: Array2<f32> = Array2::zeros((0, 0));
            self.main_table
                .for_each_row_in_range(row..row + 1, |ms_row| {
                    uvw = ms_row.get_cell("UVW")?;
                    row_data = ms_row.get_cell(data_col_name)?;
                    row_flags = ms_row.get_cell("FLAG")?;
                    row_weights = ms_row.get_cell(WEIGHT_COL_NAME)?;
                    Ok(())
                })?;

            match uvw.as_slice() {
                &[u, v, w] => uvws.push(UVW { u, v, w }),
                _ => {
                    return Err(VisReadError::BadUvw {
                        row_index: row,
                        found: uvw.len(),
                    })
                }
            }

            let num_pols = row_data.len_of(Axis(1));
            let (data, flags, weights) = cubes.get_or_insert_with(|| {
                let dim = (num_rows, num_chans, num_pols);
                (
                    Array3::zeros(dim),
                    Array3::from_elem(dim, false),
                    Array3::zeros(dim),
                )
            });
            let expected = (num_chans, data.len_of(Axis(2)));
            check_shape("data", row, row_data.dim(), expected)?;
            check_shape("flags", row, row_flags.dim(), expected)?;
            check_shape("weights", row, row_weights.dim(), expected)?;

            data.index_axis_mut(Axis(0), i_time).assign(&row_data);
            flags.index_axis_mut(Axis(0), i_time).assign(&row_flags);
            weights.index_axis_mut(Axis(0), i_time).assign(&row_weights);
        }

        let (data, flags, weights) = cubes.ok_or(VisReadError::EmptyBaseline {
            ant1: group.ant1,
            ant2: group.ant2,
        })?;
        Ok(BaselineVis {
            uvws,
            data,
            flags,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::tests::{make_multi_spw_test_ms, make_test_ms, TestRow};

    #[test]
    fn test_read_ms() {
        let dir = tempdir().unwrap();
        let ms = dir.path().join("test.ms");
        let rows = vec![
            TestRow::new(0, 0, 10.0, 0.0),
            TestRow::new(0, 1, 10.0, 100.0),
            TestRow::new(1, 0, 10.0, 100.0),
            TestRow::new(0, 0, 12.0, 0.0),
            TestRow::new(0, 1, 12.0, 200.0),
            TestRow::new(1, 0, 12.0, 200.0),
        ];
        make_test_ms(&ms, &rows, &[150e6, 151e6, 152e6]);

        let mut reader = MsReader::new(&ms, "DATA").unwrap();
        assert_eq!(reader.get_chan_freqs().len(), 3);
        assert_abs_diff_eq!(*reader.get_chan_freqs().first(), 150e6);

        let groups = reader.get_baseline_groups().to_vec();
        assert_eq!(groups.len(), 1);
        assert_eq!((groups[0].ant1, groups[0].ant2), (0, 1));
        assert_eq!(groups[0].rows, vec![1, 4]);

        let vis = reader.read_baseline(&groups[0]).unwrap();
        assert_eq!(vis.data.dim(), (2, 3, 4));
        assert_eq!(vis.flags.dim(), (2, 3, 4));
        assert_eq!(vis.weights.dim(), (2, 3, 4));
        assert_abs_diff_eq!(vis.uvws[0].u, 100.0);
        assert_abs_diff_eq!(vis.uvws[1].u, 200.0);
        // The test MS encodes the row index into the data.
        assert_abs_diff_eq!(vis.data[(0, 0, 0)].re, 1.0);
        assert_abs_diff_eq!(vis.data[(1, 2, 3)].re, 4.0);
    }

    #[test]
    fn test_missing_ms() {
        let dir = tempdir().unwrap();
        let result = MsReader::new(dir.path().join("nope.ms"), "DATA");
        assert!(matches!(result, Err(VisReadError::BadFile(_))));
    }

    #[test]
    fn test_missing_data_column() {
        let dir = tempdir().unwrap();
        let ms = dir.path().join("test.ms");
        make_test_ms(&ms, &[TestRow::new(0, 1, 10.0, 100.0)], &[150e6]);
        let result = MsReader::new(&ms, "CORRECTED_DATA");
        assert!(matches!(result, Err(VisReadError::NoSuchColumn(c)) if c == "CORRECTED_DATA"));
    }

    #[test]
    fn test_flagged_and_weighted_rows() {
        let dir = tempdir().unwrap();
        let ms = dir.path().join("test.ms");
        let mut flagged = TestRow::new(0, 1, 12.0, 100.0);
        flagged.flagged = true;
        flagged.weight = 0.25;
        make_test_ms(
            &ms,
            &[TestRow::new(0, 1, 10.0, 100.0), flagged],
            &[150e6, 151e6],
        );

        let mut reader = MsReader::new(&ms, "DATA").unwrap();
        let groups = reader.get_baseline_groups().to_vec();
        let vis = reader.read_baseline(&groups[0]).unwrap();
        assert!(vis.flags.index_axis(Axis(0), 0).iter().all(|&f| !f));
        assert!(vis.flags.index_axis(Axis(0), 1).iter().all(|&f| f));
        assert_abs_diff_eq!(vis.weights[(0, 1, 2)], 1.0);
        assert_abs_diff_eq!(vis.weights[(1, 1, 2)], 0.25);
        assert_abs_diff_eq!(vis.data[(1, 0, 0)].im, -1.0);
    }

    #[test]
    fn test_multiple_spectral_windows_are_rejected() {
        let dir = tempdir().unwrap();
        let ms = dir.path().join("test.ms");
        make_multi_spw_test_ms(
            &ms,
            &[TestRow::new(0, 1, 10.0, 100.0)],
            &[&[150e6, 151e6], &[160e6, 161e6]],
        );
        let result = MsReader::new(&ms, "DATA");
        assert!(matches!(
            result,
            Err(VisReadError::MultipleSpectralWindows(2))
        ));
    }

    #[test]
    fn test_multiple_data_descriptions_are_rejected() {
        let dir = tempdir().unwrap();
        let ms = dir.path().join("test.ms");
        let mut other_band = TestRow::new(0, 1, 10.0, 100.0);
        other_band.data_desc_id = 1;
        make_test_ms(
            &ms,
            &[TestRow::new(0, 1, 10.0, 100.0), other_band],
            &[150e6],
        );
        let result = MsReader::new(&ms, "DATA");
        assert!(matches!(
            result,
            Err(VisReadError::MultipleDataDescriptions(2))
        ));
    }
}
