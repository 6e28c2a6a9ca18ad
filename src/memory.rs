//! Visibilities held in memory.
//!
//! [`MemoryVis`] implements both [`VisRead`] and [`VisWrite`], so smoothing can
//! be driven without a measurement set. Handles made with [`MemoryVis::share`]
//! see the same rows, which allows smoothing "in place".

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use marlu::{c32, UVW};
use ndarray::prelude::*;
use vec1::Vec1;

use crate::{
    averaging::{BaselineVis, SmoothedVis},
    baselines::{group_baselines, BaselineGroup},
    read::{VisRead, VisReadError},
    write::{VisWrite, VisWriteError},
};

/// A single row of a visibility table. Arrays are arranged
/// `[channel][polarisation]`.
#[derive(Debug, Clone)]
pub struct VisRow {
    pub ant1: usize,
    pub ant2: usize,

    /// \[seconds\]
    pub time: f64,

    /// \[metres\]
    pub uvw: UVW,

    pub data: Array2<c32>,
    pub flags: Array2<bool>,
    pub weights: Array2<f32>,
}

impl VisRow {
    /// A row with unflagged, unit-weighted visibilities.
    pub fn new(ant1: usize, ant2: usize, time: f64, uvw: UVW, data: Array2<c32>) -> VisRow {
        let dim = data.dim();
        VisRow {
            ant1,
            ant2,
            time,
            uvw,
            data,
            flags: Array2::from_elem(dim, false),
            weights: Array2::ones(dim),
        }
    }
}

pub struct MemoryVis {
    rows: Rc<RefCell<Vec<VisRow>>>,
    chan_freqs: Vec1<f64>,
    baseline_groups: Vec<BaselineGroup>,
}

impl MemoryVis {
    pub fn new(rows: Vec<VisRow>, chan_freqs: Vec1<f64>) -> MemoryVis {
        let ant1: Vec<usize> = rows.iter().map(|r| r.ant1).collect();
        let ant2: Vec<usize> = rows.iter().map(|r| r.ant2).collect();
        let times: Vec<f64> = rows.iter().map(|r| r.time).collect();
        let baseline_groups = group_baselines(&ant1, &ant2, &times);
        MemoryVis {
            rows: Rc::new(RefCell::new(rows)),
            chan_freqs,
            baseline_groups,
        }
    }

    /// Another handle on the same rows. Writes through either handle are seen
    /// by both.
    pub fn share(&self) -> MemoryVis {
        MemoryVis {
            rows: Rc::clone(&self.rows),
            chan_freqs: self.chan_freqs.clone(),
            baseline_groups: self.baseline_groups.clone(),
        }
    }

    /// An independent copy of the rows.
    pub fn deep_copy(&self) -> MemoryVis {
        MemoryVis {
            rows: Rc::new(RefCell::new(self.rows.borrow().clone())),
            chan_freqs: self.chan_freqs.clone(),
            baseline_groups: self.baseline_groups.clone(),
        }
    }

    pub fn rows(&self) -> Ref<'_, [VisRow]> {
        Ref::map(self.rows.borrow(), |r| r.as_slice())
    }
}

impl VisRead for MemoryVis {
    fn get_chan_freqs(&self) -> &Vec1<f64> {
        &self.chan_freqs
    }

    fn get_baseline_groups(&self) -> &[BaselineGroup] {
        &self.baseline_groups
    }

    fn read_baseline(&mut self, group: &BaselineGroup) -> Result<BaselineVis, VisReadError> {
        let all_rows = self.rows.borrow();
        let first = group
            .rows
            .first()
            .and_then(|&r| all_rows.get(r as usize))
            .ok_or(VisReadError::EmptyBaseline {
                ant1: group.ant1,
                ant2: group.ant2,
            })?;
        let num_chans = self.chan_freqs.len();
        let num_pols = first.data.len_of(Axis(1));
        let dim = (group.num_rows(), num_chans, num_pols);

        let mut vis = BaselineVis {
            uvws: Vec::with_capacity(group.num_rows()),
            data: Array3::zeros(dim),
            flags: Array3::from_elem(dim, false),
            weights: Array3::zeros(dim),
        };
        for (i_time, &i_row) in group.rows.iter().enumerate() {
            let row = &all_rows[i_row as usize];
            for (array_type, found) in [
                ("data", row.data.dim()),
                ("flags", row.flags.dim()),
                ("weights", row.weights.dim()),
            ] {
                if found.0 != num_chans || found.1 != num_pols {
                    return Err(VisReadError::BadArraySize {
                        array_type,
                        row_index: i_row,
                        expected_len: if found.0 != num_chans {
                            num_chans
                        } else {
                            num_pols
                        },
                        axis_num: usize::from(found.0 == num_chans),
                    });
                }
            }

            vis.uvws.push(row.uvw);
            vis.data.index_axis_mut(Axis(0), i_time).assign(&row.data);
            vis.flags.index_axis_mut(Axis(0), i_time).assign(&row.flags);
            vis.weights
                .index_axis_mut(Axis(0), i_time)
                .assign(&row.weights);
        }
        Ok(vis)
    }
}

impl VisWrite for MemoryVis {
    fn write_baseline(
        &mut self,
        group: &BaselineGroup,
        smoothed: &SmoothedVis,
    ) -> Result<(), VisWriteError> {
        let (ant1, ant2) = (group.ant1, group.ant2);
        let own_group = self
            .baseline_groups
            .iter()
            .find(|g| g.ant1 == ant1 && g.ant2 == ant2)
            .ok_or(VisWriteError::BaselineNotFound { ant1, ant2 })?;
        let num_times = smoothed.data.len_of(Axis(0));
        if own_group.num_rows() != num_times {
            return Err(VisWriteError::RowCountMismatch {
                ant1,
                ant2,
                expected: num_times,
                found: own_group.num_rows(),
            });
        }

        let mut all_rows = self.rows.borrow_mut();
        for (i_time, &i_row) in own_group.rows.iter().enumerate() {
            let row = &mut all_rows[i_row as usize];
            let row_dim = row.data.dim();
            let data = smoothed.data.index_axis(Axis(0), i_time);
            if data.dim() != row_dim {
                return Err(VisWriteError::ShapeMismatch {
                    array_type: "visibilities",
                    expected: row_dim,
                    found: data.dim(),
                });
            }
            let weights = smoothed.weights.index_axis(Axis(0), i_time);
            let weights = weights
                .broadcast(row_dim)
                .ok_or(VisWriteError::ShapeMismatch {
                    array_type: "weights",
                    expected: row_dim,
                    found: weights.dim(),
                })?;

            row.data.assign(&data);
            row.weights = weights.to_owned();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use vec1::vec1;

    use super::*;

    fn rows() -> Vec<VisRow> {
        let uvw = UVW {
            u: 50.0,
            v: 0.0,
            w: 0.0,
        };
        // Times are deliberately out of order.
        [(0, 1, 4.0), (0, 1, 2.0), (1, 1, 2.0), (1, 0, 2.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (ant1, ant2, time))| {
                VisRow::new(
                    ant1,
                    ant2,
                    time,
                    uvw,
                    Array2::from_elem((2, 1), c32::new(i as f32, 0.0)),
                )
            })
            .collect()
    }

    #[test]
    fn test_read_sorted_by_time() {
        let mut vis = MemoryVis::new(rows(), vec1![100e6, 101e6]);
        let groups = vis.get_baseline_groups().to_vec();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows, vec![1, 0]);

        let baseline = vis.read_baseline(&groups[0]).unwrap();
        assert_eq!(baseline.data.dim(), (2, 2, 1));
        assert_abs_diff_eq!(baseline.data[(0, 0, 0)].re, 1.0);
        assert_abs_diff_eq!(baseline.data[(1, 1, 0)].re, 0.0);
        assert_abs_diff_eq!(baseline.uvws[1].u, 50.0);
    }

    #[test]
    fn test_wrong_channel_count_is_an_error() {
        let mut vis = MemoryVis::new(rows(), vec1![100e6, 101e6, 102e6]);
        let groups = vis.get_baseline_groups().to_vec();
        let result = vis.read_baseline(&groups[0]);
        assert!(matches!(
            result,
            Err(VisReadError::BadArraySize {
                expected_len: 3,
                axis_num: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_shared_handles_see_writes() {
        let vis = MemoryVis::new(rows(), vec1![100e6, 101e6]);
        let mut writer = vis.share();
        let copy = vis.deep_copy();
        let group = vis.get_baseline_groups()[0].clone();
        let smoothed = SmoothedVis {
            data: Array3::from_elem((2, 2, 1), c32::new(9.0, 1.0)),
            weights: Array3::from_elem((2, 2, 1), 3.0),
            num_invalid: 0,
        };
        writer.write_baseline(&group, &smoothed).unwrap();

        let rows = vis.rows();
        assert_abs_diff_eq!(rows[0].data[(1, 0)].re, 9.0);
        assert_abs_diff_eq!(rows[1].weights[(0, 0)], 3.0);
        // Unrelated rows and the copy are untouched.
        assert_abs_diff_eq!(rows[3].data[(0, 0)].re, 3.0);
        assert_abs_diff_eq!(copy.rows()[0].data[(1, 0)].re, 0.0);
    }

    #[test]
    fn test_write_unknown_baseline() {
        let mut vis = MemoryVis::new(rows(), vec1![100e6, 101e6]);
        let group = BaselineGroup {
            ant1: 3,
            ant2: 4,
            rows: vec![0],
            times: vec![0.0],
        };
        let smoothed = SmoothedVis {
            data: Array3::zeros((1, 2, 1)),
            weights: Array3::zeros((1, 2, 1)),
            num_invalid: 0,
        };
        assert!(matches!(
            vis.write_baseline(&group, &smoothed),
            Err(VisWriteError::BaselineNotFound { ant1: 3, ant2: 4 })
        ));
    }
}
