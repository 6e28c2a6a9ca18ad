//! Partitioning of a visibility table into baselines.

use std::collections::BTreeMap;

use hifitime::Duration;
use itertools::izip;

/// The rows of a table belonging to a single baseline (antenna pair), sorted
/// by time. Only cross-correlations with `ant1 < ant2` are ever grouped.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineGroup {
    pub ant1: usize,
    pub ant2: usize,

    /// The indices of the rows in the table.
    pub rows: Vec<u64>,

    /// The timestamp of each row \[seconds\]. Only differences between these
    /// are used, so the epoch doesn't matter.
    pub times: Vec<f64>,
}

impl BaselineGroup {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The time resolution of this baseline, i.e. the gap between the first
    /// two distinct timestamps. Samples are assumed to be regularly spaced.
    /// `None` if there is only one distinct timestamp.
    pub fn time_res(&self) -> Option<Duration> {
        let first = *self.times.first()?;
        self.times
            .iter()
            .find(|&&t| t > first)
            .map(|&t| Duration::from_seconds(t - first))
    }
}

/// Group the rows of a table by baseline. The three slices are the antenna
/// indices and times of each row; row `i` of the table is described by the
/// `i`th element of each.
///
/// Auto-correlations and rows with `ant1 > ant2` are dropped; the latter are
/// mirrors of baselines that are already being processed. Groups are returned
/// in ascending antenna order, with each group's rows sorted by time (ties
/// keep their table order).
pub fn group_baselines(ant1: &[usize], ant2: &[usize], times: &[f64]) -> Vec<BaselineGroup> {
    assert_eq!(ant1.len(), ant2.len());
    assert_eq!(ant1.len(), times.len());

    let mut map: BTreeMap<(usize, usize), Vec<(u64, f64)>> = BTreeMap::new();
    for (i_row, &a1, &a2, &t) in izip!(0.., ant1, ant2, times) {
        if a1 >= a2 {
            continue;
        }
        map.entry((a1, a2)).or_default().push((i_row, t));
    }

    map.into_iter()
        .map(|((ant1, ant2), mut rows)| {
            rows.sort_by(|a, b| a.1.total_cmp(&b.1));
            let (rows, times) = rows.into_iter().unzip();
            BaselineGroup {
                ant1,
                ant2,
                rows,
                times,
            }
        })
        .collect()
}
