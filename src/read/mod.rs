//! Reading visibilities, one baseline at a time.

mod error;
pub mod ms;

pub use error::VisReadError;

use vec1::Vec1;

use crate::{averaging::BaselineVis, baselines::BaselineGroup};

pub trait VisRead {
    /// The frequency of each channel \[Hz\].
    fn get_chan_freqs(&self) -> &Vec1<f64>;

    /// All of the cross-correlation baselines in the data, with the rows
    /// belonging to each.
    fn get_baseline_groups(&self) -> &[BaselineGroup];

    /// Read the UVWs, flags, weights and visibilities for the rows of `group`,
    /// in the order of the group's rows.
    fn read_baseline(&mut self, group: &BaselineGroup) -> Result<BaselineVis, VisReadError>;
}
