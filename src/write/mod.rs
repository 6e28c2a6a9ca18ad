//! Writing smoothed visibilities, one baseline at a time.

mod error;
pub mod ms;

pub use error::VisWriteError;

use crate::{averaging::SmoothedVis, baselines::BaselineGroup};

pub trait VisWrite {
    /// Write smoothed visibilities and weights for a baseline. The writer finds
    /// the rows of `group`'s antenna pair in its own dataset; the `i`th time
    /// sample of `smoothed` goes to the `i`th of those rows, ordered by time.
    /// Flags are never touched.
    fn write_baseline(
        &mut self,
        group: &BaselineGroup,
        smoothed: &SmoothedVis,
    ) -> Result<(), VisWriteError>;
}
