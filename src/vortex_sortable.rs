use crate::error::Result;
use crate::tuning_parameters::TuningParameters;
use crate::vortex_sort::{SortReport, VortexSort};
use crate::vortex_sort_builder::VortexSortBuilder;
use crate::RadixKey;

pub trait VortexSortable<T> {
    /// vortex_sort sorts the values in place with a `VortexSort` sized for exactly this many
    /// items, reserving and dropping its block pool within the call.
    ///
    /// ```
    /// use vortex_sort::VortexSortable;
    ///
    /// let mut values = [3u32, 1, 2];
    /// values.vortex_sort().unwrap();
    ///
    /// assert_eq!(values, [1, 2, 3]);
    /// ```
    fn vortex_sort(&mut self) -> Result<SortReport>;

    /// A builder sized for this many items, for when the defaults do not fit.
    fn vortex_sort_builder(&self) -> VortexSortBuilder<T>;
}

impl<T> VortexSortable<T> for [T]
where
    T: RadixKey,
{
    fn vortex_sort(&mut self) -> Result<SortReport> {
        self.vortex_sort_builder().build()?.sort(self)
    }

    fn vortex_sort_builder(&self) -> VortexSortBuilder<T> {
        VortexSort::builder(self.len())
            .with_block_size_power(TuningParameters::block_size_power_for::<T>(self.len()))
    }
}

impl<T> VortexSortable<T> for Vec<T>
where
    T: RadixKey,
{
    fn vortex_sort(&mut self) -> Result<SortReport> {
        self.as_mut_slice().vortex_sort()
    }

    fn vortex_sort_builder(&self) -> VortexSortBuilder<T> {
        self.as_slice().vortex_sort_builder()
    }
}
