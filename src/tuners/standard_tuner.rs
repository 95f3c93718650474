//! `StandardTuner` is the default choice of how each bucket is handled.
//!
//! StandardTuner algorithm choice is:
//!  * partition anything above the base case threshold
//!  * insertion sort for tiny buckets
//!  * comparative sort for the rest

use crate::tuner::{Algorithm, Tuner, TuningParams};
use crate::tuning_parameters::INSERTION_SORT_THRESHOLD;

pub struct StandardTuner;
impl Tuner for StandardTuner {
    #[inline]
    fn pick_algorithm(&self, p: &TuningParams) -> Algorithm {
        if p.input_len > p.base_case_threshold {
            return Algorithm::Partition;
        }

        match p.input_len {
            0..=INSERTION_SORT_THRESHOLD => Algorithm::Insertion,
            _ => Algorithm::Comparative,
        }
    }
}
