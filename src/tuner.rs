/// What the engine knows about a bucket when it decides how to handle it.
#[derive(Clone, Debug)]
pub struct TuningParams {
    /// Level of the digit the bucket's children would be split on.
    pub level: usize,
    pub total_levels: usize,
    pub input_len: usize,
    pub parent_len: Option<usize>,
    pub block_len: usize,
    pub base_case_threshold: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Algorithm {
    /// Split the bucket on its next digit.
    Partition,
    /// Sort the bucket inside its block with the standard library's unstable sort.
    Comparative,
    /// Sort the bucket inside its block with insertion sort.
    Insertion,
}

pub trait Tuner {
    fn pick_algorithm(&self, p: &TuningParams) -> Algorithm;
}
