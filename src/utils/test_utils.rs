use crate::tuner::{Algorithm, Tuner, TuningParams};
use crate::{RadixKey, VortexSort};
use block_pseudorand::block_rand;
use std::fmt::Debug;
use std::ops::{Shl, ShlAssign, Shr, ShrAssign};

/// Largest input produced by `gen_input_set`.
pub const MAX_SET_LEN: usize = 200_000;

pub trait NumericTest<T>:
    RadixKey
    + Sized
    + Copy
    + Debug
    + PartialEq
    + Ord
    + Send
    + Sync
    + Shl<Output = T>
    + Shr<Output = T>
    + ShrAssign
    + ShlAssign
{
}

impl<T> NumericTest<T> for T where
    T: RadixKey
        + Sized
        + Copy
        + Debug
        + PartialEq
        + Ord
        + Send
        + Sync
        + Shl<Output = T>
        + Shr<Output = T>
        + ShrAssign
        + ShlAssign
{
}

pub struct SingleAlgoTuner {
    pub(crate) algo: Algorithm,
}

impl Tuner for SingleAlgoTuner {
    #[inline]
    fn pick_algorithm(&self, _p: &TuningParams) -> Algorithm {
        self.algo
    }
}

/// Random keys; the first half shifted right by `shift`, the second half shifted left, so that
/// both the top and the bottom digits see skewed distributions.
pub fn gen_inputs<T>(n: usize, shift: T) -> Vec<T>
where
    T: NumericTest<T>,
{
    let mut inputs: Vec<T> = block_rand(n);

    inputs[0..(n / 2)].iter_mut().for_each(|v| *v >>= shift);
    inputs[(n / 2)..n].iter_mut().for_each(|v| *v <<= shift);

    inputs
}

pub fn gen_input_set<T>(shift: T) -> Vec<Vec<T>>
where
    T: NumericTest<T>,
{
    let n = MAX_SET_LEN;
    let half = n / 2;
    let inputs = gen_inputs(n, shift);

    // Middle values are used for the case where shift is provided
    let mut out = vec![
        vec![],
        inputs[..1].to_vec(),
        inputs[(half - 5)..(half + 5)].to_vec(),
        inputs[(half - 50)..(half + 50)].to_vec(),
        inputs[(half - 2_500)..(half + 2_500)].to_vec(),
        inputs[(half - 5_000)..(half + 5_000)].to_vec(),
        inputs[(half - 25_000)..(half + 25_000)].to_vec(),
        inputs[(half - 50_000)..(half + 50_000)].to_vec(),
        inputs,
    ];

    out.reverse();

    out
}

pub fn validate_sort<T, F>(mut inputs: Vec<T>, mut sort_fn: F)
where
    T: NumericTest<T>,
    F: FnMut(&mut [T]),
{
    let mut inputs_clone = inputs.clone();

    sort_fn(&mut inputs);
    inputs_clone.sort_unstable();

    assert_eq!(inputs, inputs_clone);
}

pub fn sort_comparison_suite<T, F>(shift: T, mut sort_fn: F)
where
    F: FnMut(&mut [T]),
    T: NumericTest<T>,
{
    let input_set = gen_input_set(shift);

    for s in input_set {
        validate_sort(s, &mut sort_fn);
    }
}

/// Sort `count` random keys with a sorter whose tuner always answers `algo`.
pub fn sort_single_algorithm<T>(count: usize, algo: Algorithm)
where
    T: RadixKey,
{
    let mut input_set = block_rand::<T>(count);
    let mut input_set_expected = input_set.clone();

    let mut sorter = VortexSort::<T>::builder(count)
        .with_block_size_power(16)
        .with_tuner(Box::new(SingleAlgoTuner { algo }))
        .build()
        .unwrap();

    sorter.sort(&mut input_set).unwrap();
    input_set_expected.sort_unstable();

    assert_eq!(input_set, input_set_expected);
    assert_eq!(sorter.block_count(), 0);
}
