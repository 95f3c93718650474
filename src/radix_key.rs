use std::fmt::Debug;

mod private {
    pub trait Sealed {}
}

/// Fixed-width unsigned integer keys that can be split into radix digits.
///
/// Digits are addressed by `shift` (the number of bits below the digit) and
/// `width` (the number of bits in the digit). The sort always walks from the
/// most significant digit down, so `shift` decreases with each level.
///
/// This trait is sealed: it is implemented for `u8`, `u16`, `u32`, `u64`,
/// `u128` and `usize` only.
pub trait RadixKey: private::Sealed + Copy + Ord + Debug + Send + Sync + 'static {
    /// Total number of bits in the key.
    const BITS: u32;

    const ZERO: Self;

    const MAX: Self;

    /// Extract `width` bits starting `shift` bits above the least significant bit.
    fn get_digit(&self, shift: u32, width: u32) -> usize;

    /// Overwrite the digit at (`shift`, `width`) with `digit`.
    fn with_digit(self, shift: u32, width: u32, digit: usize) -> Self;

    /// Set every bit below `shift` to one.
    fn fill_below(self, shift: u32) -> Self;

    /// Truncating (or zero-extending) conversion, used by key generators.
    fn from_u64(v: u64) -> Self;
}

macro_rules! impl_radix_key {
    ($($t:ty),*) => {
        $(
            impl private::Sealed for $t {}

            impl RadixKey for $t {
                const BITS: u32 = <$t>::BITS;
                const ZERO: Self = 0;
                const MAX: Self = <$t>::MAX;

                #[inline]
                fn get_digit(&self, shift: u32, width: u32) -> usize {
                    ((*self >> shift) & low_mask!($t, width)) as usize
                }

                #[inline]
                fn with_digit(self, shift: u32, width: u32, digit: usize) -> Self {
                    let mask = low_mask!($t, width);

                    (self & !(mask << shift)) | (((digit as $t) & mask) << shift)
                }

                #[inline]
                fn fill_below(self, shift: u32) -> Self {
                    self | low_mask!($t, shift)
                }

                #[inline]
                fn from_u64(v: u64) -> Self {
                    v as $t
                }
            }
        )*
    };
}

macro_rules! low_mask {
    ($t:ty, $bits:expr) => {
        if $bits >= <$t>::BITS {
            <$t>::MAX
        } else {
            ((1 as $t) << $bits) - 1
        }
    };
}

impl_radix_key!(u8, u16, u32, u64, u128, usize);
