//! `DigitPlan` maps each sort level to the bits of the key it consumes.
//!
//! Level 0 is the most significant digit. Every level is `digit_bits` wide except the last
//! one, which takes whatever is left when the key width is not a multiple of `digit_bits`.

use crate::error::{ConfigError, Result};
use crate::tuning_parameters::MAX_DIGIT_BITS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigitPlan {
    key_bits: u32,
    digit_bits: u32,
    levels: usize,
}

impl DigitPlan {
    pub fn new(key_bits: u32, digit_bits: u32) -> Result<Self> {
        if digit_bits == 0 || digit_bits > MAX_DIGIT_BITS {
            return Err(ConfigError::DigitBits {
                bits: digit_bits,
                max: MAX_DIGIT_BITS,
            }
            .into());
        }

        Ok(Self {
            key_bits,
            digit_bits,
            levels: key_bits.div_ceil(digit_bits) as usize,
        })
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    #[inline]
    pub fn key_bits(&self) -> u32 {
        self.key_bits
    }

    #[inline]
    pub fn digit_bits(&self) -> u32 {
        self.digit_bits
    }

    /// Number of bits consumed at `level`.
    #[inline]
    pub fn width(&self, level: usize) -> u32 {
        let used = self.digit_bits * level as u32;

        self.digit_bits.min(self.key_bits.saturating_sub(used))
    }

    /// Number of bits below the digit consumed at `level`.
    #[inline]
    pub fn shift(&self, level: usize) -> u32 {
        let through = self.digit_bits.saturating_mul(level as u32 + 1);

        self.key_bits.saturating_sub(through)
    }

    /// `(shift, width)` of `level`, ready for `RadixKey::get_digit`.
    #[inline]
    pub fn digit(&self, level: usize) -> (u32, u32) {
        (self.shift(level), self.width(level))
    }

    #[inline]
    pub fn n_buckets(&self, level: usize) -> usize {
        1 << self.width(level)
    }

    /// Bucket count of every level, most significant first.
    pub fn fan_out(&self) -> Vec<usize> {
        (0..self.levels).map(|l| self.n_buckets(l)).collect()
    }

    /// Sum of `n_buckets` over all levels.
    pub fn total_buckets(&self) -> usize {
        self.fan_out().iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VortexError;
    use crate::RadixKey;

    #[test]
    pub fn test_divisible_plan() {
        let plan = DigitPlan::new(32, 8).unwrap();

        assert_eq!(plan.levels(), 4);
        assert_eq!(plan.digit(0), (24, 8));
        assert_eq!(plan.digit(3), (0, 8));
        assert_eq!(plan.fan_out(), vec![256; 4]);
        assert_eq!(plan.total_buckets(), 1024);
    }

    #[test]
    pub fn test_last_level_is_narrower() {
        let plan = DigitPlan::new(16, 6).unwrap();

        assert_eq!(plan.levels(), 3);
        assert_eq!(plan.digit(0), (10, 6));
        assert_eq!(plan.digit(1), (4, 6));
        assert_eq!(plan.digit(2), (0, 4));
        assert_eq!(plan.fan_out(), vec![64, 64, 16]);
    }

    #[test]
    pub fn test_digit_wider_than_key() {
        let plan = DigitPlan::new(8, 16).unwrap();

        assert_eq!(plan.levels(), 1);
        assert_eq!(plan.digit(0), (0, 8));
        assert_eq!(plan.n_buckets(0), 256);
    }

    #[test]
    pub fn test_levels_cover_every_bit() {
        let plan = DigitPlan::new(64, 11).unwrap();
        let v = 0xDEAD_BEEF_0123_4567u64;

        let rebuilt = (0..plan.levels()).fold(0u64, |acc, l| {
            let (shift, width) = plan.digit(l);
            acc.with_digit(shift, width, v.get_digit(shift, width))
        });

        assert_eq!(rebuilt, v);
    }

    #[test]
    pub fn test_invalid_digit_bits() {
        assert_eq!(
            DigitPlan::new(32, 0),
            Err(VortexError::InvalidConfiguration(ConfigError::DigitBits {
                bits: 0,
                max: MAX_DIGIT_BITS,
            }))
        );
        assert!(DigitPlan::new(32, MAX_DIGIT_BITS + 1).is_err());
    }
}
