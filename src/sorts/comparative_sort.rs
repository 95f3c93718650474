use crate::RadixKey;

/// Sort a bucket that fits in one block. Every key in a bucket shares its leading digits, so
/// ordering by the whole key orders by the remaining digits.
pub fn comparative_sort<T>(bucket: &mut [T])
where
    T: RadixKey,
{
    bucket.sort_unstable();
}

#[cfg(test)]
mod tests {
    use crate::sorts::comparative_sort::comparative_sort;
    use crate::utils::test_utils::{sort_comparison_suite, NumericTest};

    fn test_comparative_sort_adapter<T>(shift: T)
    where
        T: NumericTest<T>,
    {
        sort_comparison_suite(shift, |inputs| comparative_sort(inputs));
    }

    #[test]
    pub fn test_u8() {
        test_comparative_sort_adapter(0u8);
    }

    #[test]
    pub fn test_u16() {
        test_comparative_sort_adapter(8u16);
    }

    #[test]
    pub fn test_u32() {
        test_comparative_sort_adapter(16u32);
    }

    #[test]
    pub fn test_u64() {
        test_comparative_sort_adapter(32u64);
    }

    #[test]
    pub fn test_empty() {
        // This is expected not to panic
        comparative_sort::<usize>(&mut []);
    }
}
