use crate::RadixKey;

/// Straight insertion sort, for buckets of a few dozen items.
pub fn insertion_sort<T>(bucket: &mut [T])
where
    T: RadixKey,
{
    for i in 1..bucket.len() {
        let item = bucket[i];
        let mut j = i;

        while j > 0 && bucket[j - 1] > item {
            bucket[j] = bucket[j - 1];
            j -= 1;
        }

        bucket[j] = item;
    }
}
