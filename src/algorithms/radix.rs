const RADIX_BITS: u32 = 8;
const RADIX: usize = 1 << RADIX_BITS;
const SIGN_BIT: u64 = 1 << 63;

/// Byte-wise LSD radix sort for signed 64-bit keys.
///
/// Keys are mapped to `u64` with the sign bit flipped so that the unsigned
/// order matches the signed order. Passes where every key shares the same
/// digit are skipped.
pub fn radix_sort(data: Vec<i64>) -> Vec<i64> {
    let n = data.len();
    if n < 2 {
        return data;
    }

    let mut keys: Vec<u64> = data.into_iter().map(|v| (v as u64) ^ SIGN_BIT).collect();
    let mut buffer = vec![0u64; n];
    let mut counts = [0usize; RADIX];

    for shift in (0..u64::BITS).step_by(RADIX_BITS as usize) {
        counts.fill(0);
        for &key in &keys {
            counts[digit(key, shift)] += 1;
        }

        if counts.iter().any(|&c| c == n) {
            continue;
        }

        // Exclusive prefix sums give each digit its first output slot
        let mut offset = 0;
        for count in counts.iter_mut() {
            let c = *count;
            *count = offset;
            offset += c;
        }

        for &key in &keys {
            let d = digit(key, shift);
            buffer[counts[d]] = key;
            counts[d] += 1;
        }
        std::mem::swap(&mut keys, &mut buffer);
    }

    keys.into_iter().map(|k| (k ^ SIGN_BIT) as i64).collect()
}

#[inline]
fn digit(key: u64, shift: u32) -> usize {
    ((key >> shift) as usize) & (RADIX - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radix_sort_signed() {
        assert_eq!(
            radix_sort(vec![3, -1, i64::MIN, 0, i64::MAX, -300, 256]),
            vec![i64::MIN, -300, -1, 0, 3, 256, i64::MAX]
        );
    }

    #[test]
    fn test_radix_sort_large_timestamps() {
        // nanosecond timestamps share their high bytes, exercising pass skipping
        let base = 1_701_676_800_000_000_000i64;
        let input = vec![base + 5, base + 1, base + 1_000_000, base];
        assert_eq!(
            radix_sort(input),
            vec![base, base + 1, base + 5, base + 1_000_000]
        );
    }
}
