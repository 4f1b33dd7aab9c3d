use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::SortKey;

/// Fixed pivot seed so repeated runs on the same sample do identical work
const PIVOT_SEED: u64 = 0x5EED_0F_50F7;

fn pivot_rng(len: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(PIVOT_SEED ^ len as u64)
}

/// Iterative quicksort with a two-way Hoare partition and random pivots.
///
/// Pending ranges are half-open `[lo, hi)` on an explicit stack. The larger
/// side is pushed first so the smaller one is processed next, which keeps the
/// stack at O(log n) entries.
pub fn quick_sort_2<T: SortKey>(mut data: Vec<T>) -> Vec<T> {
    if data.len() < 2 {
        return data;
    }

    let mut rng = pivot_rng(data.len());
    let mut stack = vec![(0usize, data.len())];

    while let Some((lo, hi)) = stack.pop() {
        if hi - lo < 2 {
            continue;
        }
        let pivot_idx = rng.gen_range(lo..hi);
        data.swap(lo, pivot_idx);
        let split = hoare_partition(&mut data, lo, hi - 1) + 1;
        push_ordered(&mut stack, (lo, split), (split, hi));
    }

    data
}

/// Hoare partition of `data[lo..=last]` around the pivot stored at `lo`.
///
/// Returns `j` with `lo <= j < last`: every element of `[lo, j]` is `<=` the
/// pivot and every element of `[j + 1, last]` is `>=` it.
fn hoare_partition<T: SortKey>(data: &mut [T], lo: usize, last: usize) -> usize {
    let pivot = data[lo];
    let mut i = lo;
    let mut j = last;
    loop {
        while data[i] < pivot {
            i += 1;
        }
        while data[j] > pivot {
            j -= 1;
        }
        if i >= j {
            return j;
        }
        data.swap(i, j);
        i += 1;
        j -= 1;
    }
}

/// Iterative quicksort with a three-way (Dutch flag) partition.
///
/// Keys equal to the pivot are settled in one pass, so heavily duplicated
/// columns (categorical codes) stay O(n log k) for k distinct values.
pub fn quick_sort_3<T: SortKey>(mut data: Vec<T>) -> Vec<T> {
    if data.len() < 2 {
        return data;
    }

    let mut rng = pivot_rng(data.len());
    let mut stack = vec![(0usize, data.len())];

    while let Some((lo, hi)) = stack.pop() {
        if hi - lo < 2 {
            continue;
        }
        let pivot = data[rng.gen_range(lo..hi)];

        // [lo, lt) < pivot, [lt, i) == pivot, [i, gt) unknown, [gt, hi) > pivot
        let (mut lt, mut i, mut gt) = (lo, lo, hi);
        while i < gt {
            if data[i] < pivot {
                data.swap(lt, i);
                lt += 1;
                i += 1;
            } else if data[i] > pivot {
                gt -= 1;
                data.swap(i, gt);
            } else {
                i += 1;
            }
        }

        push_ordered(&mut stack, (lo, lt), (gt, hi));
    }

    data
}

fn push_ordered(stack: &mut Vec<(usize, usize)>, a: (usize, usize), b: (usize, usize)) {
    let (small, large) = if a.1 - a.0 <= b.1 - b.0 { (a, b) } else { (b, a) };
    if large.1 - large.0 > 1 {
        stack.push(large);
    }
    if small.1 - small.0 > 1 {
        stack.push(small);
    }
}
