use super::SortKey;

/// Stable bottom-up merge sort using one auxiliary buffer.
///
/// Runs of width 1, 2, 4, ... are merged back and forth between the two
/// buffers, so no recursion depth grows with the input.
pub fn merge_sort<T: SortKey>(data: Vec<T>) -> Vec<T> {
    let n = data.len();
    if n < 2 {
        return data;
    }

    let mut src = data;
    let mut dst = src.clone();
    let mut width = 1;

    while width < n {
        let mut lo = 0;
        while lo < n {
            let mid = (lo + width).min(n);
            let hi = (lo + 2 * width).min(n);
            merge_runs(&src[lo..mid], &src[mid..hi], &mut dst[lo..hi]);
            lo = hi;
        }
        std::mem::swap(&mut src, &mut dst);
        width *= 2;
    }

    src
}

/// Merge two sorted runs, taking from `left` on ties to stay stable
fn merge_runs<T: SortKey>(left: &[T], right: &[T], out: &mut [T]) {
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        if j >= right.len() || (i < left.len() && left[i] <= right[j]) {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sort_odd_lengths() {
        assert_eq!(merge_sort(vec![5, 4, 3, 2, 1]), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            merge_sort(vec![9, -3, 7, 7, 0, 12, -3]),
            vec![-3, -3, 0, 7, 7, 9, 12]
        );
    }

    #[test]
    fn test_merge_runs_prefers_left_on_ties() {
        let mut out = [0.0; 4];
        merge_runs(&[-0.0, 1.0], &[0.0, 2.0], &mut out);
        // -0.0 and 0.0 compare equal, so the left one must come first
        assert!(out[0].is_sign_negative());
        assert!(out[1].is_sign_positive());
    }
}
