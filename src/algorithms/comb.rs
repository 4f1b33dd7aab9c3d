use super::SortKey;

const SHRINK_FACTOR: f64 = 1.3;

/// Comb sort: bubble sort over a shrinking gap sequence
pub fn comb_sort<T: SortKey>(mut data: Vec<T>) -> Vec<T> {
    let n = data.len();
    let mut gap = n;
    let mut sorted = false;

    while !sorted {
        gap = (gap as f64 / SHRINK_FACTOR) as usize;
        if gap <= 1 {
            gap = 1;
            sorted = true;
        }
        for i in 0..n.saturating_sub(gap) {
            if data[i] > data[i + gap] {
                data.swap(i, i + gap);
                sorted = false;
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comb_sort_reverse() {
        let input: Vec<i64> = (0..100).rev().collect();
        let expected: Vec<i64> = (0..100).collect();
        assert_eq!(comb_sort(input), expected);
    }
}
