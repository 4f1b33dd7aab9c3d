use super::SortKey;

/// Stable O(n²) insertion sort, the small-n correctness anchor
pub fn insertion_sort<T: SortKey>(mut data: Vec<T>) -> Vec<T> {
    for i in 1..data.len() {
        let key = data[i];
        let mut j = i;
        while j > 0 && data[j - 1] > key {
            data[j] = data[j - 1];
            j -= 1;
        }
        data[j] = key;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_sort_basic() {
        assert_eq!(insertion_sort(vec![3, 1, 2]), vec![1, 2, 3]);
        assert_eq!(insertion_sort(vec![2.5, -1.0, 2.5]), vec![-1.0, 2.5, 2.5]);
        assert_eq!(insertion_sort(Vec::<i64>::new()), Vec::<i64>::new());
    }
}
