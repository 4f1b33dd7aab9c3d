use super::SortKey;

/// In-place heap sort over a binary max-heap
pub fn heap_sort<T: SortKey>(mut data: Vec<T>) -> Vec<T> {
    let n = data.len();
    if n < 2 {
        return data;
    }

    for root in (0..n / 2).rev() {
        sift_down(&mut data, root, n);
    }
    for end in (1..n).rev() {
        data.swap(0, end);
        sift_down(&mut data, 0, end);
    }

    data
}

/// Restore the heap property below `root`, considering only `data[..end]`
fn sift_down<T: SortKey>(data: &mut [T], mut root: usize, end: usize) {
    loop {
        let left = 2 * root + 1;
        if left >= end {
            break;
        }
        let mut largest = if data[left] > data[root] { left } else { root };
        let right = left + 1;
        if right < end && data[right] > data[largest] {
            largest = right;
        }
        if largest == root {
            break;
        }
        data.swap(root, largest);
        root = largest;
    }
}
