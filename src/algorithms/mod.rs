use crate::{BenchError, Dtype, Keys, Result};

pub mod comb;
pub mod heap;
pub mod insertion;
pub mod merge;
pub mod quick;
pub mod radix;

pub use comb::comb_sort;
pub use heap::heap_sort;
pub use insertion::insertion_sort;
pub use merge::merge_sort;
pub use quick::{quick_sort_2, quick_sort_3};
pub use radix::radix_sort;

/// Key types the comparison sorts operate on
pub trait SortKey: Copy + PartialOrd + Send + Sync + 'static {}

impl SortKey for i64 {}
impl SortKey for f64 {}

/// Built-in sorting algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Stable O(n²) baseline, correctness anchor for small inputs
    Insertion,
    /// Stable O(n log n), not in place
    Merge,
    /// Iterative two-way partition quicksort with random pivots
    QuickTwoWay,
    /// Iterative three-way partition quicksort, duplicate friendly
    QuickThreeWay,
    /// Gap-shrinking bubble sort variant
    Comb,
    /// In-place binary max-heap sort
    Heap,
    /// LSD byte radix sort, integer keys only
    Radix,
}

impl Builtin {
    /// Canonical name used in selections, tables and reports
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Insertion => "insertion_sort",
            Builtin::Merge => "merge_sort",
            Builtin::QuickTwoWay => "quick_sort_2",
            Builtin::QuickThreeWay => "quick_sort_3",
            Builtin::Comb => "comb_sort",
            Builtin::Heap => "heap_sort",
            Builtin::Radix => "radix_sort",
        }
    }

    /// All built-ins in registration order
    pub fn all() -> Vec<Builtin> {
        vec![
            Builtin::Insertion,
            Builtin::Merge,
            Builtin::QuickTwoWay,
            Builtin::QuickThreeWay,
            Builtin::Comb,
            Builtin::Heap,
            Builtin::Radix,
        ]
    }

    /// Whether this algorithm can only sort integer keys
    pub fn integer_only(&self) -> bool {
        matches!(self, Builtin::Radix)
    }

    /// Sort owned keys, returning them in ascending order
    pub fn sort(&self, keys: Keys) -> Result<Keys> {
        match keys {
            Keys::Int(values) => Ok(Keys::Int(match self {
                Builtin::Radix => radix_sort(values),
                _ => self.sort_by_comparison(values)?,
            })),
            Keys::Float(values) => self.sort_by_comparison(values).map(Keys::Float),
        }
    }

    fn sort_by_comparison<T: SortKey>(&self, values: Vec<T>) -> Result<Vec<T>> {
        Ok(match self {
            Builtin::Insertion => insertion_sort(values),
            Builtin::Merge => merge_sort(values),
            Builtin::QuickTwoWay => quick_sort_2(values),
            Builtin::QuickThreeWay => quick_sort_3(values),
            Builtin::Comb => comb_sort(values),
            Builtin::Heap => heap_sort(values),
            Builtin::Radix => {
                return Err(BenchError::Unsupported {
                    algorithm: self.name().to_string(),
                    dtype: Dtype::Float.name(),
                });
            }
        })
    }
}
