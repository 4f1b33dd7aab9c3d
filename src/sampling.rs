use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{BenchError, ColumnMeta, Keys, Result};

/// Seed plus the ascending list of sampling ratios for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSpec {
    seed: u64,
    ratios: Vec<f64>,
}

impl SamplingSpec {
    /// Ratios are sorted ascending and de-duplicated. Ratios above 1 or
    /// non-finite ratios are rejected; ratios `<= 0` are kept and produce
    /// empty samples.
    pub fn new(seed: u64, mut ratios: Vec<f64>) -> Result<Self> {
        if let Some(&bad) = ratios.iter().find(|r| !r.is_finite() || **r > 1.0) {
            return Err(BenchError::InvalidRatio(bad));
        }
        ratios.sort_by(f64::total_cmp);
        ratios.dedup();
        Ok(Self { seed, ratios })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }
}

/// The sub-array drawn for one ratio, with its trusted reference ordering
#[derive(Debug, Clone)]
pub struct Sample {
    pub ratio: f64,
    pub keys: Arc<Keys>,
    pub reference: Arc<Keys>,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn meta(&self) -> ColumnMeta {
        self.keys.meta()
    }
}

/// One random permutation of `[0, n)` drawn from the seed
pub fn base_permutation(seed: u64, n: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    indices
}

/// Derives nested samples from a single base permutation.
///
/// The sample for ratio `r` is the first `floor(r * n)` entries of the
/// permutation, so for `r1 < r2` the sample of `r1` is always a prefix of the
/// sample of `r2`.
#[derive(Debug, Clone)]
pub struct Sampler {
    spec: SamplingSpec,
    permutation: Vec<usize>,
}

impl Sampler {
    pub fn new(spec: SamplingSpec, n: usize) -> Self {
        let permutation = base_permutation(spec.seed(), n);
        Self { spec, permutation }
    }

    pub fn spec(&self) -> &SamplingSpec {
        &self.spec
    }

    pub fn sample_size(&self, ratio: f64) -> usize {
        if ratio <= 0.0 {
            return 0;
        }
        let n = self.permutation.len();
        ((ratio * n as f64).floor() as usize).min(n)
    }

    /// Indices (into the full column) sampled for `ratio`, in permutation order
    pub fn indices(&self, ratio: f64) -> &[usize] {
        &self.permutation[..self.sample_size(ratio)]
    }

    /// Draw the sample for a single ratio
    pub fn sample(&self, data: &Keys, ratio: f64) -> Result<Sample> {
        self.check_population(data)?;
        let keys = data.select(self.indices(ratio));
        let reference = keys.sorted();
        Ok(Sample {
            ratio,
            keys: Arc::new(keys),
            reference: Arc::new(reference),
        })
    }

    /// Draw one sample per configured ratio, ascending
    pub fn samples(&self, data: &Keys) -> Result<Vec<Sample>> {
        self.spec
            .ratios()
            .iter()
            .map(|&ratio| self.sample(data, ratio))
            .collect()
    }

    fn check_population(&self, data: &Keys) -> Result<()> {
        if data.len() != self.permutation.len() {
            return Err(BenchError::InvalidInput(format!(
                "sampler built for {} rows but column has {}",
                self.permutation.len(),
                data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spec_sorts_and_dedups() {
        let spec = SamplingSpec::new(1, vec![0.5, 0.1, 1.0, 0.5]).unwrap();
        assert_eq!(spec.ratios(), &[0.1, 0.5, 1.0]);
    }

    #[test]
    fn test_spec_rejects_ratio_above_one() {
        assert!(matches!(
            SamplingSpec::new(1, vec![0.5, 1.5]),
            Err(BenchError::InvalidRatio(r)) if r == 1.5
        ));
        assert!(SamplingSpec::new(1, vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_non_positive_ratio_gives_empty_sample() {
        let data = Keys::Int((0..100).collect());
        let sampler = Sampler::new(SamplingSpec::new(3, vec![0.0, -0.2, 0.5]).unwrap(), 100);
        let samples = sampler.samples(&data).unwrap();
        assert!(samples[0].is_empty());
        assert!(samples[1].is_empty());
        assert_eq!(samples[2].len(), 50);
    }

    #[test]
    fn test_sample_sizes_floor() {
        let sampler = Sampler::new(SamplingSpec::new(0, vec![]).unwrap(), 10_000);
        assert_eq!(sampler.sample_size(0.1), 1000);
        assert_eq!(sampler.sample_size(0.5), 5000);
        assert_eq!(sampler.sample_size(1.0), 10_000);
        assert_eq!(sampler.sample_size(0.00005), 0);
    }

    #[test]
    fn test_full_ratio_is_permutation_of_column() {
        let data = Keys::Int((0..1000).map(|i| i * 3).collect());
        let sampler = Sampler::new(SamplingSpec::new(42, vec![1.0]).unwrap(), 1000);
        let sample = sampler.sample(&data, 1.0).unwrap();
        assert_eq!(*sample.reference, data.sorted());
        assert_ne!(*sample.keys, data);
    }

    #[test]
    fn test_population_mismatch() {
        let sampler = Sampler::new(SamplingSpec::new(42, vec![1.0]).unwrap(), 10);
        assert!(sampler.sample(&Keys::Int(vec![1, 2, 3]), 1.0).is_err());
    }

    #[test]
    fn test_permutation_is_reproducible() {
        assert_eq!(base_permutation(42, 500), base_permutation(42, 500));
        assert_ne!(base_permutation(42, 500), base_permutation(43, 500));
    }

    proptest! {
        #[test]
        fn smaller_ratio_sample_is_prefix(
            seed in any::<u64>(),
            n in 0usize..2000,
            r1 in 0.0f64..=1.0,
            r2 in 0.0f64..=1.0,
        ) {
            let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
            let data = Keys::Int((0..n as i64).collect());
            let sampler = Sampler::new(SamplingSpec::new(seed, vec![lo, hi]).unwrap(), n);
            let small = sampler.sample(&data, lo).unwrap();
            let large = sampler.sample(&data, hi).unwrap();
            match (&*small.keys, &*large.keys) {
                (Keys::Int(s), Keys::Int(l)) => prop_assert!(l.starts_with(s)),
                _ => prop_assert!(false),
            }
        }
    }
}
