//! Initial work item generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::CoreError;
use crate::work::{Coefficient, WorkItem};

/// Parameters for generating the seed items.
#[derive(Debug, Clone)]
pub struct SeedSpec {
    /// Number of items to generate.
    pub count: usize,
    /// Degree of every item (each has `degree + 1` coefficients).
    pub degree: usize,
    /// Inclusive lower bound for coefficients.
    pub min: Coefficient,
    /// Inclusive upper bound for coefficients.
    pub max: Coefficient,
}

impl SeedSpec {
    pub fn new(count: usize, degree: usize) -> Self {
        Self {
            count,
            degree,
            min: -9,
            max: 9,
        }
    }

    pub fn with_range(mut self, min: Coefficient, max: Coefficient) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// Generate seed items from `spec`, reproducibly when `rng_seed` is set.
pub fn generate(spec: &SeedSpec, rng_seed: Option<u64>) -> Result<Vec<WorkItem>, CoreError> {
    let mut rng = match rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    generate_with(spec, &mut rng)
}

/// Generate seed items drawing from the given RNG.
///
/// The leading coefficient is always nonzero so every item has exactly the
/// requested degree.
pub fn generate_with<R: Rng>(spec: &SeedSpec, rng: &mut R) -> Result<Vec<WorkItem>, CoreError> {
    if spec.min > spec.max {
        return Err(CoreError::Seed(format!(
            "empty coefficient range {}..={}",
            spec.min, spec.max
        )));
    }
    if spec.min == 0 && spec.max == 0 {
        return Err(CoreError::Seed(
            "coefficient range 0..=0 cannot produce a nonzero leading coefficient".into(),
        ));
    }

    let items = (0..spec.count)
        .map(|_| {
            let mut coefficients: Vec<Coefficient> = (0..spec.degree)
                .map(|_| rng.gen_range(spec.min..=spec.max))
                .collect();
            let leading = loop {
                let c = rng.gen_range(spec.min..=spec.max);
                if c != 0 {
                    break c;
                }
            };
            coefficients.push(leading);
            WorkItem::new(coefficients)
        })
        .collect::<Vec<_>>();

    tracing::debug!(count = spec.count, degree = spec.degree, "generated seed items");
    Ok(items)
}
