//! Weighted random selection of sites.
use crate::distribution::DistributionError;
use crate::site::SiteIndex;
use rand::Rng;

/// Draws site indices with probability proportional to their weights.
///
/// The algorithm is fixed so that results are reproducible for a given seed: cumulative sums are
/// built in `f64`, one uniform `f64` in `[0, total)` is drawn and the first index whose cumulative
/// sum exceeds the draw is returned. Sites with zero weight are never returned.
#[derive(Debug, Clone)]
pub struct WeightedSiteSampler {
    cumulative: Vec<f64>,
    last_positive: usize,
}

impl WeightedSiteSampler {
    /// Create a sampler from a slice of weights, one per site
    pub fn new(weights: &[f64]) -> Result<Self, DistributionError> {
        if weights.is_empty() {
            return Err(DistributionError::InvalidWeights(
                "no weights were provided".into(),
            ));
        }

        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        let mut last_positive = None;
        for (idx, &weight) in weights.iter().enumerate() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(DistributionError::InvalidWeights(format!(
                    "weight for site {idx} is {weight}; weights must be finite and non-negative"
                )));
            }
            if weight > 0.0 {
                last_positive = Some(idx);
            }
            total += weight;
            cumulative.push(total);
        }

        let last_positive = last_positive.ok_or_else(|| {
            DistributionError::InvalidWeights("all weights are zero".into())
        })?;
        if !total.is_finite() {
            return Err(DistributionError::InvalidWeights(
                "sum of weights is not finite".into(),
            ));
        }

        Ok(Self {
            cumulative,
            last_positive,
        })
    }

    /// Sum of all weights
    pub fn total(&self) -> f64 {
        // There is always at least one element
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Draw a site index
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SiteIndex {
        let draw = rng.random::<f64>() * self.total();
        let idx = self.cumulative.partition_point(|&c| c <= draw);

        // Rounding can push the draw up to the total
        SiteIndex(idx.min(self.last_positive))
    }
}
