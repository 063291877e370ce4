//! Per-site occupancy counters over discretised time steps.
use crate::distribution::DistributionError;
use crate::event::StepInterval;
use crate::site::SiteIndex;

/// A dense `sites × horizon` matrix counting how many events occupy each site at each step
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyMatrix {
    horizon: usize,
    counts: Vec<u32>,
}

impl OccupancyMatrix {
    /// Create an empty matrix for `n_sites` sites
    pub fn new(n_sites: usize, horizon: usize) -> Self {
        Self {
            horizon,
            counts: vec![0; n_sites * horizon],
        }
    }

    /// Number of time steps covered by the matrix
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Number of sites tracked by the matrix
    pub fn n_sites(&self) -> usize {
        if self.horizon == 0 {
            0
        } else {
            self.counts.len() / self.horizon
        }
    }

    /// Get the slice of counters for `site` over `interval`, checking the bounds
    fn row_range(
        &self,
        site: SiteIndex,
        interval: StepInterval,
    ) -> Result<std::ops::Range<usize>, DistributionError> {
        if site.0 >= self.n_sites() {
            return Err(DistributionError::SiteOutOfRange {
                site,
                n_sites: self.n_sites(),
            });
        }
        if !interval.fits_within(self.horizon) {
            return Err(DistributionError::IntervalOutOfRange {
                interval,
                horizon: self.horizon,
            });
        }

        let offset = site.0 * self.horizon;
        Ok(offset + interval.start..offset + interval.end)
    }

    /// Mark `site` as occupied by one more event over `interval`
    pub fn add(&mut self, site: SiteIndex, interval: StepInterval) -> Result<(), DistributionError> {
        let range = self.row_range(site, interval)?;
        for count in &mut self.counts[range] {
            *count += 1;
        }

        Ok(())
    }

    /// Remove one event from `site` over `interval`.
    ///
    /// The matrix is left untouched if any counter in the range would go below zero.
    pub fn release(
        &mut self,
        site: SiteIndex,
        interval: StepInterval,
    ) -> Result<(), DistributionError> {
        let range = self.row_range(site, interval)?;
        if let Some(offset) = self.counts[range.clone()].iter().position(|&c| c == 0) {
            return Err(DistributionError::NegativeOccupancy {
                site,
                step: interval.start + offset,
            });
        }
        for count in &mut self.counts[range] {
            *count -= 1;
        }

        Ok(())
    }

    /// Peak occupancy of `site` within `interval`
    pub fn max_in_range(
        &self,
        site: SiteIndex,
        interval: StepInterval,
    ) -> Result<u32, DistributionError> {
        let range = self.row_range(site, interval)?;
        Ok(self.counts[range].iter().copied().max().unwrap_or(0))
    }

    /// Peak occupancy of `site` over the whole horizon
    pub fn max_overall(&self, site: SiteIndex) -> u32 {
        let offset = site.0 * self.horizon;
        self.counts[offset..offset + self.horizon]
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Find the first site, in site order, whose peak occupancy in `interval` is below its capacity
    pub fn first_free_site<I>(
        &self,
        interval: StepInterval,
        capacities: I,
    ) -> Result<Option<SiteIndex>, DistributionError>
    where
        I: IntoIterator<Item = u32>,
    {
        for (idx, capacity) in capacities.into_iter().enumerate() {
            if capacity == 0 {
                continue;
            }
            let site = SiteIndex(idx);
            if self.max_in_range(site, interval)? < capacity {
                return Ok(Some(site));
            }
        }

        Ok(None)
    }

    /// Stack the rows of `other` below the rows of this matrix
    pub fn append(&mut self, other: &OccupancyMatrix) -> Result<(), DistributionError> {
        if other.horizon != self.horizon {
            return Err(DistributionError::SnapshotMismatch {
                expected: (other.n_sites(), self.horizon),
                actual: (other.n_sites(), other.horizon),
            });
        }
        self.counts.extend_from_slice(&other.counts);

        Ok(())
    }

    /// Keep only the rows of sites for which `keep` is true
    pub fn retain_sites(&mut self, keep: &[bool]) {
        let horizon = self.horizon;
        let mut counts = Vec::with_capacity(self.counts.len());
        for (row, _) in self
            .counts
            .chunks_exact(horizon.max(1))
            .zip(keep)
            .filter(|(_, keep)| **keep)
        {
            counts.extend_from_slice(row);
        }
        self.counts = counts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn matrix() -> OccupancyMatrix {
        let mut matrix = OccupancyMatrix::new(2, 10);
        matrix.add(SiteIndex(0), StepInterval::new(2, 6)).unwrap();
        matrix.add(SiteIndex(0), StepInterval::new(4, 8)).unwrap();
        matrix
    }

    #[rstest]
    fn test_max_in_range(matrix: OccupancyMatrix) {
        assert_eq!(
            matrix
                .max_in_range(SiteIndex(0), StepInterval::new(0, 4))
                .unwrap(),
            1
        );
        assert_eq!(
            matrix
                .max_in_range(SiteIndex(0), StepInterval::new(0, 10))
                .unwrap(),
            2
        );
        assert_eq!(
            matrix
                .max_in_range(SiteIndex(1), StepInterval::new(0, 10))
                .unwrap(),
            0
        );
        assert_eq!(matrix.max_overall(SiteIndex(0)), 2);
    }

    #[rstest]
    fn test_release(mut matrix: OccupancyMatrix) {
        matrix
            .release(SiteIndex(0), StepInterval::new(4, 8))
            .unwrap();
        assert_eq!(matrix.max_overall(SiteIndex(0)), 1);
    }

    #[rstest]
    fn test_release_below_zero(mut matrix: OccupancyMatrix) {
        let before = matrix.clone();
        let result = matrix.release(SiteIndex(0), StepInterval::new(0, 4));
        assert_eq!(
            result,
            Err(DistributionError::NegativeOccupancy {
                site: SiteIndex(0),
                step: 0
            })
        );
        assert_eq!(matrix, before);
    }

    #[rstest]
    #[case(StepInterval::new(8, 11))]
    #[case(StepInterval::new(5, 5))]
    #[case(StepInterval::new(6, 5))]
    fn test_out_of_range(mut matrix: OccupancyMatrix, #[case] interval: StepInterval) {
        let before = matrix.clone();
        assert!(matrix.add(SiteIndex(0), interval).is_err());
        assert!(matrix.max_in_range(SiteIndex(0), interval).is_err());
        assert_eq!(matrix, before);
    }

    #[rstest]
    fn test_bad_site(mut matrix: OccupancyMatrix) {
        assert_eq!(
            matrix.add(SiteIndex(2), StepInterval::new(0, 1)),
            Err(DistributionError::SiteOutOfRange {
                site: SiteIndex(2),
                n_sites: 2
            })
        );
    }

    #[rstest]
    #[case([2, 1], Some(SiteIndex(1)))]
    #[case([3, 1], Some(SiteIndex(0)))]
    #[case([2, 0], None)]
    fn test_first_free_site(
        matrix: OccupancyMatrix,
        #[case] capacities: [u32; 2],
        #[case] expected: Option<SiteIndex>,
    ) {
        assert_eq!(
            matrix
                .first_free_site(StepInterval::new(3, 7), capacities)
                .unwrap(),
            expected
        );
    }

    #[rstest]
    fn test_append_and_retain(mut matrix: OccupancyMatrix) {
        let mut other = OccupancyMatrix::new(1, 10);
        other.add(SiteIndex(0), StepInterval::new(0, 1)).unwrap();
        matrix.append(&other).unwrap();
        assert_eq!(matrix.n_sites(), 3);
        assert_eq!(matrix.max_overall(SiteIndex(2)), 1);

        matrix.retain_sites(&[true, false, true]);
        assert_eq!(matrix.n_sites(), 2);
        assert_eq!(matrix.max_overall(SiteIndex(0)), 2);
        assert_eq!(matrix.max_overall(SiteIndex(1)), 1);
    }
}
