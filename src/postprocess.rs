//! Moving public events from home-street proxies to nearby street sites with idle capacity.
use crate::distribution::{Distribution, DistributionError};
use crate::site::{SiteIndex, SiteMode};
use crate::spatial::{GRID_CELL_SIZE, SpatialGrid};
use crate::units::Distance;
use log::{debug, info};
use std::cmp::Ordering;

/// Summary of the changes made by [`postprocess_public`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostprocessReport {
    /// Events moved from a home-street site to a street site
    pub moved_events: usize,
    /// Charging points added across all sites
    pub points_added: u32,
    /// Charging points removed across all sites
    pub points_removed: u32,
}

/// Move events at home-street sites to street sites within `search_radius`, where possible.
///
/// Events are visited in order. Each one goes to the first street site (in site order) within the
/// radius whose peak occupancy over the event's interval is below its installed points. Once all
/// events have been visited, every site's charging points are set to its peak occupancy.
pub fn postprocess_public(
    distribution: &mut Distribution,
    search_radius: Distance,
) -> Result<PostprocessReport, DistributionError> {
    let street_sites = distribution
        .sites
        .iter()
        .enumerate()
        .filter(|(_, site)| site.mode == Some(SiteMode::Street))
        .map(|(idx, site)| (SiteIndex(idx), site.position));
    let grid = SpatialGrid::new(GRID_CELL_SIZE, street_sites);

    let mut report = PostprocessReport::default();
    for assignment in &mut distribution.assignments {
        let Some(from) = assignment.site else {
            continue;
        };
        let from_site = &distribution.sites[from.0];
        if from_site.mode != Some(SiteMode::HomeStreet) {
            continue;
        }

        for to in grid.within_radius(&from_site.position, search_radius) {
            let peak = distribution
                .occupancy
                .max_in_range(to, assignment.interval)?;
            if peak < distribution.sites[to.0].charging_points {
                distribution.occupancy.release(from, assignment.interval)?;
                distribution.occupancy.add(to, assignment.interval)?;
                assignment.site = Some(to);
                report.moved_events += 1;
                break;
            }
        }
    }

    for (idx, site) in distribution.sites.iter_mut().enumerate() {
        let peak = distribution.occupancy.max_overall(SiteIndex(idx));
        match peak.cmp(&site.charging_points) {
            Ordering::Greater => report.points_added += peak - site.charging_points,
            Ordering::Less => report.points_removed += site.charging_points - peak,
            Ordering::Equal => {}
        }
        site.charging_points = peak;
    }

    debug!("{report:?}");
    info!(
        "Postprocessing moved {} events to street sites ({} points added, {} removed)",
        report.moved_events, report.points_added, report.points_removed
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::EventAssignment;
    use crate::event::StepInterval;
    use crate::fixture::site_with_weight;
    use crate::occupancy::OccupancyMatrix;
    use crate::site::{Point, Site};

    fn site_at(x: f64, mode: SiteMode, charging_points: u32) -> Site {
        let mut site = site_with_weight(1.0);
        site.position = Point::new(x, 0.0);
        site.mode = Some(mode);
        site.charging_points = charging_points;
        site
    }

    /// Build a distribution where each event occupies the given site for `[0, 4)`
    fn distribution(sites: Vec<Site>, event_sites: &[usize]) -> Distribution {
        let interval = StepInterval::new(0, 4);
        let mut occupancy = OccupancyMatrix::new(sites.len(), 96);
        let assignments = event_sites
            .iter()
            .map(|&idx| {
                occupancy.add(SiteIndex(idx), interval).unwrap();
                EventAssignment {
                    site: Some(SiteIndex(idx)),
                    interval,
                }
            })
            .collect();

        Distribution {
            sites,
            assignments,
            occupancy,
        }
    }

    #[test]
    fn test_move_to_nearby_street_site() {
        let sites = vec![
            site_at(0.0, SiteMode::Street, 2),
            site_at(500.0, SiteMode::HomeStreet, 1),
        ];
        let mut dist = distribution(sites, &[0, 1]);
        let report = postprocess_public(&mut dist, Distance(1000.0)).unwrap();

        assert_eq!(
            report,
            PostprocessReport {
                moved_events: 1,
                points_added: 0,
                points_removed: 1
            }
        );
        assert_eq!(dist.assignments[1].site, Some(SiteIndex(0)));
        assert_eq!(dist.sites[0].charging_points, 2);
        assert_eq!(dist.sites[1].charging_points, 0);
    }

    #[test]
    fn test_no_move_when_full_or_far() {
        let sites = vec![
            site_at(0.0, SiteMode::Street, 1),
            site_at(500.0, SiteMode::HomeStreet, 1),
            site_at(5000.0, SiteMode::HomeStreet, 1),
            site_at(5100.0, SiteMode::Street, 3),
        ];
        // Street site 3 has idle points but is too far from site 1
        let mut dist = distribution(sites, &[0, 1, 2]);
        let report = postprocess_public(&mut dist, Distance(1000.0)).unwrap();

        assert_eq!(dist.assignments[1].site, Some(SiteIndex(1)));
        assert_eq!(dist.assignments[2].site, Some(SiteIndex(3)));
        assert_eq!(report.moved_events, 1);
        assert_eq!(dist.sites[3].charging_points, 1);
        assert_eq!(report.points_removed, 3);
    }

    #[test]
    fn test_capacity_matches_peak() {
        let sites = vec![
            site_at(0.0, SiteMode::Street, 1),
            site_at(100.0, SiteMode::Street, 4),
            site_at(200.0, SiteMode::HomeStreet, 3),
        ];
        let mut dist = distribution(sites, &[0, 2, 2, 2]);
        postprocess_public(&mut dist, Distance(1000.0)).unwrap();

        for (idx, site) in dist.sites.iter().enumerate() {
            assert_eq!(dist.occupancy.max_overall(SiteIndex(idx)), site.charging_points);
        }
        assert_eq!(dist.sites[1].charging_points, 3);
        assert_eq!(dist.sites[2].charging_points, 0);
    }

    #[test]
    fn test_proxy_site_emptied_and_dropped() {
        // The street site is idle, so the home-street proxy loses its only event
        let sites = vec![
            site_at(0.0, SiteMode::HomeStreet, 1),
            site_at(300.0, SiteMode::Street, 1),
        ];
        let mut dist = distribution(sites, &[0]);
        postprocess_public(&mut dist, Distance(1000.0)).unwrap();

        assert_eq!(dist.assignments[0].site, Some(SiteIndex(1)));
        assert_eq!(dist.sites[0].charging_points, 0);
        assert_eq!(dist.sites[1].charging_points, 1);

        dist.drop_empty_sites();
        assert_eq!(dist.sites.len(), 1);
        assert_eq!(dist.sites[0].mode, Some(SiteMode::Street));
        assert_eq!(dist.sites[0].charging_points, 1);
        assert_eq!(dist.assignments[0].site, Some(SiteIndex(0)));
    }
}
