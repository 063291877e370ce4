//! A uniform grid index for radius queries over sites.
use crate::site::{Point, SiteIndex};
use crate::units::Distance;
use std::collections::HashMap;

/// Default edge length of a grid cell in metres
pub const GRID_CELL_SIZE: f64 = 500.0;

/// Buckets site positions into square cells so that radius queries only visit nearby cells
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<(SiteIndex, Point)>>,
}

impl SpatialGrid {
    /// Build an index from site positions
    pub fn new<I>(cell_size: f64, sites: I) -> Self
    where
        I: IntoIterator<Item = (SiteIndex, Point)>,
    {
        let mut grid = Self {
            cell_size,
            cells: HashMap::new(),
        };
        for (site, position) in sites {
            grid.cells
                .entry(grid.cell_of(&position))
                .or_default()
                .push((site, position));
        }

        grid
    }

    fn cell_of(&self, point: &Point) -> (i64, i64) {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    /// All sites within `radius` of `centre`, in ascending site order
    pub fn within_radius(&self, centre: &Point, radius: Distance) -> Vec<SiteIndex> {
        let reach = (radius.value() / self.cell_size).ceil() as i64;
        let (cx, cy) = self.cell_of(centre);

        let mut found = Vec::new();
        for gx in cx - reach..=cx + reach {
            for gy in cy - reach..=cy + reach {
                let Some(cell) = self.cells.get(&(gx, gy)) else {
                    continue;
                };
                found.extend(
                    cell.iter()
                        .filter(|(_, position)| position.distance(centre) <= radius)
                        .map(|(site, _)| *site),
                );
            }
        }
        found.sort_unstable();

        found
    }
}
