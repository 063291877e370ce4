//! Candidate and existing sites at which charging points can be installed.
use crate::units::{Distance, Power};
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;

/// The index of a site within its batch.
///
/// Sites live in a `Vec` for the duration of a distribution run and events refer to them by
/// position, so no join between tables is ever needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteIndex(pub usize);

impl fmt::Display for SiteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in a projected, metric coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Easting in metres
    pub x: f64,
    /// Northing in metres
    pub y: f64,
}

impl Point {
    /// Create a new [`Point`]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> Distance {
        Distance((self.x - other.x).hypot(self.y - other.y))
    }
}

/// Distinguishes the two site partitions of the public use case
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum SiteMode {
    /// A real public street location
    #[string = "street"]
    Street,
    /// A residential building acting as a proxy for street parking near home
    #[string = "home_street"]
    HomeStreet,
}

/// A place where charging points can be installed
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// The site's location
    pub position: Point,
    /// Named, non-negative weights used for weighted sampling (e.g. `area`)
    pub weights: IndexMap<String, f64>,
    /// Number of installed charging points
    pub charging_points: u32,
    /// Mean requested power of the events which caused points to be installed
    pub average_charging_capacity: Power,
    /// Which partition the site belongs to, if the use case has more than one
    pub mode: Option<SiteMode>,
}

impl Site {
    /// Create a new site with no charging points
    pub fn new(position: Point, weights: IndexMap<String, f64>) -> Self {
        Self {
            position,
            weights,
            charging_points: 0,
            average_charging_capacity: Power(0.0),
            mode: None,
        }
    }

    /// Get the value of the named weight, if the site has it
    pub fn weight(&self, column: &str) -> Option<f64> {
        self.weights.get(column).copied()
    }

    /// Installed charging power, i.e. average capacity multiplied by number of charging points
    pub fn installed_power(&self) -> Power {
        self.average_charging_capacity * f64::from(self.charging_points)
    }

    /// Install one more charging point, folding `power` into the running mean
    pub fn add_charging_point(&mut self, power: Power) {
        let prev_count = f64::from(self.charging_points);
        let prev_total = self.average_charging_capacity * prev_count;
        self.charging_points += 1;
        self.average_charging_capacity = (prev_total + power) / f64::from(self.charging_points);
    }
}
