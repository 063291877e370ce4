//! Code for handling use cases and the IDs given to located charging sites
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use strum::{Display, EnumIter};

/// A category of charging infrastructure.
///
/// Each use case is distributed independently over its own set of candidate sites. Variants are
/// declared in the order in which use cases are run: retail must come before public, because
/// multi-use packing at retail sites can hand events back to the public use case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UseCase {
    /// Fast charging at dedicated high-power charging sites
    Hpc,
    /// Charging at retail car parks
    Retail,
    /// Charging at public street locations
    Public,
    /// Private charging at detached houses
    HomeDetached,
    /// Shared charging at apartment buildings
    HomeApartment,
    /// Charging at workplaces
    Work,
    /// Charging at fleet depots
    Depot,
}

/// A globally unique identifier for a located charging site.
///
/// This is a composite of the use case and the site's ordinal within that use case's batch, so IDs
/// from different use cases can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId {
    /// The use case the site belongs to
    pub use_case: UseCase,
    /// The ordinal index of the site within its use case
    pub index: usize,
}

impl LocationId {
    /// Create a new [`LocationId`]
    pub fn new(use_case: UseCase, index: usize) -> Self {
        Self { use_case, index }
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.use_case, self.index)
    }
}

impl Serialize for LocationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
