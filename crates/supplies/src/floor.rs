use core::str::FromStr;

use serde::{Deserialize, Serialize};

use linenroom_core::{DomainError, DomainResult, ValueObject};

/// A physical hotel floor: the unit of request and stock tracking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Floor(i32);

impl Floor {
    pub const fn new(number: i32) -> Self {
        Self(number)
    }

    pub const fn number(self) -> i32 {
        self.0
    }
}

impl ValueObject for Floor {}

impl core::fmt::Display for Floor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Floor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i32>()
            .map(Floor)
            .map_err(|_| DomainError::validation("floor", format!("'{s}' is not a floor number")))
    }
}

/// Inclusive range of configured floors (e.g. `3-11`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorRange {
    first: Floor,
    last: Floor,
}

impl FloorRange {
    pub fn new(first: i32, last: i32) -> DomainResult<Self> {
        if first > last {
            return Err(DomainError::validation(
                "floors",
                format!("first floor {first} is above last floor {last}"),
            ));
        }
        Ok(Self {
            first: Floor(first),
            last: Floor(last),
        })
    }

    pub fn first(&self) -> Floor {
        self.first
    }

    pub fn last(&self) -> Floor {
        self.last
    }

    pub fn contains(&self, floor: Floor) -> bool {
        self.first <= floor && floor <= self.last
    }

    pub fn len(&self) -> usize {
        (self.last.0 - self.first.0) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = Floor> + '_ {
        (self.first.0..=self.last.0).map(Floor)
    }

    /// Reject a floor supplied as request input.
    pub fn check_input(&self, floor: Floor) -> DomainResult<()> {
        if self.contains(floor) {
            Ok(())
        } else {
            Err(DomainError::validation(
                "floor",
                format!("floor {floor} is outside the configured range {self}"),
            ))
        }
    }

    /// Reject a reference to a floor that is not part of the building.
    pub fn require(&self, floor: Floor) -> DomainResult<()> {
        if self.contains(floor) {
            Ok(())
        } else {
            Err(DomainError::not_found(format!("floor {floor}")))
        }
    }
}

impl Default for FloorRange {
    fn default() -> Self {
        Self {
            first: Floor(3),
            last: Floor(11),
        }
    }
}

impl core::fmt::Display for FloorRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

impl FromStr for FloorRange {
    type Err = DomainError;

    /// Accepts `first-last` or a single floor. Negative floors (basements) are
    /// written with a leading minus, e.g. `-2-4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomainError::validation("floors", format!("'{s}' is not a floor range"));

        let split = s
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '-')
            .map(|(idx, _)| idx);

        match split {
            Some(idx) => {
                let first = s[..idx].trim().parse::<i32>().map_err(|_| invalid())?;
                let last = s[idx + 1..].trim().parse::<i32>().map_err(|_| invalid())?;
                Self::new(first, last)
            }
            None => {
                let only = s.parse::<i32>().map_err(|_| invalid())?;
                Self::new(only, only)
            }
        }
    }
}

/// Target of a supply action: one floor or the whole hotel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SupplyTarget {
    Floor(Floor),
    All,
}

impl SupplyTarget {
    /// Resolve the target into the floors it affects.
    pub fn floors(&self, range: &FloorRange) -> DomainResult<Vec<Floor>> {
        match self {
            SupplyTarget::All => Ok(range.iter().collect()),
            SupplyTarget::Floor(floor) => {
                range.require(*floor)?;
                Ok(vec![*floor])
            }
        }
    }

    /// The floor recorded on the audit movement (`None` for hotel-wide).
    pub fn audit_floor(&self) -> Option<Floor> {
        match self {
            SupplyTarget::Floor(floor) => Some(*floor),
            SupplyTarget::All => None,
        }
    }
}

impl core::fmt::Display for SupplyTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SupplyTarget::Floor(floor) => write!(f, "floor {floor}"),
            SupplyTarget::All => f.write_str("ALL"),
        }
    }
}

impl FromStr for SupplyTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(SupplyTarget::All);
        }
        s.parse::<Floor>().map(SupplyTarget::Floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_range_is_three_to_eleven() {
        let range = FloorRange::default();
        let floors: Vec<i32> = range.iter().map(Floor::number).collect();
        assert_eq!(floors, (3..=11).collect::<Vec<_>>());
        assert_eq!(range.len(), 9);
    }

    #[test]
    fn parses_ranges_and_single_floors() {
        assert_eq!("3-11".parse::<FloorRange>().unwrap(), FloorRange::default());
        assert_eq!("7".parse::<FloorRange>().unwrap(), FloorRange::new(7, 7).unwrap());
        assert_eq!("-2-4".parse::<FloorRange>().unwrap(), FloorRange::new(-2, 4).unwrap());
        assert!("11-3".parse::<FloorRange>().is_err());
        assert!("three".parse::<FloorRange>().is_err());
    }

    #[test]
    fn supply_target_resolution() {
        let range = FloorRange::default();
        assert_eq!(SupplyTarget::All.floors(&range).unwrap().len(), 9);
        assert_eq!(
            "5".parse::<SupplyTarget>().unwrap().floors(&range).unwrap(),
            vec![Floor::new(5)]
        );
        assert!(matches!(
            SupplyTarget::Floor(Floor::new(12)).floors(&range),
            Err(DomainError::NotFound(_))
        ));
        assert_eq!("ALL".parse::<SupplyTarget>().unwrap(), SupplyTarget::All);
        assert!("roof".parse::<SupplyTarget>().is_err());
    }

    #[test]
    fn input_outside_range_is_a_validation_error() {
        let range = FloorRange::default();
        let err = range.check_input(Floor::new(2)).unwrap_err();
        assert_eq!(err.field(), Some("floor"));
    }

    proptest! {
        #[test]
        fn display_round_trips(first in -5i32..40, span in 0i32..40) {
            let range = FloorRange::new(first, first + span).unwrap();
            let parsed: FloorRange = range.to_string().parse().unwrap();
            prop_assert_eq!(parsed, range);
        }

        #[test]
        fn contains_agrees_with_iteration(first in -5i32..40, span in 0i32..40, probe in -10i32..90) {
            let range = FloorRange::new(first, first + span).unwrap();
            let listed = range.iter().any(|f| f.number() == probe);
            prop_assert_eq!(range.contains(Floor::new(probe)), listed);
            prop_assert_eq!(range.iter().count(), range.len());
        }
    }
}
