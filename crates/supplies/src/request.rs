//! Floor request batches and their all-or-nothing validation.
//!
//! A batch is validated in full before anything is written. The result of a
//! successful validation, [`ValidatedRequest`], is the only thing storage
//! accepts for insertion, so there is no code path that writes part of a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linenroom_core::{DomainError, DomainResult};

use crate::catalog::{Catalog, ItemName};
use crate::change::NewChange;
use crate::floor::{Floor, FloorRange};
use crate::movement::NewMovement;

/// One requested line as submitted by floor staff (unvalidated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub item: String,
    pub quantity: i64,
}

/// A floor's request batch (unvalidated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBatch {
    pub floor: Floor,
    pub lines: Vec<RequestLine>,
}

/// A line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedLine {
    pub item: ItemName,
    pub quantity: u32,
}

impl core::fmt::Display for AcceptedLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.quantity, self.item)
    }
}

/// A batch whose every line is known, positive and available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    floor: Floor,
    lines: Vec<AcceptedLine>,
}

impl RequestBatch {
    pub fn new(floor: Floor, lines: Vec<RequestLine>) -> Self {
        Self { floor, lines }
    }

    /// Checks that need no stored state: floor range, non-empty, positive quantities.
    pub fn check_shape(&self, floors: &FloorRange) -> DomainResult<()> {
        floors.check_input(self.floor)?;
        if self.lines.is_empty() {
            return Err(DomainError::validation("items", "a request needs at least one item"));
        }
        for (idx, line) in self.lines.iter().enumerate() {
            if line.item.trim().is_empty() {
                return Err(DomainError::validation(
                    format!("items[{idx}].item"),
                    "item name cannot be empty",
                ));
            }
            if line.quantity <= 0 {
                return Err(DomainError::validation(
                    format!("items[{idx}].quantity"),
                    format!("quantity must be positive, got {}", line.quantity),
                ));
            }
            if u32::try_from(line.quantity).is_err() {
                return Err(DomainError::validation(
                    format!("items[{idx}].quantity"),
                    format!("quantity {} is too large", line.quantity),
                ));
            }
        }
        Ok(())
    }

    /// Validate the whole batch against the catalog as it is right now.
    ///
    /// Lines are checked in order; the first failing line decides the error.
    /// An unavailable item yields [`DomainError::UnavailableItem`] naming it.
    pub fn validate(&self, floors: &FloorRange, catalog: &Catalog) -> DomainResult<ValidatedRequest> {
        self.check_shape(floors)?;

        let mut accepted = Vec::with_capacity(self.lines.len());
        for (idx, line) in self.lines.iter().enumerate() {
            let name = line.item.trim();
            let item = catalog.get(name).ok_or_else(|| {
                DomainError::validation(format!("items[{idx}].item"), format!("unknown item '{name}'"))
            })?;
            if !item.available {
                return Err(DomainError::unavailable(item.name.as_str()));
            }
            let quantity = u32::try_from(line.quantity).map_err(|_| {
                DomainError::validation(format!("items[{idx}].quantity"), "quantity out of range")
            })?;
            accepted.push(AcceptedLine {
                item: item.name.clone(),
                quantity,
            });
        }

        Ok(ValidatedRequest {
            floor: self.floor,
            lines: accepted,
        })
    }
}

impl ValidatedRequest {
    pub fn floor(&self) -> Floor {
        self.floor
    }

    pub fn lines(&self) -> &[AcceptedLine] {
        &self.lines
    }

    /// One pending REQUEST movement per line.
    pub fn movements(&self, at: DateTime<Utc>) -> Vec<NewMovement> {
        self.lines
            .iter()
            .map(|l| NewMovement::request(self.floor, l.item.clone(), l.quantity, at))
            .collect()
    }

    /// One REQUEST change event per line, paired index-for-index with `movements`.
    pub fn changes(&self) -> Vec<NewChange> {
        self.lines
            .iter()
            .map(|l| NewChange::request(self.floor, l.item.clone()))
            .collect()
    }

    /// Human-readable summary, e.g. `2 Toalla Corporal, 1 Sabana King`.
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(item: &str, quantity: i64) -> RequestLine {
        RequestLine {
            item: item.to_string(),
            quantity,
        }
    }

    fn batch(floor: i32, lines: Vec<RequestLine>) -> RequestBatch {
        RequestBatch::new(Floor::new(floor), lines)
    }

    #[test]
    fn valid_batch_produces_paired_movements_and_changes() {
        let catalog = Catalog::defaults();
        let req = batch(5, vec![line("Toalla Corporal", 2), line("Sabana King", 1)])
            .validate(&FloorRange::default(), &catalog)
            .unwrap();

        assert_eq!(req.summary(), "2 Toalla Corporal, 1 Sabana King");
        let now = Utc::now();
        let movements = req.movements(now);
        let changes = req.changes();
        assert_eq!(movements.len(), 2);
        assert_eq!(changes.len(), 2);
        for (m, c) in movements.iter().zip(&changes) {
            assert_eq!(m.floor, c.floor);
            assert_eq!(m.item.item_name(), c.item.as_ref());
        }
    }

    #[test]
    fn first_unavailable_item_is_named() {
        let mut catalog = Catalog::defaults();
        catalog.set_availability("Tapete", false).unwrap();
        catalog.set_availability("Funda", false).unwrap();

        let err = batch(7, vec![line("Toalla Manos", 1), line("Funda", 1), line("Tapete", 1)])
            .validate(&FloorRange::default(), &catalog)
            .unwrap_err();
        assert_eq!(err, DomainError::unavailable("Funda"));
    }

    #[test]
    fn unknown_item_names_its_position() {
        let err = batch(5, vec![line("Funda", 1), line("Almohada", 1)])
            .validate(&FloorRange::default(), &Catalog::defaults())
            .unwrap_err();
        assert_eq!(err.field(), Some("items[1].item"));
    }

    #[test]
    fn shape_errors_come_before_catalog_checks() {
        let floors = FloorRange::default();
        let catalog = Catalog::defaults();

        let err = batch(2, vec![line("Funda", 1)]).validate(&floors, &catalog).unwrap_err();
        assert_eq!(err.field(), Some("floor"));

        let err = batch(5, vec![]).validate(&floors, &catalog).unwrap_err();
        assert_eq!(err.field(), Some("items"));

        let err = batch(5, vec![line("Funda", 0)]).validate(&floors, &catalog).unwrap_err();
        assert_eq!(err.field(), Some("items[0].quantity"));

        let err = batch(5, vec![line("Funda", i64::from(u32::MAX) + 1)])
            .validate(&floors, &catalog)
            .unwrap_err();
        assert_eq!(err.field(), Some("items[0].quantity"));
    }

    proptest! {
        #[test]
        fn never_accepts_a_batch_containing_an_unavailable_item(
            picks in proptest::collection::vec((0usize..9, 1i64..20), 1..8),
            blocked in 0usize..9,
        ) {
            let mut catalog = Catalog::defaults();
            let blocked_name = catalog.items()[blocked].name.as_str().to_string();
            catalog.set_availability(&blocked_name, false).unwrap();

            let lines: Vec<RequestLine> = picks
                .iter()
                .map(|(idx, qty)| line(catalog.items()[*idx].name.as_str(), *qty))
                .collect();
            let contains_blocked = lines.iter().any(|l| l.item == blocked_name);

            let result = batch(5, lines.clone()).validate(&FloorRange::default(), &catalog);
            if contains_blocked {
                prop_assert_eq!(result.unwrap_err(), DomainError::unavailable(blocked_name));
            } else {
                let req = result.unwrap();
                prop_assert_eq!(req.lines().len(), lines.len());
            }
        }
    }
}
