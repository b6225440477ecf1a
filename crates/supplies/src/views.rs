//! Read-only views served to floor and admin clients.

use std::collections::BTreeMap;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogItem, ItemName};
use crate::floor::Floor;
use crate::movement::Movement;
use crate::report::{FloorItemTotal, ItemTotal};
use crate::stock::{FloorStockEntry, format_timestamp, last_refill_label};

/// Pending quantities of one floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorPending {
    pub floor: Floor,
    pub items: Vec<ItemTotal>,
}

/// Pending REQUEST totals, hotel-wide and per floor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSummary {
    /// Ordered by item name.
    pub by_item: Vec<ItemTotal>,
    /// Ordered by floor, highest first; items by name within a floor.
    pub by_floor: Vec<FloorPending>,
}

impl PendingSummary {
    pub fn from_rows(rows: &[FloorItemTotal]) -> Self {
        let mut by_item: BTreeMap<&ItemName, u64> = BTreeMap::new();
        let mut by_floor: BTreeMap<Floor, BTreeMap<&ItemName, u64>> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.total > 0) {
            *by_item.entry(&row.item).or_default() += row.total;
            *by_floor
                .entry(row.floor)
                .or_default()
                .entry(&row.item)
                .or_default() += row.total;
        }

        let to_totals = |m: BTreeMap<&ItemName, u64>| -> Vec<ItemTotal> {
            m.into_iter()
                .map(|(item, total)| ItemTotal {
                    item: item.clone(),
                    total,
                })
                .collect()
        };

        Self {
            by_item: to_totals(by_item),
            by_floor: by_floor
                .into_iter()
                .rev()
                .map(|(floor, items)| FloorPending {
                    floor,
                    items: to_totals(items),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }

    /// Pending quantity of `item` on `floor` (zero when nothing is pending).
    pub fn pending_for(&self, floor: Floor, item: &str) -> u64 {
        self.by_floor
            .iter()
            .find(|f| f.floor == floor)
            .and_then(|f| f.items.iter().find(|t| t.item.as_str() == item))
            .map(|t| t.total)
            .unwrap_or(0)
    }
}

/// Admin dashboard: pending work plus the catalog with availability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSummary {
    pub pending_by_item: Vec<ItemTotal>,
    pub pending_by_floor: Vec<FloorPending>,
    pub catalog: Vec<CatalogItem>,
}

impl AdminSummary {
    pub fn new(pending: PendingSummary, catalog: &Catalog) -> Self {
        Self {
            pending_by_item: pending.by_item,
            pending_by_floor: pending.by_floor,
            catalog: catalog.items().to_vec(),
        }
    }
}

/// A movement with its display timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub movement: Movement,
    pub occurred_at_formatted: String,
}

/// Everything a floor client shows: stock, last refill, recent history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorView {
    pub floor: Floor,
    pub stock: Vec<FloorStockEntry>,
    pub last_refill_formatted: String,
    /// Newest first.
    pub history: Vec<HistoryEntry>,
}

impl FloorView {
    pub fn new(
        floor: Floor,
        stock: Vec<FloorStockEntry>,
        history: Vec<Movement>,
        offset: FixedOffset,
    ) -> Self {
        let last_refill_formatted = last_refill_label(&stock, offset);
        let history = history
            .into_iter()
            .map(|movement| HistoryEntry {
                occurred_at_formatted: format_timestamp(movement.occurred_at, offset),
                movement,
            })
            .collect();
        Self {
            floor,
            stock,
            last_refill_formatted,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use linenroom_core::MovementId;

    use crate::movement::NewMovement;

    fn row(floor: i32, item: &str, total: u64) -> FloorItemTotal {
        FloorItemTotal {
            floor: Floor::new(floor),
            item: ItemName::new(item).unwrap(),
            total,
        }
    }

    #[test]
    fn pending_is_grouped_by_item_and_by_floor_descending() {
        let summary = PendingSummary::from_rows(&[
            row(5, "Toalla Corporal", 2),
            row(5, "Sabana King", 1),
            row(9, "Toalla Corporal", 3),
        ]);

        assert_eq!(summary.by_item.len(), 2);
        assert_eq!(summary.by_item[0].item.as_str(), "Sabana King");
        assert_eq!(summary.by_item[1].total, 5);

        let floors: Vec<i32> = summary.by_floor.iter().map(|f| f.floor.number()).collect();
        assert_eq!(floors, vec![9, 5]);
        assert_eq!(summary.pending_for(Floor::new(5), "Toalla Corporal"), 2);
        assert_eq!(summary.pending_for(Floor::new(5), "Sabana King"), 1);
        assert_eq!(summary.pending_for(Floor::new(4), "Funda"), 0);
    }

    #[test]
    fn zero_rows_are_dropped() {
        let summary = PendingSummary::from_rows(&[row(3, "Funda", 0)]);
        assert!(summary.is_empty());
        assert!(summary.by_floor.is_empty());
    }

    #[test]
    fn floor_view_formats_history_and_refill() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 7, 45, 0).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let stock = vec![FloorStockEntry {
            floor: Floor::new(3),
            item: ItemName::new("Funda").unwrap(),
            quantity: 5,
            last_update: at,
        }];
        let history = vec![Movement::from_new(
            MovementId::new(1),
            NewMovement::stockout(Floor::new(3), at),
        )];

        let view = FloorView::new(Floor::new(3), stock, history, offset);
        assert_eq!(view.last_refill_formatted, "07:45 01/02/2024");
        assert_eq!(view.history[0].occurred_at_formatted, "07:45 01/02/2024");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["history"][0]["kind"], "STOCKOUT");
    }
}
