use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ItemName};
use crate::floor::{Floor, FloorRange};

/// Quantity a floor's stock entries are reset to by a supply action.
pub const DEFAULT_RESTOCK_QUANTITY: u32 = 5;

/// Placeholder shown when a floor has no refill timestamp.
pub const NO_DATA: &str = "no data";

const DISPLAY_FORMAT: &str = "%H:%M %d/%m/%Y";

/// Estimated quantity of one item on one floor.
///
/// One entry exists for every `(floor, item)` pair from initialization on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorStockEntry {
    pub floor: Floor,
    pub item: ItemName,
    pub quantity: u32,
    pub last_update: DateTime<Utc>,
}

impl FloorStockEntry {
    /// The full stock ledger at startup: every pair, quantity zero.
    pub fn initial(floors: &FloorRange, catalog: &Catalog, at: DateTime<Utc>) -> Vec<Self> {
        floors
            .iter()
            .flat_map(|floor| {
                catalog.names().map(move |item| FloorStockEntry {
                    floor,
                    item: item.clone(),
                    quantity: 0,
                    last_update: at,
                })
            })
            .collect()
    }
}

/// Render a timestamp as `HH:MM DD/MM/YYYY` in the given local offset.
pub fn format_timestamp(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format(DISPLAY_FORMAT).to_string()
}

/// Label for a floor's most recent stock update, or [`NO_DATA`].
pub fn last_refill_label(entries: &[FloorStockEntry], offset: FixedOffset) -> String {
    entries
        .iter()
        .map(|e| e.last_update)
        .max()
        .map(|ts| format_timestamp(ts, offset))
        .unwrap_or_else(|| NO_DATA.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn initial_ledger_covers_every_pair_at_zero() {
        let floors = FloorRange::default();
        let catalog = Catalog::defaults();
        let entries = FloorStockEntry::initial(&floors, &catalog, Utc::now());

        assert_eq!(entries.len(), floors.len() * catalog.len());
        assert!(entries.iter().all(|e| e.quantity == 0));
        for floor in floors.iter() {
            for item in catalog.names() {
                assert!(entries.iter().any(|e| e.floor == floor && &e.item == item));
            }
        }
    }

    #[test]
    fn formats_in_local_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 23, 5, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let mexico = FixedOffset::west_opt(6 * 3600).unwrap();
        assert_eq!(format_timestamp(ts, utc), "23:05 09/03/2024");
        assert_eq!(format_timestamp(ts, mexico), "17:05 09/03/2024");
    }

    #[test]
    fn last_refill_uses_latest_update_or_placeholder() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(last_refill_label(&[], utc), NO_DATA);

        let early = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let entry = |ts| FloorStockEntry {
            floor: Floor::new(3),
            item: ItemName::new("Funda").unwrap(),
            quantity: 5,
            last_update: ts,
        };
        assert_eq!(last_refill_label(&[entry(early), entry(late)], utc), "09:30 02/01/2024");
    }
}
