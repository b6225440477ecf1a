//! Linen supply domain module.
//!
//! This crate contains the business rules of the linen room: the fixed item
//! catalog, floors, per-floor stock, the movement log state machine, change
//! events, request validation and the read-only aggregations. Everything here is
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod catalog;
pub mod change;
pub mod floor;
pub mod movement;
pub mod report;
pub mod request;
pub mod stock;
pub mod views;

pub use catalog::{Catalog, CatalogItem, DEFAULT_ITEMS, ItemName};
pub use change::{ChangeBatch, ChangeEvent, ChangeKind, NewChange};
pub use floor::{Floor, FloorRange, SupplyTarget};
pub use movement::{ALL_ITEMS, Movement, MovementItem, MovementKind, MovementStatus, NewMovement};
pub use report::{FloorItemTotal, FloorTotal, ItemTotal, Report, ReportPeriod, ReportWindow};
pub use request::{AcceptedLine, RequestBatch, RequestLine, ValidatedRequest};
pub use stock::{DEFAULT_RESTOCK_QUANTITY, FloorStockEntry, NO_DATA, format_timestamp, last_refill_label};
pub use views::{AdminSummary, FloorPending, FloorView, HistoryEntry, PendingSummary};
