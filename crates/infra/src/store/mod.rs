//! Storage boundary for the linen room.
//!
//! A single [`LinenStore`] owns the catalog, the floor stock ledger, the
//! movement log and the change feed, so every multi-table write can be made
//! atomic by the backend.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLinenStore;
pub use postgres::PostgresLinenStore;
pub use r#trait::{ClearOutcome, LinenStore, RecordedRequest, StoreError, SupplyOutcome, TotalsFilter};
