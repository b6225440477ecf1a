use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use linenroom_core::{ChangeId, DomainError};
use linenroom_supplies::{
    Catalog, ChangeBatch, ChangeEvent, Floor, FloorItemTotal, FloorRange, FloorStockEntry, ItemName,
    Movement, NewMovement, RequestBatch, ValidatedRequest,
};

/// Storage-level error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed (connection, query, IO).
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("store lock poisoned")]
    Poisoned,

    /// A persisted row could not be read back into a domain value.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    /// The write was refused by a domain rule checked inside the transaction.
    #[error(transparent)]
    Rejected(#[from] DomainError),
}

/// Which REQUEST movements to total.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TotalsFilter {
    /// Requests still waiting for a supply or a clear.
    Pending,
    /// Every request at or after the instant, whatever its status.
    Since(DateTime<Utc>),
}

/// What a successful request write produced.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ValidatedRequest,
    pub movements: Vec<Movement>,
    pub changes: Vec<ChangeEvent>,
}

#[derive(Debug, Clone)]
pub struct SupplyOutcome {
    pub audit: Movement,
    /// Pending requests flipped to FULFILLED.
    pub fulfilled: u64,
    pub changes: Vec<ChangeEvent>,
}

#[derive(Debug, Clone)]
pub struct ClearOutcome {
    pub fulfilled: u64,
    pub change: ChangeEvent,
}

/// Persistence for catalog, stock, movements and change events.
///
/// ## Atomicity
///
/// Each method is one unit of work. A request either stores all of its
/// movements and change events or none of them; a supply resets stock, fulfils
/// pending requests and appends its audit row and change events together.
///
/// ## Change ids
///
/// Change event ids are assigned by the store, strictly increasing, with no
/// gaps, and become visible to `changes_since` in id order.
#[async_trait]
pub trait LinenStore: Send + Sync {
    /// Create missing catalog rows and stock entries. Existing rows are kept.
    async fn seed(
        &self,
        catalog: &Catalog,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn catalog(&self) -> Result<Catalog, StoreError>;

    /// Flip an item's availability. Unknown items are `Rejected(NotFound)`.
    async fn set_availability(&self, item: &ItemName, available: bool) -> Result<(), StoreError>;

    /// Validate `batch` against the stored catalog and append it, in one step.
    async fn record_request(
        &self,
        batch: &RequestBatch,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<RecordedRequest, StoreError>;

    /// Zero the floor's stock and append a STOCKOUT alert.
    async fn record_stockout(&self, floor: Floor, at: DateTime<Utc>) -> Result<Movement, StoreError>;

    /// Reset stock on `floors` to `restock`, fulfil their pending requests,
    /// append `audit` and one SUPPLY change event per floor.
    async fn supply(
        &self,
        floors: &[Floor],
        audit: NewMovement,
        restock: u32,
        at: DateTime<Utc>,
    ) -> Result<SupplyOutcome, StoreError>;

    /// Fulfil every pending request and append a CLEAR change event.
    async fn clear_pending(&self) -> Result<ClearOutcome, StoreError>;

    /// Change events with id greater than `since`, plus the current head id.
    async fn changes_since(&self, since: ChangeId) -> Result<ChangeBatch, StoreError>;

    /// Stock entries of one floor, in catalog order.
    async fn floor_stock(&self, floor: Floor) -> Result<Vec<FloorStockEntry>, StoreError>;

    /// Newest-first movements of one floor, at most `limit`.
    async fn floor_history(&self, floor: Floor, limit: usize) -> Result<Vec<Movement>, StoreError>;

    /// REQUEST quantities summed per `(floor, item)`.
    async fn request_totals(&self, filter: TotalsFilter) -> Result<Vec<FloorItemTotal>, StoreError>;

    async fn movement_count(&self) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> LinenStore for Arc<S>
where
    S: LinenStore + ?Sized,
{
    async fn seed(
        &self,
        catalog: &Catalog,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        (**self).seed(catalog, floors, at).await
    }

    async fn catalog(&self) -> Result<Catalog, StoreError> {
        (**self).catalog().await
    }

    async fn set_availability(&self, item: &ItemName, available: bool) -> Result<(), StoreError> {
        (**self).set_availability(item, available).await
    }

    async fn record_request(
        &self,
        batch: &RequestBatch,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<RecordedRequest, StoreError> {
        (**self).record_request(batch, floors, at).await
    }

    async fn record_stockout(&self, floor: Floor, at: DateTime<Utc>) -> Result<Movement, StoreError> {
        (**self).record_stockout(floor, at).await
    }

    async fn supply(
        &self,
        floors: &[Floor],
        audit: NewMovement,
        restock: u32,
        at: DateTime<Utc>,
    ) -> Result<SupplyOutcome, StoreError> {
        (**self).supply(floors, audit, restock, at).await
    }

    async fn clear_pending(&self) -> Result<ClearOutcome, StoreError> {
        (**self).clear_pending().await
    }

    async fn changes_since(&self, since: ChangeId) -> Result<ChangeBatch, StoreError> {
        (**self).changes_since(since).await
    }

    async fn floor_stock(&self, floor: Floor) -> Result<Vec<FloorStockEntry>, StoreError> {
        (**self).floor_stock(floor).await
    }

    async fn floor_history(&self, floor: Floor, limit: usize) -> Result<Vec<Movement>, StoreError> {
        (**self).floor_history(floor, limit).await
    }

    async fn request_totals(&self, filter: TotalsFilter) -> Result<Vec<FloorItemTotal>, StoreError> {
        (**self).request_totals(filter).await
    }

    async fn movement_count(&self) -> Result<u64, StoreError> {
        (**self).movement_count().await
    }
}
