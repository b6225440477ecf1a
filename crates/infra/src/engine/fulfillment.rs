use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use linenroom_core::{ChangeId, MovementId};
use linenroom_supplies::{CatalogItem, Floor, FloorRange, ItemName, NewMovement, SupplyTarget};

use super::EngineError;
use crate::store::LinenStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyReceipt {
    pub floors: Vec<Floor>,
    pub restock_quantity: u32,
    /// Pending requests flipped to FULFILLED.
    pub fulfilled: u64,
    pub audit_movement_id: MovementId,
    pub change_ids: Vec<ChangeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearReceipt {
    pub fulfilled: u64,
    pub change_id: ChangeId,
}

/// Admin-side writes: restocking floors, clearing the queue, catalog flags.
pub struct FulfillmentEngine<S> {
    store: S,
    floors: FloorRange,
    restock_quantity: u32,
}

impl<S> FulfillmentEngine<S>
where
    S: LinenStore,
{
    pub fn new(store: S, floors: FloorRange, restock_quantity: u32) -> Self {
        Self {
            store,
            floors,
            restock_quantity,
        }
    }

    /// Restock one floor or the whole hotel and fulfil the pending requests there.
    ///
    /// Emits one SUPPLY change event per affected floor.
    #[instrument(skip(self), fields(target = %target))]
    pub async fn supply_stock(&self, target: SupplyTarget) -> Result<SupplyReceipt, EngineError> {
        let floors = target.floors(&self.floors)?;
        let now = Utc::now();
        let audit = NewMovement::supply_audit(target.audit_floor(), self.restock_quantity, now);

        let outcome = self
            .store
            .supply(&floors, audit, self.restock_quantity, now)
            .await?;

        info!(
            floors = floors.len(),
            fulfilled = outcome.fulfilled,
            "stock supplied"
        );
        Ok(SupplyReceipt {
            floors,
            restock_quantity: self.restock_quantity,
            fulfilled: outcome.fulfilled,
            audit_movement_id: outcome.audit.id,
            change_ids: outcome.changes.iter().map(|c| c.id).collect(),
        })
    }

    /// Mark every pending request FULFILLED without touching stock.
    #[instrument(skip(self))]
    pub async fn clear_pending(&self) -> Result<ClearReceipt, EngineError> {
        let outcome = self.store.clear_pending().await?;
        info!(fulfilled = outcome.fulfilled, "pending requests cleared");
        Ok(ClearReceipt {
            fulfilled: outcome.fulfilled,
            change_id: outcome.change.id,
        })
    }

    /// Flip an item's manual availability flag.
    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        item: &str,
        available: bool,
    ) -> Result<CatalogItem, EngineError> {
        let name = ItemName::new(item)?;
        self.store.set_availability(&name, available).await?;
        info!(item = %name, available, "availability changed");
        Ok(CatalogItem { name, available })
    }
}
