use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use linenroom_core::{ChangeId, DomainError, Entity, MovementId};
use linenroom_supplies::{
    Catalog, CatalogItem, ChangeBatch, ChangeEvent, Floor, FloorItemTotal, FloorRange,
    FloorStockEntry, ItemName, Movement, MovementStatus, NewChange, NewMovement, RequestBatch,
};

use super::r#trait::{
    ClearOutcome, LinenStore, RecordedRequest, StoreError, SupplyOutcome, TotalsFilter,
};

#[derive(Debug, Default)]
struct Tables {
    catalog: Vec<CatalogItem>,
    stock: Vec<FloorStockEntry>,
    movements: Vec<Movement>,
    changes: Vec<ChangeEvent>,
}

impl Tables {
    fn append_movement(&mut self, new: NewMovement) -> Movement {
        let id = self
            .movements
            .last()
            .map(|m| m.id.next())
            .unwrap_or(MovementId::new(1));
        let movement = Movement::from_new(id, new);
        self.movements.push(movement.clone());
        movement
    }

    fn append_change(&mut self, new: NewChange) -> ChangeEvent {
        let id = self
            .changes
            .last()
            .map(|c| c.id.next())
            .unwrap_or(ChangeId::new(1));
        let event = ChangeEvent::from_new(id, new);
        self.changes.push(event.clone());
        event
    }

    /// Flip matching pending requests to FULFILLED; returns how many changed.
    fn fulfil_pending(&mut self, on_floor: impl Fn(Option<Floor>) -> bool) -> Result<u64, StoreError> {
        let mut fulfilled = 0;
        for m in self.movements.iter_mut() {
            if m.is_pending_request() && on_floor(m.floor) {
                m.transition(MovementStatus::Fulfilled)?;
                fulfilled += 1;
            }
        }
        Ok(fulfilled)
    }

    fn reset_stock(&mut self, floor: Floor, quantity: u32, at: DateTime<Utc>) {
        for entry in self.stock.iter_mut().filter(|e| e.floor == floor) {
            entry.quantity = quantity;
            entry.last_update = at;
        }
    }
}

/// In-memory linen store.
///
/// Intended for tests/dev. All tables sit behind one lock, so every method is
/// atomic and change ids become visible in order.
#[derive(Debug, Default)]
pub struct InMemoryLinenStore {
    tables: RwLock<Tables>,
}

impl InMemoryLinenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already seeded with `catalog` and `floors`.
    pub fn seeded(catalog: &Catalog, floors: &FloorRange, at: DateTime<Utc>) -> Self {
        let store = Self::new();
        if let Ok(mut t) = store.tables.write() {
            t.catalog = catalog.items().to_vec();
            t.stock = FloorStockEntry::initial(floors, catalog, at);
        }
        store
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl LinenStore for InMemoryLinenStore {
    async fn seed(
        &self,
        catalog: &Catalog,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut t = self.write()?;
        for item in catalog.items() {
            if !t.catalog.iter().any(|c| c.has_id(&item.name)) {
                t.catalog.push(item.clone());
            }
        }
        for entry in FloorStockEntry::initial(floors, catalog, at) {
            let exists = t
                .stock
                .iter()
                .any(|e| e.floor == entry.floor && e.item == entry.item);
            if !exists {
                t.stock.push(entry);
            }
        }
        Ok(())
    }

    async fn catalog(&self) -> Result<Catalog, StoreError> {
        Ok(Catalog::from_items(self.read()?.catalog.clone()))
    }

    async fn set_availability(&self, item: &ItemName, available: bool) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let row = t
            .catalog
            .iter_mut()
            .find(|c| c.has_id(item))
            .ok_or_else(|| DomainError::not_found(format!("catalog item '{item}'")))?;
        row.available = available;
        Ok(())
    }

    async fn record_request(
        &self,
        batch: &RequestBatch,
        floors: &FloorRange,
        at: DateTime<Utc>,
    ) -> Result<RecordedRequest, StoreError> {
        let mut t = self.write()?;
        let catalog = Catalog::from_items(t.catalog.clone());
        let request = batch.validate(floors, &catalog)?;

        let movements = request
            .movements(at)
            .into_iter()
            .map(|m| t.append_movement(m))
            .collect();
        let changes = request
            .changes()
            .into_iter()
            .map(|c| t.append_change(c))
            .collect();

        Ok(RecordedRequest {
            request,
            movements,
            changes,
        })
    }

    async fn record_stockout(&self, floor: Floor, at: DateTime<Utc>) -> Result<Movement, StoreError> {
        let mut t = self.write()?;
        t.reset_stock(floor, 0, at);
        Ok(t.append_movement(NewMovement::stockout(floor, at)))
    }

    async fn supply(
        &self,
        floors: &[Floor],
        audit: NewMovement,
        restock: u32,
        at: DateTime<Utc>,
    ) -> Result<SupplyOutcome, StoreError> {
        let mut t = self.write()?;
        for floor in floors {
            t.reset_stock(*floor, restock, at);
        }
        let fulfilled = t.fulfil_pending(|f| f.is_some_and(|f| floors.contains(&f)))?;
        let audit = t.append_movement(audit);
        let changes = floors
            .iter()
            .map(|f| t.append_change(NewChange::supply(*f)))
            .collect();

        Ok(SupplyOutcome {
            audit,
            fulfilled,
            changes,
        })
    }

    async fn clear_pending(&self) -> Result<ClearOutcome, StoreError> {
        let mut t = self.write()?;
        let fulfilled = t.fulfil_pending(|_| true)?;
        let change = t.append_change(NewChange::clear());
        Ok(ClearOutcome { fulfilled, change })
    }

    async fn changes_since(&self, since: ChangeId) -> Result<ChangeBatch, StoreError> {
        Ok(ChangeBatch::from_log(&self.read()?.changes, since))
    }

    async fn floor_stock(&self, floor: Floor) -> Result<Vec<FloorStockEntry>, StoreError> {
        let t = self.read()?;
        let mut entries: Vec<FloorStockEntry> =
            t.stock.iter().filter(|e| e.floor == floor).cloned().collect();
        entries.sort_by_key(|e| t.catalog.iter().position(|c| c.name == e.item));
        Ok(entries)
    }

    async fn floor_history(&self, floor: Floor, limit: usize) -> Result<Vec<Movement>, StoreError> {
        let t = self.read()?;
        let mut history: Vec<Movement> = t
            .movements
            .iter()
            .filter(|m| m.floor == Some(floor))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.id.cmp(&a.id)));
        history.truncate(limit);
        Ok(history)
    }

    async fn request_totals(&self, filter: TotalsFilter) -> Result<Vec<FloorItemTotal>, StoreError> {
        let t = self.read()?;
        let rows = match filter {
            TotalsFilter::Pending => {
                FloorItemTotal::tally(t.movements.iter().filter(|m| m.is_pending_request()))
            }
            TotalsFilter::Since(since) => {
                FloorItemTotal::tally(t.movements.iter().filter(|m| m.occurred_at >= since))
            }
        };
        Ok(rows)
    }

    async fn movement_count(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.movements.len() as u64)
    }
}
