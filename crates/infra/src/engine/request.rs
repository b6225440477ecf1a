use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use linenroom_core::{ChangeId, MovementId};
use linenroom_supplies::{AcceptedLine, Floor, FloorRange, Movement, RequestBatch};

use super::EngineError;
use crate::store::LinenStore;

/// Confirmation returned to the floor after a request batch is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestReceipt {
    pub floor: Floor,
    /// e.g. `2 Toalla Corporal, 1 Sabana King`
    pub summary: String,
    pub accepted: Vec<AcceptedLine>,
    pub movement_ids: Vec<MovementId>,
    pub change_ids: Vec<ChangeId>,
}

/// Accepts floor request batches and stockout alerts.
pub struct RequestEngine<S> {
    store: S,
    floors: FloorRange,
}

impl<S> RequestEngine<S>
where
    S: LinenStore,
{
    pub fn new(store: S, floors: FloorRange) -> Self {
        Self { store, floors }
    }

    /// Validate and record a request batch, all lines or none.
    #[instrument(skip(self, batch), fields(floor = %batch.floor, lines = batch.lines.len()))]
    pub async fn submit_request(&self, batch: RequestBatch) -> Result<RequestReceipt, EngineError> {
        if let Err(err) = batch.check_shape(&self.floors) {
            warn!(error = %err, "request rejected");
            return Err(err.into());
        }

        let recorded = match self.store.record_request(&batch, &self.floors, Utc::now()).await {
            Ok(recorded) => recorded,
            Err(err) => {
                let err = EngineError::from(err);
                warn!(error = %err, "request rejected");
                return Err(err);
            }
        };

        let summary = recorded.request.summary();
        info!(%summary, "request recorded");

        Ok(RequestReceipt {
            floor: recorded.request.floor(),
            summary,
            accepted: recorded.request.lines().to_vec(),
            movement_ids: recorded.movements.iter().map(|m| m.id).collect(),
            change_ids: recorded.changes.iter().map(|c| c.id).collect(),
        })
    }

    /// Record that a floor ran out of everything: stock goes to zero.
    ///
    /// No change event is emitted; admins see stockouts through the history.
    #[instrument(skip(self), fields(floor = %floor))]
    pub async fn report_stockout(&self, floor: Floor) -> Result<Movement, EngineError> {
        self.floors.check_input(floor)?;
        let movement = self.store.record_stockout(floor, Utc::now()).await?;
        warn!(movement_id = %movement.id, "floor reported stockout");
        Ok(movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use linenroom_core::ChangeId;
    use linenroom_supplies::{Catalog, ItemName, MovementKind, MovementStatus, RequestLine};

    use crate::store::{InMemoryLinenStore, TotalsFilter};

    fn engine() -> (RequestEngine<Arc<InMemoryLinenStore>>, Arc<InMemoryLinenStore>) {
        let floors = FloorRange::default();
        let store = Arc::new(InMemoryLinenStore::seeded(&Catalog::defaults(), &floors, Utc::now()));
        (RequestEngine::new(store.clone(), floors), store)
    }

    fn batch(floor: i32, lines: &[(&str, i64)]) -> RequestBatch {
        RequestBatch::new(
            Floor::new(floor),
            lines
                .iter()
                .map(|(item, quantity)| RequestLine {
                    item: item.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn request_creates_pending_movements_and_change_events() {
        let (engine, store) = engine();
        let receipt = engine
            .submit_request(batch(5, &[("Toalla Corporal", 2), ("Sabana King", 1)]))
            .await
            .unwrap();

        assert_eq!(receipt.summary, "2 Toalla Corporal, 1 Sabana King");
        assert_eq!(receipt.movement_ids.len(), 2);
        assert_eq!(receipt.change_ids, vec![ChangeId::new(1), ChangeId::new(2)]);

        let history = store.floor_history(Floor::new(5), 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.kind == MovementKind::Request && m.status == MovementStatus::Pending));
    }

    #[tokio::test]
    async fn unavailable_item_rejects_the_whole_batch() {
        let (engine, store) = engine();
        store
            .set_availability(&ItemName::new("Tapete").unwrap(), false)
            .await
            .unwrap();

        let err = engine
            .submit_request(batch(5, &[("Funda", 1), ("Tapete", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::UnavailableItem(ref item) if item == "Tapete"));
        assert_eq!(store.movement_count().await.unwrap(), 0);
        let feed = store.changes_since(ChangeId::new(0)).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn invalid_input_is_reported_by_field() {
        let (engine, store) = engine();

        let err = engine.submit_request(batch(12, &[("Funda", 1)])).await.unwrap_err();
        assert_eq!(err.field(), Some("floor"));

        let err = engine.submit_request(batch(5, &[])).await.unwrap_err();
        assert_eq!(err.field(), Some("items"));

        let err = engine
            .submit_request(batch(5, &[("Funda", 1), ("Funda", -3)]))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("items[1].quantity"));

        let err = engine.submit_request(batch(5, &[("Almohada", 1)])).await.unwrap_err();
        assert_eq!(err.field(), Some("items[0].item"));

        assert_eq!(store.movement_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stockout_zeroes_the_floor_without_a_change_event() {
        let (engine, store) = engine();
        let movement = engine.report_stockout(Floor::new(6)).await.unwrap();

        assert_eq!(movement.kind, MovementKind::Stockout);
        assert_eq!(movement.status, MovementStatus::Alert);
        assert_eq!(movement.item.as_str(), "ALL");
        assert!(store.floor_stock(Floor::new(6)).await.unwrap().iter().all(|e| e.quantity == 0));
        assert!(store.changes_since(ChangeId::new(0)).await.unwrap().is_empty());
        assert!(store.request_totals(TotalsFilter::Pending).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stockout_outside_the_building_is_rejected() {
        let (engine, store) = engine();
        let err = engine.report_stockout(Floor::new(2)).await.unwrap_err();
        assert_eq!(err.field(), Some("floor"));
        assert_eq!(store.movement_count().await.unwrap(), 0);
    }
}
