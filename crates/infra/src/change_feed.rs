//! Cursor-based change feed for polling admin clients.
//!
//! Clients keep the last `max_id` they saw and pass it back as `since`. Every
//! poll returns the events after the cursor in id order; a poll at the head is
//! empty and reports the same `max_id`.

use tracing::{error, instrument, trace};

use linenroom_core::ChangeId;
use linenroom_supplies::ChangeBatch;

use crate::engine::EngineError;
use crate::store::LinenStore;

pub struct ChangeFeed<S> {
    store: S,
}

impl<S> ChangeFeed<S>
where
    S: LinenStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(since = %since))]
    pub async fn poll_since(&self, since: ChangeId) -> Result<ChangeBatch, EngineError> {
        let batch = self.store.changes_since(since).await?;
        if let Err(err) = batch.ensure_contiguous(since) {
            error!(error = %err, "change feed is not contiguous");
            return Err(err.into());
        }
        trace!(updates = batch.updates.len(), max_id = %batch.max_id, "change feed polled");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use linenroom_supplies::{
        Catalog, ChangeKind, Floor, FloorRange, RequestBatch, RequestLine, SupplyTarget,
    };

    use crate::engine::{FulfillmentEngine, RequestEngine};
    use crate::store::InMemoryLinenStore;

    fn request(floor: i32, items: &[&str]) -> RequestBatch {
        RequestBatch::new(
            Floor::new(floor),
            items
                .iter()
                .map(|item| RequestLine {
                    item: item.to_string(),
                    quantity: 1,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn polling_walks_the_feed_without_gaps() {
        let floors = FloorRange::default();
        let store = Arc::new(InMemoryLinenStore::seeded(&Catalog::defaults(), &floors, Utc::now()));
        let requests = RequestEngine::new(store.clone(), floors);
        let fulfillment = FulfillmentEngine::new(store.clone(), floors, 5);
        let feed = ChangeFeed::new(store.clone());

        let empty = feed.poll_since(ChangeId::new(0)).await.unwrap();
        assert_eq!(empty.max_id, ChangeId::new(0));
        assert!(empty.is_empty());

        requests.submit_request(request(5, &["Funda", "Tapete"])).await.unwrap();
        let first = feed.poll_since(ChangeId::new(0)).await.unwrap();
        assert_eq!(first.max_id, ChangeId::new(2));
        assert_eq!(first.updates.len(), 2);
        assert!(first.updates.iter().all(|c| c.kind == ChangeKind::Request));
        assert_eq!(first.updates[1].item.as_ref().map(|i| i.as_str()), Some("Tapete"));

        fulfillment.supply_stock(SupplyTarget::Floor(Floor::new(5))).await.unwrap();
        fulfillment.clear_pending().await.unwrap();

        let second = feed.poll_since(first.max_id).await.unwrap();
        let ids: Vec<u64> = second.updates.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(second.updates[0].kind, ChangeKind::Supply);
        assert_eq!(second.updates[1].kind, ChangeKind::Clear);

        let idle = feed.poll_since(second.max_id).await.unwrap();
        assert!(idle.is_empty());
        assert_eq!(idle.max_id, second.max_id);
    }

    #[tokio::test]
    async fn concurrent_writers_never_leave_gaps() {
        let floors = FloorRange::default();
        let store = Arc::new(InMemoryLinenStore::seeded(&Catalog::defaults(), &floors, Utc::now()));
        let requests = Arc::new(RequestEngine::new(store.clone(), floors));

        let mut handles = Vec::new();
        for floor in floors.iter() {
            let requests = requests.clone();
            handles.push(tokio::spawn(async move {
                requests
                    .submit_request(request(floor.number(), &["Funda", "Toalla Manos"]))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let batch = ChangeFeed::new(store).poll_since(ChangeId::new(0)).await.unwrap();
        assert_eq!(batch.updates.len(), 18);
        assert_eq!(batch.max_id, ChangeId::new(18));
    }
}
