//! Change feed entries.
//!
//! Change events announce admin-relevant writes to polling clients. They are
//! append-only, never mutated, and their ids come from a sequence independent
//! of the movement log.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use linenroom_core::{ChangeId, DomainError, DomainResult};

use crate::catalog::ItemName;
use crate::floor::Floor;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Request,
    Supply,
    Clear,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Request => "REQUEST",
            ChangeKind::Supply => "SUPPLY",
            ChangeKind::Clear => "CLEAR",
        }
    }
}

impl FromStr for ChangeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUEST" => Ok(ChangeKind::Request),
            "SUPPLY" => Ok(ChangeKind::Supply),
            "CLEAR" => Ok(ChangeKind::Clear),
            other => Err(DomainError::invariant(format!("unknown change kind '{other}'"))),
        }
    }
}

/// A change event ready to be appended (id assigned by storage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChange {
    pub kind: ChangeKind,
    pub floor: Option<Floor>,
    pub item: Option<ItemName>,
}

impl NewChange {
    pub fn request(floor: Floor, item: ItemName) -> Self {
        Self {
            kind: ChangeKind::Request,
            floor: Some(floor),
            item: Some(item),
        }
    }

    pub fn supply(floor: Floor) -> Self {
        Self {
            kind: ChangeKind::Supply,
            floor: Some(floor),
            item: None,
        }
    }

    pub fn clear() -> Self {
        Self {
            kind: ChangeKind::Clear,
            floor: None,
            item: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: ChangeId,
    pub kind: ChangeKind,
    pub floor: Option<Floor>,
    pub item: Option<ItemName>,
}

impl ChangeEvent {
    pub fn from_new(id: ChangeId, new: NewChange) -> Self {
        Self {
            id,
            kind: new.kind,
            floor: new.floor,
            item: new.item,
        }
    }
}

/// Result of polling the feed: everything after the cursor, plus the head id.
///
/// `max_id` is the highest id present at poll time, even when `updates` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub max_id: ChangeId,
    pub updates: Vec<ChangeEvent>,
}

impl ChangeBatch {
    /// Slice an ordered log at `since` (exclusive).
    pub fn from_log(log: &[ChangeEvent], since: ChangeId) -> Self {
        let max_id = log.last().map(|e| e.id).unwrap_or_default();
        let start = log.partition_point(|e| e.id <= since);
        Self {
            max_id,
            updates: log[start..].to_vec(),
        }
    }

    /// Check the batch is `since+1, since+2, ..., max_id` with nothing missing.
    ///
    /// A cursor ahead of the head (e.g. after the store was reset) yields an
    /// empty batch, which is accepted.
    pub fn ensure_contiguous(&self, since: ChangeId) -> DomainResult<()> {
        let mut expected = since.next();
        for event in &self.updates {
            if event.id != expected {
                return Err(DomainError::invariant(format!(
                    "change feed gap: expected id {expected}, found {}",
                    event.id
                )));
            }
            expected = expected.next();
        }
        if let Some(last) = self.updates.last() {
            if last.id != self.max_id {
                return Err(DomainError::invariant(format!(
                    "change feed head {} is past the last update {}",
                    self.max_id, last.id
                )));
            }
        } else if self.max_id > since {
            return Err(DomainError::invariant(format!(
                "change feed head {} is past the cursor {since} but no updates were returned",
                self.max_id
            )));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(n: u64) -> Vec<ChangeEvent> {
        (1..=n)
            .map(|id| ChangeEvent::from_new(ChangeId::new(id), NewChange::supply(Floor::new(3))))
            .collect()
    }

    #[test]
    fn slicing_is_exclusive_of_the_cursor() {
        let batch = ChangeBatch::from_log(&log(5), ChangeId::new(2));
        let ids: Vec<u64> = batch.updates.iter().map(|e| e.id.get()).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(batch.max_id, ChangeId::new(5));
        batch.ensure_contiguous(ChangeId::new(2)).unwrap();
    }

    #[test]
    fn polling_at_head_is_empty_with_same_max() {
        let batch = ChangeBatch::from_log(&log(5), ChangeId::new(5));
        assert!(batch.is_empty());
        assert_eq!(batch.max_id, ChangeId::new(5));
        batch.ensure_contiguous(ChangeId::new(5)).unwrap();
    }

    #[test]
    fn empty_feed_reports_zero() {
        let batch = ChangeBatch::from_log(&[], ChangeId::default());
        assert_eq!(batch.max_id, ChangeId::new(0));
        assert!(batch.is_empty());
    }

    #[test]
    fn cursor_past_head_is_accepted() {
        let batch = ChangeBatch::from_log(&log(2), ChangeId::new(40));
        assert!(batch.is_empty());
        batch.ensure_contiguous(ChangeId::new(40)).unwrap();
    }

    #[test]
    fn gaps_are_detected() {
        let mut events = log(4);
        events.remove(1);
        let batch = ChangeBatch::from_log(&events, ChangeId::new(0));
        assert!(batch.ensure_contiguous(ChangeId::new(0)).is_err());
    }
}
