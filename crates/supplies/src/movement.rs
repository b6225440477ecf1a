//! Movement log entries and their status state machine.
//!
//! The movement log is append-only. The single mutation allowed after insert is
//! the forward status transition `PENDING -> FULFILLED`.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use linenroom_core::{DomainError, DomainResult, Entity, MovementId};

use crate::catalog::ItemName;
use crate::floor::Floor;

/// Item sentinel for movements that concern a whole floor (or the whole hotel).
pub const ALL_ITEMS: &str = "ALL";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Request,
    Stockout,
    Supply,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Request => "REQUEST",
            MovementKind::Stockout => "STOCKOUT",
            MovementKind::Supply => "SUPPLY",
        }
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUEST" => Ok(MovementKind::Request),
            "STOCKOUT" => Ok(MovementKind::Stockout),
            "SUPPLY" => Ok(MovementKind::Supply),
            other => Err(DomainError::invariant(format!("unknown movement kind '{other}'"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    Pending,
    Fulfilled,
    Alert,
    Ok,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Pending => "PENDING",
            MovementStatus::Fulfilled => "FULFILLED",
            MovementStatus::Alert => "ALERT",
            MovementStatus::Ok => "OK",
        }
    }

    /// Only `PENDING -> FULFILLED` is legal; statuses never move backward.
    pub fn can_transition_to(self, next: MovementStatus) -> bool {
        matches!((self, next), (MovementStatus::Pending, MovementStatus::Fulfilled))
    }
}

impl FromStr for MovementStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(MovementStatus::Pending),
            "FULFILLED" => Ok(MovementStatus::Fulfilled),
            "ALERT" => Ok(MovementStatus::Alert),
            "OK" => Ok(MovementStatus::Ok),
            other => Err(DomainError::invariant(format!("unknown movement status '{other}'"))),
        }
    }
}

/// What a movement is about: one catalog item, or everything (`ALL`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MovementItem {
    Item(ItemName),
    All,
}

impl MovementItem {
    pub fn as_str(&self) -> &str {
        match self {
            MovementItem::Item(name) => name.as_str(),
            MovementItem::All => ALL_ITEMS,
        }
    }

    pub fn item_name(&self) -> Option<&ItemName> {
        match self {
            MovementItem::Item(name) => Some(name),
            MovementItem::All => None,
        }
    }
}

impl TryFrom<String> for MovementItem {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == ALL_ITEMS {
            Ok(MovementItem::All)
        } else {
            ItemName::new(value).map(MovementItem::Item)
        }
    }
}

impl From<MovementItem> for String {
    fn from(value: MovementItem) -> Self {
        match value {
            MovementItem::Item(name) => name.into(),
            MovementItem::All => ALL_ITEMS.to_string(),
        }
    }
}

impl core::fmt::Display for MovementItem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movement ready to be appended (not yet assigned an id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    /// `None` only for hotel-wide supply audits.
    pub floor: Option<Floor>,
    pub item: MovementItem,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
    pub kind: MovementKind,
    pub status: MovementStatus,
}

impl NewMovement {
    pub fn request(floor: Floor, item: ItemName, quantity: u32, at: DateTime<Utc>) -> Self {
        Self {
            floor: Some(floor),
            item: MovementItem::Item(item),
            quantity,
            occurred_at: at,
            kind: MovementKind::Request,
            status: MovementStatus::Pending,
        }
    }

    pub fn stockout(floor: Floor, at: DateTime<Utc>) -> Self {
        Self {
            floor: Some(floor),
            item: MovementItem::All,
            quantity: 0,
            occurred_at: at,
            kind: MovementKind::Stockout,
            status: MovementStatus::Alert,
        }
    }

    /// One audit row per supply invocation, whatever the number of floors.
    pub fn supply_audit(floor: Option<Floor>, restock: u32, at: DateTime<Utc>) -> Self {
        Self {
            floor,
            item: MovementItem::All,
            quantity: restock,
            occurred_at: at,
            kind: MovementKind::Supply,
            status: MovementStatus::Ok,
        }
    }
}

/// A stored movement log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub floor: Option<Floor>,
    pub item: MovementItem,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
    pub kind: MovementKind,
    pub status: MovementStatus,
}

impl Movement {
    pub fn from_new(id: MovementId, new: NewMovement) -> Self {
        Self {
            id,
            floor: new.floor,
            item: new.item,
            quantity: new.quantity,
            occurred_at: new.occurred_at,
            kind: new.kind,
            status: new.status,
        }
    }

    pub fn is_pending_request(&self) -> bool {
        self.kind == MovementKind::Request && self.status == MovementStatus::Pending
    }

    /// Move the status forward, rejecting backward or sideways transitions.
    pub fn transition(&mut self, next: MovementStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "movement {} cannot go from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        Ok(())
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
