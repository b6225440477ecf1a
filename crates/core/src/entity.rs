//! Rows that keep their identity while their state changes.
//!
//! A movement is still movement 17 after it goes from PENDING to FULFILLED; a
//! catalog item is still "Funda" after it is marked unavailable.

pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// True when this row is the one identified by `id`.
    fn has_id(&self, id: &Self::Id) -> bool {
        self.id() == id
    }
}
