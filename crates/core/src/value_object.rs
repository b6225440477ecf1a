//! Value object trait: equality by value, not identity.
//!
//! Floors, quantities and item names are value objects: two floors numbered 5
//! are the same floor, whatever request mentions them.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one. Constructors are expected to validate, so a value object
/// that exists is a value object that is valid.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
