//! Strongly-typed identifiers used across the domain.
//!
//! Both sequences are assigned by storage on insert and are strictly increasing.
//! They are independent of each other: a movement id says nothing about the
//! change id that announced it.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a row in the append-only movement log.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(u64);

/// Identifier of an entry in the change feed.
///
/// `ChangeId(0)` is the "nothing seen yet" cursor; real events start at 1.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(u64);

macro_rules! impl_seq_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            /// The id that follows this one in the sequence.
            pub const fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $t {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for u64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| DomainError::validation($name, e.to_string()))?;
                Ok(Self(value))
            }
        }
    };
}

impl_seq_newtype!(MovementId, "movement_id");
impl_seq_newtype!(ChangeId, "since");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_id_parses_and_orders() {
        let a: ChangeId = "7".parse().unwrap();
        assert_eq!(a, ChangeId::new(7));
        assert!(a < a.next());
        assert_eq!(a.next().get(), 8);
    }

    #[test]
    fn negative_cursor_is_a_validation_error() {
        let err = "-1".parse::<ChangeId>().unwrap_err();
        assert_eq!(err.field(), Some("since"));
    }
}
