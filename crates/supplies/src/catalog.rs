use serde::{Deserialize, Serialize};

use linenroom_core::{DomainError, DomainResult, Entity, ValueObject};

use crate::movement::ALL_ITEMS;

/// Items tracked when no catalog is configured explicitly.
pub const DEFAULT_ITEMS: [&str; 9] = [
    "Toalla Corporal",
    "Toalla Manos",
    "Toalla Facial",
    "Tapete",
    "Sabana King",
    "Sabana Matrimonial",
    "Inserto Grande",
    "Inserto Chico",
    "Funda",
];

/// Name of a trackable linen/supply type. Unique key of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ItemName {
    /// Validate and wrap an item name.
    ///
    /// The `ALL` sentinel used by floor-wide movements is reserved.
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("item", "item name cannot be empty"));
        }
        if trimmed.eq_ignore_ascii_case(ALL_ITEMS) {
            return Err(DomainError::validation(
                "item",
                format!("`{ALL_ITEMS}` is reserved and cannot name a catalog item"),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for ItemName {}

impl core::fmt::Display for ItemName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemName> for String {
    fn from(value: ItemName) -> Self {
        value.0
    }
}

/// One catalog row: an item type and its manual availability flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: ItemName,
    pub available: bool,
}

impl Entity for CatalogItem {
    type Id = ItemName;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

/// The fixed set of trackable items, in declaration order.
///
/// Names are fixed once built; only the availability flags change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Build a catalog where every item starts available.
    pub fn new(names: impl IntoIterator<Item = ItemName>) -> DomainResult<Self> {
        let mut items: Vec<CatalogItem> = Vec::new();
        for name in names {
            if items.iter().any(|i| i.name == name) {
                return Err(DomainError::validation(
                    "catalog",
                    format!("duplicate catalog item '{name}'"),
                ));
            }
            items.push(CatalogItem {
                name,
                available: true,
            });
        }
        if items.is_empty() {
            return Err(DomainError::validation("catalog", "catalog cannot be empty"));
        }
        Ok(Self { items })
    }

    /// Rebuild a catalog from stored rows (availability included).
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    /// The default linen catalog.
    pub fn defaults() -> Self {
        let items = DEFAULT_ITEMS
            .iter()
            .map(|name| CatalogItem {
                name: ItemName(name.to_string()),
                available: true,
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn names(&self) -> impl Iterator<Item = &ItemName> {
        self.items.iter().map(|i| &i.name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.name.as_str() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up an item that must exist (NotFound otherwise).
    pub fn require(&self, name: &str) -> DomainResult<&CatalogItem> {
        self.get(name)
            .ok_or_else(|| DomainError::not_found(format!("catalog item '{name}'")))
    }

    /// Flip the manual availability flag of an existing item.
    pub fn set_availability(&mut self, name: &str, available: bool) -> DomainResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.name.as_str() == name)
            .ok_or_else(|| DomainError::not_found(format!("catalog item '{name}'")))?;
        item.available = available;
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::defaults()
    }
}
