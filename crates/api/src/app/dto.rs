use serde::Deserialize;

use linenroom_core::{ChangeId, DomainError, DomainResult};
use linenroom_supplies::{Floor, RequestBatch, RequestLine, SupplyTarget};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub floor: i32,
    pub items: Vec<RequestItemBody>,
}

#[derive(Debug, Deserialize)]
pub struct RequestItemBody {
    pub item: String,
    pub quantity: i64,
}

impl SubmitRequestBody {
    pub fn into_batch(self) -> RequestBatch {
        RequestBatch::new(
            Floor::new(self.floor),
            self.items
                .into_iter()
                .map(|line| RequestLine {
                    item: line.item,
                    quantity: line.quantity,
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct StockoutBody {
    pub floor: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    pub since: Option<String>,
}

impl ChangesQuery {
    /// Missing or blank `since` means "from the beginning".
    pub fn cursor(&self) -> DomainResult<ChangeId> {
        match self.since.as_deref().map(str::trim) {
            None | Some("") => Ok(ChangeId::default()),
            Some(raw) => raw.parse(),
        }
    }
}

/// `floor` is a floor number or `ALL`.
#[derive(Debug, Deserialize)]
pub struct SupplyForm {
    pub floor: String,
}

impl SupplyForm {
    pub fn target(&self) -> DomainResult<SupplyTarget> {
        self.floor.parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusForm {
    pub item: String,
    pub available: String,
}

impl SetStatusForm {
    pub fn available(&self) -> DomainResult<bool> {
        parse_flag(&self.available)
    }
}

fn parse_flag(raw: &str) -> DomainResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(DomainError::validation(
            "available",
            format!("expected 0 or 1, got '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_numbers_and_words() {
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag(" FALSE ").unwrap());
        assert_eq!(parse_flag("yes").unwrap_err().field(), Some("available"));
    }

    #[test]
    fn changes_cursor_defaults_to_zero() {
        assert_eq!(ChangesQuery::default().cursor().unwrap(), ChangeId::new(0));
        let q = ChangesQuery {
            since: Some("17".to_string()),
        };
        assert_eq!(q.cursor().unwrap(), ChangeId::new(17));
        let q = ChangesQuery {
            since: Some("-1".to_string()),
        };
        assert_eq!(q.cursor().unwrap_err().field(), Some("since"));
    }

    #[test]
    fn supply_form_accepts_all() {
        let form = SupplyForm {
            floor: "all".to_string(),
        };
        assert_eq!(form.target().unwrap(), SupplyTarget::All);
        let form = SupplyForm {
            floor: "seven".to_string(),
        };
        assert!(form.target().is_err());
    }
}
