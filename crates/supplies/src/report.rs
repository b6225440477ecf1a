//! Request consumption reports over a time window.
//!
//! Reports are derived on every call from REQUEST movements; nothing is stored.
//! Both storage backends produce per-(floor, item) totals and the ordering and
//! summing rules live here so they agree.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeDelta, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use linenroom_core::DomainError;

use crate::catalog::ItemName;
use crate::floor::Floor;
use crate::movement::{Movement, MovementKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Today,
    Week,
    Month,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Today => "today",
            ReportPeriod::Week => "week",
            ReportPeriod::Month => "month",
        }
    }

    fn lookback_days(&self) -> u64 {
        match self {
            ReportPeriod::Today => 0,
            ReportPeriod::Week => 7,
            ReportPeriod::Month => 30,
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(ReportPeriod::Today),
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            other => Err(DomainError::validation(
                "period",
                format!("unknown report period '{other}' (expected today, week or month)"),
            )),
        }
    }
}

/// The day-aligned window a report covers, starting at local midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub period: ReportPeriod,
    pub since: DateTime<Utc>,
    pub title: String,
}

impl ReportWindow {
    pub fn new(period: ReportPeriod, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        let start_date = today
            .checked_sub_days(Days::new(period.lookback_days()))
            .unwrap_or(today);
        let local_midnight = start_date.and_time(NaiveTime::MIN);
        let utc_naive = local_midnight - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
        let since = DateTime::<Utc>::from_naive_utc_and_offset(utc_naive, Utc);

        let day = start_date.format("%Y-%m-%d");
        let title = match period {
            ReportPeriod::Today => format!("Daily report ({day})"),
            ReportPeriod::Week => format!("Weekly report (since {day})"),
            ReportPeriod::Month => format!("Monthly report (since {day})"),
        };

        Self { period, since, title }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.since
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTotal {
    pub item: ItemName,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorTotal {
    pub floor: Floor,
    pub total: u64,
}

/// Requested quantity for one `(floor, item)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorItemTotal {
    pub floor: Floor,
    pub item: ItemName,
    pub total: u64,
}

impl FloorItemTotal {
    /// Sum REQUEST movements by `(floor, item)`, ordered by floor then item.
    pub fn tally<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> Vec<Self> {
        let mut sums: BTreeMap<(Floor, ItemName), u64> = BTreeMap::new();
        for m in movements {
            if m.kind != MovementKind::Request {
                continue;
            }
            let (Some(floor), Some(item)) = (m.floor, m.item.item_name()) else {
                continue;
            };
            *sums.entry((floor, item.clone())).or_default() += u64::from(m.quantity);
        }
        sums.into_iter()
            .map(|((floor, item), total)| FloorItemTotal { floor, item, total })
            .collect()
    }
}

/// Aggregated request totals for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub period: ReportPeriod,
    pub since: DateTime<Utc>,
    pub per_item_totals: Vec<ItemTotal>,
    pub per_floor_totals: Vec<FloorTotal>,
    pub grand_total: u64,
}

impl Report {
    /// Build a report from per-pair totals. Empty input gives an all-zero report.
    pub fn from_rows(window: ReportWindow, rows: &[FloorItemTotal]) -> Self {
        let mut by_item: BTreeMap<&ItemName, u64> = BTreeMap::new();
        let mut by_floor: BTreeMap<Floor, u64> = BTreeMap::new();
        for row in rows {
            *by_item.entry(&row.item).or_default() += row.total;
            *by_floor.entry(row.floor).or_default() += row.total;
        }

        let mut per_item_totals: Vec<ItemTotal> = by_item
            .into_iter()
            .map(|(item, total)| ItemTotal {
                item: item.clone(),
                total,
            })
            .collect();
        per_item_totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.item.cmp(&b.item)));

        let mut per_floor_totals: Vec<FloorTotal> = by_floor
            .into_iter()
            .map(|(floor, total)| FloorTotal { floor, total })
            .collect();
        per_floor_totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.floor.cmp(&b.floor)));

        let grand_total = per_item_totals.iter().map(|t| t.total).sum();

        Self {
            title: window.title,
            period: window.period,
            since: window.since,
            per_item_totals,
            per_floor_totals,
            grand_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use linenroom_core::MovementId;

    use crate::movement::NewMovement;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn request(id: u64, floor: i32, item: &str, qty: u32, at: DateTime<Utc>) -> Movement {
        Movement::from_new(
            MovementId::new(id),
            NewMovement::request(Floor::new(floor), ItemName::new(item).unwrap(), qty, at),
        )
    }

    #[test]
    fn windows_start_at_local_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 15, 30, 0).unwrap();

        let today = ReportWindow::new(ReportPeriod::Today, now, utc());
        assert_eq!(today.since, Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap());
        assert_eq!(today.title, "Daily report (2024-05-20)");

        let week = ReportWindow::new(ReportPeriod::Week, now, utc());
        assert_eq!(week.since, Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap());
        assert_eq!(week.title, "Weekly report (since 2024-05-13)");

        let month = ReportWindow::new(ReportPeriod::Month, now, utc());
        assert_eq!(month.title, "Monthly report (since 2024-04-20)");
    }

    #[test]
    fn offset_shifts_the_local_day() {
        // 02:00 UTC is still the previous evening six hours west.
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 2, 0, 0).unwrap();
        let west = FixedOffset::west_opt(6 * 3600).unwrap();
        let today = ReportWindow::new(ReportPeriod::Today, now, west);
        assert_eq!(today.since, Utc.with_ymd_and_hms(2024, 5, 19, 6, 0, 0).unwrap());
    }

    #[test]
    fn periods_parse_case_insensitively() {
        assert_eq!("Week".parse::<ReportPeriod>().unwrap(), ReportPeriod::Week);
        let err = "year".parse::<ReportPeriod>().unwrap_err();
        assert_eq!(err.field(), Some("period"));
    }

    #[test]
    fn totals_are_sorted_descending() {
        let at = Utc::now();
        let log = vec![
            request(1, 5, "Funda", 2, at),
            request(2, 5, "Tapete", 1, at),
            request(3, 7, "Funda", 4, at),
            Movement::from_new(MovementId::new(4), NewMovement::stockout(Floor::new(7), at)),
        ];
        let rows = FloorItemTotal::tally(&log);
        let window = ReportWindow::new(ReportPeriod::Today, at, utc());
        let report = Report::from_rows(window, &rows);

        assert_eq!(report.grand_total, 7);
        assert_eq!(report.per_item_totals[0].item.as_str(), "Funda");
        assert_eq!(report.per_item_totals[0].total, 6);
        assert_eq!(report.per_floor_totals[0].floor, Floor::new(7));
        assert_eq!(report.per_floor_totals[1].total, 3);
    }

    #[test]
    fn empty_window_reports_zero() {
        let window = ReportWindow::new(ReportPeriod::Month, Utc::now(), utc());
        let report = Report::from_rows(window, &[]);
        assert_eq!(report.grand_total, 0);
        assert!(report.per_item_totals.is_empty());
        assert!(report.per_floor_totals.is_empty());
    }
}
