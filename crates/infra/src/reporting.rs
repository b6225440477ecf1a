//! Read-side queries: floor views, the admin summary and consumption reports.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::instrument;

use linenroom_supplies::{
    AdminSummary, Catalog, Floor, FloorRange, FloorView, PendingSummary, Report, ReportPeriod,
    ReportWindow,
};

use crate::engine::EngineError;
use crate::store::{LinenStore, TotalsFilter};

pub struct Reporting<S> {
    store: S,
    floors: FloorRange,
    history_limit: usize,
    offset: FixedOffset,
}

impl<S> Reporting<S>
where
    S: LinenStore,
{
    pub fn new(store: S, floors: FloorRange, history_limit: usize, offset: FixedOffset) -> Self {
        Self {
            store,
            floors,
            history_limit,
            offset,
        }
    }

    /// Stock, last refill and the most recent movements of one floor.
    #[instrument(skip(self), fields(floor = %floor))]
    pub async fn floor_view(&self, floor: Floor) -> Result<FloorView, EngineError> {
        self.floors.require(floor)?;
        let stock = self.store.floor_stock(floor).await?;
        let history = self.store.floor_history(floor, self.history_limit).await?;
        Ok(FloorView::new(floor, stock, history, self.offset))
    }

    #[instrument(skip(self))]
    pub async fn pending(&self) -> Result<PendingSummary, EngineError> {
        let rows = self.store.request_totals(TotalsFilter::Pending).await?;
        Ok(PendingSummary::from_rows(&rows))
    }

    #[instrument(skip(self))]
    pub async fn admin_summary(&self) -> Result<AdminSummary, EngineError> {
        let pending = self.pending().await?;
        let catalog = self.store.catalog().await?;
        Ok(AdminSummary::new(pending, &catalog))
    }

    pub async fn report(&self, period: ReportPeriod) -> Result<Report, EngineError> {
        self.report_at(period, Utc::now()).await
    }

    /// Report for the window that contains `now`.
    #[instrument(skip(self))]
    pub async fn report_at(
        &self,
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> Result<Report, EngineError> {
        let window = ReportWindow::new(period, now, self.offset);
        let rows = self
            .store
            .request_totals(TotalsFilter::Since(window.since))
            .await?;
        Ok(Report::from_rows(window, &rows))
    }

    pub async fn catalog(&self) -> Result<Catalog, EngineError> {
        Ok(self.store.catalog().await?)
    }
}
