//! Query/filter layer over placed-order history.
//!
//! Translates a date-range + sort request into the store's grouped aggregate
//! query and hands the rows to the aggregator. Read-only; everything here is
//! derivative of the order history the placement engine wrote.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use stockroom_reporting::{group_by_date, DayGroup, ReportClock, SortDirection};

use crate::store::{OrderStore, StoreError};

/// A history request: inclusive report-local date range plus group ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default)]
    pub sort: SortDirection,
}

/// Read path for date-grouped order history.
#[derive(Debug, Clone)]
pub struct HistoryReader<S> {
    store: S,
    clock: ReportClock,
}

impl<S> HistoryReader<S> {
    pub fn new(store: S, clock: ReportClock) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> ReportClock {
        self.clock
    }
}

impl<S> HistoryReader<S>
where
    S: OrderStore,
{
    #[instrument(skip(self), fields(from = %query.date_from, to = %query.date_to))]
    pub async fn run(&self, query: &HistoryQuery) -> Result<Vec<DayGroup>, StoreError> {
        if query.date_from > query.date_to {
            return Err(StoreError::Invalid(format!(
                "date_from {} is after date_to {}",
                query.date_from, query.date_to
            )));
        }

        let rows = self
            .store
            .order_history(query.date_from, query.date_to, self.clock)
            .await?;
        Ok(group_by_date(rows, query.sort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOrderStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let reader = HistoryReader::new(InMemoryOrderStore::new(), ReportClock::default());
        let err = reader
            .run(&HistoryQuery {
                date_from: date(2024, 2, 1),
                date_to: date(2024, 1, 1),
                sort: SortDirection::Asc,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn empty_history_yields_no_groups() {
        let reader = HistoryReader::new(InMemoryOrderStore::new(), ReportClock::default());
        let groups = reader
            .run(&HistoryQuery {
                date_from: date(2024, 1, 1),
                date_to: date(2024, 12, 31),
                sort: SortDirection::Desc,
            })
            .await
            .unwrap();
        assert!(groups.is_empty());
    }
}
