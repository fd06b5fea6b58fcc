use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use domain::DomainError;
use model::DailySales;
use repository::Store;
use tracing::debug;

use crate::{RestaurantServiceImpl, ServiceError};

#[async_trait]
pub trait ReportService: Send + Sync {
    /// Sum of totals and count of paid orders created on `date` (UTC).
    async fn daily_sales(&self, date: NaiveDate) -> Result<DailySales, ServiceError>;
}

#[async_trait]
impl<S: Store> ReportService for RestaurantServiceImpl<S> {
    async fn daily_sales(&self, date: NaiveDate) -> Result<DailySales, ServiceError> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| DomainError::Validation(format!("date {date} is out of range")))?;
        let from = date.and_time(Default::default()).and_utc();
        let to = next.and_time(Default::default()).and_utc();

        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        let orders = uow.list_paid_orders_between(from, to).await?;

        let summary = DailySales {
            date,
            total_sales: orders.iter().map(|o| o.total_amount).sum(),
            order_count: orders.len() as i64,
        };
        debug!(%date, total = %summary.total_sales, count = summary.order_count, "Daily sales");
        Ok(summary)
    }
}
