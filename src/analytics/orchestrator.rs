//! # Aggregation Orchestrator
//!
//! Builds a report by resolving the period once, spawning every metric of
//! the report kind as its own task, and waiting for all of them.
//!
//! Metric failures are absorbed by [`Metric::evaluate`], so joining never
//! fails because of one metric. The only error is a metric task that does
//! not finish (a panic), reported as [`AnalyticsError::TaskJoin`]. Spawned
//! tasks are detached: if the request is dropped they still run to the end.
//! No timeout is applied, so a hung query holds its report.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use super::composer::{self, MetricResults};
use super::metrics::{Metric, MetricValue};
use crate::config::ReportLimits;
use crate::error::AnalyticsError;
use crate::models::{CustomerReport, DashboardReport, ProductReport, Report, ReportKind};
use crate::period::{self, DateRange};
use crate::store::AnalyticsStore;

const DASHBOARD_METRICS: &[Metric] = &[
    Metric::TotalRevenue,
    Metric::TotalOrders,
    Metric::TotalCustomers,
    Metric::AverageOrderValue,
    Metric::ConversionRate,
    Metric::TopProducts,
    Metric::RecentOrders,
    Metric::SalesByDay,
];

const CUSTOMER_METRICS: &[Metric] = &[
    Metric::TotalCustomers,
    Metric::NewCustomers,
    Metric::ReturningCustomers,
    Metric::CustomerLifetimeValue,
    Metric::TopCustomers,
    Metric::CustomerSegments,
];

const PRODUCT_METRICS: &[Metric] = &[
    Metric::TopProducts,
    Metric::LowStockProducts,
    Metric::ProductCategories,
    Metric::ProductPerformance,
];

/// The fixed metric set computed for a report kind.
pub fn metrics_for(kind: ReportKind) -> &'static [Metric] {
    match kind {
        ReportKind::Dashboard => DASHBOARD_METRICS,
        ReportKind::Customers => CUSTOMER_METRICS,
        ReportKind::Products => PRODUCT_METRICS,
    }
}

/// Builds reports against an injected store. Cheap to clone.
#[derive(Clone)]
pub struct ReportEngine {
    store: Arc<dyn AnalyticsStore>,
    limits: ReportLimits,
    today: Option<NaiveDate>,
}

impl ReportEngine {
    pub fn new(store: Arc<dyn AnalyticsStore>, limits: ReportLimits) -> Self {
        Self {
            store,
            limits,
            today: None,
        }
    }

    /// Resolve every period against `today` instead of the current UTC date.
    pub fn pinned_to(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn resolve(&self, token: &str) -> DateRange {
        match self.today {
            Some(today) => period::resolve_on(token, today),
            None => period::resolve(token),
        }
    }

    #[instrument(skip(self))]
    pub async fn build_report(
        &self,
        kind: ReportKind,
        period: &str,
    ) -> Result<Report, AnalyticsError> {
        let results = self.fan_out(kind, self.resolve(period)).await?;
        Ok(composer::compose(kind, period, results))
    }

    #[instrument(skip(self))]
    pub async fn build_dashboard(&self, period: &str) -> Result<DashboardReport, AnalyticsError> {
        let results = self
            .fan_out(ReportKind::Dashboard, self.resolve(period))
            .await?;
        Ok(composer::dashboard(period, results))
    }

    #[instrument(skip(self))]
    pub async fn build_customers(&self, period: &str) -> Result<CustomerReport, AnalyticsError> {
        let results = self
            .fan_out(ReportKind::Customers, self.resolve(period))
            .await?;
        Ok(composer::customers(period, results))
    }

    #[instrument(skip(self))]
    pub async fn build_products(&self, period: &str) -> Result<ProductReport, AnalyticsError> {
        let results = self
            .fan_out(ReportKind::Products, self.resolve(period))
            .await?;
        Ok(composer::products(period, results))
    }

    /// Spawn every metric of `kind` and wait for all of them.
    async fn fan_out(
        &self,
        kind: ReportKind,
        range: DateRange,
    ) -> Result<MetricResults, AnalyticsError> {
        let metrics = metrics_for(kind);
        debug!(
            "Fanning out {} metrics for {:?} from {}",
            metrics.len(),
            kind,
            range.start
        );

        let handles: Vec<(Metric, JoinHandle<MetricValue>)> = metrics
            .iter()
            .map(|&metric| {
                let store = Arc::clone(&self.store);
                let limits = self.limits;
                let handle =
                    tokio::spawn(async move { metric.evaluate(store.as_ref(), range, limits).await });
                (metric, handle)
            })
            .collect();

        let mut results = MetricResults::default();
        for (metric, handle) in handles {
            let value = handle.await.map_err(|source| AnalyticsError::TaskJoin {
                metric: metric.name(),
                source,
            })?;
            results.insert(metric, value);
        }

        debug!("Joined {} metrics for {:?}", results.len(), kind);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;
    use crate::store::memory::ProductRecord;
    use crate::store::{MemoryStore, QueryKind};
    use chrono::{Duration, Utc};

    fn product(id: i32, name: &str, stock: i32, category: &str) -> ProductRecord {
        ProductRecord {
            id,
            name: name.to_string(),
            price: 50.0,
            image_url: None,
            stock,
            category: category.to_string(),
            is_active: true,
        }
    }

    /// Three completed orders (300.00) in the last week and two (150.00)
    /// eight days ago.
    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.add_user(1, "Ana", "ana@example.com");
        store.add_user(2, "Bruno", "bruno@example.com");
        store.add_product(product(1, "Caneca", 4, "Cozinha"));
        store.add_product(product(2, "Camiseta", 40, "Vestuário"));
        store.add_product(product(3, "Boné", 2, "Vestuário"));

        store.add_order(1, Some(1), 100.0, "completed", now - Duration::days(1));
        store.add_order(2, Some(2), 150.0, "completed", now - Duration::days(3));
        store.add_order(3, None, 50.0, "completed", now - Duration::days(3));
        store.add_order(4, Some(1), 100.0, "completed", now - Duration::days(8));
        store.add_order(5, Some(2), 50.0, "completed", now - Duration::days(8));

        store.add_item(1, 1, 2, 50.0);
        store.add_item(2, 2, 3, 50.0);
        store.add_item(3, 1, 1, 50.0);
        store.add_item(4, 2, 2, 50.0);
        Arc::new(store)
    }

    fn engine(store: Arc<MemoryStore>) -> ReportEngine {
        ReportEngine::new(store, ReportLimits::default())
    }

    #[tokio::test]
    async fn test_dashboard_end_to_end() {
        let report = engine(seeded_store()).build_dashboard("7d").await.unwrap();

        assert_eq!(report.overview.total_revenue, 300.0);
        assert_eq!(report.overview.total_orders, 3);
        assert_eq!(report.overview.total_customers, 2);
        assert_eq!(report.overview.average_order_value, 100.0);
        assert_eq!(report.overview.conversion_rate, 5.0);
        assert_eq!(report.sales_by_day.len(), 2);
        assert!(report
            .sales_by_day
            .windows(2)
            .all(|w| w[0].date < w[1].date));
        assert_eq!(report.top_products[0].id, 1);
        assert_eq!(report.top_products[0].total_sold, 3);
        // recent orders ignore the window
        assert_eq!(report.recent_orders.len(), 5);
        assert_eq!(report.recent_orders[0].id, 1);
        assert_eq!(report.period, "7d");
    }

    #[tokio::test]
    async fn test_failed_metric_only_blanks_its_slot() {
        let store = seeded_store();
        store.fail_on(QueryKind::TopProducts);
        let report = engine(store).build_dashboard("7d").await.unwrap();

        assert!(report.top_products.is_empty());
        assert_eq!(report.overview.total_revenue, 300.0);
        assert_eq!(report.overview.total_orders, 3);
        assert!(!report.recent_orders.is_empty());
        assert!(!report.sales_by_day.is_empty());
    }

    #[tokio::test]
    async fn test_total_outage_degrades_to_default_report() {
        let store = seeded_store();
        store.set_unavailable(true);
        let engine = engine(store);

        let dashboard = engine.build_dashboard("30d").await.unwrap();
        assert_eq!(dashboard.overview.total_revenue, 0.0);
        assert!(dashboard.recent_orders.is_empty());

        let customers = engine.build_customers("30d").await.unwrap();
        assert_eq!(customers.segments.len(), 4);
        assert!(customers.top_customers.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_builds_differ_only_in_timestamp() {
        let engine = engine(seeded_store());
        let mut first = engine.build_dashboard("30d").await.unwrap();
        let second = engine.build_dashboard("30d").await.unwrap();
        first.generated_at = second.generated_at;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_window_start_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let start = period::resolve_on("7d", today).start_at();
        let store = MemoryStore::new();
        store.add_order(1, None, 10.0, "completed", start);
        store.add_order(2, None, 20.0, "completed", start - Duration::seconds(1));

        let report = engine(Arc::new(store))
            .pinned_to(today)
            .build_dashboard("7d")
            .await
            .unwrap();
        assert_eq!(report.overview.total_orders, 1);
        assert_eq!(report.overview.total_revenue, 10.0);
    }

    #[tokio::test]
    async fn test_panicking_metric_fails_the_report() {
        let store = seeded_store();
        store.panic_on(QueryKind::TopProducts);

        let err = engine(store)
            .build_report(ReportKind::Dashboard, "7d")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::TaskJoin {
                metric: "topProducts",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_panic_outside_the_metric_set_is_harmless() {
        let store = seeded_store();
        store.panic_on(QueryKind::TopCustomers);

        let report = engine(store).build_dashboard("7d").await.unwrap();
        assert_eq!(report.overview.total_revenue, 300.0);
    }

    #[tokio::test]
    async fn test_customer_report() {
        let report = engine(seeded_store()).build_customers("7d").await.unwrap();

        assert_eq!(report.overview.total_customers, 2);
        // both customers ordered eight days ago
        assert_eq!(report.overview.new_customers, 0);
        assert_eq!(report.overview.returning_customers, 2);
        assert_eq!(report.overview.customer_lifetime_value, 125.0);
        assert_eq!(report.top_customers[0].name, "Bruno");

        let counts: Vec<(Segment, i64)> =
            report.segments.iter().map(|s| (s.segment, s.count)).collect();
        assert_eq!(
            counts,
            vec![
                (Segment::Vip, 0),
                (Segment::Premium, 0),
                (Segment::Regular, 2),
                (Segment::Novo, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_product_report() {
        let report = engine(seeded_store()).build_products("7d").await.unwrap();

        let low: Vec<i32> = report.low_stock_products.iter().map(|p| p.id).collect();
        assert_eq!(low, vec![3, 1]);

        // zero-activity products still appear
        assert_eq!(report.performance.len(), 3);
        let cap = report.performance.iter().find(|p| p.id == 3).unwrap();
        assert_eq!(cap.total_sold, 0);
        assert_eq!(cap.order_count, 0);

        let apparel = report
            .categories
            .iter()
            .find(|c| c.category == "Vestuário")
            .unwrap();
        assert_eq!(apparel.product_count, 2);
        assert_eq!(apparel.total_sold, 3);
    }

    #[tokio::test]
    async fn test_build_report_dispatches_by_kind() {
        let engine = engine(seeded_store());
        for kind in [ReportKind::Dashboard, ReportKind::Customers, ReportKind::Products] {
            let report = engine.build_report(kind, "90d").await.unwrap();
            assert_eq!(report.kind(), kind);
        }
    }
}
