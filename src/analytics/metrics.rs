//! # Metric Functions
//!
//! Each metric is one independent aggregate over the store. The typed
//! functions below return `StoreResult` so callers see real failures;
//! [`Metric::evaluate`] is the isolation boundary that logs a failure and
//! substitutes the metric's entry from the default table
//! ([`Metric::default_value`]). A broken metric therefore never blocks a report.
//!
//! Defaults:
//!
//! | metric kind                  | default |
//! |------------------------------|---------|
//! | amounts, rates, averages     | `0.0`   |
//! | counts                       | `0`     |
//! | rankings, series, rollups    | `[]`    |
//! | customer segments            | every tier with count `0` |

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ReportLimits;
use crate::models::{
    round_currency, CategorySales, CustomerSegment, DaySales, LowStockProduct, OrderSummary,
    ProductPerformance, ProductSales, Segment, TopCustomer,
};
use crate::period::DateRange;
use crate::store::{AnalyticsStore, StoreResult};

/// Visits assumed per order when estimating conversion (a fixed 5% rate).
pub const ASSUMED_VISITS_PER_ORDER: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    TotalRevenue,
    TotalOrders,
    TotalCustomers,
    AverageOrderValue,
    ConversionRate,
    TopProducts,
    RecentOrders,
    SalesByDay,
    NewCustomers,
    ReturningCustomers,
    CustomerLifetimeValue,
    TopCustomers,
    CustomerSegments,
    LowStockProducts,
    ProductCategories,
    ProductPerformance,
}

/// The value produced by one metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Amount(f64),
    Count(i64),
    Products(Vec<ProductSales>),
    Orders(Vec<OrderSummary>),
    Days(Vec<DaySales>),
    Customers(Vec<TopCustomer>),
    Segments(Vec<CustomerSegment>),
    LowStock(Vec<LowStockProduct>),
    Categories(Vec<CategorySales>),
    Performance(Vec<ProductPerformance>),
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::TotalRevenue => "totalRevenue",
            Metric::TotalOrders => "totalOrders",
            Metric::TotalCustomers => "totalCustomers",
            Metric::AverageOrderValue => "averageOrderValue",
            Metric::ConversionRate => "conversionRate",
            Metric::TopProducts => "topProducts",
            Metric::RecentOrders => "recentOrders",
            Metric::SalesByDay => "salesByDay",
            Metric::NewCustomers => "newCustomers",
            Metric::ReturningCustomers => "returningCustomers",
            Metric::CustomerLifetimeValue => "customerLifetimeValue",
            Metric::TopCustomers => "topCustomers",
            Metric::CustomerSegments => "customerSegments",
            Metric::LowStockProducts => "lowStockProducts",
            Metric::ProductCategories => "productCategories",
            Metric::ProductPerformance => "productPerformance",
        }
    }

    /// The value reported when this metric cannot be computed.
    pub fn default_value(self) -> MetricValue {
        match self {
            Metric::TotalRevenue
            | Metric::AverageOrderValue
            | Metric::ConversionRate
            | Metric::CustomerLifetimeValue => MetricValue::Amount(0.0),
            Metric::TotalOrders
            | Metric::TotalCustomers
            | Metric::NewCustomers
            | Metric::ReturningCustomers => MetricValue::Count(0),
            Metric::TopProducts => MetricValue::Products(Vec::new()),
            Metric::RecentOrders => MetricValue::Orders(Vec::new()),
            Metric::SalesByDay => MetricValue::Days(Vec::new()),
            Metric::TopCustomers => MetricValue::Customers(Vec::new()),
            Metric::CustomerSegments => MetricValue::Segments(segment_counts(&[])),
            Metric::LowStockProducts => MetricValue::LowStock(Vec::new()),
            Metric::ProductCategories => MetricValue::Categories(Vec::new()),
            Metric::ProductPerformance => MetricValue::Performance(Vec::new()),
        }
    }

    /// Run the metric against the store, propagating store failures.
    pub async fn compute(
        self,
        store: &dyn AnalyticsStore,
        range: DateRange,
        limits: ReportLimits,
    ) -> StoreResult<MetricValue> {
        let value = match self {
            Metric::TotalRevenue => MetricValue::Amount(total_revenue(store, range).await?),
            Metric::TotalOrders => MetricValue::Count(total_orders(store, range).await?),
            Metric::TotalCustomers => MetricValue::Count(total_customers(store, range).await?),
            Metric::AverageOrderValue => {
                MetricValue::Amount(average_order_value(store, range).await?)
            }
            Metric::ConversionRate => MetricValue::Amount(conversion_rate(store, range).await?),
            Metric::TopProducts => {
                MetricValue::Products(top_products(store, range, limits.top_products).await?)
            }
            Metric::RecentOrders => {
                MetricValue::Orders(recent_orders(store, limits.recent_orders).await?)
            }
            Metric::SalesByDay => MetricValue::Days(sales_by_day(store, range).await?),
            Metric::NewCustomers => MetricValue::Count(new_customers(store, range).await?),
            Metric::ReturningCustomers => {
                MetricValue::Count(returning_customers(store, range).await?)
            }
            Metric::CustomerLifetimeValue => {
                MetricValue::Amount(customer_lifetime_value(store, range).await?)
            }
            Metric::TopCustomers => {
                MetricValue::Customers(top_customers(store, range, limits.top_customers).await?)
            }
            Metric::CustomerSegments => {
                MetricValue::Segments(customer_segments(store, range).await?)
            }
            Metric::LowStockProducts => {
                MetricValue::LowStock(low_stock_products(store, limits.low_stock_threshold).await?)
            }
            Metric::ProductCategories => {
                MetricValue::Categories(product_categories(store, range).await?)
            }
            Metric::ProductPerformance => {
                MetricValue::Performance(product_performance(store, range).await?)
            }
        };
        Ok(value)
    }

    /// Run the metric, replacing any store failure with the default value.
    pub async fn evaluate(
        self,
        store: &dyn AnalyticsStore,
        range: DateRange,
        limits: ReportLimits,
    ) -> MetricValue {
        match self.compute(store, range, limits).await {
            Ok(value) => {
                debug!("Metric {} computed", self.name());
                value
            }
            Err(e) => {
                warn!("Metric {} failed, using default: {}", self.name(), e);
                self.default_value()
            }
        }
    }
}

// ============================================================================
// Sales
// ============================================================================

/// Sum of completed order totals in the window.
pub async fn total_revenue(store: &dyn AnalyticsStore, range: DateRange) -> StoreResult<f64> {
    Ok(round_currency(store.total_revenue(range.start_at()).await?))
}

/// Orders in the window in any status. Unlike revenue this is not limited
/// to completed orders.
pub async fn total_orders(store: &dyn AnalyticsStore, range: DateRange) -> StoreResult<i64> {
    store.total_orders(range.start_at()).await
}

pub async fn total_customers(store: &dyn AnalyticsStore, range: DateRange) -> StoreResult<i64> {
    store.total_customers(range.start_at()).await
}

pub async fn average_order_value(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<f64> {
    Ok(round_currency(store.average_order_value(range.start_at()).await?))
}

/// Estimated conversion rate in percent.
///
/// There is no visit tracking, so visits are assumed to be
/// `orders * ASSUMED_VISITS_PER_ORDER`. The result is 5.0 whenever any order
/// exists and 0.0 otherwise.
pub async fn conversion_rate(store: &dyn AnalyticsStore, range: DateRange) -> StoreResult<f64> {
    let orders = store.total_orders(range.start_at()).await? as f64;
    if orders == 0.0 {
        return Ok(0.0);
    }
    let visits = orders * ASSUMED_VISITS_PER_ORDER;
    Ok(round_currency(orders / visits * 100.0))
}

pub async fn top_products(
    store: &dyn AnalyticsStore,
    range: DateRange,
    limit: i64,
) -> StoreResult<Vec<ProductSales>> {
    store.top_products(range.start_at(), limit).await
}

/// Most recent orders overall, newest first. Not limited to the window.
pub async fn recent_orders(
    store: &dyn AnalyticsStore,
    limit: i64,
) -> StoreResult<Vec<OrderSummary>> {
    store.recent_orders(limit).await
}

pub async fn sales_by_day(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<Vec<DaySales>> {
    store.sales_by_day(range.start_at()).await
}

// ============================================================================
// Customers
// ============================================================================

pub async fn new_customers(store: &dyn AnalyticsStore, range: DateRange) -> StoreResult<i64> {
    store.new_customers(range.start_at()).await
}

pub async fn returning_customers(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<i64> {
    store.returning_customers(range.start_at()).await
}

/// Mean completed spend per customer in the window.
pub async fn customer_lifetime_value(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<f64> {
    let spend = store.customer_spend(range.start_at()).await?;
    if spend.is_empty() {
        return Ok(0.0);
    }
    Ok(round_currency(spend.iter().sum::<f64>() / spend.len() as f64))
}

pub async fn top_customers(
    store: &dyn AnalyticsStore,
    range: DateRange,
    limit: i64,
) -> StoreResult<Vec<TopCustomer>> {
    store.top_customers(range.start_at(), limit).await
}

pub async fn customer_segments(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<Vec<CustomerSegment>> {
    let spend = store.customer_spend(range.start_at()).await?;
    Ok(segment_counts(&spend))
}

/// Count customers per tier. All four tiers are always present, highest first.
pub fn segment_counts(spend: &[f64]) -> Vec<CustomerSegment> {
    let mut counts: HashMap<Segment, i64> = HashMap::new();
    for amount in spend {
        *counts.entry(Segment::for_spend(*amount)).or_insert(0) += 1;
    }
    Segment::ALL
        .iter()
        .map(|segment| CustomerSegment {
            segment: *segment,
            count: counts.get(segment).copied().unwrap_or(0),
        })
        .collect()
}

// ============================================================================
// Products
// ============================================================================

/// Active products at or below the stock threshold. Reflects current
/// inventory, so no date window applies.
pub async fn low_stock_products(
    store: &dyn AnalyticsStore,
    threshold: i32,
) -> StoreResult<Vec<LowStockProduct>> {
    store.low_stock_products(threshold).await
}

pub async fn product_categories(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<Vec<CategorySales>> {
    store.product_categories(range.start_at()).await
}

pub async fn product_performance(
    store: &dyn AnalyticsStore,
    range: DateRange,
) -> StoreResult<Vec<ProductPerformance>> {
    store.product_performance(range.start_at()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::resolve;
    use crate::store::{MemoryStore, QueryKind};
    use chrono::{Duration, Utc};

    fn store_with_orders() -> MemoryStore {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.add_user(1, "Ana", "ana@example.com");
        store.add_user(2, "Bruno", "bruno@example.com");
        store.add_order(1, Some(1), 120.0, "completed", now - Duration::days(1));
        store.add_order(2, Some(2), 80.0, "completed", now - Duration::days(2));
        store.add_order(3, Some(2), 40.0, "pending", now - Duration::days(2));
        store
    }

    #[tokio::test]
    async fn test_revenue_counts_completed_but_orders_count_all() {
        let store = store_with_orders();
        let range = resolve("7d");
        assert_eq!(total_revenue(&store, range).await.unwrap(), 200.0);
        assert_eq!(total_orders(&store, range).await.unwrap(), 3);
        assert_eq!(average_order_value(&store, range).await.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn test_conversion_rate_is_fixed_estimate() {
        let store = store_with_orders();
        assert_eq!(conversion_rate(&store, resolve("7d")).await.unwrap(), 5.0);

        let empty = MemoryStore::new();
        assert_eq!(conversion_rate(&empty, resolve("7d")).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_customer_lifetime_value_is_mean_spend() {
        let store = store_with_orders();
        let ltv = customer_lifetime_value(&store, resolve("7d")).await.unwrap();
        assert_eq!(ltv, 100.0);
    }

    #[test]
    fn test_segment_counts_include_every_tier() {
        let segments = segment_counts(&[500.0, 250.0, 150.0, 50.0, 720.0]);
        let counts: Vec<(Segment, i64)> = segments.iter().map(|s| (s.segment, s.count)).collect();
        assert_eq!(
            counts,
            vec![
                (Segment::Vip, 2),
                (Segment::Premium, 1),
                (Segment::Regular, 1),
                (Segment::Novo, 1),
            ]
        );
        assert!(segment_counts(&[]).iter().all(|s| s.count == 0));
    }

    #[tokio::test]
    async fn test_evaluate_substitutes_default_on_failure() {
        let store = store_with_orders();
        store.fail_on(QueryKind::TotalRevenue);
        let limits = ReportLimits::default();
        let range = resolve("7d");

        assert!(Metric::TotalRevenue.compute(&store, range, limits).await.is_err());
        assert_eq!(
            Metric::TotalRevenue.evaluate(&store, range, limits).await,
            MetricValue::Amount(0.0)
        );
        assert_eq!(
            Metric::TotalOrders.evaluate(&store, range, limits).await,
            MetricValue::Count(3)
        );
    }

    #[tokio::test]
    async fn test_segments_default_keeps_all_tiers() {
        let store = MemoryStore::new();
        store.fail_on(QueryKind::CustomerSpend);
        let value = Metric::CustomerSegments
            .evaluate(&store, resolve("30d"), ReportLimits::default())
            .await;
        match value {
            MetricValue::Segments(segments) => {
                assert_eq!(segments.len(), 4);
                assert!(segments.iter().all(|s| s.count == 0));
            }
            other => panic!("unexpected value {other:?}"),
        }
    }
}
