//! Data store adapters.
//!
//! `AnalyticsStore` is the only way the engine reads order data. Each method
//! runs one aggregate query over orders, order items, products and users and
//! returns rows or a `StoreError`. Two adapters are provided:
//!
//! - `postgres::PgStore`: the production adapter over a bounded sqlx pool.
//! - `memory::MemoryStore`: an in-process dataset with per-query fault
//!   injection, used by tests and local demos.
//!
//! Every `since` argument is an inclusive lower bound. No query applies an
//! upper bound.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    CategorySales, DaySales, LowStockProduct, OrderSummary, ProductPerformance, ProductSales,
    TopCustomer,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Order status counted by revenue and spend queries.
pub const COMPLETED_STATUS: &str = "completed";

/// Identifies a single store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    TotalRevenue,
    TotalOrders,
    TotalCustomers,
    AverageOrderValue,
    TopProducts,
    RecentOrders,
    SalesByDay,
    NewCustomers,
    ReturningCustomers,
    CustomerSpend,
    TopCustomers,
    LowStockProducts,
    ProductCategories,
    ProductPerformance,
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Sum of completed order totals.
    async fn total_revenue(&self, since: DateTime<Utc>) -> StoreResult<f64>;

    /// Count of orders in any status.
    async fn total_orders(&self, since: DateTime<Utc>) -> StoreResult<i64>;

    /// Distinct customers with at least one order.
    async fn total_customers(&self, since: DateTime<Utc>) -> StoreResult<i64>;

    /// Mean completed order total, 0 when there are none.
    async fn average_order_value(&self, since: DateTime<Utc>) -> StoreResult<f64>;

    /// Products by units sold in completed orders, descending.
    async fn top_products(&self, since: DateTime<Utc>, limit: i64)
        -> StoreResult<Vec<ProductSales>>;

    /// Newest orders overall, regardless of date.
    async fn recent_orders(&self, limit: i64) -> StoreResult<Vec<OrderSummary>>;

    /// One row per day with orders, ascending by date.
    async fn sales_by_day(&self, since: DateTime<Utc>) -> StoreResult<Vec<DaySales>>;

    /// Customers whose first ever order falls in the window.
    async fn new_customers(&self, since: DateTime<Utc>) -> StoreResult<i64>;

    /// Customers ordering in the window who also ordered before it.
    async fn returning_customers(&self, since: DateTime<Utc>) -> StoreResult<i64>;

    /// Completed spend per customer in the window, one value per customer.
    async fn customer_spend(&self, since: DateTime<Utc>) -> StoreResult<Vec<f64>>;

    /// Customers by completed spend, descending.
    async fn top_customers(&self, since: DateTime<Utc>, limit: i64)
        -> StoreResult<Vec<TopCustomer>>;

    /// Active products at or below `threshold` units, lowest stock first.
    async fn low_stock_products(&self, threshold: i32) -> StoreResult<Vec<LowStockProduct>>;

    async fn product_categories(&self, since: DateTime<Utc>) -> StoreResult<Vec<CategorySales>>;

    /// Every active product, including those with no sales in the window.
    async fn product_performance(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<ProductPerformance>>;
}
