//! Value types for the analytics service.
//!
//! Store rows, composed reports and the response envelope. Every report is
//! rebuilt per request; nothing here is persisted. Field names are serialized
//! in camelCase to match the dashboard client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Display name for orders placed without a customer account.
pub const ANONYMOUS_CUSTOMER: &str = "Cliente Anônimo";

/// Round to two decimal places, halves away from zero.
///
/// Rounding happens on the `f64` value, not on its decimal spelling: `1.005`
/// is stored as `1.00499…` and rounds to `1.0`.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Metric Rows (sqlx::FromRow)
// ============================================================================

/// A product ranked by units sold in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub total_sold: i64,
    pub total_revenue: f64,
}

/// One of the most recent orders, with the customer resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i32,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Orders and completed revenue for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DaySales {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: f64,
}

/// A customer ranked by completed spend in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub total_orders: i64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LowStockProduct {
    pub id: i32,
    pub name: String,
    pub stock: i32,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategorySales {
    pub category: String,
    pub product_count: i64,
    pub total_sold: i64,
    pub total_revenue: f64,
}

/// Per-product rollup. Products without sales in the window appear with zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductPerformance {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub total_sold: i64,
    pub total_revenue: f64,
    pub order_count: i64,
}

// ============================================================================
// Customer Segmentation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "VIP")]
    Vip,
    Premium,
    Regular,
    Novo,
}

impl Segment {
    /// Tiers in report order, highest first.
    pub const ALL: [Segment; 4] = [
        Segment::Vip,
        Segment::Premium,
        Segment::Regular,
        Segment::Novo,
    ];

    /// Bucket an in-range spend. Each tier includes its lower edge.
    pub fn for_spend(spend: f64) -> Self {
        if spend >= 500.0 {
            Segment::Vip
        } else if spend >= 200.0 {
            Segment::Premium
        } else if spend >= 100.0 {
            Segment::Regular
        } else {
            Segment::Novo
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub segment: Segment,
    pub count: i64,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Dashboard,
    Customers,
    Products,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_revenue: f64,
    pub total_orders: i64,
    pub total_customers: i64,
    pub average_order_value: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub overview: DashboardOverview,
    pub top_products: Vec<ProductSales>,
    pub recent_orders: Vec<OrderSummary>,
    pub sales_by_day: Vec<DaySales>,
    pub period: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOverview {
    pub total_customers: i64,
    pub new_customers: i64,
    pub returning_customers: i64,
    pub customer_lifetime_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReport {
    pub overview: CustomerOverview,
    pub top_customers: Vec<TopCustomer>,
    pub segments: Vec<CustomerSegment>,
    pub period: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReport {
    pub top_products: Vec<ProductSales>,
    pub low_stock_products: Vec<LowStockProduct>,
    pub categories: Vec<CategorySales>,
    pub performance: Vec<ProductPerformance>,
    pub period: String,
    pub generated_at: DateTime<Utc>,
}

/// A composed report of any kind. Serializes as the inner report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Dashboard(DashboardReport),
    Customers(CustomerReport),
    Products(ProductReport),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Dashboard(_) => ReportKind::Dashboard,
            Report::Customers(_) => ReportKind::Customers,
            Report::Products(_) => ReportKind::Products,
        }
    }
}

// ============================================================================
// Derived Metrics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub revenue: MetricChange,
    pub orders: MetricChange,
    pub customers: MetricChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub comparison: ComparisonResult,
    pub current_period: String,
    pub previous_period: String,
    pub generated_at: DateTime<Utc>,
}

/// Placeholder live figures. These are generated, not read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSnapshot {
    pub online_users: u32,
    pub current_hour_orders: u32,
    pub current_hour_revenue: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeReport {
    #[serde(flatten)]
    pub report: DashboardReport,
    pub realtime: RealtimeSnapshot,
}

// ============================================================================
// Request / Response Models
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub period: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompareQuery {
    pub current: Option<String>,
    pub previous: Option<String>,
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            error: Some(error.into()),
        }
    }
}
