//! Report Composer.
//!
//! Places named metric results into the slots of a typed report and stamps
//! it. A slot whose metric is missing, or holds a value of the wrong shape,
//! gets that metric's default, so every field of a report is always present.

use std::collections::HashMap;

use chrono::Utc;

use super::metrics::{Metric, MetricValue};
use crate::models::{
    CategorySales, CustomerOverview, CustomerReport, CustomerSegment, DashboardOverview,
    DashboardReport, DaySales, LowStockProduct, OrderSummary, ProductPerformance, ProductReport,
    ProductSales, Report, ReportKind, TopCustomer,
};

/// Results of one fan-out, keyed by metric.
#[derive(Debug, Default)]
pub struct MetricResults {
    values: HashMap<Metric, MetricValue>,
}

impl MetricResults {
    pub fn insert(&mut self, metric: Metric, value: MetricValue) {
        self.values.insert(metric, value);
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    fn take(&mut self, metric: Metric) -> MetricValue {
        self.values
            .remove(&metric)
            .unwrap_or_else(|| metric.default_value())
    }

    fn amount(&mut self, metric: Metric) -> f64 {
        match self.take(metric) {
            MetricValue::Amount(v) => v,
            _ => 0.0,
        }
    }

    fn count(&mut self, metric: Metric) -> i64 {
        match self.take(metric) {
            MetricValue::Count(v) => v,
            _ => 0,
        }
    }

    fn products(&mut self, metric: Metric) -> Vec<ProductSales> {
        match self.take(metric) {
            MetricValue::Products(v) => v,
            _ => Vec::new(),
        }
    }

    fn orders(&mut self, metric: Metric) -> Vec<OrderSummary> {
        match self.take(metric) {
            MetricValue::Orders(v) => v,
            _ => Vec::new(),
        }
    }

    fn days(&mut self, metric: Metric) -> Vec<DaySales> {
        match self.take(metric) {
            MetricValue::Days(v) => v,
            _ => Vec::new(),
        }
    }

    fn customers(&mut self, metric: Metric) -> Vec<TopCustomer> {
        match self.take(metric) {
            MetricValue::Customers(v) => v,
            _ => Vec::new(),
        }
    }

    fn segments(&mut self, metric: Metric) -> Vec<CustomerSegment> {
        match self.take(metric) {
            MetricValue::Segments(v) => v,
            _ => match metric.default_value() {
                MetricValue::Segments(v) => v,
                _ => Vec::new(),
            },
        }
    }

    fn low_stock(&mut self, metric: Metric) -> Vec<LowStockProduct> {
        match self.take(metric) {
            MetricValue::LowStock(v) => v,
            _ => Vec::new(),
        }
    }

    fn categories(&mut self, metric: Metric) -> Vec<CategorySales> {
        match self.take(metric) {
            MetricValue::Categories(v) => v,
            _ => Vec::new(),
        }
    }

    fn performance(&mut self, metric: Metric) -> Vec<ProductPerformance> {
        match self.take(metric) {
            MetricValue::Performance(v) => v,
            _ => Vec::new(),
        }
    }
}

/// Assemble a report of `kind`. `period` is echoed as given by the caller.
pub fn compose(kind: ReportKind, period: &str, results: MetricResults) -> Report {
    match kind {
        ReportKind::Dashboard => Report::Dashboard(dashboard(period, results)),
        ReportKind::Customers => Report::Customers(customers(period, results)),
        ReportKind::Products => Report::Products(products(period, results)),
    }
}

pub fn dashboard(period: &str, mut results: MetricResults) -> DashboardReport {
    DashboardReport {
        overview: DashboardOverview {
            total_revenue: results.amount(Metric::TotalRevenue),
            total_orders: results.count(Metric::TotalOrders),
            total_customers: results.count(Metric::TotalCustomers),
            average_order_value: results.amount(Metric::AverageOrderValue),
            conversion_rate: results.amount(Metric::ConversionRate),
        },
        top_products: results.products(Metric::TopProducts),
        recent_orders: results.orders(Metric::RecentOrders),
        sales_by_day: results.days(Metric::SalesByDay),
        period: period.to_string(),
        generated_at: Utc::now(),
    }
}

pub fn customers(period: &str, mut results: MetricResults) -> CustomerReport {
    CustomerReport {
        overview: CustomerOverview {
            total_customers: results.count(Metric::TotalCustomers),
            new_customers: results.count(Metric::NewCustomers),
            returning_customers: results.count(Metric::ReturningCustomers),
            customer_lifetime_value: results.amount(Metric::CustomerLifetimeValue),
        },
        top_customers: results.customers(Metric::TopCustomers),
        segments: results.segments(Metric::CustomerSegments),
        period: period.to_string(),
        generated_at: Utc::now(),
    }
}

pub fn products(period: &str, mut results: MetricResults) -> ProductReport {
    ProductReport {
        top_products: results.products(Metric::TopProducts),
        low_stock_products: results.low_stock(Metric::LowStockProducts),
        categories: results.categories(Metric::ProductCategories),
        performance: results.performance(Metric::ProductPerformance),
        period: period.to_string(),
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_results_compose_all_default_dashboard() {
        let report = dashboard("7d", MetricResults::default());
        assert_eq!(report.overview, DashboardOverview::default());
        assert!(report.top_products.is_empty());
        assert!(report.recent_orders.is_empty());
        assert!(report.sales_by_day.is_empty());
        assert_eq!(report.period, "7d");
    }

    #[test]
    fn test_period_token_is_echoed_verbatim() {
        let report = compose(ReportKind::Products, "fortnight", MetricResults::default());
        match report {
            Report::Products(r) => assert_eq!(r.period, "fortnight"),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn test_values_land_in_named_slots() {
        let mut results = MetricResults::default();
        results.insert(Metric::TotalRevenue, MetricValue::Amount(300.0));
        results.insert(Metric::TotalOrders, MetricValue::Count(3));
        // wrong shape falls back to the default
        results.insert(Metric::TotalCustomers, MetricValue::Amount(9.0));

        let report = dashboard("30d", results);
        assert_eq!(report.overview.total_revenue, 300.0);
        assert_eq!(report.overview.total_orders, 3);
        assert_eq!(report.overview.total_customers, 0);
    }

    #[test]
    fn test_customer_report_keeps_segment_tiers_when_missing() {
        let report = customers("30d", MetricResults::default());
        assert_eq!(report.segments.len(), 4);
        assert_eq!(report.overview, CustomerOverview::default());
    }
}
