//! # Derived Metrics
//!
//! Figures computed from already-built reports rather than from the store:
//! period-over-period comparison and the placeholder realtime overlay.

use chrono::Utc;
use rand::Rng;
use tracing::instrument;

use super::orchestrator::ReportEngine;
use crate::error::AnalyticsError;
use crate::models::{
    round_currency, ComparisonReport, ComparisonResult, DashboardReport, MetricChange,
    RealtimeReport, RealtimeSnapshot,
};

/// Period used for the dashboard behind the realtime view.
pub const REALTIME_PERIOD: &str = "7d";

/// Percentage change from `previous` to `current`, rounded to 2 dp.
///
/// With no previous value the change is 100 if anything happened now and 0
/// otherwise.
pub fn percentage_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    round_currency((current - previous) / previous * 100.0)
}

fn metric_change(previous: f64, current: f64) -> MetricChange {
    MetricChange {
        current,
        previous,
        change: percentage_change(previous, current),
    }
}

/// Compare revenue, orders and customers of two dashboard reports.
pub fn compare_reports(current: &DashboardReport, previous: &DashboardReport) -> ComparisonResult {
    ComparisonResult {
        revenue: metric_change(previous.overview.total_revenue, current.overview.total_revenue),
        orders: metric_change(
            previous.overview.total_orders as f64,
            current.overview.total_orders as f64,
        ),
        customers: metric_change(
            previous.overview.total_customers as f64,
            current.overview.total_customers as f64,
        ),
    }
}

/// Build both dashboards concurrently and compare them.
///
/// Degraded metrics inside either report still compare (as their defaults).
/// If either build fails outright the whole comparison fails; no partial
/// result is returned.
#[instrument(skip(engine))]
pub async fn compare(
    engine: &ReportEngine,
    current_period: &str,
    previous_period: &str,
) -> Result<ComparisonReport, AnalyticsError> {
    let (current, previous) = tokio::try_join!(
        async {
            engine
                .build_dashboard(current_period)
                .await
                .map_err(|e| AnalyticsError::Comparison {
                    side: "current",
                    source: Box::new(e),
                })
        },
        async {
            engine
                .build_dashboard(previous_period)
                .await
                .map_err(|e| AnalyticsError::Comparison {
                    side: "previous",
                    source: Box::new(e),
                })
        },
    )?;

    Ok(ComparisonReport {
        comparison: compare_reports(&current, &previous),
        current_period: current_period.to_string(),
        previous_period: previous_period.to_string(),
        generated_at: Utc::now(),
    })
}

// ============================================================================
// Realtime Overlay
// ============================================================================

/// Source of the live figures shown next to the 7-day dashboard.
pub trait RealtimeSource: Send + Sync {
    fn snapshot(&self) -> RealtimeSnapshot;
}

/// Placeholder source: the figures are random and do not come from the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRealtime;

impl RealtimeSource for RandomRealtime {
    fn snapshot(&self) -> RealtimeSnapshot {
        let mut rng = rand::thread_rng();
        RealtimeSnapshot {
            online_users: rng.gen_range(10..60),
            current_hour_orders: rng.gen_range(0..5),
            current_hour_revenue: round_currency(rng.gen_range(0.0..1000.0)),
            timestamp: Utc::now(),
        }
    }
}

/// The 7-day dashboard with a realtime block attached.
pub async fn realtime(
    engine: &ReportEngine,
    source: &dyn RealtimeSource,
) -> Result<RealtimeReport, AnalyticsError> {
    let report = engine.build_dashboard(REALTIME_PERIOD).await?;
    Ok(RealtimeReport {
        report,
        realtime: source.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::config::ReportLimits;
    use crate::store::{MemoryStore, QueryKind};

    #[test]
    fn test_percentage_change_from_zero() {
        assert_eq!(percentage_change(0.0, 0.0), 0.0);
        assert_eq!(percentage_change(0.0, 50.0), 100.0);
    }

    #[test]
    fn test_percentage_change_rounding() {
        assert_eq!(percentage_change(100.0, 150.0), 50.0);
        assert_eq!(percentage_change(200.0, 150.0), -25.0);
        assert_eq!(percentage_change(3.0, 4.0), 33.33);
        assert_eq!(percentage_change(3.0, 2.0), -33.33);
    }

    fn seeded_engine() -> (Arc<MemoryStore>, ReportEngine) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store.add_user(1, "Ana", "ana@example.com");
        store.add_order(1, Some(1), 100.0, "completed", now - Duration::days(2));
        store.add_order(2, Some(1), 300.0, "completed", now - Duration::days(20));
        let engine = ReportEngine::new(store.clone(), ReportLimits::default());
        (store, engine)
    }

    #[tokio::test]
    async fn test_compare_week_against_month() {
        let (_, engine) = seeded_engine();
        let report = compare(&engine, "7d", "30d").await.unwrap();

        assert_eq!(report.comparison.revenue.current, 100.0);
        assert_eq!(report.comparison.revenue.previous, 400.0);
        assert_eq!(report.comparison.revenue.change, -75.0);
        assert_eq!(report.comparison.orders.change, -50.0);
        assert_eq!(report.comparison.customers.change, 0.0);
        assert_eq!(report.current_period, "7d");
        assert_eq!(report.previous_period, "30d");
    }

    #[tokio::test]
    async fn test_compare_with_degraded_metric() {
        let (store, engine) = seeded_engine();
        store.fail_on(QueryKind::TotalRevenue);
        let report = compare(&engine, "7d", "30d").await.unwrap();

        assert_eq!(report.comparison.revenue.current, 0.0);
        assert_eq!(report.comparison.revenue.previous, 0.0);
        assert_eq!(report.comparison.revenue.change, 0.0);
        assert_eq!(report.comparison.orders.change, -50.0);
    }

    #[tokio::test]
    async fn test_compare_fails_when_a_build_fails() {
        let (store, engine) = seeded_engine();
        store.panic_on(QueryKind::TotalOrders);

        let err = compare(&engine, "7d", "30d").await.unwrap_err();
        match err {
            AnalyticsError::Comparison { side, source } => {
                assert!(side == "current" || side == "previous");
                assert!(matches!(*source, AnalyticsError::TaskJoin { .. }));
            }
            other => panic!("expected a comparison error, got {other:?}"),
        }
    }

    struct FixedRealtime;

    impl RealtimeSource for FixedRealtime {
        fn snapshot(&self) -> RealtimeSnapshot {
            RealtimeSnapshot {
                online_users: 42,
                current_hour_orders: 1,
                current_hour_revenue: 99.9,
                timestamp: Utc::now(),
            }
        }
    }

    #[tokio::test]
    async fn test_realtime_uses_week_dashboard() {
        let (_, engine) = seeded_engine();
        let report = realtime(&engine, &FixedRealtime).await.unwrap();
        assert_eq!(report.report.period, REALTIME_PERIOD);
        assert_eq!(report.report.overview.total_orders, 1);
        assert_eq!(report.realtime.online_users, 42);
    }

    #[test]
    fn test_random_realtime_stays_in_range() {
        for _ in 0..100 {
            let snapshot = RandomRealtime.snapshot();
            assert!((10..60).contains(&snapshot.online_users));
            assert!(snapshot.current_hour_orders < 5);
            assert!((0.0..=1000.0).contains(&snapshot.current_hour_revenue));
        }
    }
}
