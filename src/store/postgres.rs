//! PostgreSQL adapter over a bounded sqlx pool.
//!
//! Expected tables:
//! - `users(id, name, email)`
//! - `products(id, name, price, image_url, stock, category, is_active)`
//! - `orders(id, user_id NULL, total_amount, status, created_at TIMESTAMPTZ)`
//! - `order_items(id, order_id, product_id, quantity, price)`
//!
//! Queries beyond the pool size wait for a free connection instead of failing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};

use super::{AnalyticsStore, StoreResult, COMPLETED_STATUS};
use crate::config::AppConfig;
use crate::error::StoreError;
use crate::models::{
    CategorySales, DaySales, LowStockProduct, OrderSummary, ProductPerformance, ProductSales,
    TopCustomer, ANONYMOUS_CUSTOMER,
};

/// Store backed by PostgreSQL.
///
/// `pool` is `None` only when no pool could be built at all, in which case
/// every query reports `StoreError::Unavailable`.
#[derive(Clone)]
pub struct PgStore {
    pool: Option<PgPool>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Open the pool at startup.
    ///
    /// A failed eager connect is logged and replaced by a lazily connecting
    /// pool, so the process keeps serving and each metric degrades on its own.
    pub async fn open(config: &AppConfig) -> Self {
        let options = PgPoolOptions::new().max_connections(config.db_max_connections);

        match options.clone().connect(&config.database_url).await {
            Ok(pool) => {
                info!(
                    "Connected to analytics database (max {} connections)",
                    config.db_max_connections
                );
                return Self::new(pool);
            }
            Err(e) => error!("Failed to connect to analytics database: {}", e),
        }

        match options.connect_lazy(&config.database_url) {
            Ok(pool) => {
                warn!("Serving with a lazy pool; metrics will degrade until the database is reachable");
                Self::new(pool)
            }
            Err(e) => {
                error!("Invalid analytics database configuration: {}", e);
                Self { pool: None }
            }
        }
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("Analytics database pool closed");
        }
    }

    fn pool(&self) -> StoreResult<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("no database pool configured".to_string()))
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn total_revenue(&self, since: DateTime<Utc>) -> StoreResult<f64> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)::float8
            FROM orders
            WHERE status = $1 AND created_at >= $2
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .fetch_one(self.pool()?)
        .await?;
        Ok(total)
    }

    async fn total_orders(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE created_at >= $1")
            .bind(since)
            .fetch_one(self.pool()?)
            .await?;
        Ok(count)
    }

    async fn total_customers(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT user_id)
            FROM orders
            WHERE user_id IS NOT NULL AND created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(self.pool()?)
        .await?;
        Ok(count)
    }

    async fn average_order_value(&self, since: DateTime<Utc>) -> StoreResult<f64> {
        let avg: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(AVG(total_amount), 0)::float8
            FROM orders
            WHERE status = $1 AND created_at >= $2
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .fetch_one(self.pool()?)
        .await?;
        Ok(avg)
    }

    async fn top_products(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ProductSales>> {
        let rows = sqlx::query_as(
            r#"
            SELECT p.id,
                   p.name,
                   p.price::float8 AS price,
                   p.image_url,
                   SUM(oi.quantity)::int8 AS total_sold,
                   ROUND(SUM(oi.quantity * oi.price), 2)::float8 AS total_revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status = $1 AND o.created_at >= $2
            GROUP BY p.id, p.name, p.price, p.image_url
            ORDER BY total_sold DESC, p.id
            LIMIT $3
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }

    async fn recent_orders(&self, limit: i64) -> StoreResult<Vec<OrderSummary>> {
        let rows = sqlx::query_as(
            r#"
            SELECT o.id,
                   COALESCE(u.name, $1) AS customer_name,
                   u.email AS customer_email,
                   o.total_amount::float8 AS total_amount,
                   o.status,
                   o.created_at
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2
            "#,
        )
        .bind(ANONYMOUS_CUSTOMER)
        .bind(limit)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }

    async fn sales_by_day(&self, since: DateTime<Utc>) -> StoreResult<Vec<DaySales>> {
        let rows = sqlx::query_as(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS date,
                   COUNT(*) AS orders,
                   ROUND(COALESCE(SUM(total_amount) FILTER (WHERE status = $1), 0), 2)::float8 AS revenue
            FROM orders
            WHERE created_at >= $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }

    async fn new_customers(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM (
                SELECT user_id
                FROM orders
                WHERE user_id IS NOT NULL
                GROUP BY user_id
                HAVING MIN(created_at) >= $1
            ) first_orders
            "#,
        )
        .bind(since)
        .fetch_one(self.pool()?)
        .await?;
        Ok(count)
    }

    async fn returning_customers(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT o.user_id)
            FROM orders o
            WHERE o.user_id IS NOT NULL
              AND o.created_at >= $1
              AND EXISTS (
                  SELECT 1 FROM orders prior
                  WHERE prior.user_id = o.user_id AND prior.created_at < $1
              )
            "#,
        )
        .bind(since)
        .fetch_one(self.pool()?)
        .await?;
        Ok(count)
    }

    async fn customer_spend(&self, since: DateTime<Utc>) -> StoreResult<Vec<f64>> {
        let spend: Vec<f64> = sqlx::query_scalar(
            r#"
            SELECT SUM(total_amount)::float8
            FROM orders
            WHERE user_id IS NOT NULL AND status = $1 AND created_at >= $2
            GROUP BY user_id
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .fetch_all(self.pool()?)
        .await?;
        Ok(spend)
    }

    async fn top_customers(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<TopCustomer>> {
        let rows = sqlx::query_as(
            r#"
            SELECT u.id,
                   u.name,
                   u.email,
                   COUNT(o.id) AS total_orders,
                   ROUND(SUM(o.total_amount), 2)::float8 AS total_spent
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.status = $1 AND o.created_at >= $2
            GROUP BY u.id, u.name, u.email
            ORDER BY total_spent DESC, u.id
            LIMIT $3
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .bind(limit)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }

    async fn low_stock_products(&self, threshold: i32) -> StoreResult<Vec<LowStockProduct>> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, name, stock, price::float8 AS price
            FROM products
            WHERE is_active AND stock <= $1
            ORDER BY stock ASC, id
            "#,
        )
        .bind(threshold)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }

    async fn product_categories(&self, since: DateTime<Utc>) -> StoreResult<Vec<CategorySales>> {
        let rows = sqlx::query_as(
            r#"
            SELECT p.category,
                   COUNT(DISTINCT p.id) AS product_count,
                   COALESCE(SUM(oi.quantity), 0)::int8 AS total_sold,
                   ROUND(COALESCE(SUM(oi.quantity * oi.price), 0), 2)::float8 AS total_revenue
            FROM products p
            LEFT JOIN (order_items oi
                       JOIN orders o ON o.id = oi.order_id
                                    AND o.status = $1
                                    AND o.created_at >= $2)
                   ON oi.product_id = p.id
            WHERE p.is_active
            GROUP BY p.category
            ORDER BY total_revenue DESC, p.category
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }

    async fn product_performance(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<ProductPerformance>> {
        let rows = sqlx::query_as(
            r#"
            SELECT p.id,
                   p.name,
                   p.price::float8 AS price,
                   p.stock,
                   COALESCE(SUM(oi.quantity), 0)::int8 AS total_sold,
                   ROUND(COALESCE(SUM(oi.quantity * oi.price), 0), 2)::float8 AS total_revenue,
                   COUNT(DISTINCT o.id) AS order_count
            FROM products p
            LEFT JOIN (order_items oi
                       JOIN orders o ON o.id = oi.order_id
                                    AND o.status = $1
                                    AND o.created_at >= $2)
                   ON oi.product_id = p.id
            WHERE p.is_active
            GROUP BY p.id, p.name, p.price, p.stock
            ORDER BY total_revenue DESC, p.id
            "#,
        )
        .bind(COMPLETED_STATUS)
        .bind(since)
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows)
    }
}
