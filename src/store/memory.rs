//! In-memory store with per-query fault injection.
//!
//! Holds users, products, orders and order items in process and answers the
//! same aggregate queries as the PostgreSQL adapter. `fail_on` makes a single
//! query kind return an error, which is how metric isolation is exercised.
//! `panic_on` makes it panic instead, which takes down the metric task.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AnalyticsStore, QueryKind, StoreResult, COMPLETED_STATUS};
use crate::error::StoreError;
use crate::models::{
    round_currency, CategorySales, DaySales, LowStockProduct, OrderSummary, ProductPerformance,
    ProductSales, TopCustomer, ANONYMOUS_CUSTOMER,
};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub category: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: i32,
    pub user_id: Option<i32>,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderItemRecord {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Default)]
struct Dataset {
    users: Vec<UserRecord>,
    products: Vec<ProductRecord>,
    orders: Vec<OrderRecord>,
    items: Vec<OrderItemRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
    failing: RwLock<HashSet<QueryKind>>,
    panicking: RwLock<HashSet<QueryKind>>,
    unavailable: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, id: i32, name: &str, email: &str) {
        self.write().users.push(UserRecord {
            id,
            name: name.to_string(),
            email: email.to_string(),
        });
    }

    pub fn add_product(&self, product: ProductRecord) {
        self.write().products.push(product);
    }

    pub fn add_order(
        &self,
        id: i32,
        user_id: Option<i32>,
        total_amount: f64,
        status: &str,
        created_at: DateTime<Utc>,
    ) {
        self.write().orders.push(OrderRecord {
            id,
            user_id,
            total_amount,
            status: status.to_string(),
            created_at,
        });
    }

    pub fn add_item(&self, order_id: i32, product_id: i32, quantity: i64, price: f64) {
        self.write().items.push(OrderItemRecord {
            order_id,
            product_id,
            quantity,
            price,
        });
    }

    /// Make every future `kind` query fail.
    pub fn fail_on(&self, kind: QueryKind) {
        self.failing
            .write()
            .expect("fault set lock poisoned")
            .insert(kind);
    }

    /// Make every future `kind` query panic.
    pub fn panic_on(&self, kind: QueryKind) {
        self.panicking
            .write()
            .expect("fault set lock poisoned")
            .insert(kind);
    }

    /// Simulate a full outage: every query fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().expect("outage flag lock poisoned") = unavailable;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Dataset> {
        self.data.write().expect("dataset lock poisoned")
    }

    /// Check injected faults, then run `f` against the dataset.
    fn query<T>(&self, kind: QueryKind, f: impl FnOnce(&Dataset) -> T) -> StoreResult<T> {
        if *self.unavailable.read().expect("outage flag lock poisoned") {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        if self
            .failing
            .read()
            .expect("fault set lock poisoned")
            .contains(&kind)
        {
            return Err(StoreError::Injected(kind));
        }
        let panics = self
            .panicking
            .read()
            .expect("fault set lock poisoned")
            .contains(&kind);
        if panics {
            panic!("injected panic in {:?} query", kind);
        }
        let data = self.data.read().expect("dataset lock poisoned");
        Ok(f(&data))
    }
}

impl Dataset {
    fn orders_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &OrderRecord> {
        self.orders.iter().filter(move |o| o.created_at >= since)
    }

    fn completed_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &OrderRecord> {
        self.orders_since(since)
            .filter(|o| o.status == COMPLETED_STATUS)
    }

    /// Completed spend and order count per customer in the window.
    fn spend_by_customer(&self, since: DateTime<Utc>) -> HashMap<i32, (f64, i64)> {
        let mut spend: HashMap<i32, (f64, i64)> = HashMap::new();
        for order in self.completed_since(since) {
            if let Some(user_id) = order.user_id {
                let entry = spend.entry(user_id).or_insert((0.0, 0));
                entry.0 += order.total_amount;
                entry.1 += 1;
            }
        }
        spend
    }

    /// Units, revenue and distinct orders per product from completed orders in the window.
    fn product_sales(&self, since: DateTime<Utc>) -> HashMap<i32, (i64, f64, HashSet<i32>)> {
        let completed: HashSet<i32> = self.completed_since(since).map(|o| o.id).collect();
        let mut sales: HashMap<i32, (i64, f64, HashSet<i32>)> = HashMap::new();
        for item in self.items.iter().filter(|i| completed.contains(&i.order_id)) {
            let entry = sales
                .entry(item.product_id)
                .or_insert_with(|| (0, 0.0, HashSet::new()));
            entry.0 += item.quantity;
            entry.1 += item.quantity as f64 * item.price;
            entry.2.insert(item.order_id);
        }
        sales
    }

    fn active_products(&self) -> impl Iterator<Item = &ProductRecord> {
        self.products.iter().filter(|p| p.is_active)
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn total_revenue(&self, since: DateTime<Utc>) -> StoreResult<f64> {
        self.query(QueryKind::TotalRevenue, |d| {
            d.completed_since(since).map(|o| o.total_amount).sum()
        })
    }

    async fn total_orders(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        self.query(QueryKind::TotalOrders, |d| d.orders_since(since).count() as i64)
    }

    async fn total_customers(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        self.query(QueryKind::TotalCustomers, |d| {
            d.orders_since(since)
                .filter_map(|o| o.user_id)
                .collect::<HashSet<_>>()
                .len() as i64
        })
    }

    async fn average_order_value(&self, since: DateTime<Utc>) -> StoreResult<f64> {
        self.query(QueryKind::AverageOrderValue, |d| {
            let totals: Vec<f64> = d.completed_since(since).map(|o| o.total_amount).collect();
            if totals.is_empty() {
                0.0
            } else {
                totals.iter().sum::<f64>() / totals.len() as f64
            }
        })
    }

    async fn top_products(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ProductSales>> {
        self.query(QueryKind::TopProducts, |d| {
            let sales = d.product_sales(since);
            let mut ranked: Vec<ProductSales> = d
                .products
                .iter()
                .filter_map(|p| {
                    sales.get(&p.id).map(|(sold, revenue, _)| ProductSales {
                        id: p.id,
                        name: p.name.clone(),
                        price: p.price,
                        image_url: p.image_url.clone(),
                        total_sold: *sold,
                        total_revenue: round_currency(*revenue),
                    })
                })
                .collect();
            ranked.sort_by(|a, b| b.total_sold.cmp(&a.total_sold).then(a.id.cmp(&b.id)));
            ranked.truncate(limit.max(0) as usize);
            ranked
        })
    }

    async fn recent_orders(&self, limit: i64) -> StoreResult<Vec<OrderSummary>> {
        self.query(QueryKind::RecentOrders, |d| {
            let mut orders: Vec<&OrderRecord> = d.orders.iter().collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            orders
                .into_iter()
                .take(limit.max(0) as usize)
                .map(|o| {
                    let user = o
                        .user_id
                        .and_then(|id| d.users.iter().find(|u| u.id == id));
                    OrderSummary {
                        id: o.id,
                        customer_name: user
                            .map(|u| u.name.clone())
                            .unwrap_or_else(|| ANONYMOUS_CUSTOMER.to_string()),
                        customer_email: user.map(|u| u.email.clone()),
                        total_amount: o.total_amount,
                        status: o.status.clone(),
                        created_at: o.created_at,
                    }
                })
                .collect()
        })
    }

    async fn sales_by_day(&self, since: DateTime<Utc>) -> StoreResult<Vec<DaySales>> {
        self.query(QueryKind::SalesByDay, |d| {
            let mut days: Vec<DaySales> = Vec::new();
            let mut orders: Vec<&OrderRecord> = d.orders_since(since).collect();
            orders.sort_by_key(|o| o.created_at);
            for order in orders {
                let date = order.created_at.date_naive();
                let revenue = if order.status == COMPLETED_STATUS {
                    order.total_amount
                } else {
                    0.0
                };
                match days.last_mut() {
                    Some(day) if day.date == date => {
                        day.orders += 1;
                        day.revenue += revenue;
                    }
                    _ => days.push(DaySales {
                        date,
                        orders: 1,
                        revenue,
                    }),
                }
            }
            for day in &mut days {
                day.revenue = round_currency(day.revenue);
            }
            days
        })
    }

    async fn new_customers(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        self.query(QueryKind::NewCustomers, |d| {
            let mut first_order: HashMap<i32, DateTime<Utc>> = HashMap::new();
            for order in &d.orders {
                if let Some(user_id) = order.user_id {
                    first_order
                        .entry(user_id)
                        .and_modify(|at| *at = (*at).min(order.created_at))
                        .or_insert(order.created_at);
                }
            }
            first_order.values().filter(|at| **at >= since).count() as i64
        })
    }

    async fn returning_customers(&self, since: DateTime<Utc>) -> StoreResult<i64> {
        self.query(QueryKind::ReturningCustomers, |d| {
            let before: HashSet<i32> = d
                .orders
                .iter()
                .filter(|o| o.created_at < since)
                .filter_map(|o| o.user_id)
                .collect();
            d.orders_since(since)
                .filter_map(|o| o.user_id)
                .filter(|id| before.contains(id))
                .collect::<HashSet<_>>()
                .len() as i64
        })
    }

    async fn customer_spend(&self, since: DateTime<Utc>) -> StoreResult<Vec<f64>> {
        self.query(QueryKind::CustomerSpend, |d| {
            d.spend_by_customer(since)
                .into_values()
                .map(|(spent, _)| spent)
                .collect()
        })
    }

    async fn top_customers(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<TopCustomer>> {
        self.query(QueryKind::TopCustomers, |d| {
            let spend = d.spend_by_customer(since);
            let mut ranked: Vec<TopCustomer> = d
                .users
                .iter()
                .filter_map(|u| {
                    spend.get(&u.id).map(|(spent, orders)| TopCustomer {
                        id: u.id,
                        name: u.name.clone(),
                        email: u.email.clone(),
                        total_orders: *orders,
                        total_spent: round_currency(*spent),
                    })
                })
                .collect();
            ranked.sort_by(|a, b| {
                b.total_spent
                    .total_cmp(&a.total_spent)
                    .then(a.id.cmp(&b.id))
            });
            ranked.truncate(limit.max(0) as usize);
            ranked
        })
    }

    async fn low_stock_products(&self, threshold: i32) -> StoreResult<Vec<LowStockProduct>> {
        self.query(QueryKind::LowStockProducts, |d| {
            let mut low: Vec<LowStockProduct> = d
                .active_products()
                .filter(|p| p.stock <= threshold)
                .map(|p| LowStockProduct {
                    id: p.id,
                    name: p.name.clone(),
                    stock: p.stock,
                    price: p.price,
                })
                .collect();
            low.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.id.cmp(&b.id)));
            low
        })
    }

    async fn product_categories(&self, since: DateTime<Utc>) -> StoreResult<Vec<CategorySales>> {
        self.query(QueryKind::ProductCategories, |d| {
            let sales = d.product_sales(since);
            let mut by_category: HashMap<&str, CategorySales> = HashMap::new();
            for product in d.active_products() {
                let entry = by_category
                    .entry(product.category.as_str())
                    .or_insert_with(|| CategorySales {
                        category: product.category.clone(),
                        product_count: 0,
                        total_sold: 0,
                        total_revenue: 0.0,
                    });
                entry.product_count += 1;
                if let Some((sold, revenue, _)) = sales.get(&product.id) {
                    entry.total_sold += sold;
                    entry.total_revenue += revenue;
                }
            }
            let mut categories: Vec<CategorySales> = by_category
                .into_values()
                .map(|mut c| {
                    c.total_revenue = round_currency(c.total_revenue);
                    c
                })
                .collect();
            categories.sort_by(|a, b| {
                b.total_revenue
                    .total_cmp(&a.total_revenue)
                    .then_with(|| a.category.cmp(&b.category))
            });
            categories
        })
    }

    async fn product_performance(
        &self,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<ProductPerformance>> {
        self.query(QueryKind::ProductPerformance, |d| {
            let sales = d.product_sales(since);
            let mut rows: Vec<ProductPerformance> = d
                .active_products()
                .map(|p| {
                    let (sold, revenue, orders) = sales
                        .get(&p.id)
                        .map(|(s, r, o)| (*s, *r, o.len() as i64))
                        .unwrap_or((0, 0.0, 0));
                    ProductPerformance {
                        id: p.id,
                        name: p.name.clone(),
                        price: p.price,
                        stock: p.stock,
                        total_sold: sold,
                        total_revenue: round_currency(revenue),
                        order_count: orders,
                    }
                })
                .collect();
            rows.sort_by(|a, b| {
                b.total_revenue
                    .total_cmp(&a.total_revenue)
                    .then(a.id.cmp(&b.id))
            });
            rows
        })
    }
}
