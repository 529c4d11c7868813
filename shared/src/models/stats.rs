//! Admin dashboard statistics

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderStatus;

/// Revenue for one day of the requested month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_revenue: Decimal,
    pub order_count: i64,
}

/// Best-selling product by quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestOrderSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub receiver_name: Option<String>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

/// Full payload for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminDashboardStats {
    pub total_customers: i64,
    pub total_orders: i64,
    /// Sum over all non-canceled orders
    pub total_revenue: Decimal,
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
    pub latest_orders: Vec<LatestOrderSummary>,
}
