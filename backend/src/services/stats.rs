//! Admin dashboard statistics

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{AdminDashboardStats, DailySales, LatestOrderSummary, TopProduct};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const TOP_PRODUCTS: i64 = 5;
const LATEST_ORDERS: i64 = 5;

/// Stats service for aggregated read-only queries
#[derive(Clone)]
pub struct StatsService {
    db: PgPool,
}

/// Month to report daily sales for. Defaults to the current one.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl StatsQuery {
    /// Resolve the requested (year, month), filling gaps from `today`
    pub fn period(&self, today: NaiveDate) -> AppResult<(i32, u32)> {
        let year = self.year.unwrap_or_else(|| today.year());
        let month = self.month.unwrap_or_else(|| today.month());

        if !(1..=12).contains(&month) {
            return Err(AppError::validation("month", "month must be between 1 and 12"));
        }
        Ok((year, month))
    }
}

#[derive(sqlx::FromRow)]
struct DailySalesRow {
    day: NaiveDate,
    revenue: Decimal,
    order_count: i64,
}

#[derive(sqlx::FromRow)]
struct TopProductRow {
    product_id: Uuid,
    name: String,
    total_quantity: i64,
    total_revenue: Decimal,
}

#[derive(sqlx::FromRow)]
struct LatestOrderRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    receiver_name: Option<String>,
    total_amount: Decimal,
    status: String,
}

impl StatsService {
    /// Create a new StatsService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self, query: StatsQuery) -> AppResult<AdminDashboardStats> {
        let (year, month) = query.period(Utc::now().date_naive())?;

        let total_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'user'")
            .fetch_one(&self.db)
            .await?;

        let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.db)
            .await?;

        let total_revenue: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status <> 'canceled'",
        )
        .fetch_one(&self.db)
        .await?;

        let daily_sales = self.daily_sales(year, month).await?;
        let top_products = self.top_products().await?;
        let latest_orders = self.latest_orders().await?;

        Ok(AdminDashboardStats {
            total_customers,
            total_orders,
            total_revenue,
            daily_sales,
            top_products,
            latest_orders,
        })
    }

    /// Revenue per day of one month, canceled orders excluded
    async fn daily_sales(&self, year: i32, month: u32) -> AppResult<Vec<DailySales>> {
        let rows = sqlx::query_as::<_, DailySalesRow>(
            r#"
            SELECT date_trunc('day', created_at)::date AS day,
                   COALESCE(SUM(total_amount), 0) AS revenue,
                   COUNT(id) AS order_count
            FROM orders
            WHERE status <> 'canceled'
              AND EXTRACT(YEAR FROM created_at) = $1
              AND EXTRACT(MONTH FROM created_at) = $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(year)
        .bind(month as i32)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DailySales {
                date: r.day,
                total_revenue: r.revenue,
                order_count: r.order_count,
            })
            .collect())
    }

    /// Best sellers by quantity across non-canceled orders
    async fn top_products(&self) -> AppResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT oi.product_id,
                   p.name,
                   COALESCE(SUM(oi.quantity), 0)::BIGINT AS total_quantity,
                   COALESCE(SUM(oi.quantity * oi.unit_price), 0) AS total_revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            JOIN products p ON p.id = oi.product_id
            WHERE o.status <> 'canceled'
            GROUP BY oi.product_id, p.name
            ORDER BY total_quantity DESC
            LIMIT $1
            "#,
        )
        .bind(TOP_PRODUCTS)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TopProduct {
                product_id: r.product_id,
                name: r.name,
                total_quantity: r.total_quantity,
                total_revenue: r.total_revenue,
            })
            .collect())
    }

    async fn latest_orders(&self) -> AppResult<Vec<LatestOrderSummary>> {
        let rows = sqlx::query_as::<_, LatestOrderRow>(
            r#"
            SELECT id, created_at, user_id, receiver_name, total_amount, status
            FROM orders
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(LATEST_ORDERS)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(LatestOrderSummary {
                    id: r.id,
                    created_at: r.created_at,
                    user_id: r.user_id,
                    receiver_name: r.receiver_name,
                    total_amount: r.total_amount,
                    status: r.status.parse().map_err(AppError::Internal)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    #[test]
    fn test_period_defaults_to_current_month() {
        assert_eq!(StatsQuery::default().period(today()).unwrap(), (2025, 6));

        let query = StatsQuery {
            year: Some(2024),
            month: None,
        };
        assert_eq!(query.period(today()).unwrap(), (2024, 6));
    }

    #[test]
    fn test_period_rejects_bad_month() {
        for month in [0, 13] {
            let query = StatsQuery {
                year: None,
                month: Some(month),
            };
            let err = query.period(today()).unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
        let query = StatsQuery {
            year: None,
            month: Some(12),
        };
        assert!(query.period(today()).is_ok());
    }
}
