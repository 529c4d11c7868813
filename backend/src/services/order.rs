//! Order service
//!
//! Checkout turns a customer's cart into an order inside one transaction:
//! products are locked, every line is validated, stock is deducted and the
//! cart is cleared. Admins then move orders through the status lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    normalize_optional, normalize_required, validate_delivery_timing, CartItem, DeliveryWindow, Order,
    OrderDetail, OrderItem, OrderStatus, OrderTotals, Pagination,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult, CartLineIssue};
use crate::external::EmailClient;
use crate::services::cart::{CartItemRow, CART_COLUMNS};
use crate::services::UserService;

/// Order service for checkout and fulfilment
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    email: Option<EmailClient>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    receiver_name: Option<String>,
    phone_number: String,
    note: Option<String>,
    full_address: String,
    province: String,
    ward: String,
    delivery_date: NaiveDate,
    delivery_window: String,
    status: String,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            receiver_name: row.receiver_name,
            phone_number: row.phone_number,
            note: row.note,
            full_address: row.full_address,
            province: row.province,
            ward: row.ward,
            delivery_date: row.delivery_date,
            delivery_window: row.delivery_window.parse().map_err(AppError::Internal)?,
            status: row.status.parse().map_err(AppError::Internal)?,
            total_amount: row.total_amount,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
    product_name: Option<String>,
    product_hero_image_url: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            product_name: row.product_name,
            product_hero_image_url: row.product_hero_image_url,
        }
    }
}

/// Locked product state used to validate a checkout
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockRow {
    pub id: Uuid,
    pub name: String,
    pub stock_on_hand: i32,
    pub is_active: bool,
    pub hero_image_url: Option<String>,
}

const ORDER_COLUMNS: &str = "id, user_id, receiver_name, phone_number, note, full_address, province, \
     ward, delivery_date, delivery_window, status, total_amount, created_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price, product_name, product_hero_image_url";

/// Checkout payload: where and when to deliver
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutInput {
    pub receiver_name: Option<String>,
    pub phone_number: String,
    pub full_address: String,
    pub province: String,
    pub ward: String,
    pub delivery_date: NaiveDate,
    pub delivery_window: DeliveryWindow,
    pub note: Option<String>,
}

/// Checkout payload after trimming
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryDetails {
    pub receiver_name: Option<String>,
    pub phone_number: String,
    pub full_address: String,
    pub province: String,
    pub ward: String,
    pub delivery_date: NaiveDate,
    pub delivery_window: DeliveryWindow,
    pub note: Option<String>,
}

impl CheckoutInput {
    /// Trim text fields, reject blank required ones and check delivery timing
    pub fn normalize(self, now: NaiveDateTime) -> AppResult<DeliveryDetails> {
        let required = |field: &str, value: &str| {
            normalize_required(value).map_err(|e| AppError::validation(field, e))
        };

        let details = DeliveryDetails {
            phone_number: required("phone_number", &self.phone_number)?,
            full_address: required("full_address", &self.full_address)?,
            province: required("province", &self.province)?,
            ward: required("ward", &self.ward)?,
            receiver_name: normalize_optional(self.receiver_name),
            note: normalize_optional(self.note),
            delivery_date: self.delivery_date,
            delivery_window: self.delivery_window,
        };

        validate_delivery_timing(details.delivery_date, details.delivery_window, now)?;
        Ok(details)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
}

/// Check every cart line against the locked product rows.
/// All problems are reported, not just the first.
pub fn validate_cart_lines(items: &[CartItem], products: &HashMap<Uuid, StockRow>) -> Vec<CartLineIssue> {
    let mut issues = Vec::new();

    for item in items {
        let reason = match products.get(&item.product_id) {
            None => Some("Product not found".to_string()),
            Some(p) if !p.is_active => Some("Product is inactive".to_string()),
            Some(p) if item.quantity > p.stock_on_hand => Some(format!(
                "Insufficient stock (have {}, requested {})",
                p.stock_on_hand, item.quantity
            )),
            Some(_) if item.snapshot_price <= Decimal::ZERO => Some("Invalid price in cart".to_string()),
            Some(_) => None,
        };

        if let Some(reason) = reason {
            issues.push(CartLineIssue {
                product_id: item.product_id,
                reason,
            });
        }
    }

    issues
}

/// Check a status change. Same status is allowed as a no-op.
pub fn check_transition(current: OrderStatus, next: OrderStatus) -> AppResult<()> {
    if current == next || current.can_transition_to(next) {
        return Ok(());
    }
    Err(AppError::InvalidStateTransition(format!(
        "Invalid status transition: {} -> {}",
        current, next
    )))
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db, email: None }
    }

    pub fn with_email(mut self, email: Option<EmailClient>) -> Self {
        self.email = email;
        self
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    /// Convert the customer's cart into a pending order
    pub async fn checkout(&self, user_id: Uuid, input: CheckoutInput) -> AppResult<OrderDetail> {
        let details = input.normalize(chrono::Local::now().naive_local())?;

        let mut tx = self.db.begin().await?;

        let cart: Vec<CartItem> = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY created_at, id FOR UPDATE",
            CART_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(CartItem::from)
        .collect();

        if cart.is_empty() {
            return Err(AppError::bad_request("Cart is empty"));
        }

        let product_ids: Vec<Uuid> = cart.iter().map(|item| item.product_id).collect();
        let products: HashMap<Uuid, StockRow> = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, name, stock_on_hand, is_active, hero_image_url
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

        let issues = validate_cart_lines(&cart, &products);
        if !issues.is_empty() {
            return Err(AppError::CartValidation { items: issues });
        }

        let totals = OrderTotals::compute(cart.iter().map(|item| (item.quantity, item.snapshot_price)));
        if totals.subtotal <= Decimal::ZERO {
            return Err(AppError::bad_request("Total order amount must be positive"));
        }

        let order: Order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (user_id, receiver_name, phone_number, note, full_address, province,
                                ward, delivery_date, delivery_window, status, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(&details.receiver_name)
        .bind(&details.phone_number)
        .bind(&details.note)
        .bind(&details.full_address)
        .bind(&details.province)
        .bind(&details.ward)
        .bind(details.delivery_date)
        .bind(details.delivery_window.as_str())
        .bind(OrderStatus::Pending.as_str())
        .bind(totals.total_amount)
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        let mut items = Vec::with_capacity(cart.len());
        for line in &cart {
            let product = products.get(&line.product_id);
            // Prefer the cart snapshot, fall back to the live product
            let name = line
                .product_name
                .clone()
                .or_else(|| product.map(|p| p.name.clone()));
            let hero = line
                .product_hero_image_url
                .clone()
                .or_else(|| product.and_then(|p| p.hero_image_url.clone()));

            let row = sqlx::query_as::<_, OrderItemRow>(&format!(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price, product_name, product_hero_image_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                ORDER_ITEM_COLUMNS
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.snapshot_price)
            .bind(name)
            .bind(hero)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(row));

            deduct_stock(&mut tx, line.product_id, line.quantity).await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            %user_id,
            total = %order.total_amount,
            "Order placed"
        );

        Ok(OrderDetail::new(order, items))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_items(&self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn with_items(&self, order: Order) -> AppResult<OrderDetail> {
        let items = self.list_items(order.id).await?;
        Ok(OrderDetail::new(order, items))
    }

    /// A customer's own orders, newest first
    pub async fn list_user_orders(&self, user_id: Uuid, page: Pagination) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// One of the customer's orders. Other customers' orders look missing.
    pub async fn get_user_order(&self, user_id: Uuid, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = self
            .find_order(order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or_else(|| AppError::not_found("Order not found"))?;

        self.with_items(order).await
    }

    pub async fn list_all_orders(&self, page: Pagination) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders ORDER BY created_at DESC OFFSET $1 LIMIT $2",
            ORDER_COLUMNS
        ))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = self
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))?;

        self.with_items(order).await
    }

    // ========================================================================
    // Fulfilment
    // ========================================================================

    /// Move an order along its lifecycle
    pub async fn update_status(&self, order_id: Uuid, input: UpdateStatusInput) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        let order: Order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?
        .try_into()?;

        let current = order.status;
        let next = input.status;
        check_transition(current, next)?;

        if current == next {
            return Ok(order);
        }

        let updated: Order = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        tx.commit().await?;

        tracing::info!(%order_id, from = %current, to = %next, "Order status changed");

        if next == OrderStatus::Confirmed {
            self.notify_confirmed(updated.clone());
        }

        Ok(updated)
    }

    /// Email the customer in the background. Failures are only logged.
    fn notify_confirmed(&self, order: Order) {
        let Some(email) = self.email.clone() else {
            tracing::debug!(order_id = %order.id, "SMTP not configured, skipping confirmation email");
            return;
        };
        let service = self.clone();

        tokio::spawn(async move {
            let order_id = order.id;
            if let Err(e) = service.send_confirmation(&email, order).await {
                tracing::warn!(%order_id, "Failed to send order confirmation: {}", e);
            }
        });
    }

    async fn send_confirmation(&self, email: &EmailClient, order: Order) -> AppResult<()> {
        let customer = UserService::new(self.db.clone()).get_user(order.user_id).await?;
        let detail = self.with_items(order).await?;
        email
            .send_order_confirmation(&customer.email, &customer.name, &detail)
            .await
    }
}

/// Decrement stock, refusing to go below zero
async fn deduct_stock(tx: &mut Transaction<'_, Postgres>, product_id: Uuid, quantity: i32) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE products SET stock_on_hand = stock_on_hand - $2 WHERE id = $1 AND stock_on_hand >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Internal("Internal stock calculation error".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn cart_item(product_id: Uuid, quantity: i32, price: Decimal) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id,
            quantity,
            snapshot_price: price,
            product_name: Some("Cake".into()),
            product_hero_image_url: None,
            created_at: Utc::now(),
        }
    }

    fn stock(id: Uuid, stock_on_hand: i32, is_active: bool) -> StockRow {
        StockRow {
            id,
            name: "Cake".into(),
            stock_on_hand,
            is_active,
            hero_image_url: None,
        }
    }

    fn checkout_input(date: NaiveDate, window: DeliveryWindow) -> CheckoutInput {
        CheckoutInput {
            receiver_name: Some("   ".into()),
            phone_number: " 0901234567 ".into(),
            full_address: "12 Tran Hung Dao".into(),
            province: "Ho Chi Minh".into(),
            ward: "Ben Thanh".into(),
            delivery_date: date,
            delivery_window: window,
            note: Some(" Leave at the door ".into()),
        }
    }

    #[test]
    fn test_all_cart_issues_reported() {
        let ok = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let inactive = Uuid::new_v4();
        let short = Uuid::new_v4();

        let products: HashMap<Uuid, StockRow> = [
            (ok, stock(ok, 10, true)),
            (inactive, stock(inactive, 10, false)),
            (short, stock(short, 1, true)),
        ]
        .into_iter()
        .collect();

        let items = vec![
            cart_item(ok, 2, Decimal::new(50000, 0)),
            cart_item(missing, 1, Decimal::new(50000, 0)),
            cart_item(inactive, 1, Decimal::new(50000, 0)),
            cart_item(short, 3, Decimal::new(50000, 0)),
        ];

        let issues = validate_cart_lines(&items, &products);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].product_id, missing);
        assert_eq!(issues[0].reason, "Product not found");
        assert_eq!(issues[1].reason, "Product is inactive");
        assert_eq!(issues[2].reason, "Insufficient stock (have 1, requested 3)");
    }

    #[test]
    fn test_zero_price_line_rejected() {
        let id = Uuid::new_v4();
        let products: HashMap<Uuid, StockRow> = [(id, stock(id, 5, true))].into_iter().collect();
        let issues = validate_cart_lines(&[cart_item(id, 1, Decimal::ZERO)], &products);
        assert_eq!(issues[0].reason, "Invalid price in cart");
    }

    #[test]
    fn test_transition_rules() {
        use OrderStatus::*;
        assert!(check_transition(Pending, Pending).is_ok());
        assert!(check_transition(Pending, Confirmed).is_ok());
        assert!(check_transition(Confirmed, Shipped).is_ok());

        let err = check_transition(Shipped, Pending).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(ref m) if m == "Invalid status transition: shipped -> pending"));
        assert!(check_transition(Canceled, Confirmed).is_err());
    }

    #[test]
    fn test_checkout_input_normalized() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let now = today.and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());

        let details = checkout_input(today, DeliveryWindow::Afternoon).normalize(now).unwrap();
        assert_eq!(details.phone_number, "0901234567");
        assert_eq!(details.receiver_name, None);
        assert_eq!(details.note.as_deref(), Some("Leave at the door"));
    }

    #[test]
    fn test_checkout_input_rejects_blank_and_bad_timing() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let now = today.and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap());

        let mut input = checkout_input(today, DeliveryWindow::Evening);
        input.ward = "  ".into();
        assert!(matches!(input.normalize(now), Err(AppError::Validation { ref field, .. }) if field == "ward"));

        let input = checkout_input(today, DeliveryWindow::Custom);
        assert!(input.normalize(now).is_err());
    }
}
