//! Shopping cart models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cart entry. A user holds at most one entry per product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Product price at the moment the item was added
    pub snapshot_price: Decimal,
    pub product_name: Option<String>,
    pub product_hero_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.snapshot_price * Decimal::from(self.quantity)
    }
}

/// Cart entry as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub line_total: Decimal,
}

/// Full cart with totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub total_quantity: i64,
    pub total_price: Decimal,
}

impl CartSummary {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_quantity: 0,
            total_price: Decimal::ZERO,
        }
    }

    /// Build a summary, computing each line total and the cart totals
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut total_quantity = 0i64;
        let mut total_price = Decimal::ZERO;

        let items = items
            .into_iter()
            .map(|item| {
                let line_total = item.line_total();
                total_quantity += i64::from(item.quantity);
                total_price += line_total;
                CartLine { item, line_total }
            })
            .collect();

        Self {
            items,
            total_quantity,
            total_price,
        }
    }
}
