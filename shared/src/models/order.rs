//! Order models, pricing and the order status lifecycle

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tax applied on top of the cart subtotal (8%)
pub fn tax_rate() -> Decimal {
    Decimal::new(8, 2)
}

/// Tax owed on a subtotal, rounded to cents half away from zero
pub fn tax_amount(subtotal: Decimal) -> Decimal {
    (subtotal * tax_rate()).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Requested delivery slot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryWindow {
    Morning,
    Afternoon,
    Evening,
    Custom,
}

impl DeliveryWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryWindow::Morning => "morning",
            DeliveryWindow::Afternoon => "afternoon",
            DeliveryWindow::Evening => "evening",
            DeliveryWindow::Custom => "custom",
        }
    }

    /// Canonical start of the window. `Custom` has none.
    pub fn start_time(&self) -> Option<NaiveTime> {
        match self {
            DeliveryWindow::Morning => NaiveTime::from_hms_opt(9, 0, 0),
            DeliveryWindow::Afternoon => NaiveTime::from_hms_opt(14, 0, 0),
            DeliveryWindow::Evening => NaiveTime::from_hms_opt(19, 0, 0),
            DeliveryWindow::Custom => None,
        }
    }
}

impl std::str::FromStr for DeliveryWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(DeliveryWindow::Morning),
            "afternoon" => Ok(DeliveryWindow::Afternoon),
            "evening" => Ok(DeliveryWindow::Evening),
            "custom" => Ok(DeliveryWindow::Custom),
            other => Err(format!("unknown delivery window '{}'", other)),
        }
    }
}

/// Order lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Canceled => "canceled",
        }
    }

    /// States reachable from this one in a single step
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Canceled],
            OrderStatus::Confirmed => &[OrderStatus::Shipped, OrderStatus::Canceled],
            OrderStatus::Shipped | OrderStatus::Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order (without its line items)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub receiver_name: Option<String>,
    pub phone_number: String,
    pub note: Option<String>,
    pub full_address: String,
    pub province: String,
    pub ward: String,
    pub delivery_date: NaiveDate,
    pub delivery_window: DeliveryWindow,
    pub status: OrderStatus,
    /// Final amount including tax
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A line item inside an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Pre-tax unit price at checkout time
    pub unit_price: Decimal,
    pub product_name: Option<String>,
    pub product_hero_image_url: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order line as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub line_total: Decimal,
}

/// Full order view with items, subtotal and tax
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
}

impl OrderDetail {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        let mut subtotal = Decimal::ZERO;
        let items = items
            .into_iter()
            .map(|item| {
                let line_total = item.line_total();
                subtotal += line_total;
                OrderLine { item, line_total }
            })
            .collect();

        Self {
            order,
            items,
            subtotal,
            tax_amount: tax_amount(subtotal),
        }
    }
}

/// Subtotal, tax and total of a prospective order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    /// Compute totals from (quantity, unit price) pairs
    pub fn compute<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (i32, Decimal)>,
    {
        let subtotal: Decimal = lines
            .into_iter()
            .map(|(quantity, unit_price)| unit_price * Decimal::from(quantity))
            .sum();
        let tax_amount = tax_amount(subtotal);

        Self {
            subtotal,
            tax_amount,
            total_amount: subtotal + tax_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_tax_is_eight_percent() {
        assert_eq!(tax_amount(dec("100000")), dec("8000.00"));
        assert_eq!(tax_amount(dec("12.50")), dec("1.00"));
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.0625 * 0.08 = 0.005
        assert_eq!(tax_amount(dec("0.0625")), dec("0.01"));
    }

    #[test]
    fn test_totals_compute() {
        let totals = OrderTotals::compute(vec![(2, dec("150000")), (1, dec("50000"))]);
        assert_eq!(totals.subtotal, dec("350000"));
        assert_eq!(totals.tax_amount, dec("28000.00"));
        assert_eq!(totals.total_amount, dec("378000.00"));
    }

    #[test]
    fn test_status_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Canceled));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Canceled));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(Shipped.is_terminal());
        assert!(Canceled.is_terminal());
    }

    #[test]
    fn test_window_start_times() {
        assert_eq!(DeliveryWindow::Morning.start_time(), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(DeliveryWindow::Afternoon.start_time(), NaiveTime::from_hms_opt(14, 0, 0));
        assert_eq!(DeliveryWindow::Evening.start_time(), NaiveTime::from_hms_opt(19, 0, 0));
        assert_eq!(DeliveryWindow::Custom.start_time(), None);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_value(OrderStatus::Canceled).unwrap(), "canceled");
        assert_eq!(serde_json::to_value(DeliveryWindow::Afternoon).unwrap(), "afternoon");
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }
}
