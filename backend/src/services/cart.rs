//! Shopping cart service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{CartItem, CartSummary, Product};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ProductService;

/// Cart service for customer carts
#[derive(Clone)]
pub struct CartService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CartItemRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub snapshot_price: Decimal,
    pub product_name: Option<String>,
    pub product_hero_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            snapshot_price: row.snapshot_price,
            product_name: row.product_name,
            product_hero_image_url: row.product_hero_image_url,
            created_at: row.created_at,
        }
    }
}

pub(crate) const CART_COLUMNS: &str =
    "id, user_id, product_id, quantity, snapshot_price, product_name, product_hero_image_url, created_at";

/// Input for adding a product to the cart
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AddCartItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be greater than 0"))]
    pub quantity: i32,
}

/// Input for changing an item's quantity
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCartItemInput {
    #[validate(range(min = 1, message = "quantity must be greater than 0"))]
    pub quantity: i32,
}

/// Product must exist and be on sale to go into a cart
fn ensure_active(product: Product) -> AppResult<Product> {
    if !product.is_active {
        return Err(AppError::bad_request("Product is inactive"));
    }
    Ok(product)
}

/// Quantity after adding `added` to an existing line, bounded by stock
fn merged_quantity(existing: i32, added: i32, stock_on_hand: i32) -> AppResult<i32> {
    existing
        .checked_add(added)
        .filter(|quantity| *quantity <= stock_on_hand)
        .ok_or_else(|| AppError::bad_request("Not enough stock to increase quantity"))
}

impl CartService {
    /// Create a new CartService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn list_items(&self, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY created_at, id",
            CART_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn find_item(&self, user_id: Uuid, product_id: Uuid) -> AppResult<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {} FROM cart_items WHERE user_id = $1 AND product_id = $2",
            CART_COLUMNS
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(CartItem::from))
    }

    /// Items with line totals plus cart totals
    pub async fn get_summary(&self, user_id: Uuid) -> AppResult<CartSummary> {
        Ok(CartSummary::from_items(self.list_items(user_id).await?))
    }

    /// Add a product or increase its quantity
    pub async fn add_item(&self, user_id: Uuid, input: AddCartItemInput) -> AppResult<CartSummary> {
        input.validate()?;

        let product = ProductService::new(self.db.clone())
            .get_product(input.product_id)
            .await
            .and_then(ensure_active)?;

        if input.quantity > product.stock_on_hand {
            return Err(AppError::bad_request("Not enough stock available"));
        }

        match self.find_item(user_id, product.id).await? {
            Some(existing) => {
                let new_quantity = merged_quantity(existing.quantity, input.quantity, product.stock_on_hand)?;

                sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
                    .bind(existing.id)
                    .bind(new_quantity)
                    .execute(&self.db)
                    .await?;
            }
            None => {
                // Price, name and image are frozen at add time
                sqlx::query(
                    r#"
                    INSERT INTO cart_items
                        (user_id, product_id, quantity, snapshot_price, product_name, product_hero_image_url)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (user_id, product_id)
                    DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
                    "#,
                )
                .bind(user_id)
                .bind(product.id)
                .bind(input.quantity)
                .bind(product.price)
                .bind(&product.name)
                .bind(&product.hero_image_url)
                .execute(&self.db)
                .await?;
            }
        }

        self.get_summary(user_id).await
    }

    /// Set the quantity of an item already in the cart
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateCartItemInput,
    ) -> AppResult<CartSummary> {
        input.validate()?;

        let product = ProductService::new(self.db.clone())
            .get_product(product_id)
            .await
            .and_then(ensure_active)?;

        let item = self
            .find_item(user_id, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item not in cart"))?;

        if input.quantity > product.stock_on_hand {
            return Err(AppError::bad_request("Not enough stock available"));
        }

        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item.id)
            .bind(input.quantity)
            .execute(&self.db)
            .await?;

        self.get_summary(user_id).await
    }

    pub async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> AppResult<CartSummary> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Item not found in cart"));
        }

        self.get_summary(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> AppResult<CartSummary> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(CartSummary::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_must_be_positive() {
        let input = AddCartItemInput {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        assert!(input.validate().is_err());
        assert!(UpdateCartItemInput { quantity: 3 }.validate().is_ok());
        assert!(UpdateCartItemInput { quantity: -1 }.validate().is_err());
    }

    #[test]
    fn test_inactive_product_rejected() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Opera".into(),
            slug: "opera".into(),
            description: None,
            price: Decimal::new(95000, 0),
            stock_on_hand: 4,
            is_active: false,
            hero_image_url: None,
            category: "cake".into(),
            created_at: Utc::now(),
        };
        let err = ensure_active(product).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Product is inactive"));
    }

    #[test]
    fn test_merged_quantity_bounded_by_stock() {
        assert_eq!(merged_quantity(2, 3, 5).unwrap(), 5);
        assert!(merged_quantity(2, 4, 5).is_err());
    }

    #[test]
    fn test_merged_quantity_overflow_is_bad_request() {
        let err = merged_quantity(i32::MAX, 1, i32::MAX).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Not enough stock to increase quantity"));
    }
}
