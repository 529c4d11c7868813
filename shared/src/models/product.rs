//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PRODUCT_NAME_MIN_LEN: usize = 3;
pub const PRODUCT_NAME_MAX_LEN: usize = 100;
pub const PRODUCT_SLUG_MAX_LEN: usize = 255;
pub const PRODUCT_CATEGORY_MAX_LEN: usize = 50;

/// A cake or other item sold on the storefront
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// URL-friendly unique identifier
    pub slug: String,
    pub description: Option<String>,
    /// Pre-tax unit price
    pub price: Decimal,
    pub stock_on_hand: i32,
    /// Inactive products are hidden from the storefront and cannot be bought
    pub is_active: bool,
    pub hero_image_url: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Additional gallery image for a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    /// Position within the gallery, starting at 0
    pub sort_order: i32,
}

/// Storage path of a product's hero image
pub fn hero_image_path(product_id: Uuid, ext: &str) -> String {
    format!("products/{}/hero.{}", product_id, ext)
}

/// Storage path of a gallery image
pub fn gallery_image_path(product_id: Uuid, filename: &str) -> String {
    format!("products/{}/gallery/{}", product_id, filename)
}
