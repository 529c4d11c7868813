//! Product catalog service
//!
//! Slug generation, catalog CRUD and the product image workflow (hero image
//! plus an ordered gallery) backed by Supabase Storage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    gallery_image_path, hero_image_path, normalize_optional, normalize_required, slug_candidate,
    slugify, validate_image, validate_length, Pagination, Product, ProductImage,
    PRODUCT_CATEGORY_MAX_LEN, PRODUCT_NAME_MAX_LEN, PRODUCT_NAME_MIN_LEN, PRODUCT_SLUG_MAX_LEN,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_constraint_error, AppError, AppResult};
use crate::external::{storage::generate_filename, StorageClient};

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    storage: Option<StorageClient>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    price: Decimal,
    stock_on_hand: i32,
    is_active: bool,
    hero_image_url: Option<String>,
    category: String,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            stock_on_hand: row.stock_on_hand,
            is_active: row.is_active,
            hero_image_url: row.hero_image_url,
            category: row.category,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductImageRow {
    id: Uuid,
    product_id: Uuid,
    image_url: String,
    sort_order: i32,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        ProductImage {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
            sort_order: row.sort_order,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, slug, description, price, stock_on_hand, is_active, hero_image_url, category, created_at";

/// Query parameters for the catalog listing
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProductListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub only_active: Option<bool>,
}

impl ProductListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProductInput {
    pub name: String,
    /// Generated from `name` when omitted
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_on_hand: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub category: String,
}

fn default_true() -> bool {
    true
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_on_hand: Option<i32>,
    pub is_active: Option<bool>,
    /// Manual override of the stored hero image URL
    pub hero_image_url: Option<String>,
    pub category: Option<String>,
}

/// An uploaded image file
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size, returning the extension to store under
    pub fn extension(&self) -> AppResult<&'static str> {
        let content_type = self
            .content_type
            .as_deref()
            .ok_or_else(|| AppError::bad_request("Missing content type for uploaded file"))?;
        Ok(validate_image(content_type, self.bytes.len())?)
    }
}

fn normalize_name(raw: &str) -> AppResult<String> {
    let name = normalize_required(raw).map_err(|_| AppError::validation("name", "name cannot be empty"))?;
    validate_length(&name, PRODUCT_NAME_MIN_LEN, PRODUCT_NAME_MAX_LEN)
        .map_err(|e| AppError::validation("name", format!("name {}", e)))?;
    Ok(name)
}

fn normalize_category(raw: &str) -> AppResult<String> {
    let category =
        normalize_required(raw).map_err(|_| AppError::validation("category", "category cannot be empty"))?;
    validate_length(&category, 1, PRODUCT_CATEGORY_MAX_LEN)
        .map_err(|e| AppError::validation("category", format!("category {}", e)))?;
    Ok(category)
}

/// Slugify client input, capped so a `-N` suffix still fits the column
fn normalize_slug_input(raw: &str) -> AppResult<String> {
    let slug = normalize_required(raw).map_err(|_| AppError::validation("slug", "slug cannot be empty"))?;
    Ok(truncate_slug(&slugify(&slug)))
}

fn truncate_slug(slug: &str) -> String {
    slug.chars().take(PRODUCT_SLUG_MAX_LEN - 8).collect()
}

fn check_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::validation("price", "price must be greater than 0"));
    }
    Ok(())
}

fn check_stock(stock: i32) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::validation("stock_on_hand", "stock_on_hand must be 0 or more"));
    }
    Ok(())
}

/// Base slug for a new product: the explicit slug if given, else the name
pub fn base_slug(name: &str, slug: Option<&str>) -> AppResult<String> {
    let slug = match slug {
        Some(raw) => normalize_slug_input(raw)?,
        None => truncate_slug(&slugify(name)),
    };
    Ok(slug)
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db, storage: None }
    }

    pub fn with_storage(mut self, storage: Option<StorageClient>) -> Self {
        self.storage = storage;
        self
    }

    fn storage(&self) -> AppResult<&StorageClient> {
        self.storage
            .as_ref()
            .ok_or_else(|| AppError::Configuration("Missing SUPABASE_SERVICE_ROLE_KEY".to_string()))
    }

    /// First free slug among `base`, `base-2`, `base-3`, ...
    async fn unique_slug(&self, base: &str, exclude: Option<Uuid>) -> AppResult<String> {
        let mut attempt = 1u32;
        loop {
            let candidate = slug_candidate(base, attempt);
            let taken: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
            )
            .bind(&candidate)
            .bind(exclude)
            .fetch_one(&self.db)
            .await?;

            if !taken {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub async fn list_products(&self, query: ProductListQuery) -> AppResult<Vec<Product>> {
        let page = query.pagination();
        let only_active = query.only_active.unwrap_or(true);

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE ($1 = FALSE OR is_active = TRUE)
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(only_active)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::not_found("Product not found"))
    }

    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        let name = normalize_name(&input.name)?;
        let category = normalize_category(&input.category)?;
        check_price(input.price)?;
        check_stock(input.stock_on_hand)?;

        let base = base_slug(&name, input.slug.as_deref())?;
        let slug = self.unique_slug(&base, None).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, slug, description, price, stock_on_hand, is_active, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&name)
        .bind(&slug)
        .bind(normalize_optional(input.description))
        .bind(input.price)
        .bind(input.stock_on_hand)
        .bind(input.is_active)
        .bind(&category)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, "slug", "Product could not be created"))?;

        tracing::info!(product_id = %row.id, slug = %row.slug, "Product created");
        Ok(row.into())
    }

    pub async fn update_product(&self, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        let mut product = self.get_product(product_id).await?;

        if let Some(name) = &input.name {
            product.name = normalize_name(name)?;
        }
        if let Some(raw) = &input.slug {
            let base = normalize_slug_input(raw)?;
            if base != product.slug {
                product.slug = self.unique_slug(&base, Some(product_id)).await?;
            }
        }
        if input.description.is_some() {
            product.description = normalize_optional(input.description);
        }
        if let Some(price) = input.price {
            check_price(price)?;
            product.price = price;
        }
        if let Some(stock) = input.stock_on_hand {
            check_stock(stock)?;
            product.stock_on_hand = stock;
        }
        if let Some(is_active) = input.is_active {
            product.is_active = is_active;
        }
        if input.hero_image_url.is_some() {
            product.hero_image_url = normalize_optional(input.hero_image_url);
        }
        if let Some(category) = &input.category {
            product.category = normalize_category(category)?;
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $2, slug = $3, description = $4, price = $5, stock_on_hand = $6,
                is_active = $7, hero_image_url = $8, category = $9
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_on_hand)
        .bind(product.is_active)
        .bind(&product.hero_image_url)
        .bind(&product.category)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_constraint_error(e, "slug", "Product could not be updated"))?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

        Ok(row.into())
    }

    /// Delete a product with its gallery rows, then clean up stored files
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let product = self.get_product(product_id).await?;
        let images = self.list_images(product_id).await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_constraint_error(e, "id", "Product has orders and cannot be deleted"))?;

        tx.commit().await?;

        if let Some(storage) = &self.storage {
            if let Some(url) = &product.hero_image_url {
                storage.delete_public_url_best_effort(url).await;
            }
            for image in &images {
                storage.delete_public_url_best_effort(&image.image_url).await;
            }
        } else if product.hero_image_url.is_some() || !images.is_empty() {
            tracing::warn!(%product_id, "Storage is not configured; product files were left behind");
        }

        tracing::info!(%product_id, "Product deleted");
        Ok(())
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Upload or replace the hero image
    pub async fn set_hero_image(&self, product_id: Uuid, upload: ImageUpload) -> AppResult<Product> {
        let product = self.get_product(product_id).await?;
        let ext = upload.extension()?;
        let content_type = upload.content_type.unwrap_or_default();
        let storage = self.storage()?;

        let url = storage
            .upload(&hero_image_path(product.id, ext), upload.bytes, &content_type)
            .await?;

        // Same path means the upload already overwrote the old file
        if let Some(old) = &product.hero_image_url {
            if old != &url {
                storage.delete_public_url_best_effort(old).await;
            }
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET hero_image_url = $2 WHERE id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(&url)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

        Ok(row.into())
    }

    /// Gallery images ordered by `sort_order`
    pub async fn list_images(&self, product_id: Uuid) -> AppResult<Vec<ProductImage>> {
        let rows = sqlx::query_as::<_, ProductImageRow>(
            r#"
            SELECT id, product_id, image_url, sort_order
            FROM product_images
            WHERE product_id = $1
            ORDER BY sort_order, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    /// Public gallery listing, 404 for unknown products
    pub async fn get_gallery(&self, product_id: Uuid) -> AppResult<Vec<ProductImage>> {
        self.get_product(product_id).await?;
        self.list_images(product_id).await
    }

    /// Append images to the gallery. Every file is checked before any upload.
    pub async fn add_gallery_images(
        &self,
        product_id: Uuid,
        uploads: Vec<ImageUpload>,
    ) -> AppResult<Vec<ProductImage>> {
        if uploads.is_empty() {
            return Err(AppError::bad_request("No files uploaded"));
        }

        let product = self.get_product(product_id).await?;
        let extensions = uploads
            .iter()
            .map(ImageUpload::extension)
            .collect::<AppResult<Vec<_>>>()?;
        let storage = self.storage()?;

        let mut next_order: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM product_images WHERE product_id = $1",
        )
        .bind(product.id)
        .fetch_one(&self.db)
        .await?;

        let mut created = Vec::with_capacity(uploads.len());
        for (upload, ext) in uploads.into_iter().zip(extensions) {
            let content_type = upload.content_type.unwrap_or_default();
            let path = gallery_image_path(product.id, &generate_filename(ext));
            let url = storage.upload(&path, upload.bytes, &content_type).await?;

            let row = sqlx::query_as::<_, ProductImageRow>(
                r#"
                INSERT INTO product_images (product_id, image_url, sort_order)
                VALUES ($1, $2, $3)
                RETURNING id, product_id, image_url, sort_order
                "#,
            )
            .bind(product.id)
            .bind(&url)
            .bind(next_order)
            .fetch_one(&self.db)
            .await?;

            next_order += 1;
            created.push(ProductImage::from(row));
        }

        tracing::info!(%product_id, count = created.len(), "Gallery images added");
        Ok(created)
    }

    /// Remove one gallery image belonging to `product_id`
    pub async fn remove_gallery_image(&self, product_id: Uuid, image_id: Uuid) -> AppResult<()> {
        let image = sqlx::query_as::<_, ProductImageRow>(
            "SELECT id, product_id, image_url, sort_order FROM product_images WHERE id = $1",
        )
        .bind(image_id)
        .fetch_optional(&self.db)
        .await?
        .filter(|image| image.product_id == product_id)
        .ok_or_else(|| AppError::not_found("Image not found for this product"))?;

        sqlx::query("DELETE FROM product_images WHERE id = $1")
            .bind(image.id)
            .execute(&self.db)
            .await?;

        if let Some(storage) = &self.storage {
            storage.delete_public_url_best_effort(&image.image_url).await;
        }

        Ok(())
    }
}
