//! Product catalog HTTP handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use shared::{MessageResponse, Product, ProductImage};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::services::product::{
    CreateProductInput, ImageUpload, ProductListQuery, ProductService, UpdateProductInput,
};
use crate::AppState;

fn product_service(state: &AppState) -> ProductService {
    ProductService::new(state.db.clone()).with_storage(state.storage.clone())
}

/// Body limit overruns surface as 413, anything else as a bad request
fn multipart_error(err: MultipartError, context: &str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        AppError::bad_request(format!("{}: {}", context, err))
    }
}

/// Collect every multipart part named `field` as an image upload
async fn read_uploads(mut multipart: Multipart, field: &str) -> AppResult<Vec<ImageUpload>> {
    let mut uploads = Vec::new();

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Invalid multipart body"))?
    {
        if part.name() != Some(field) {
            continue;
        }
        let content_type = part.content_type().map(str::to_string);
        let bytes = part
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read uploaded file"))?;

        uploads.push(ImageUpload {
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(uploads)
}

/// List products (public)
pub async fn list_products(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ProductListQuery>, AppError>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(product_service(&state).list_products(query).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<Product>> {
    Ok(Json(product_service(&state).get_product(product_id).await?))
}

pub async fn list_product_images(
    State(state): State<AppState>,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<Vec<ProductImage>>> {
    Ok(Json(product_service(&state).get_gallery(product_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Json(input), _): WithRejection<Json<CreateProductInput>, AppError>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = product_service(&state).create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateProductInput>, AppError>,
) -> AppResult<Json<Product>> {
    Ok(Json(product_service(&state).update_product(product_id, input).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    product_service(&state).delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the hero image (multipart field `file`)
pub async fn upload_hero_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
    multipart: Multipart,
) -> AppResult<Json<Product>> {
    let upload = read_uploads(multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::validation("file", "An image file is required"))?;

    Ok(Json(product_service(&state).set_hero_image(product_id, upload).await?))
}

/// Append gallery images (multipart field `files`, repeated)
pub async fn upload_gallery_images(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
    multipart: Multipart,
) -> AppResult<Json<Vec<ProductImage>>> {
    let uploads = read_uploads(multipart, "files").await?;
    Ok(Json(product_service(&state).add_gallery_images(product_id, uploads).await?))
}

pub async fn delete_gallery_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path((product_id, image_id)), _): WithRejection<Path<(Uuid, Uuid)>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    product_service(&state)
        .remove_gallery_image(product_id, image_id)
        .await?;
    Ok(Json(MessageResponse::new("Gallery image deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::DefaultBodyLimit,
        http::{header, Request},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "amoura-boundary";

    async fn count_files(multipart: Multipart) -> AppResult<Json<usize>> {
        Ok(Json(read_uploads(multipart, "file").await?.len()))
    }

    fn upload_router(limit: usize) -> Router {
        Router::new()
            .route("/upload", post(count_files))
            .layer(DefaultBodyLimit::max(limit))
    }

    fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"cake.png\"\r\nContent-Type: image/png\r\n\r\n",
            b = BOUNDARY,
            f = field
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post_upload(limit: usize, body: Vec<u8>) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let response = upload_router(limit).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_oversized_upload_is_payload_too_large() {
        let (status, body) = post_upload(1024, multipart_body("file", &[0u8; 4096])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_uploads_filtered_by_field_name() {
        let (status, body) = post_upload(64 * 1024, multipart_body("file", &[1u8; 16])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"1");

        let (status, body) = post_upload(64 * 1024, multipart_body("other", &[1u8; 16])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"0");
    }
}
