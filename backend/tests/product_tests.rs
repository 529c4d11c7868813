//! Product catalog tests
//!
//! Slug generation and image upload checks.

use amoura_backend::error::AppError;
use amoura_backend::external::storage::{extract_path_from_public_url, generate_filename};
use amoura_backend::services::product::{base_slug, ImageUpload};
use proptest::prelude::*;
use shared::{
    gallery_image_path, hero_image_path, slug_candidate, slugify, validate_image, ImageError, MAX_IMAGE_BYTES,
    PRODUCT_SLUG_MAX_LEN,
};
use uuid::Uuid;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_slugify_examples() {
        assert_eq!(slugify("  Strawberry Shortcake! "), "strawberry-shortcake");
        assert_eq!(slugify("Matcha -- Mille  Crêpe"), "matcha-mille-cr-pe");
        assert_eq!(slugify("!!!"), "product");
    }

    #[test]
    fn test_slug_candidates() {
        assert_eq!(slug_candidate("opera-cake", 1), "opera-cake");
        assert_eq!(slug_candidate("opera-cake", 2), "opera-cake-2");
        assert_eq!(slug_candidate("opera-cake", 3), "opera-cake-3");
    }

    #[test]
    fn test_base_slug_prefers_explicit_slug() {
        assert_eq!(base_slug("Black Forest", Some("Forest Classic")).unwrap(), "forest-classic");
        assert_eq!(base_slug("Black Forest", None).unwrap(), "black-forest");
        assert!(base_slug("Black Forest", Some("   ")).is_err());
    }

    #[test]
    fn test_image_types() {
        assert_eq!(validate_image("image/jpeg", 10), Ok("jpg"));
        assert_eq!(validate_image("image/png", 10), Ok("png"));
        assert_eq!(validate_image("image/webp", 10), Ok("webp"));
        assert_eq!(validate_image("image/gif", 10), Err(ImageError::UnsupportedType));
        assert_eq!(validate_image("image/png", MAX_IMAGE_BYTES + 1), Err(ImageError::TooLarge));
    }

    #[test]
    fn test_upload_errors_map_to_status() {
        let missing = ImageUpload {
            content_type: None,
            bytes: vec![0; 4],
        };
        assert!(matches!(missing.extension(), Err(AppError::BadRequest(_))));

        let too_big = ImageUpload {
            content_type: Some("image/jpeg".into()),
            bytes: vec![0; MAX_IMAGE_BYTES + 1],
        };
        let err = too_big.extension().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_storage_paths() {
        let id = Uuid::nil();
        assert_eq!(
            hero_image_path(id, "png"),
            "products/00000000-0000-0000-0000-000000000000/hero.png"
        );
        let file = generate_filename("webp");
        assert!(file.ends_with(".webp"));
        assert!(gallery_image_path(id, &file).contains("/gallery/"));
    }

    #[test]
    fn test_public_url_path_extraction() {
        let url = "https://x.supabase.co/storage/v1/object/public/assets/products/1/hero.png";
        assert_eq!(extract_path_from_public_url(url, "assets"), Some("products/1/hero.png"));
        assert_eq!(extract_path_from_public_url("https://cdn.example.com/a.png", "assets"), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Slugs only contain [a-z0-9-] with no leading, trailing or doubled dashes
        #[test]
        fn prop_slug_charset(raw in "\\PC{0,80}") {
            let slug = slugify(&raw);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        /// Slugifying a slug changes nothing
        #[test]
        fn prop_slugify_idempotent(raw in "[A-Za-z0-9 _.!-]{0,60}") {
            let once = slugify(&raw);
            prop_assert_eq!(slugify(&once), once);
        }

        /// Base slugs leave room for a uniqueness suffix
        #[test]
        fn prop_base_slug_fits_column(name in "[a-z ]{1,400}", attempt in 1u32..10_000) {
            let base = base_slug(&name, None).unwrap();
            prop_assert!(slug_candidate(&base, attempt).len() <= PRODUCT_SLUG_MAX_LEN);
        }

        /// Uploads under the limit with a known type are accepted
        #[test]
        fn prop_known_types_under_limit(size in 0usize..=MAX_IMAGE_BYTES, idx in 0usize..3) {
            let content_type = ["image/jpeg", "image/png", "image/webp"][idx];
            prop_assert!(validate_image(content_type, size).is_ok());
        }
    }
}
