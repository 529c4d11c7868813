//! Validation rules for the Amoura storefront
//!
//! Pure functions shared by the HTTP layer and tests: text normalisation,
//! slugs, image uploads and delivery scheduling.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::DeliveryWindow;

// ============================================================================
// Text
// ============================================================================

/// Trim a required text field. Blank input is rejected.
pub fn normalize_required(value: &str) -> Result<String, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("field cannot be empty");
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field. Blank input becomes `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Check a trimmed value's length in characters
pub fn validate_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("must be at least {} characters", min));
    }
    if len > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(())
}

// ============================================================================
// Slugs
// ============================================================================

/// Turn arbitrary text into a URL slug.
///
/// Lowercases, replaces every run of characters outside `[a-z0-9]` with a
/// single `-` and strips `-` from both ends. Empty results become `product`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}

/// Candidate slug for the given attempt: `base`, `base-2`, `base-3`, ...
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

// ============================================================================
// Images
// ============================================================================

/// Largest accepted image upload (5 MiB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Unsupported image type. Allowed: JPEG, PNG, WEBP.")]
    UnsupportedType,

    #[error("Image too large (max 5MB).")]
    TooLarge,
}

/// File extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Validate an upload and return the extension to store it under
pub fn validate_image(content_type: &str, size: usize) -> Result<&'static str, ImageError> {
    let ext = image_extension(content_type).ok_or(ImageError::UnsupportedType)?;
    if size > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge);
    }
    Ok(ext)
}

// ============================================================================
// Delivery scheduling
// ============================================================================

/// Minimum lead time between now and a same-day delivery window
pub const MIN_LEAD_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Delivery date cannot be in the past")]
    DateInPast,

    #[error("Custom same-day delivery is not allowed. Choose a later date or a predefined window.")]
    CustomSameDay,

    #[error("Delivery must be at least 30 minutes from now for the selected time window.")]
    TooSoon,
}

/// Check a requested delivery slot against the current local time.
///
/// Any later date is fine. Same-day deliveries need a predefined window whose
/// start is at least `MIN_LEAD_MINUTES` away.
pub fn validate_delivery_timing(
    delivery_date: NaiveDate,
    window: DeliveryWindow,
    now: NaiveDateTime,
) -> Result<(), DeliveryError> {
    let today = now.date();

    if delivery_date < today {
        return Err(DeliveryError::DateInPast);
    }
    if delivery_date > today {
        return Ok(());
    }

    let start = window.start_time().ok_or(DeliveryError::CustomSameDay)?;
    let delivery_at = delivery_date.and_time(start);

    if delivery_at < now + Duration::minutes(MIN_LEAD_MINUTES) {
        return Err(DeliveryError::TooSoon);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========================================================================
    // Text
    // ========================================================================

    #[test]
    fn test_normalize_required() {
        assert_eq!(normalize_required("  12 Tran Hung Dao ").unwrap(), "12 Tran Hung Dao");
        assert!(normalize_required("   ").is_err());
        assert!(normalize_required("").is_err());
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some(" Ring twice ".into())), Some("Ring twice".into()));
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn test_validate_length_counts_characters() {
        assert!(validate_length("Bánh", 3, 100).is_ok());
        assert!(validate_length("ab", 3, 100).is_err());
        assert!(validate_length(&"x".repeat(101), 3, 100).is_err());
    }

    // ========================================================================
    // Slugs
    // ========================================================================

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Strawberry Shortcake"), "strawberry-shortcake");
        assert_eq!(slugify("  Tiramisu -- Classic!! "), "tiramisu-classic");
        assert_eq!(slugify("Cake #1 (Large)"), "cake-1-large");
    }

    #[test]
    fn test_slugify_empty_falls_back() {
        assert_eq!(slugify(""), "product");
        assert_eq!(slugify("!!!"), "product");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Bánh mì"), "b-nh-m");
    }

    #[test]
    fn test_slug_candidates() {
        assert_eq!(slug_candidate("opera", 1), "opera");
        assert_eq!(slug_candidate("opera", 2), "opera-2");
        assert_eq!(slug_candidate("opera", 7), "opera-7");
    }

    // ========================================================================
    // Images
    // ========================================================================

    #[test]
    fn test_validate_image_accepts_known_types() {
        assert_eq!(validate_image("image/jpeg", 1024), Ok("jpg"));
        assert_eq!(validate_image("image/png", 1024), Ok("png"));
        assert_eq!(validate_image("image/webp", MAX_IMAGE_BYTES), Ok("webp"));
    }

    #[test]
    fn test_validate_image_rejects() {
        assert_eq!(validate_image("image/gif", 10), Err(ImageError::UnsupportedType));
        assert_eq!(
            validate_image("image/png", MAX_IMAGE_BYTES + 1),
            Err(ImageError::TooLarge)
        );
    }

    // ========================================================================
    // Delivery scheduling
    // ========================================================================

    #[test]
    fn test_delivery_in_past_rejected() {
        let now = at(day(2025, 3, 10), 8, 0);
        assert_eq!(
            validate_delivery_timing(day(2025, 3, 9), DeliveryWindow::Evening, now),
            Err(DeliveryError::DateInPast)
        );
    }

    #[test]
    fn test_delivery_future_date_always_ok() {
        let now = at(day(2025, 3, 10), 23, 50);
        assert!(validate_delivery_timing(day(2025, 3, 11), DeliveryWindow::Custom, now).is_ok());
        assert!(validate_delivery_timing(day(2025, 3, 11), DeliveryWindow::Morning, now).is_ok());
    }

    #[test]
    fn test_same_day_custom_rejected() {
        let now = at(day(2025, 3, 10), 6, 0);
        assert_eq!(
            validate_delivery_timing(day(2025, 3, 10), DeliveryWindow::Custom, now),
            Err(DeliveryError::CustomSameDay)
        );
    }

    #[test]
    fn test_same_day_lead_time() {
        let today = day(2025, 3, 10);
        // 13:30 is exactly 30 minutes before the afternoon window
        assert!(validate_delivery_timing(today, DeliveryWindow::Afternoon, at(today, 13, 30)).is_ok());
        assert_eq!(
            validate_delivery_timing(today, DeliveryWindow::Afternoon, at(today, 13, 31)),
            Err(DeliveryError::TooSoon)
        );
        assert_eq!(
            validate_delivery_timing(today, DeliveryWindow::Morning, at(today, 10, 0)),
            Err(DeliveryError::TooSoon)
        );
        assert!(validate_delivery_timing(today, DeliveryWindow::Evening, at(today, 10, 0)).is_ok());
    }
}
