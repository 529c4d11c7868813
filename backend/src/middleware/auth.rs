//! Authentication extractors
//!
//! Callers authenticate with a Supabase access token in the `Authorization:
//! Bearer` header. Requests without one are served as guests; handlers pick
//! the guard they need by naming the matching extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::User;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::UserService;
use crate::AppState;

/// Claims read from a Supabase access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub exp: Option<i64>,
}

/// Identity carried by a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub email: String,
}

/// Verify signature and expiry and pull the identity out of a token.
/// The audience is not checked. A token without `exp` never expires.
pub fn decode_access_token(token: &str, secret: &str, alg: Algorithm) -> Result<TokenIdentity, AppError> {
    let mut validation = Validation::new(alg);
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected access token: {}", e);
            AppError::unauthorized("Invalid or expired token")
        })?;

    let (sub, email) = match (claims.sub, claims.email) {
        (Some(sub), Some(email)) if !sub.is_empty() && !email.is_empty() => (sub, email),
        _ => return Err(AppError::unauthorized("Token missing sub/email")),
    };

    let user_id = Uuid::parse_str(&sub).map_err(|_| AppError::unauthorized("Invalid sub in token"))?;

    Ok(TokenIdentity { user_id, email })
}

/// The caller's profile, or `None` for guests
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<User>);

/// Any authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authenticated caller with the `admin` role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// Authenticated caller with the `user` (customer) role
#[derive(Debug, Clone)]
pub struct CustomerUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A missing or non-Bearer header means guest
        let bearer = match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => bearer,
            Err(_) => return Ok(OptionalUser(None)),
        };

        let supabase = &state.config.supabase;
        let identity = decode_access_token(bearer.token(), &supabase.jwt_secret, supabase.algorithm())?;

        let user = UserService::new(state.db.clone())
            .get_or_provision(identity.user_id, &identity.email)
            .await?;

        Ok(OptionalUser(Some(user)))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let OptionalUser(user) = OptionalUser::from_request_parts(parts, state).await?;
        user.map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_customer() {
            return Err(AppError::forbidden("Customer access required"));
        }
        Ok(CustomerUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "super-secret-jwt-token";

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn future_exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_valid_token_decodes() {
        let id = Uuid::new_v4();
        let jwt = token(
            serde_json::json!({
                "sub": id.to_string(),
                "email": "linh@example.com",
                "aud": "authenticated",
                "exp": future_exp(),
            }),
            SECRET,
        );

        let identity = decode_access_token(&jwt, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.email, "linh@example.com");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = token(
            serde_json::json!({ "sub": Uuid::new_v4().to_string(), "email": "a@b.co", "exp": future_exp() }),
            "other-secret",
        );
        let err = decode_access_token(&jwt, SECRET, Algorithm::HS256).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid or expired token"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = token(
            serde_json::json!({
                "sub": Uuid::new_v4().to_string(),
                "email": "a@b.co",
                "exp": chrono::Utc::now().timestamp() - 3600,
            }),
            SECRET,
        );
        assert!(decode_access_token(&jwt, SECRET, Algorithm::HS256).is_err());
    }

    #[test]
    fn test_token_without_exp_accepted() {
        let id = Uuid::new_v4();
        let jwt = token(serde_json::json!({ "sub": id.to_string(), "email": "a@b.co" }), SECRET);

        let identity = decode_access_token(&jwt, SECRET, Algorithm::HS256).unwrap();
        assert_eq!(identity.user_id, id);
    }

    #[test]
    fn test_missing_email_rejected() {
        let jwt = token(
            serde_json::json!({ "sub": Uuid::new_v4().to_string(), "exp": future_exp() }),
            SECRET,
        );
        let err = decode_access_token(&jwt, SECRET, Algorithm::HS256).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Token missing sub/email"));
    }

    #[test]
    fn test_non_uuid_sub_rejected() {
        let jwt = token(
            serde_json::json!({ "sub": "user-42", "email": "a@b.co", "exp": future_exp() }),
            SECRET,
        );
        let err = decode_access_token(&jwt, SECRET, Algorithm::HS256).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Invalid sub in token"));
    }
}
