//! Database connection helpers

use std::{str::FromStr, time::Duration};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Normalise a PostgreSQL connection URL.
///
/// Accepts `postgres://`, `postgresql://` and driver-qualified forms such as
/// `postgresql+asyncpg://`, which are rewritten to `postgresql://`. TLS is
/// required unless the URL already sets `sslmode`.
pub fn normalize_database_url(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("must not be empty".to_string());
    }

    let (scheme, rest) = raw
        .split_once("://")
        .ok_or_else(|| "expected a postgresql:// URL".to_string())?;

    let scheme = match scheme.split_once('+') {
        Some(("postgresql", _)) => "postgresql",
        None if scheme == "postgres" || scheme == "postgresql" => scheme,
        _ => return Err(format!("unsupported scheme '{}'", scheme)),
    };

    if rest.is_empty() {
        return Err("missing host".to_string());
    }

    let query = rest.split_once('?').map(|(_, query)| query);
    let has_sslmode = query
        .map(|q| q.split('&').any(|pair| pair.starts_with("sslmode=")))
        .unwrap_or(false);

    let mut url = format!("{}://{}", scheme, rest);
    if !has_sslmode {
        url.push(if query.is_some() { '&' } else { '?' });
        url.push_str("sslmode=require");
    }

    PgConnectOptions::from_str(&url).map_err(|e| e.to_string())?;
    Ok(url)
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
}

/// Open the pool and verify the database is reachable
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(&config.url)?;
    pool_options(config).connect_with(options).await
}

/// Pool that connects on first use
pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(&config.url)?;
    Ok(pool_options(config).connect_lazy_with(options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_qualified_scheme_is_rewritten() {
        let url = normalize_database_url("postgresql+asyncpg://u:p@localhost:5432/app").unwrap();
        assert_eq!(url, "postgresql://u:p@localhost:5432/app?sslmode=require");
    }

    #[test]
    fn test_plain_schemes_accepted() {
        assert!(normalize_database_url("postgres://u:p@localhost/app").is_ok());
        assert!(normalize_database_url("postgresql://u:p@localhost/app").is_ok());
    }

    #[test]
    fn test_existing_query_and_sslmode_kept() {
        let url = normalize_database_url("postgresql://u@h/app?application_name=amoura").unwrap();
        assert_eq!(url, "postgresql://u@h/app?application_name=amoura&sslmode=require");

        let url = normalize_database_url("postgresql://u@h/app?sslmode=disable").unwrap();
        assert_eq!(url, "postgresql://u@h/app?sslmode=disable");

        let url = normalize_database_url("postgresql://u@h/app?application_name=amoura&sslmode=prefer").unwrap();
        assert_eq!(url, "postgresql://u@h/app?application_name=amoura&sslmode=prefer");
    }

    #[test]
    fn test_sslmode_outside_query_ignored() {
        let url = normalize_database_url("postgresql://u:sslmode=x@h/app").unwrap();
        assert_eq!(url, "postgresql://u:sslmode=x@h/app?sslmode=require");

        let url = normalize_database_url("postgresql://u@h/app?application_name=nosslmode=1").unwrap();
        assert_eq!(url, "postgresql://u@h/app?application_name=nosslmode=1&sslmode=require");
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(normalize_database_url("").is_err());
        assert!(normalize_database_url("localhost:5432").is_err());
        assert!(normalize_database_url("mysql://u@h/app").is_err());
        assert!(normalize_database_url("postgresql://").is_err());
        assert!(normalize_database_url("sqlite+aiosqlite://file.db").is_err());
    }
}
