//! Supabase Storage client
//!
//! Talks to the Storage REST API with the service role key. Objects live in a
//! single public bucket and are referenced by their public URL.

use reqwest::{header, Client};
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::error::{AppError, AppResult};

/// Storage API client bound to one bucket
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_role_key: String,
    bucket: String,
}

impl StorageClient {
    /// Create a client, or `None` when no service role key is configured
    pub fn from_config(config: &SupabaseConfig) -> Option<Self> {
        let service_role_key = config.service_role_key.clone()?;
        Some(Self::with_base_url(
            config.url.clone(),
            config.key.clone(),
            service_role_key,
            config.storage_bucket.clone(),
        ))
    }

    /// Create a client against an explicit project URL (for testing)
    pub fn with_base_url(
        base_url: String,
        api_key: String,
        service_role_key: String,
        bucket: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            service_role_key,
            bucket,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload bytes to `path`, overwriting any existing object, and return
    /// the object's public URL
    pub async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.service_role_key)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("upload failed: {} - {}", status, body)));
        }

        tracing::debug!(path, "Uploaded object to storage");
        Ok(self.public_url(path))
    }

    /// Delete the object at `path`
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);

        let response = self
            .client
            .delete(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.service_role_key)
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("delete failed: {} - {}", status, body)));
        }

        tracing::debug!(path, "Deleted object from storage");
        Ok(())
    }

    /// Delete the object behind a public URL. URLs outside this bucket are ignored.
    pub async fn delete_public_url(&self, url: &str) -> AppResult<()> {
        match extract_path_from_public_url(url, &self.bucket) {
            Some(path) => self.delete(path).await,
            None => Ok(()),
        }
    }

    /// Like `delete_public_url`, logging failures instead of returning them
    pub async fn delete_public_url_best_effort(&self, url: &str) {
        if let Err(e) = self.delete_public_url(url).await {
            tracing::warn!(url, "Failed to delete stored object: {}", e);
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

/// Object path inside `bucket` for one of its public URLs
pub fn extract_path_from_public_url<'a>(url: &'a str, bucket: &str) -> Option<&'a str> {
    let marker = format!("/storage/v1/object/public/{}/", bucket);
    let idx = url.find(&marker)?;
    let path = &url[idx + marker.len()..];
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Random object name with the given extension (`{uuid}.{ext}`)
pub fn generate_filename(ext: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), ext)
}
