use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ArtifactTarget;

/// Destination for run-log JSON documents. Paths are `/`-separated and
/// relative to the store root.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put_json(&self, path: &str, body: Vec<u8>) -> anyhow::Result<()>;
}

pub fn build_artifact_store(target: ArtifactTarget, http: Client) -> Arc<dyn ArtifactStore> {
    match target {
        ArtifactTarget::LocalDir(root) => Arc::new(LocalArtifactStore::new(root)),
        ArtifactTarget::Bucket {
            storage_url,
            service_key,
            bucket,
        } => Arc::new(BucketArtifactStore::new(http, storage_url, service_key, bucket)),
    }
}

// ---------------------------------------------------------------------------
// Object storage bucket (Supabase storage REST API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BucketArtifactStore {
    http: Client,
    storage_url: String,
    service_key: String,
    bucket: String,
}

impl BucketArtifactStore {
    pub fn new(http: Client, storage_url: String, service_key: String, bucket: String) -> Self {
        Self {
            http,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.storage_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ArtifactStore for BucketArtifactStore {
    async fn put_json(&self, path: &str, body: Vec<u8>) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("content-type", "application/json")
            .header("x-upsert", "true")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("storage upload returned {status}: {text}");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put_json(&self, path: &str, body: Vec<u8>) -> anyhow::Result<()> {
        if path.split('/').any(|part| part == "..") {
            anyhow::bail!("refusing artifact path outside store root: {path}");
        }

        let full = self.root.join(path.trim_start_matches('/'));
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, body).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory (tests, dry runs)
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: bool,
}

impl MemoryArtifactStore {
    /// A store that rejects every write.
    pub fn failing() -> Self {
        Self {
            objects: Mutex::default(),
            fail_writes: true,
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_json(&self, path: &str) -> Option<serde_json::Value> {
        let objects = self.objects.lock().ok()?;
        let body = objects.get(path)?;
        serde_json::from_slice(body).ok()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put_json(&self, path: &str, body: Vec<u8>) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("artifact store unavailable");
        }
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("artifact store lock poisoned"))?
            .insert(path.to_string(), body);
        Ok(())
    }
}
