//! Mock cloud client for testing.
//!
//! This module provides a configurable stand-in for the cloud verdict
//! service so the engine can be exercised without network access.

use crate::cloud::client::{CloudVerdict, CloudVerdictClient};
use crate::core::error::{CloudError, CloudErrorKind};
use crate::core::FileHasher;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// A mock cloud client.
///
/// Responses can be keyed by MD5 digest of the submitted file; anything
/// else gets the default verdict. The client can also be told to fail
/// with any of the three failure kinds, or to stall.
///
/// # Examples
///
/// ```rust
/// use scanward::cloud::{CloudVerdict, MockCloudClient};
/// use std::time::Duration;
///
/// // Reports every file clean.
/// let client = MockCloudClient::new_clean();
///
/// // Reports every file infected.
/// let client = MockCloudClient::new_infected(["Trojan.Generic"]);
///
/// // Answers slowly.
/// let client = MockCloudClient::new_clean().with_latency(Duration::from_millis(50));
/// ```
#[derive(Debug)]
pub struct MockCloudClient {
    name: String,
    responses: RwLock<HashMap<String, CloudVerdict>>,
    default_verdict: CloudVerdict,
    latency: Option<Duration>,
    failure: RwLock<Option<CloudErrorKind>>,
    submit_count: AtomicU64,
}

impl MockCloudClient {
    /// Creates a mock that reports every file clean.
    pub fn new() -> Self {
        Self {
            name: "mock-cloud".to_string(),
            responses: RwLock::new(HashMap::new()),
            default_verdict: CloudVerdict::clean(),
            latency: None,
            failure: RwLock::new(None),
            submit_count: AtomicU64::new(0),
        }
    }

    /// Alias of [`new`](Self::new).
    pub fn new_clean() -> Self {
        Self::new()
    }

    /// Creates a mock that reports every file infected.
    pub fn new_infected<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_verdict: CloudVerdict::infected(labels),
            ..Self::new()
        }
    }

    /// Creates a mock whose every submission fails with `kind`.
    pub fn new_failing(kind: CloudErrorKind) -> Self {
        let client = Self::new();
        client.set_failure(Some(kind));
        client
    }

    /// Sets the service name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a verdict for files with the given MD5 digest.
    pub fn with_response(self, md5: impl Into<String>, verdict: CloudVerdict) -> Self {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(md5.into(), verdict);
        self
    }

    /// Sets the simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every later submission fail with `kind`, or succeed again on `None`.
    pub fn set_failure(&self, kind: Option<CloudErrorKind>) {
        *self
            .failure
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = kind;
    }

    /// Number of submissions received.
    pub fn submit_count(&self) -> u64 {
        self.submit_count.load(Ordering::Relaxed)
    }
}

impl Default for MockCloudClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudVerdictClient for MockCloudClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, path: &Path) -> Result<CloudVerdict, CloudError> {
        self.submit_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = *self
            .failure
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match failure {
            Some(CloudErrorKind::Authentication) => {
                return Err(CloudError::authentication(&self.name, "invalid api key"))
            }
            Some(CloudErrorKind::Network) => {
                return Err(CloudError::network(&self.name, "connection refused"))
            }
            Some(CloudErrorKind::Timeout) => {
                return Err(CloudError::timeout(
                    &self.name,
                    self.latency.unwrap_or_default(),
                ))
            }
            None => {}
        }

        let hash = FileHasher::new()
            .hash_file(path)
            .map_err(|e| CloudError::network(&self.name, format!("upload failed: {e}")))?;

        let verdict = self
            .responses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&hash.md5)
            .cloned()
            .unwrap_or_else(|| self.default_verdict.clone());
        Ok(verdict)
    }
}
