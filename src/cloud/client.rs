//! The cloud verdict client trait.

use crate::core::error::CloudError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A verdict returned by the cloud service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudVerdict {
    /// Whether the service considers the file infected.
    pub infected: bool,
    /// Threat labels, most relevant first.
    pub labels: Vec<String>,
}

impl CloudVerdict {
    /// A clean verdict.
    pub fn clean() -> Self {
        Self::default()
    }

    /// An infected verdict with the given labels.
    pub fn infected<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            infected: true,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// The first label, if any.
    pub fn first_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// The external cloud verdict service, as consumed by the engine.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; submissions run on the async runtime.
/// - A submission may be slow. The orchestrator bounds every call with its
///   own timeout, so implementations need not, but they may.
/// - Every failure must be one of the three [`CloudError`] kinds. The engine
///   never reads a failure as "clean".
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanward::cloud::{CloudVerdict, CloudVerdictClient};
/// use scanward::core::CloudError;
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct MyService;
///
/// #[async_trait]
/// impl CloudVerdictClient for MyService {
///     fn name(&self) -> &str {
///         "my-service"
///     }
///
///     async fn submit(&self, path: &Path) -> Result<CloudVerdict, CloudError> {
///         // Upload the file and wait for the verdict...
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait CloudVerdictClient: Send + Sync + Debug {
    /// Stable, human-readable name of the service.
    fn name(&self) -> &str;

    /// Submits the file at `path` and returns the service's verdict.
    async fn submit(&self, path: &Path) -> Result<CloudVerdict, CloudError>;
}

/// A shared cloud client.
pub type ArcCloudClient = Arc<dyn CloudVerdictClient>;

/// Submits `path` with an upper bound on the wait.
///
/// An elapsed bound is reported as [`CloudError::Timeout`].
pub async fn submit_with_timeout(
    client: &dyn CloudVerdictClient,
    path: &Path,
    limit: Duration,
) -> Result<CloudVerdict, CloudError> {
    let start = Instant::now();
    match tokio::time::timeout(limit, client.submit(path)).await {
        Ok(result) => result,
        Err(_) => Err(CloudError::timeout(client.name(), start.elapsed())),
    }
}
