//! Combines signature and cloud results into one verdict per file.
//!
//! ## Precedence
//!
//! - A file is infected if either detector says so.
//! - The signature label wins when both detectors flag the file.
//! - A cloud-only detection uses the first cloud label, or `Unknown`.
//! - A cloud failure of any kind leaves the signature result standing alone,
//!   with `method = signature`. It never turns into "clean" on its own.

use crate::cloud::CloudVerdict;
use crate::core::error::CloudError;
use crate::core::{DetectionMethod, ScanVerdict};

use std::path::PathBuf;

/// Label used when the cloud flags a file without naming the threat.
pub const UNKNOWN_THREAT: &str = "Unknown";

/// Outcome of the signature lookup for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureResult {
    /// Label of the matching signature, if any.
    pub matched: Option<String>,
}

impl SignatureResult {
    /// A signature hit.
    pub fn hit(label: impl Into<String>) -> Self {
        Self {
            matched: Some(label.into()),
        }
    }

    /// No signature matched.
    pub fn miss() -> Self {
        Self::default()
    }

    /// Returns `true` on a hit.
    pub fn is_infected(&self) -> bool {
        self.matched.is_some()
    }
}

/// Outcome of the cloud submission for one file.
#[derive(Debug)]
pub enum CloudResult {
    /// Cloud detection was disabled for this scan.
    NotRequested,
    /// The service answered.
    Verdict(CloudVerdict),
    /// The service failed; its answer is unknown.
    Unavailable(CloudError),
}

impl CloudResult {
    /// Returns `true` if the service was asked but did not answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<Result<CloudVerdict, CloudError>> for CloudResult {
    fn from(result: Result<CloudVerdict, CloudError>) -> Self {
        match result {
            Ok(verdict) => Self::Verdict(verdict),
            Err(e) => Self::Unavailable(e),
        }
    }
}

/// Produces the final verdict for `path`.
pub fn combine(path: impl Into<PathBuf>, signature: SignatureResult, cloud: CloudResult) -> ScanVerdict {
    let path = path.into();
    let cloud_unavailable = cloud.is_unavailable();

    let verdict = match cloud {
        CloudResult::NotRequested | CloudResult::Unavailable(_) => ScanVerdict {
            path,
            infected: signature.is_infected(),
            threat_label: signature.matched,
            method: DetectionMethod::Signature,
            cloud_unavailable,
        },
        CloudResult::Verdict(cloud) => {
            let (infected, threat_label, method) = match (signature.matched, cloud.infected) {
                (Some(label), true) => (true, Some(label), DetectionMethod::Both),
                (Some(label), false) => (true, Some(label), DetectionMethod::Signature),
                (None, true) => (
                    true,
                    Some(cloud.first_label().unwrap_or(UNKNOWN_THREAT).to_string()),
                    DetectionMethod::Cloud,
                ),
                (None, false) => (false, None, DetectionMethod::Both),
            };
            ScanVerdict {
                path,
                infected,
                threat_label,
                method,
                cloud_unavailable,
            }
        }
    };

    if verdict.cloud_unavailable {
        tracing::debug!(
            path = %verdict.path.display(),
            infected = verdict.infected,
            "Cloud verdict unavailable, using signature result"
        );
    }
    verdict
}
