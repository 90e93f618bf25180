//! Signature sources: the built-in table and on-disk feeds.

use crate::core::error::SignatureError;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A known-bad digest paired with a threat label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Lower-case hex digest (MD5, SHA-256 or BLAKE3).
    pub digest: String,
    /// Human-readable threat name.
    pub label: String,
}

impl Signature {
    /// Creates a signature, validating and normalising the digest.
    pub fn new(digest: &str, label: impl Into<String>) -> Result<Self, SignatureError> {
        Ok(Self {
            digest: normalize_digest(digest)?,
            label: label.into(),
        })
    }
}

/// Validates a hex digest and returns it in lower case.
///
/// Accepted lengths are 32 (MD5) and 64 (SHA-256, BLAKE3) hex characters.
pub fn normalize_digest(digest: &str) -> Result<String, SignatureError> {
    let trimmed = digest.trim();
    let valid_len = matches!(trimmed.len(), 32 | 64);
    if !valid_len || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SignatureError::InvalidDigest {
            digest: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// The signatures shipped with the engine.
pub fn builtin_signatures() -> Vec<Signature> {
    vec![
        Signature {
            digest: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".into(),
            label: "Empty File".into(),
        },
        Signature {
            digest: "d41d8cd98f00b204e9800998ecf8427e".into(),
            label: "Empty File".into(),
        },
    ]
}

/// Reads signatures from a file.
///
/// Files ending in `.json` hold an array of `{"digest": .., "label": ..}`
/// objects. Anything else is read as one `digest<sep>label` pair per line,
/// where `<sep>` is a tab or a colon; blank lines and `#` comments are skipped.
pub fn read_signature_file(path: &Path) -> Result<Vec<Signature>, SignatureError> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        parse_json(&content)
    } else {
        parse_lines(&content)
    }
}

fn parse_json(content: &str) -> Result<Vec<Signature>, SignatureError> {
    let raw: Vec<Signature> =
        serde_json::from_str(content).map_err(|e| SignatureError::Parse {
            reason: e.to_string(),
        })?;
    raw.into_iter()
        .map(|s| Signature::new(&s.digest, s.label))
        .collect()
}

fn parse_lines(content: &str) -> Result<Vec<Signature>, SignatureError> {
    let mut signatures = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (digest, label) = line
            .split_once('\t')
            .or_else(|| line.split_once(':'))
            .ok_or_else(|| SignatureError::Parse {
                reason: format!("line {}: expected 'digest<TAB>label'", lineno + 1),
            })?;
        let label = label.trim();
        if label.is_empty() {
            return Err(SignatureError::Parse {
                reason: format!("line {}: empty label", lineno + 1),
            });
        }
        signatures.push(Signature::new(digest, label)?);
    }
    Ok(signatures)
}
