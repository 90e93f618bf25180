//! Streaming file fingerprinting.
//!
//! `FileHasher` reads a file in fixed-size chunks and feeds every chunk to
//! MD5, SHA-256 and BLAKE3 in the same pass, so memory use does not depend on
//! file size. A read failure anywhere in the stream is an error; it is never
//! reported as a digest.

use crate::core::error::ScanError;
use crate::core::types::FileHash;

use md5::Md5;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Default read size, matching the chunking of the original scanner.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Computes content digests for files and byte slices.
///
/// # Examples
///
/// ```rust
/// use scanward::core::FileHasher;
///
/// let hasher = FileHasher::new();
/// let hash = hasher.hash_bytes(b"");
/// assert_eq!(hash.md5, "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[derive(Debug, Clone)]
pub struct FileHasher {
    chunk_size: usize,
}

impl Default for FileHasher {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FileHasher {
    /// Creates a hasher with the default chunk size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read chunk size. Zero is clamped to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the read chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Computes digests of in-memory bytes.
    pub fn hash_bytes(&self, data: &[u8]) -> FileHash {
        let mut state = DigestState::new();
        state.update(data);
        state.finalize()
    }

    /// Computes digests of the file at `path`, streaming its content.
    ///
    /// Fails with [`ScanError::UnreadableFile`] if the file cannot be opened
    /// or a read fails mid-stream.
    pub fn hash_file(&self, path: &Path) -> Result<FileHash, ScanError> {
        let mut file = std::fs::File::open(path).map_err(|e| ScanError::unreadable(path, e))?;
        self.hash_reader(&mut file)
            .map_err(|e| ScanError::unreadable(path, e))
    }

    /// Computes digests from a synchronous reader.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<FileHash> {
        let mut state = DigestState::new();
        let mut buffer = vec![0u8; self.chunk_size];
        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            state.update(&buffer[..bytes_read]);
        }
        Ok(state.finalize())
    }
}

struct DigestState {
    md5: Md5,
    sha256: Sha256,
    blake3: blake3::Hasher,
}

impl DigestState {
    fn new() -> Self {
        Self {
            md5: Md5::new(),
            sha256: Sha256::new(),
            blake3: blake3::Hasher::new(),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        self.md5.update(chunk);
        self.sha256.update(chunk);
        self.blake3.update(chunk);
    }

    fn finalize(self) -> FileHash {
        FileHash {
            md5: format!("{:x}", self.md5.finalize()),
            sha256: format!("{:x}", self.sha256.finalize()),
            blake3: self.blake3.finalize().to_hex().to_string(),
        }
    }
}
