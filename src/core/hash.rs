use std::fmt;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hex digest of a file's full content. Only meaningful for equality checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes whole-file content hashes used for exact duplicate detection
pub struct HashService;

impl HashService {
    pub fn new() -> Self {
        Self
    }

    /// BLAKE3 digest of everything in `file_path`, read in one streaming pass
    pub fn compute_content_hash(&self, file_path: &Path) -> Result<ContentHash, HashError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update_reader(File::open(file_path)?)?;
        Ok(ContentHash(hasher.finalize().to_hex().to_string()))
    }
}

impl Default for HashService {
    fn default() -> Self {
        Self::new()
    }
}
