//! Kernel bundle files.
//!
//! A bundle is the JSON form of one compiled unit's kernels, guarded by a
//! SHA-256 hash of the serialized kernel list so edited or truncated files
//! are rejected on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{KernelError, Result};
use crate::kernel::Kernel;

/// Value of the `format` field.
pub const BUNDLE_FORMAT: &str = "ckern-kernels";

/// Current bundle version.
pub const BUNDLE_VERSION: u32 = 1;

/// File extension written by the driver.
pub const BUNDLE_EXTENSION: &str = "kernels.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelBundle {
    pub format: String,
    pub version: u32,
    /// Base name of the unit the kernels came from.
    pub source: String,
    pub kernels: Vec<Kernel>,
    /// Lowercase hex SHA-256 of the compact JSON of `kernels`.
    pub hash: String,
}

impl KernelBundle {
    pub fn new(source: impl Into<String>, kernels: Vec<Kernel>) -> Result<Self> {
        let hash = content_hash(&kernels)?;
        Ok(Self {
            format: BUNDLE_FORMAT.to_string(),
            version: BUNDLE_VERSION,
            source: source.into(),
            kernels,
            hash,
        })
    }

    /// Check format, version, and hash.
    pub fn verify(&self) -> Result<()> {
        if self.format != BUNDLE_FORMAT {
            return Err(KernelError::InvalidBundleFormat {
                format: self.format.clone(),
            });
        }
        if self.version != BUNDLE_VERSION {
            return Err(KernelError::UnsupportedBundleVersion {
                version: self.version,
            });
        }
        if content_hash(&self.kernels)? != self.hash {
            return Err(KernelError::BundleHashMismatch);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and verify.
    pub fn from_json(text: &str) -> Result<Self> {
        let bundle: KernelBundle = serde_json::from_str(text)?;
        bundle.verify()?;
        Ok(bundle)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), kernels = self.kernels.len(), "wrote bundle");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let bundle = Self::from_json(&text)?;
        debug!(path = %path.display(), kernels = bundle.kernels.len(), "read bundle");
        Ok(bundle)
    }
}

fn content_hash(kernels: &[Kernel]) -> Result<String> {
    let payload = serde_json::to_vec(kernels)?;
    let digest: [u8; 32] = Sha256::digest(&payload).into();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}
