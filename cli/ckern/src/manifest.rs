//! `ckern.toml` manifest parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ckern_kernel::ExtractConfig;
use serde::{Deserialize, Serialize};

pub const MANIFEST_NAME: &str = "ckern.toml";

/// Project configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CkernManifest {
    #[serde(default)]
    pub project: Option<ProjectConfig>,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

/// `[compile]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Globals treated as mutable variables (default: `["sgngamf"]`).
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    /// Entry points to keep; everything unreachable from them is dropped.
    #[serde(default)]
    pub exports: Option<Vec<String>>,
}

/// `[export]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Default target dialect (`glsl100`, `glsl300`, or `js`).
    #[serde(default)]
    pub target: Option<String>,
}

impl CkernManifest {
    /// Search upward from `start_dir` for a `ckern.toml`.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing ckern.toml")
    }

    pub fn extract_config(&self) -> ExtractConfig {
        let defaults = ExtractConfig::default();
        ExtractConfig {
            variables: self.compile.variables.clone().unwrap_or(defaults.variables),
            exports: self.compile.exports.clone(),
        }
    }

    pub fn default_target(&self) -> Option<&str> {
        self.export.target.as_deref()
    }
}
