//! `ckern compile`: AST dumps to kernel bundles.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ckern_kernel::bundle::BUNDLE_EXTENSION;
use ckern_kernel::{extract, ExtractConfig, KernelBundle};
use ckern_transform::{transform, PipelineConfig};
use tracing::debug;

use super::{base_name, read_ast};

/// Compile each input into `<out_dir>/<base>.kernels.json`, returning the
/// written paths.
pub fn run(inputs: &[PathBuf], out_dir: &Path, config: &ExtractConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(inputs.len());
    for input in inputs {
        let base = base_name(input);
        let file = read_ast(input)?;
        let out = transform(file, &PipelineConfig::standard(&base))
            .with_context(|| format!("transforming {}", input.display()))?;
        debug!("\n{}", out.report);

        let batch = extract(&out.file, config)
            .with_context(|| format!("extracting kernels from {}", input.display()))?;
        let count = batch.len();
        let bundle = KernelBundle::new(&base, batch.kernels)?;
        let path = out_dir.join(format!("{base}.{BUNDLE_EXTENSION}"));
        bundle
            .write(&path)
            .with_context(|| format!("writing {}", path.display()))?;

        println!("{} -> {} ({count} kernels)", input.display(), path.display());
        written.push(path);
    }
    Ok(written)
}
