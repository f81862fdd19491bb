//! `ckern export`: link one entry point from bundles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ckern_kernel::{KernelBundle, Target};
use ckern_link::Linker;

/// Target used when neither the flag nor the manifest names one.
pub const DEFAULT_TARGET: &str = "glsl300";

/// Linked source for `entry` plus the uniform values it needs.
#[derive(Debug)]
pub struct Exported {
    pub text: String,
    pub uniforms: BTreeMap<String, Vec<f64>>,
}

pub fn link(entry: &str, bundles: &[PathBuf], target: &str) -> Result<Exported> {
    let target = Target::parse(target)?;
    let mut linker = Linker::with_builtins();
    for path in bundles {
        let bundle =
            KernelBundle::read(path).with_context(|| format!("loading {}", path.display()))?;
        linker.register_all(bundle.kernels);
    }
    let text = linker
        .export(entry, target)
        .with_context(|| format!("linking '{entry}' for {target}"))?;
    let uniforms = if target.arrays_as_uniforms() {
        linker.export_runtime_uniforms(entry)?
    } else {
        BTreeMap::new()
    };
    Ok(Exported { text, uniforms })
}

/// Print the linked source; uniform values go to `uniforms` as JSON, where
/// a NaN is written as `null`.
pub fn run(entry: &str, bundles: &[PathBuf], target: &str, uniforms: Option<&Path>) -> Result<()> {
    let exported = link(entry, bundles, target)?;
    print!("{}", exported.text);
    if let Some(path) = uniforms {
        let json = serde_json::to_string_pretty(&exported.uniforms)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
