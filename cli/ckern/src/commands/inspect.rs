//! `ckern inspect`: print a unit as C, before or after normalization.

use std::path::Path;

use anyhow::{Context, Result};
use ckern_transform::{transform, PipelineConfig};
use clap::ValueEnum;

use super::{base_name, read_ast};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// As parsed.
    Raw,
    /// After the standard pipeline, followed by the pass report.
    Transformed,
}

pub fn render(input: &Path, stage: Stage) -> Result<String> {
    let file = read_ast(input)?;
    match stage {
        Stage::Raw => Ok(file.to_string()),
        Stage::Transformed => {
            let out = transform(file, &PipelineConfig::standard(base_name(input)))
                .with_context(|| format!("transforming {}", input.display()))?;
            Ok(format!("{}\n{}", out.file, out.report))
        }
    }
}

pub fn run(input: &Path, stage: Stage) -> Result<()> {
    print!("{}", render(input, stage)?);
    Ok(())
}
