//! CLI command implementations.

pub mod compile;
pub mod export;
pub mod inspect;

use std::path::Path;

use anyhow::{Context, Result};
use ckern_ast::FileAst;

/// Unit name for an AST dump: the file name without `.json` and `.ast`.
pub fn base_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file.strip_suffix(".json").unwrap_or(&file);
    stem.strip_suffix(".ast").unwrap_or(stem).to_string()
}

/// Read and validate one AST dump.
pub fn read_ast(path: &Path) -> Result<FileAst> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    ckern_ast::parse_file_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_names() {
        assert_eq!(base_name(Path::new("dir/gammaf.ast.json")), "gammaf");
        assert_eq!(base_name(Path::new("gammaf.json")), "gammaf");
        assert_eq!(base_name(Path::new("lgam")), "lgam");
    }
}
