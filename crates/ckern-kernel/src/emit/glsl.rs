//! GLSL ES function bodies (shared by versions 1.00 and 3.00).

use ckern_ast::{FuncDef, ScalarType};

use super::{strip_suffix, Dialect};
use crate::error::{KernelError, Result};
use crate::target::TargetFamily;

#[derive(Debug, Clone, Copy, Default)]
pub struct Glsl;

impl Dialect for Glsl {
    fn family(&self) -> TargetFamily {
        TargetFamily::Shader
    }

    fn signature(&self, def: &FuncDef) -> Result<String> {
        let mut params = Vec::with_capacity(def.params().len());
        for p in def.params() {
            let name = p.name.as_deref().ok_or_else(|| KernelError::Emit {
                name: def.name().to_string(),
                detail: "unnamed parameter".into(),
            })?;
            let ty = p.scalar_type();
            if p.is_array() {
                let len = p.array_len().ok_or_else(|| KernelError::Emit {
                    name: def.name().to_string(),
                    detail: format!("array parameter '{name}' has no fixed size"),
                })?;
                params.push(format!("{ty} {name}[{len}]"));
            } else {
                params.push(format!("{ty} {name}"));
            }
        }
        Ok(format!(
            "{} {}({})",
            def.return_type(),
            def.name(),
            params.join(", ")
        ))
    }

    fn prototype(&self, def: &FuncDef) -> Result<Option<String>> {
        Ok(Some(format!("{};", self.signature(def)?)))
    }

    fn scalar_local(&self, ty: ScalarType, name: &str, init: Option<String>) -> String {
        match init {
            Some(init) => format!("{ty} {name} = {init}"),
            None => format!("{ty} {name}"),
        }
    }

    fn array_local(&self, ty: ScalarType, name: &str, len: usize) -> String {
        format!("{ty} {name}[{len}]")
    }

    fn float_literal(&self, text: &str) -> String {
        let text = strip_suffix(text);
        if text.contains(['.', 'e', 'E']) {
            text.to_string()
        } else {
            format!("{text}.0")
        }
    }

    fn allows_while(&self) -> bool {
        false
    }
}
