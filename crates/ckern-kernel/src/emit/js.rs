//! Scalar interpreter (JavaScript) function bodies.

use ckern_ast::{BinaryOp, FuncDef, ScalarType};

use super::{strip_suffix, Dialect};
use crate::error::Result;
use crate::target::TargetFamily;

#[derive(Debug, Clone, Copy, Default)]
pub struct Js;

impl Dialect for Js {
    fn family(&self) -> TargetFamily {
        TargetFamily::Scalar
    }

    fn signature(&self, def: &FuncDef) -> Result<String> {
        let params: Vec<String> = def
            .params()
            .iter()
            .enumerate()
            .map(|(i, p)| p.name.clone().unwrap_or_else(|| format!("_a{i}")))
            .collect();
        Ok(format!("function {}({})", def.name(), params.join(", ")))
    }

    fn prototype(&self, _def: &FuncDef) -> Result<Option<String>> {
        Ok(None)
    }

    fn scalar_local(&self, ty: ScalarType, name: &str, init: Option<String>) -> String {
        let init = init.unwrap_or_else(|| match ty {
            ScalarType::Bool => "false".to_string(),
            _ => "0".to_string(),
        });
        format!("let {name} = {init}")
    }

    fn array_local(&self, _ty: ScalarType, name: &str, len: usize) -> String {
        format!("let {name} = new Array({len}).fill(0)")
    }

    fn float_literal(&self, text: &str) -> String {
        strip_suffix(text).to_string()
    }

    fn binary_op(&self, op: BinaryOp) -> &'static str {
        match op {
            BinaryOp::Eq => "===",
            BinaryOp::Ne => "!==",
            _ => op.symbol(),
        }
    }

    fn allows_while(&self) -> bool {
        true
    }
}
