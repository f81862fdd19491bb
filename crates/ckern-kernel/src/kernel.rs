//! Kernel records: the unit the linker works with.
//!
//! A kernel is one named top-level item of a compiled unit, a constant,
//! a mutable global, or a function, carrying ready-made code for each
//! target family. Records are plain data and serialize to the bundle
//! format unchanged.

use std::collections::BTreeSet;
use std::fmt;

use ckern_ast::ScalarType;
use serde::{Deserialize, Serialize};

use crate::target::{Target, TargetFamily};

/// Literal text standing for a quiet NaN.
pub const NAN_LITERAL: &str = "NAN";

/// Quiet NaN as a GLSL ES 3.00 constant expression. GLSL 1.00 has no bit
/// casts, so there NaN values are bound as uniforms instead.
const GLSL_NAN: &str = "intBitsToFloat(0x7fc00000)";

/// Resolved value of a constant or variable.
///
/// NaN is stored as `null`, JSON having no literal for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KernelValue {
    Scalar(#[serde(with = "nullable")] f64),
    Vector(#[serde(with = "nullable_vec")] Vec<f64>),
}

mod nullable {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_nan() {
            s.serialize_none()
        } else {
            s.serialize_f64(*v)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

mod nullable_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
        let items: Vec<Option<f64>> = v.iter().map(|x| (!x.is_nan()).then_some(*x)).collect();
        items.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let items = Vec::<Option<f64>>::deserialize(d)?;
        Ok(items.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect())
    }
}

impl KernelValue {
    /// Element count for vectors, `None` for scalars.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            KernelValue::Scalar(_) => None,
            KernelValue::Vector(v) => Some(v.len()),
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            KernelValue::Scalar(_) => None,
            KernelValue::Vector(v) => Some(v),
        }
    }
}

/// A constant or mutable global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueKernel {
    pub name: String,
    /// Element type.
    pub ty: ScalarType,
    pub value: KernelValue,
    /// Source text of each element, reused verbatim in the output.
    pub literals: Vec<String>,
}

pub type ConstantKernel = ValueKernel;
pub type VariableKernel = ValueKernel;

impl ValueKernel {
    /// Whether `target` cannot spell this value and the runtime has to
    /// bind it as a uniform: arrays and NaN scalars in GLSL 100.
    pub fn is_runtime_uniform(&self, target: Target) -> bool {
        target.arrays_as_uniforms()
            && match &self.value {
                KernelValue::Scalar(v) => v.is_nan(),
                KernelValue::Vector(_) => true,
            }
    }

    /// Values bound for a uniform; a scalar is a one-element list.
    pub fn uniform_values(&self) -> Vec<f64> {
        match &self.value {
            KernelValue::Scalar(v) => vec![*v],
            KernelValue::Vector(v) => v.clone(),
        }
    }

    /// Declaration of this value in `target`.
    pub fn declaration(&self, target: Target, constant: bool) -> String {
        let name = &self.name;
        let ty = self.ty.c_name();
        let lits: Vec<String> = self
            .literals
            .iter()
            .map(|l| literal_text(l, self.ty, target))
            .collect();
        let first = lits.first().cloned().unwrap_or_else(|| zero(self.ty, target));
        match (target, self.value.array_len()) {
            (Target::Glsl(_), None) if self.is_runtime_uniform(target) => {
                format!("uniform {ty} {name};")
            }
            (Target::Glsl(_), None) => {
                let qualifier = if constant { "const " } else { "" };
                format!("{qualifier}{ty} {name} = {first};")
            }
            (Target::Glsl(_), Some(n)) if self.is_runtime_uniform(target) => {
                format!("uniform {ty} {name}[{n}];")
            }
            (Target::Glsl(_), Some(n)) => {
                let qualifier = if constant { "const " } else { "" };
                format!("{qualifier}{ty} {name}[{n}] = {ty}[{n}]({});", lits.join(", "))
            }
            (Target::Js, None) => {
                let keyword = if constant { "const" } else { "var" };
                format!("{keyword} {name} = {first};")
            }
            (Target::Js, Some(_)) => {
                let keyword = if constant { "const" } else { "var" };
                format!("{keyword} {name} = [{}];", lits.join(", "))
            }
        }
    }
}

/// Render one literal for `target`.
///
/// GLSL float literals need a `.` or an exponent; NaN has no literal in
/// either dialect and is spelled as an expression.
pub fn literal_text(text: &str, ty: ScalarType, target: Target) -> String {
    match target {
        Target::Glsl(_) if text == NAN_LITERAL => GLSL_NAN.to_string(),
        Target::Js if text == NAN_LITERAL => "NaN".to_string(),
        Target::Glsl(_)
            if ty == ScalarType::Float
                && text.parse::<f64>().is_ok()
                && !text.contains(['.', 'e', 'E']) =>
        {
            format!("{text}.0")
        }
        _ => text.to_string(),
    }
}

fn zero(ty: ScalarType, target: Target) -> String {
    match (ty, target) {
        (ScalarType::Bool, _) => "false".to_string(),
        (ScalarType::Float, Target::Glsl(_)) => "0.0".to_string(),
        _ => "0".to_string(),
    }
}

/// One positional function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelArg {
    pub name: String,
    pub ty: ScalarType,
    pub index: usize,
    /// Fixed length of an array parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_len: Option<usize>,
}

/// Names a function refers to, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub functions: BTreeSet<String>,
    pub constants: BTreeSet<String>,
    pub variables: BTreeSet<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.constants.is_empty() && self.variables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.constants.len() + self.variables.len()
    }
}

/// Code for one target family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCode {
    /// Forward declaration, for dialects that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<String>,
    pub body: String,
}

/// A function with per-family code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionKernel {
    pub name: String,
    pub args: Vec<KernelArg>,
    pub return_type: ScalarType,
    pub deps: Dependencies,
    /// `None` when the shader dialect provides the function natively.
    pub shader: Option<FunctionCode>,
    /// `None` when the scalar dialect provides the function natively.
    pub scalar: Option<FunctionCode>,
}

impl FunctionKernel {
    pub fn code(&self, family: TargetFamily) -> Option<&FunctionCode> {
        match family {
            TargetFamily::Shader => self.shader.as_ref(),
            TargetFamily::Scalar => self.scalar.as_ref(),
        }
    }
}

/// Kind of a kernel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Constant,
    Variable,
    Function,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KernelKind::Constant => "constant",
            KernelKind::Variable => "variable",
            KernelKind::Function => "function",
        })
    }
}

/// A named, portable record of one constant, variable, or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Kernel {
    Constant(ConstantKernel),
    Variable(VariableKernel),
    Function(FunctionKernel),
}

impl Kernel {
    pub fn name(&self) -> &str {
        match self {
            Kernel::Constant(k) | Kernel::Variable(k) => &k.name,
            Kernel::Function(k) => &k.name,
        }
    }

    pub fn kind(&self) -> KernelKind {
        match self {
            Kernel::Constant(_) => KernelKind::Constant,
            Kernel::Variable(_) => KernelKind::Variable,
            Kernel::Function(_) => KernelKind::Function,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionKernel> {
        match self {
            Kernel::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&ValueKernel> {
        match self {
            Kernel::Constant(v) | Kernel::Variable(v) => Some(v),
            Kernel::Function(_) => None,
        }
    }

    /// Global declaration for constants and variables.
    pub fn declaration(&self, target: Target) -> Option<String> {
        match self {
            Kernel::Constant(v) => Some(v.declaration(target, true)),
            Kernel::Variable(v) => Some(v.declaration(target, false)),
            Kernel::Function(_) => None,
        }
    }
}
