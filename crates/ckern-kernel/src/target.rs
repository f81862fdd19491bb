//! Output dialects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// GLSL language version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlslVersion {
    /// GLSL ES 1.00 (WebGL 1): no array constructors, arrays come in as uniforms.
    V100,
    /// GLSL ES 3.00 (WebGL 2).
    V300,
}

/// The two code families a kernel carries bodies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFamily {
    /// Fragment shader code.
    Shader,
    /// Scalar interpreter code.
    Scalar,
}

impl fmt::Display for TargetFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetFamily::Shader => "shader",
            TargetFamily::Scalar => "scalar",
        })
    }
}

/// A concrete output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Glsl(GlslVersion),
    Js,
}

impl Target {
    pub const ALL: [Target; 3] = [
        Target::Glsl(GlslVersion::V100),
        Target::Glsl(GlslVersion::V300),
        Target::Js,
    ];

    /// Parse a target from its command-line name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "glsl100" | "glsl" => Ok(Target::Glsl(GlslVersion::V100)),
            "glsl300" => Ok(Target::Glsl(GlslVersion::V300)),
            "js" | "javascript" => Ok(Target::Js),
            _ => Err(KernelError::UnknownTarget {
                name: s.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Target::Glsl(GlslVersion::V100) => "glsl100",
            Target::Glsl(GlslVersion::V300) => "glsl300",
            Target::Js => "js",
        }
    }

    pub fn family(&self) -> TargetFamily {
        match self {
            Target::Glsl(_) => TargetFamily::Shader,
            Target::Js => TargetFamily::Scalar,
        }
    }

    /// Whether array values must be bound from outside as uniforms.
    pub fn arrays_as_uniforms(&self) -> bool {
        matches!(self, Target::Glsl(GlslVersion::V100))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
