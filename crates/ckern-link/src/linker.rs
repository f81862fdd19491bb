//! The kernel registry and code assembly.

use std::collections::{BTreeMap, HashMap};

use ckern_kernel::builtins;
use ckern_kernel::{FunctionKernel, GlslVersion, Kernel, Target, ValueKernel};
use tracing::{debug, info, trace};

use crate::error::{LinkError, Result};
use crate::resolution::{self, Resolution};

/// Name-keyed tables of every registered kernel.
#[derive(Debug, Clone, Default)]
pub struct Linker {
    constants: HashMap<String, ValueKernel>,
    variables: HashMap<String, ValueKernel>,
    functions: HashMap<String, FunctionKernel>,
}

impl Linker {
    /// An empty linker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A linker preloaded with [`builtins::table`].
    pub fn with_builtins() -> Self {
        let mut linker = Self::new();
        linker.register_all(builtins::table());
        linker
    }

    /// Insert `kernel`, replacing any kernel of the same kind and name.
    pub fn register(&mut self, kernel: Kernel) {
        let replaced = match kernel {
            Kernel::Constant(k) => self.constants.insert(k.name.clone(), k).is_some(),
            Kernel::Variable(k) => self.variables.insert(k.name.clone(), k).is_some(),
            Kernel::Function(k) => self.functions.insert(k.name.clone(), k).is_some(),
        };
        if replaced {
            trace!("replaced an existing kernel");
        }
    }

    pub fn register_all(&mut self, kernels: impl IntoIterator<Item = Kernel>) {
        for kernel in kernels {
            self.register(kernel);
        }
    }

    /// Discard every registered kernel and load `kernels` instead.
    pub fn replace_all(&mut self, kernels: impl IntoIterator<Item = Kernel>) {
        self.constants.clear();
        self.variables.clear();
        self.functions.clear();
        self.register_all(kernels);
        debug!(kernels = self.len(), "replaced linker tables");
    }

    pub fn function(&self, name: &str) -> Option<&FunctionKernel> {
        self.functions.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&ValueKernel> {
        self.constants.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&ValueKernel> {
        self.variables.get(name)
    }

    pub fn len(&self) -> usize {
        self.constants.len() + self.variables.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of every registered function, sorted.
    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The transitive dependency closure of `entry`.
    pub fn resolve(&self, entry: &str) -> Result<Resolution> {
        resolution::resolve(self, entry)
    }

    /// One self-contained unit of `target` source for `entry`.
    ///
    /// Constant and variable declarations come first, then prototypes,
    /// then bodies, each in discovery order. Functions the target
    /// provides natively contribute nothing.
    pub fn export(&self, entry: &str, target: Target) -> Result<String> {
        let resolved = self.resolve(entry)?;
        let family = target.family();

        let entry_has_code = self
            .function(entry)
            .and_then(|f| f.code(family))
            .is_some();
        if !entry_has_code {
            return Err(LinkError::MissingTargetCode {
                name: entry.to_string(),
                target: target.to_string(),
            });
        }

        let mut decls = Vec::new();
        for name in &resolved.constants {
            if let Some(k) = self.constant(name) {
                decls.push(k.declaration(target, true));
            }
        }
        for name in &resolved.variables {
            if let Some(k) = self.variable(name) {
                decls.push(k.declaration(target, false));
            }
        }
        let code: Vec<_> = resolved
            .functions
            .iter()
            .filter_map(|name| self.function(name)?.code(family))
            .collect();
        let prototypes: Vec<&str> = code.iter().filter_map(|c| c.prototype.as_deref()).collect();

        let mut sections = Vec::new();
        if !decls.is_empty() {
            sections.push(format!("{}\n", decls.join("\n")));
        }
        if !prototypes.is_empty() {
            sections.push(format!("{}\n", prototypes.join("\n")));
        }
        sections.extend(code.iter().map(|c| c.body.clone()));

        info!(
            entry,
            target = %target,
            functions = code.len(),
            declarations = decls.len(),
            "exported entry point"
        );
        Ok(sections.join("\n"))
    }

    /// Values `entry` reads that the GLSL 100 dialect cannot embed and
    /// must bind as uniforms: arrays, and NaN scalars as one-element lists.
    pub fn export_runtime_uniforms(&self, entry: &str) -> Result<BTreeMap<String, Vec<f64>>> {
        let resolved = self.resolve(entry)?;
        let values = resolved
            .constants
            .iter()
            .filter_map(|n| self.constant(n))
            .chain(resolved.variables.iter().filter_map(|n| self.variable(n)));
        Ok(values
            .filter(|k| k.is_runtime_uniform(Target::Glsl(GlslVersion::V100)))
            .map(|k| (k.name.clone(), k.uniform_values()))
            .collect())
    }
}
