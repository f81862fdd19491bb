//! Transitive dependency closure of an entry point.
//!
//! A breadth-first work list over function-to-function edges. Each
//! function's constant and variable references are checked as the
//! function is reached, so a dangling name is reported together with the
//! function that needed it.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::{LinkError, Result};
use crate::linker::Linker;

/// Everything one entry point needs, deduplicated, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Functions, entry point first.
    pub functions: Vec<String>,
    pub constants: Vec<String>,
    pub variables: Vec<String>,
}

impl Resolution {
    pub fn contains(&self, name: &str) -> bool {
        self.functions
            .iter()
            .chain(&self.constants)
            .chain(&self.variables)
            .any(|n| n == name)
    }

    /// Total number of symbols.
    pub fn len(&self) -> usize {
        self.functions.len() + self.constants.len() + self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn resolve(linker: &Linker, entry: &str) -> Result<Resolution> {
    if linker.function(entry).is_none() {
        return Err(LinkError::UnknownEntryPoint {
            name: entry.to_string(),
        });
    }

    let mut out = Resolution::default();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([entry]);
    seen.insert(entry);

    while let Some(name) = queue.pop_front() {
        let Some(f) = linker.function(name) else {
            continue;
        };
        out.functions.push(name.to_string());

        for callee in &f.deps.functions {
            if linker.function(callee).is_none() {
                return Err(LinkError::MissingFunction {
                    name: callee.clone(),
                    required_by: name.to_string(),
                });
            }
            if seen.insert(callee) {
                queue.push_back(callee);
            }
        }
        for constant in &f.deps.constants {
            if linker.constant(constant).is_none() {
                return Err(LinkError::MissingConstant {
                    name: constant.clone(),
                    required_by: name.to_string(),
                });
            }
            if seen.insert(constant) {
                out.constants.push(constant.clone());
            }
        }
        for variable in &f.deps.variables {
            if linker.variable(variable).is_none() {
                return Err(LinkError::MissingVariable {
                    name: variable.clone(),
                    required_by: name.to_string(),
                });
            }
            if seen.insert(variable) {
                out.variables.push(variable.clone());
            }
        }
    }

    debug!(
        entry,
        functions = out.functions.len(),
        constants = out.constants.len(),
        variables = out.variables.len(),
        "resolved entry point"
    );
    Ok(out)
}
