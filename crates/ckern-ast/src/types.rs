//! Scalar element types.
//!
//! Every declarator chain terminates in a `TypeDecl` naming one of these.
//! Both output dialects only know 32-bit floats, ints, and bools, so the
//! many C spellings collapse onto four variants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolved scalar element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    Float,
    Bool,
    Void,
}

impl ScalarType {
    /// Resolve a C `IdentifierType.names` list.
    ///
    /// Returns `None` for names outside the supported subset (typedef
    /// names, `struct`, `enum`, ...).
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        if names.is_empty() {
            return None;
        }
        let mut saw_int = false;
        let mut result = None;
        for name in names {
            match name.as_ref() {
                "float" | "double" => result = Some(ScalarType::Float),
                "void" => result = Some(ScalarType::Void),
                "_Bool" | "bool" => result = Some(ScalarType::Bool),
                "int" | "char" | "short" | "long" | "signed" | "unsigned" => saw_int = true,
                _ => return None,
            }
        }
        // `long double` is a float, `long` alone is an int.
        result.or(if saw_int { Some(ScalarType::Int) } else { None })
    }

    /// Canonical C spelling, which is also the spelling of the matching
    /// coercion function in both targets.
    pub fn c_name(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Bool => "bool",
            ScalarType::Void => "void",
        }
    }

    /// Parse a canonical spelling back.
    pub fn from_c_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ScalarType::Int),
            "float" => Some(ScalarType::Float),
            "bool" => Some(ScalarType::Bool),
            "void" => Some(ScalarType::Void),
            _ => None,
        }
    }

    /// Whether values of this type take part in arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Float)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_common_spellings() {
        assert_eq!(ScalarType::from_names(&["double"]), Some(ScalarType::Float));
        assert_eq!(
            ScalarType::from_names(&["long", "double"]),
            Some(ScalarType::Float)
        );
        assert_eq!(
            ScalarType::from_names(&["unsigned", "long"]),
            Some(ScalarType::Int)
        );
        assert_eq!(ScalarType::from_names(&["unsigned"]), Some(ScalarType::Int));
        assert_eq!(ScalarType::from_names(&["_Bool"]), Some(ScalarType::Bool));
        assert_eq!(ScalarType::from_names(&["void"]), Some(ScalarType::Void));
    }

    #[test]
    fn rejects_typedef_names() {
        assert_eq!(ScalarType::from_names(&["size_t"]), None);
        assert_eq!(ScalarType::from_names::<&str>(&[]), None);
    }

    #[test]
    fn c_name_round_trips() {
        for ty in [
            ScalarType::Int,
            ScalarType::Float,
            ScalarType::Bool,
            ScalarType::Void,
        ] {
            assert_eq!(ScalarType::from_c_name(ty.c_name()), Some(ty));
        }
    }
}
