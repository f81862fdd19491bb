//! Hand-written kernels for the primitives normalized code calls.
//!
//! Shader-native functions (casts, the math library) have no shader
//! body; the scalar dialect gets thin wrappers over `Math`. The fixed-size
//! polynomial helpers are generated for every array length up to
//! [`ARRAY_HELPER_MAX_LEN`].

use ckern_ast::ScalarType;

use crate::kernel::{
    Dependencies, FunctionCode, FunctionKernel, Kernel, KernelArg, KernelValue, ValueKernel,
    NAN_LITERAL,
};

/// Largest coefficient array the polynomial helpers are generated for.
pub const ARRAY_HELPER_MAX_LEN: usize = 32;

/// Constants the table defines.
pub const BUILTIN_CONSTANTS: &[&str] = &[NAN_LITERAL];

/// One-argument math functions mapped straight onto `Math.<name>`.
const UNARY_MATH: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "exp", "log", "sqrt", "abs", "floor", "ceil",
];

use ScalarType::{Bool, Float, Int};

fn args(params: &[(&str, ScalarType)]) -> Vec<KernelArg> {
    params
        .iter()
        .enumerate()
        .map(|(index, (name, ty))| KernelArg {
            name: name.to_string(),
            ty: *ty,
            index,
            array_len: None,
        })
        .collect()
}

fn js_function(name: &str, params: &[(&str, ScalarType)], body: &str) -> FunctionCode {
    let names: Vec<&str> = params.iter().map(|(n, _)| *n).collect();
    FunctionCode {
        prototype: None,
        body: format!("function {name}({}) {{\n    {body}\n}}\n", names.join(", ")),
    }
}

/// A function the shader dialect provides itself.
fn shader_native(
    name: &str,
    ret: ScalarType,
    params: &[(&str, ScalarType)],
    js_body: &str,
) -> Kernel {
    Kernel::Function(FunctionKernel {
        name: name.to_string(),
        args: args(params),
        return_type: ret,
        deps: Dependencies::default(),
        shader: None,
        scalar: Some(js_function(name, params, js_body)),
    })
}

fn glsl_function(
    name: &str,
    ret: ScalarType,
    params: &[(&str, ScalarType)],
    body: &str,
) -> FunctionCode {
    let sig: Vec<String> = params.iter().map(|(n, t)| format!("{t} {n}")).collect();
    let signature = format!("{ret} {name}({})", sig.join(", "));
    FunctionCode {
        prototype: Some(format!("{signature};")),
        body: format!("{signature} {{\n    {body}\n}}\n"),
    }
}

/// A function with hand-written bodies for both families.
fn portable(
    name: &str,
    ret: ScalarType,
    params: &[(&str, ScalarType)],
    glsl_body: &str,
    js_body: &str,
) -> Kernel {
    Kernel::Function(FunctionKernel {
        name: name.to_string(),
        args: args(params),
        return_type: ret,
        deps: Dependencies::default(),
        shader: Some(glsl_function(name, ret, params, glsl_body)),
        scalar: Some(js_function(name, params, js_body)),
    })
}

/// Loop of one polynomial helper over a coefficient array of `len`
/// elements; `n` bounds the loop from inside since shader loops need a
/// constant trip count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polynomial {
    /// Degree-`n` polynomial, coefficients highest first.
    Polevl,
    /// Same with an implicit leading coefficient of 1.
    P1evl,
    /// Chebyshev series of `n` terms.
    Chbevl,
}

impl Polynomial {
    const ALL: [Polynomial; 3] = [Polynomial::Polevl, Polynomial::P1evl, Polynomial::Chbevl];

    fn helper(&self) -> &'static str {
        match self {
            Polynomial::Polevl => "polevlf",
            Polynomial::P1evl => "p1evlf",
            Polynomial::Chbevl => "chbevlf",
        }
    }

    /// Body lines, written once with `{f}`/`{i}` standing for the
    /// declaration keywords of floats and ints.
    fn lines(&self, len: usize) -> Vec<String> {
        match self {
            Polynomial::Polevl => vec![
                "{f} ans = coef[0];".into(),
                format!("for ({{i}} i = 1; i < {len}; i++) {{"),
                "    if (i > n) {".into(),
                "        break;".into(),
                "    }".into(),
                "    ans = ans * x + coef[i];".into(),
                "}".into(),
                "return ans;".into(),
            ],
            Polynomial::P1evl => vec![
                "{f} ans = x + coef[0];".into(),
                format!("for ({{i}} i = 1; i < {len}; i++) {{"),
                "    if (i >= n) {".into(),
                "        break;".into(),
                "    }".into(),
                "    ans = ans * x + coef[i];".into(),
                "}".into(),
                "return ans;".into(),
            ],
            Polynomial::Chbevl => vec![
                "{f} b0 = coef[0];".into(),
                "{f} b1 = 0.0;".into(),
                "{f} b2 = 0.0;".into(),
                format!("for ({{i}} i = 1; i < {len}; i++) {{"),
                "    if (i >= n) {".into(),
                "        break;".into(),
                "    }".into(),
                "    b2 = b1;".into(),
                "    b1 = b0;".into(),
                "    b0 = x * b1 - b2 + coef[i];".into(),
                "}".into(),
                "return 0.5 * (b0 - b2);".into(),
            ],
        }
    }

    fn kernel(&self, len: usize) -> Kernel {
        let name = format!("{}_{len}", self.helper());
        let lines = self.lines(len);
        let render = |float_kw: &str, int_kw: &str| -> String {
            lines
                .iter()
                .map(|l| {
                    format!(
                        "    {}\n",
                        l.replace("{f}", float_kw).replace("{i}", int_kw)
                    )
                })
                .collect()
        };

        let glsl_sig = format!("float {name}(float x, float coef[{len}], int n)");
        let shader = FunctionCode {
            prototype: Some(format!("{glsl_sig};")),
            body: format!("{glsl_sig} {{\n{}}}\n", render("float", "int")),
        };
        let scalar = FunctionCode {
            prototype: None,
            body: format!("function {name}(x, coef, n) {{\n{}}}\n", render("let", "let")),
        };

        let mut params = args(&[("x", Float), ("coef", Float), ("n", Int)]);
        params[1].array_len = Some(len);
        Kernel::Function(FunctionKernel {
            name,
            args: params,
            return_type: Float,
            deps: Dependencies::default(),
            shader: Some(shader),
            scalar: Some(scalar),
        })
    }
}

/// Every builtin kernel.
pub fn table() -> Vec<Kernel> {
    let mut kernels = vec![
        shader_native("float", Float, &[("x", Float)], "return +x;"),
        shader_native("int", Int, &[("x", Float)], "return Math.trunc(x);"),
        shader_native("bool", Bool, &[("x", Float)], "return !!x;"),
    ];
    for name in UNARY_MATH {
        kernels.push(shader_native(
            name,
            Float,
            &[("x", Float)],
            &format!("return Math.{name}(x);"),
        ));
    }
    kernels.push(shader_native(
        "atan",
        Float,
        &[("y", Float), ("x", Float)],
        "return x === undefined ? Math.atan(y) : Math.atan2(y, x);",
    ));
    for name in ["pow", "min", "max"] {
        kernels.push(shader_native(
            name,
            Float,
            &[("a", Float), ("b", Float)],
            &format!("return Math.{name}(a, b);"),
        ));
    }

    kernels.push(portable(
        "imod",
        Int,
        &[("a", Int), ("b", Int)],
        "return a - b * (a / b);",
        "return a % b;",
    ));
    kernels.push(portable(
        "is_odd",
        Bool,
        &[("x", Int)],
        "return x - 2 * (x / 2) != 0;",
        "return (x & 1) !== 0;",
    ));

    kernels.push(Kernel::Constant(ValueKernel {
        name: NAN_LITERAL.to_string(),
        ty: Float,
        value: KernelValue::Scalar(f64::NAN),
        literals: vec![NAN_LITERAL.to_string()],
    }));

    for poly in Polynomial::ALL {
        for len in 1..=ARRAY_HELPER_MAX_LEN {
            kernels.push(poly.kernel(len));
        }
    }
    kernels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{GlslVersion, Target, TargetFamily};
    use std::collections::HashSet;

    fn find<'a>(table: &'a [Kernel], name: &str) -> &'a FunctionKernel {
        table
            .iter()
            .find_map(|k| k.as_function().filter(|f| f.name == name))
            .unwrap()
    }

    #[test]
    fn names_are_unique() {
        let table = table();
        let names: HashSet<&str> = table.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), table.len());
        assert_eq!(table.len(), 3 + UNARY_MATH.len() + 4 + 2 + 1 + 3 * ARRAY_HELPER_MAX_LEN);
    }

    #[test]
    fn every_function_has_a_scalar_body() {
        for k in table() {
            if let Some(f) = k.as_function() {
                assert!(f.code(TargetFamily::Scalar).is_some(), "{}", f.name);
            }
        }
    }

    #[test]
    fn shader_native_functions_have_no_shader_body() {
        let table = table();
        for name in ["float", "int", "bool", "sin", "pow", "atan", "abs"] {
            assert!(find(&table, name).shader.is_none(), "{name}");
        }
        assert!(find(&table, "imod").shader.is_some());
        assert_eq!(
            find(&table, "sqrt").scalar.as_ref().map(|c| c.body.as_str()),
            Some("function sqrt(x) {\n    return Math.sqrt(x);\n}\n")
        );
    }

    #[test]
    fn polynomial_helper_bodies() {
        let table = table();
        let p = find(&table, "p1evlf_8");
        assert_eq!(p.args[1].array_len, Some(8));
        let shader = p.shader.as_ref().unwrap();
        assert_eq!(
            shader.prototype.as_deref(),
            Some("float p1evlf_8(float x, float coef[8], int n);")
        );
        assert_eq!(
            shader.body,
            "float p1evlf_8(float x, float coef[8], int n) {
    float ans = x + coef[0];
    for (int i = 1; i < 8; i++) {
        if (i >= n) {
            break;
        }
        ans = ans * x + coef[i];
    }
    return ans;
}
"
        );
        let scalar = &p.scalar.as_ref().unwrap().body;
        assert!(scalar.starts_with("function p1evlf_8(x, coef, n) {\n    let ans = x + coef[0];\n"));
        assert!(scalar.contains("for (let i = 1; i < 8; i++) {"));
        assert!(find(&table, "chbevlf_32").shader.is_some());
    }

    #[test]
    fn nan_constant_declarations() {
        let table = table();
        let nan = table.iter().find(|k| k.name() == "NAN").unwrap();
        assert_eq!(
            nan.declaration(Target::Glsl(GlslVersion::V300)).unwrap(),
            "const float NAN = intBitsToFloat(0x7fc00000);"
        );
        assert_eq!(
            nan.declaration(Target::Glsl(GlslVersion::V100)).unwrap(),
            "uniform float NAN;"
        );
        assert_eq!(nan.declaration(Target::Js).unwrap(), "const NAN = NaN;");
    }
}
