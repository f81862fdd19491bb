//! End-to-end runs of the standard pipeline on parsed units.

use ckern_ast::parse_file;
use ckern_transform::{transform, PipelineConfig, TransformError};
use serde_json::{json, Value};

fn type_decl(name: &str, ty: &str) -> Value {
    json!({
        "_nodetype": "TypeDecl", "coord": null, "declname": name, "quals": [],
        "type": {"_nodetype": "IdentifierType", "coord": null, "names": [ty]}
    })
}

fn decl(name: &str, ty: Value, init: Value, storage: &[&str]) -> Value {
    json!({
        "_nodetype": "Decl", "coord": null, "name": name, "quals": [],
        "storage": storage, "funcspec": [], "init": init, "bitsize": null, "type": ty
    })
}

fn id(name: &str) -> Value {
    json!({"_nodetype": "ID", "coord": null, "name": name})
}

fn constant(ty: &str, v: &str) -> Value {
    json!({"_nodetype": "Constant", "coord": null, "type": ty, "value": v})
}

fn binop(op: &str, left: Value, right: Value) -> Value {
    json!({"_nodetype": "BinaryOp", "coord": null, "op": op, "left": left, "right": right})
}

fn call(name: &str, args: Vec<Value>) -> Value {
    json!({
        "_nodetype": "FuncCall", "coord": null, "name": id(name),
        "args": {"_nodetype": "ExprList", "coord": null, "exprs": args}
    })
}

fn function(name: &str, ret: &str, params: Vec<Value>, body: Vec<Value>) -> Value {
    json!({
        "_nodetype": "FuncDef", "coord": null, "param_decls": null,
        "decl": decl(name, json!({
            "_nodetype": "FuncDecl", "coord": null,
            "args": {"_nodetype": "ParamList", "coord": null, "params": params},
            "type": type_decl(name, ret)
        }), Value::Null, &[]),
        "body": {"_nodetype": "Compound", "coord": null, "block_items": body}
    })
}

fn scalar_param(name: &str, ty: &str) -> Value {
    decl(name, type_decl(name, ty), Value::Null, &[])
}

fn unit(ext: Vec<Value>) -> Value {
    json!({"_nodetype": "FileAST", "coord": null, "ext": ext})
}

/// ```c
/// static const float P[3] = {1.0f, 2.0f, 3.0f};
/// float polevlf(float x, float coef[], int N);
/// float f(float x) {
///     int n = 0;
///     while (x > 1.0f) { x = x / 2.0f; n++; }
///     return (x < 0 ? -x : x) + (float) n + polevlf(x, P, 2);
/// }
/// ```
fn halving_unit() -> Value {
    let table = decl(
        "P",
        json!({
            "_nodetype": "ArrayDecl", "coord": null, "dim": constant("int", "3"), "dim_quals": [],
            "type": type_decl("P", "float")
        }),
        json!({"_nodetype": "InitList", "coord": null, "exprs": [
            constant("float", "1.0f"), constant("float", "2.0f"), constant("float", "3.0f")
        ]}),
        &["static"],
    );
    let coef = decl(
        "coef",
        json!({
            "_nodetype": "ArrayDecl", "coord": null, "dim": null, "dim_quals": [],
            "type": type_decl("coef", "float")
        }),
        Value::Null,
        &[],
    );
    let prototype = decl(
        "polevlf",
        json!({
            "_nodetype": "FuncDecl", "coord": null,
            "args": {"_nodetype": "ParamList", "coord": null, "params": [
                scalar_param("x", "float"), coef, scalar_param("N", "int")
            ]},
            "type": type_decl("polevlf", "float")
        }),
        Value::Null,
        &[],
    );
    let neg = json!({"_nodetype": "UnaryOp", "coord": null, "op": "-", "expr": id("x")});
    let abs = json!({
        "_nodetype": "TernaryOp", "coord": null,
        "cond": binop("<", id("x"), constant("int", "0")),
        "iftrue": neg, "iffalse": id("x")
    });
    let cast = json!({
        "_nodetype": "Cast", "coord": null,
        "to_type": {"_nodetype": "Typename", "coord": null, "name": null,
                    "quals": [], "type": type_decl("", "float")},
        "expr": id("n")
    });
    let body = vec![
        decl("n", type_decl("n", "int"), constant("int", "0"), &[]),
        json!({
            "_nodetype": "While", "coord": "halve.c:5:5",
            "cond": binop(">", id("x"), constant("float", "1.0f")),
            "stmt": {"_nodetype": "Compound", "coord": null, "block_items": [
                {"_nodetype": "Assignment", "coord": null, "op": "=", "lvalue": id("x"),
                 "rvalue": binop("/", id("x"), constant("float", "2.0f"))},
                {"_nodetype": "UnaryOp", "coord": null, "op": "p++", "expr": id("n")}
            ]}
        }),
        json!({
            "_nodetype": "Return", "coord": null,
            "expr": binop("+", binop("+", abs, cast), call("polevlf", vec![id("x"), id("P"), constant("int", "2")]))
        }),
    ];
    unit(vec![
        table,
        prototype,
        function("f", "float", vec![scalar_param("x", "float")], body),
    ])
}

#[test]
fn standard_pipeline_normalizes_a_unit() {
    let file = parse_file(&halving_unit()).unwrap();
    let out = transform(file, &PipelineConfig::standard("halve")).unwrap();
    let text = out.file.to_string();

    assert!(
        text.starts_with("float polevlf_3(float x, float coef[3], int n);\n"),
        "{text}"
    );
    assert!(text.contains("float halve_P[3] = {1.0, 2.0, 3.0};"), "{text}");
    assert!(!text.contains("static"), "{text}");
    assert!(!text.contains("while"), "{text}");
    assert!(
        text.contains("for (int _li0 = 0; _li0 < 1000; _li0++) {"),
        "{text}"
    );
    assert!(text.contains("if (!(x > 1.0)) {"), "{text}");
    assert!(
        text.contains("return abs(x) + float(n) + polevlf_3(x, halve_P, 2);"),
        "{text}"
    );

    assert_eq!(out.report.unit, "halve");
    assert_eq!(out.report.names_issued, 1);
    assert_eq!(out.report.pass("loop-normalization").map(|s| s.rewritten), Some(1));
    assert_eq!(out.report.pass("static-arrays").map(|s| s.inserted), Some(1));
}

#[test]
fn pipeline_output_is_a_fixed_point() {
    let file = parse_file(&halving_unit()).unwrap();
    let config = PipelineConfig::standard("halve");
    let once = transform(file, &config).unwrap().file;
    let twice = transform(once.clone(), &config).unwrap().file;
    assert_eq!(twice.to_string(), once.to_string());
}

#[test]
fn unknown_goto_label_fails_the_unit() {
    let body = vec![
        json!({"_nodetype": "Goto", "coord": "g.c:2:5", "name": "nowhere"}),
        json!({"_nodetype": "Return", "coord": null, "expr": id("x")}),
    ];
    let file = parse_file(&unit(vec![function(
        "g",
        "float",
        vec![scalar_param("x", "float")],
        body,
    )]))
    .unwrap();
    let err = transform(file, &PipelineConfig::standard("g")).unwrap_err();
    assert!(matches!(err, TransformError::UnknownLabel { ref label, .. } if label == "nowhere"));
}
