//! Validating construction from the parser's JSON dump.
//!
//! Each reader opens a JSON object, checks its `_nodetype` against the
//! tags acceptable in that position, and pulls typed fields out of it.
//! Fields that stand for C features outside the supported subset must be
//! empty; anything else fails construction with the tag and coordinate.

use serde_json::{Map, Value};

use crate::error::{AstError, Result};
use crate::node::{
    ArrayDecl, AssignOp, BinaryOp, Compound, ConstKind, Constant, Coord, Decl, Expr, ExprKind,
    ExternalDecl, FileAst, ForInit, FuncDecl, FuncDef, Stmt, StmtKind, Storage, TypeDecl,
    TypeNode, UnaryOp,
};
use crate::types::ScalarType;

/// Every tag of the wire format this crate understands.
pub const KNOWN_TAGS: &[&str] = &[
    "FileAST",
    "Decl",
    "TypeDecl",
    "IdentifierType",
    "FuncDecl",
    "ParamList",
    "ArrayDecl",
    "PtrDecl",
    "Typename",
    "FuncDef",
    "Compound",
    "DeclList",
    "Return",
    "If",
    "For",
    "While",
    "DoWhile",
    "Break",
    "Continue",
    "Goto",
    "Label",
    "EmptyStatement",
    "ID",
    "Constant",
    "BinaryOp",
    "UnaryOp",
    "Assignment",
    "TernaryOp",
    "FuncCall",
    "ExprList",
    "Cast",
    "ArrayRef",
    "InitList",
];

const STMT_TAGS: &[&str] = &[
    "Decl",
    "Compound",
    "Return",
    "If",
    "For",
    "While",
    "DoWhile",
    "Break",
    "Continue",
    "Goto",
    "Label",
    "EmptyStatement",
];

const EXPR_TAGS: &[&str] = &[
    "ID",
    "Constant",
    "BinaryOp",
    "UnaryOp",
    "Assignment",
    "TernaryOp",
    "FuncCall",
    "ExprList",
    "Cast",
    "ArrayRef",
    "InitList",
];

/// Build a typed tree from a parsed JSON value.
pub fn parse_file(value: &Value) -> Result<FileAst> {
    let node = Node::open(value, &["FileAST"])?;
    let ext = node
        .list("ext")?
        .into_iter()
        .map(read_external)
        .collect::<Result<Vec<_>>>()?;
    Ok(FileAst {
        ext,
        coord: node.coord,
    })
}

/// Build a typed tree from JSON text.
pub fn parse_file_str(text: &str) -> Result<FileAst> {
    let value: Value = serde_json::from_str(text)?;
    parse_file(&value)
}

/// A JSON object opened as a node of a known tag.
struct Node<'a> {
    tag: &'a str,
    fields: &'a Map<String, Value>,
    coord: Coord,
}

impl<'a> Node<'a> {
    /// Open `value` as one of the `expected` tags.
    fn open(value: &'a Value, expected: &[&str]) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| AstError::UnexpectedNode {
            expected: expected.join(" | "),
            found: json_kind(value).to_string(),
            coord: None,
        })?;
        let coord = fields
            .get("coord")
            .and_then(Value::as_str)
            .map(str::to_string);
        let tag = fields
            .get("_nodetype")
            .and_then(Value::as_str)
            .ok_or_else(|| AstError::MissingField {
                node: "node".into(),
                field: "_nodetype".into(),
                coord: coord.clone(),
            })?;
        if !KNOWN_TAGS.contains(&tag) {
            return Err(AstError::UnknownNodeType {
                tag: tag.to_string(),
                coord,
            });
        }
        if !expected.contains(&tag) {
            return Err(AstError::UnexpectedNode {
                expected: expected.join(" | "),
                found: tag.to_string(),
                coord,
            });
        }
        Ok(Self { tag, fields, coord })
    }

    /// Optional child: absent and `null` are both `None`.
    fn opt(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn req(&self, field: &str) -> Result<&'a Value> {
        self.opt(field).ok_or_else(|| self.missing(field))
    }

    fn string(&self, field: &str) -> Result<String> {
        self.req(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field, "expected a string"))
    }

    fn opt_string(&self, field: &str) -> Result<Option<String>> {
        match self.opt(field) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.invalid(field, "expected a string")),
        }
    }

    /// A list of child values; a missing or null list is empty.
    fn list(&self, field: &str) -> Result<Vec<&'a Value>> {
        match self.opt(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.iter().collect()),
            Some(_) => Err(self.invalid(field, "expected a list")),
        }
    }

    fn strings(&self, field: &str) -> Result<Vec<String>> {
        self.list(field)?
            .into_iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(field, "expected a list of strings"))
            })
            .collect()
    }

    /// Fields naming unsupported C features must be empty or null.
    fn assert_empty(&self, field: &str) -> Result<()> {
        match self.opt(field) {
            None => Ok(()),
            Some(Value::Array(items)) if items.is_empty() => Ok(()),
            Some(Value::String(s)) if s.is_empty() => Ok(()),
            Some(other) => Err(AstError::Unsupported {
                node: self.tag.to_string(),
                detail: format!("non-empty '{field}': {other}"),
                coord: self.coord.clone(),
            }),
        }
    }

    fn missing(&self, field: &str) -> AstError {
        AstError::MissingField {
            node: self.tag.to_string(),
            field: field.to_string(),
            coord: self.coord.clone(),
        }
    }

    fn invalid(&self, field: &str, detail: impl Into<String>) -> AstError {
        AstError::InvalidField {
            node: self.tag.to_string(),
            field: field.to_string(),
            detail: detail.into(),
            coord: self.coord.clone(),
        }
    }

    fn unsupported(&self, detail: impl Into<String>) -> AstError {
        AstError::Unsupported {
            node: self.tag.to_string(),
            detail: detail.into(),
            coord: self.coord.clone(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn read_external(value: &Value) -> Result<ExternalDecl> {
    let node = Node::open(value, &["Decl", "FuncDef"])?;
    match node.tag {
        "Decl" => Ok(ExternalDecl::Decl(read_decl_fields(&node)?)),
        _ => Ok(ExternalDecl::FuncDef(read_func_def(&node)?)),
    }
}

fn read_decl(value: &Value) -> Result<Decl> {
    let node = Node::open(value, &["Decl"])?;
    read_decl_fields(&node)
}

fn read_decl_fields(node: &Node<'_>) -> Result<Decl> {
    node.assert_empty("funcspec")?;
    node.assert_empty("align")?;
    node.assert_empty("bitsize")?;

    let quals = node.strings("quals")?;
    if let Some(q) = quals.iter().find(|q| q.as_str() != "const") {
        return Err(node.unsupported(format!("qualifier '{q}'")));
    }
    let storage = node
        .strings("storage")?
        .iter()
        .map(|s| {
            Storage::parse(s).ok_or_else(|| node.unsupported(format!("storage class '{s}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    let ty = read_type(node.req("type")?)?;
    let init = node.opt("init").map(read_expr).transpose()?;

    Ok(Decl {
        name: node.opt_string("name")?,
        quals,
        storage,
        ty,
        init,
        coord: node.coord.clone(),
    })
}

fn read_type(value: &Value) -> Result<TypeNode> {
    let node = Node::open(value, &["TypeDecl", "FuncDecl", "ArrayDecl", "PtrDecl"])?;
    match node.tag {
        "TypeDecl" => Ok(TypeNode::TypeDecl(read_type_decl(&node)?)),
        "FuncDecl" => {
            let params = match node.opt("args") {
                None => Vec::new(),
                Some(v) => read_param_list(v)?,
            };
            Ok(TypeNode::FuncDecl(FuncDecl {
                params,
                ty: Box::new(read_type(node.req("type")?)?),
                coord: node.coord.clone(),
            }))
        }
        "ArrayDecl" => {
            node.assert_empty("dim_quals")?;
            let dim = node.opt("dim").map(read_expr).transpose()?.map(Box::new);
            let inner = read_type(node.req("type")?)?;
            if matches!(inner, TypeNode::ArrayDecl(_)) {
                return Err(node.unsupported("multi-dimensional arrays"));
            }
            Ok(TypeNode::ArrayDecl(ArrayDecl {
                ty: Box::new(inner),
                dim,
                coord: node.coord.clone(),
            }))
        }
        _ => Err(node.unsupported("pointer declarators")),
    }
}

fn read_type_decl(node: &Node<'_>) -> Result<TypeDecl> {
    node.assert_empty("align")?;
    let quals = node.strings("quals")?;
    if let Some(q) = quals.iter().find(|q| q.as_str() != "const") {
        return Err(node.unsupported(format!("qualifier '{q}'")));
    }
    let ident = Node::open(node.req("type")?, &["IdentifierType"])?;
    let names = ident.strings("names")?;
    let scalar = ScalarType::from_names(&names)
        .ok_or_else(|| ident.unsupported(format!("type '{}'", names.join(" "))))?;
    Ok(TypeDecl {
        declname: node.opt_string("declname")?,
        quals,
        names,
        scalar,
        coord: node.coord.clone(),
    })
}

/// Read a `ParamList`; a lone unnamed `void` parameter means no parameters.
fn read_param_list(value: &Value) -> Result<Vec<Decl>> {
    let node = Node::open(value, &["ParamList"])?;
    let mut params = Vec::new();
    for item in node.list("params")? {
        let param = Node::open(item, &["Decl", "Typename"])?;
        let decl = match param.tag {
            "Decl" => read_decl_fields(&param)?,
            _ => {
                let ty = read_typename_type(&param)?;
                Decl {
                    name: None,
                    quals: param.strings("quals")?,
                    storage: Vec::new(),
                    ty,
                    init: None,
                    coord: param.coord.clone(),
                }
            }
        };
        params.push(decl);
    }
    if let [only] = params.as_slice() {
        if only.name.is_none()
            && matches!(&only.ty, TypeNode::TypeDecl(t) if t.scalar == ScalarType::Void)
        {
            params.clear();
        }
    }
    Ok(params)
}

fn read_typename_type(node: &Node<'_>) -> Result<TypeNode> {
    node.assert_empty("align")?;
    read_type(node.req("type")?)
}

fn read_func_def(node: &Node<'_>) -> Result<FuncDef> {
    node.assert_empty("param_decls")?;
    let decl = read_decl(node.req("decl")?)?;
    if !decl.is_function() {
        return Err(node.invalid("decl", "function definition without a function declarator"));
    }
    let body = read_compound(node.req("body")?)?;
    Ok(FuncDef {
        decl,
        body,
        coord: node.coord.clone(),
    })
}

fn read_compound(value: &Value) -> Result<Compound> {
    let node = Node::open(value, &["Compound"])?;
    read_compound_fields(&node)
}

fn read_compound_fields(node: &Node<'_>) -> Result<Compound> {
    let items = node
        .list("block_items")?
        .into_iter()
        .map(read_stmt)
        .collect::<Result<Vec<_>>>()?;
    Ok(Compound {
        items,
        coord: node.coord.clone(),
    })
}

/// Read a statement; bare expression nodes become expression statements.
fn read_stmt(value: &Value) -> Result<Stmt> {
    let mut expected: Vec<&str> = STMT_TAGS.to_vec();
    expected.extend_from_slice(EXPR_TAGS);
    let node = Node::open(value, &expected)?;
    let coord = node.coord.clone();

    let kind = match node.tag {
        "Decl" => StmtKind::Decl(read_decl_fields(&node)?),
        "Compound" => StmtKind::Compound(read_compound_fields(&node)?),
        "Return" => StmtKind::Return(node.opt("expr").map(read_expr).transpose()?),
        "If" => StmtKind::If {
            cond: read_expr(node.req("cond")?)?,
            then: Box::new(read_stmt_or_empty(node.opt("iftrue"))?),
            otherwise: node.opt("iffalse").map(read_stmt).transpose()?.map(Box::new),
        },
        "For" => StmtKind::For {
            init: node.opt("init").map(read_for_init).transpose()?,
            cond: node.opt("cond").map(read_expr).transpose()?,
            next: node.opt("next").map(read_expr).transpose()?,
            body: Box::new(read_stmt_or_empty(node.opt("stmt"))?),
        },
        "While" => StmtKind::While {
            cond: read_expr(node.req("cond")?)?,
            body: Box::new(read_stmt_or_empty(node.opt("stmt"))?),
        },
        "DoWhile" => StmtKind::DoWhile {
            cond: read_expr(node.req("cond")?)?,
            body: Box::new(read_stmt_or_empty(node.opt("stmt"))?),
        },
        "Break" => StmtKind::Break,
        "Continue" => StmtKind::Continue,
        "EmptyStatement" => StmtKind::Empty,
        "Goto" => StmtKind::Goto(node.string("name")?),
        "Label" => StmtKind::Label {
            name: node.string("name")?,
            stmt: Box::new(read_stmt_or_empty(node.opt("stmt"))?),
        },
        _ => StmtKind::Expr(read_expr_fields(&node)?),
    };
    Ok(Stmt { kind, coord })
}

fn read_stmt_or_empty(value: Option<&Value>) -> Result<Stmt> {
    match value {
        Some(v) => read_stmt(v),
        None => Ok(Stmt::new(StmtKind::Empty)),
    }
}

fn read_for_init(value: &Value) -> Result<ForInit> {
    let mut expected = vec!["DeclList"];
    expected.extend_from_slice(EXPR_TAGS);
    let node = Node::open(value, &expected)?;
    if node.tag == "DeclList" {
        let decls = node
            .list("decls")?
            .into_iter()
            .map(read_decl)
            .collect::<Result<Vec<_>>>()?;
        Ok(ForInit::Decls(decls))
    } else {
        Ok(ForInit::Expr(read_expr_fields(&node)?))
    }
}

fn read_expr(value: &Value) -> Result<Expr> {
    let node = Node::open(value, EXPR_TAGS)?;
    read_expr_fields(&node)
}

fn read_boxed(node: &Node<'_>, field: &str) -> Result<Box<Expr>> {
    Ok(Box::new(read_expr(node.req(field)?)?))
}

fn read_expr_fields(node: &Node<'_>) -> Result<Expr> {
    let kind = match node.tag {
        "ID" => ExprKind::Id(node.string("name")?),
        "Constant" => {
            let ty = node.string("type")?;
            let kind = if ty.contains("int") {
                ConstKind::Int
            } else if ty.contains("float") || ty.contains("double") {
                ConstKind::Float
            } else if ty == "char" {
                ConstKind::Char
            } else if ty == "string" {
                ConstKind::Str
            } else {
                return Err(node.invalid("type", format!("unknown constant type '{ty}'")));
            };
            ExprKind::Constant(Constant {
                kind,
                value: node.string("value")?,
            })
        }
        "BinaryOp" => {
            let op = node.string("op")?;
            ExprKind::Binary {
                op: BinaryOp::parse(&op)
                    .ok_or_else(|| node.unsupported(format!("operator '{op}'")))?,
                left: read_boxed(node, "left")?,
                right: read_boxed(node, "right")?,
            }
        }
        "UnaryOp" => {
            let op = node.string("op")?;
            ExprKind::Unary {
                op: UnaryOp::parse(&op)
                    .ok_or_else(|| node.unsupported(format!("operator '{op}'")))?,
                operand: read_boxed(node, "expr")?,
            }
        }
        "Assignment" => {
            let op = node.string("op")?;
            ExprKind::Assign {
                op: AssignOp::parse(&op)
                    .ok_or_else(|| node.unsupported(format!("operator '{op}'")))?,
                target: read_boxed(node, "lvalue")?,
                value: read_boxed(node, "rvalue")?,
            }
        }
        "TernaryOp" => ExprKind::Ternary {
            cond: read_boxed(node, "cond")?,
            then: read_boxed(node, "iftrue")?,
            otherwise: read_boxed(node, "iffalse")?,
        },
        "FuncCall" => {
            let callee = Node::open(node.req("name")?, EXPR_TAGS)?;
            if callee.tag != "ID" {
                return Err(callee.unsupported("calls through expressions"));
            }
            let args = match node.opt("args") {
                None => Vec::new(),
                Some(v) => read_expr_list(v)?,
            };
            ExprKind::Call {
                name: callee.string("name")?,
                args,
            }
        }
        "ExprList" => ExprKind::Comma(read_expr_list_fields(node)?),
        "Cast" => {
            let typename = Node::open(node.req("to_type")?, &["Typename"])?;
            let to = match read_typename_type(&typename)? {
                TypeNode::TypeDecl(t) => t.scalar,
                _ => return Err(typename.unsupported("cast to a non-scalar type")),
            };
            ExprKind::Cast {
                to,
                expr: read_boxed(node, "expr")?,
            }
        }
        "ArrayRef" => ExprKind::Index {
            array: read_boxed(node, "name")?,
            index: read_boxed(node, "subscript")?,
        },
        "InitList" => ExprKind::InitList(read_expr_list_fields(node)?),
        other => {
            return Err(AstError::UnexpectedNode {
                expected: "expression".into(),
                found: other.to_string(),
                coord: node.coord.clone(),
            })
        }
    };
    Ok(Expr {
        kind,
        coord: node.coord.clone(),
    })
}

fn read_expr_list(value: &Value) -> Result<Vec<Expr>> {
    let node = Node::open(value, &["ExprList"])?;
    read_expr_list_fields(&node)
}

fn read_expr_list_fields(node: &Node<'_>) -> Result<Vec<Expr>> {
    node.list("exprs")?.into_iter().map(read_expr).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn type_decl(name: &str, ty: &str) -> Value {
        json!({
            "_nodetype": "TypeDecl", "coord": null, "declname": name, "quals": [],
            "type": {"_nodetype": "IdentifierType", "coord": null, "names": [ty]}
        })
    }

    fn id(name: &str) -> Value {
        json!({"_nodetype": "ID", "coord": null, "name": name})
    }

    fn float_const(v: &str) -> Value {
        json!({"_nodetype": "Constant", "coord": null, "type": "float", "value": v})
    }

    fn square_fn() -> Value {
        json!({
            "_nodetype": "FileAST", "coord": null,
            "ext": [{
                "_nodetype": "FuncDef", "coord": "sq.c:1:7", "param_decls": null,
                "decl": {
                    "_nodetype": "Decl", "coord": "sq.c:1:7", "name": "sq",
                    "quals": [], "storage": [], "funcspec": [], "init": null, "bitsize": null,
                    "type": {
                        "_nodetype": "FuncDecl", "coord": null,
                        "args": {"_nodetype": "ParamList", "coord": null, "params": [{
                            "_nodetype": "Decl", "coord": null, "name": "x",
                            "quals": [], "storage": [], "funcspec": [], "init": null,
                            "bitsize": null, "type": type_decl("x", "float")
                        }]},
                        "type": type_decl("sq", "float")
                    }
                },
                "body": {
                    "_nodetype": "Compound", "coord": null,
                    "block_items": [{
                        "_nodetype": "Return", "coord": "sq.c:2:3",
                        "expr": {
                            "_nodetype": "BinaryOp", "coord": null, "op": "*",
                            "left": id("x"), "right": id("x")
                        }
                    }]
                }
            }]
        })
    }

    #[test]
    fn parse_simple_function() {
        let file = parse_file(&square_fn()).unwrap();
        assert_eq!(file.ext.len(), 1);
        let ExternalDecl::FuncDef(def) = &file.ext[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(def.name(), "sq");
        assert_eq!(def.return_type(), ScalarType::Float);
        assert_eq!(def.params().len(), 1);
        assert_eq!(def.params()[0].name.as_deref(), Some("x"));
        assert_eq!(def.body.items.len(), 1);
        assert!(def.body.items[0].is_return());
        assert_eq!(def.body.items[0].coord.as_deref(), Some("sq.c:2:3"));
    }

    #[test]
    fn void_param_list_is_empty() {
        let value = json!({
            "_nodetype": "FuncDecl", "coord": null,
            "args": {"_nodetype": "ParamList", "coord": null, "params": [{
                "_nodetype": "Typename", "coord": null, "name": null, "quals": [],
                "type": type_decl("", "void")
            }]},
            "type": type_decl("f", "int")
        });
        let TypeNode::FuncDecl(f) = read_type(&value).unwrap() else {
            panic!("expected FuncDecl");
        };
        assert!(f.params.is_empty());
    }

    #[test]
    fn unknown_tag_rejected() {
        let value = json!({"_nodetype": "Struct", "coord": "a.c:3:1"});
        let err = read_expr(&value).unwrap_err();
        assert!(matches!(err, AstError::UnknownNodeType { ref tag, .. } if tag == "Struct"));
        assert!(err.to_string().contains("a.c:3:1"));
    }

    #[test]
    fn wrong_position_rejected() {
        let value = json!({"_nodetype": "FuncDef", "coord": null});
        let err = read_expr(&value).unwrap_err();
        assert!(matches!(err, AstError::UnexpectedNode { .. }));
    }

    #[test]
    fn non_empty_funcspec_rejected() {
        let value = json!({
            "_nodetype": "Decl", "coord": "a.c:1:1", "name": "f",
            "quals": [], "storage": [], "funcspec": ["inline"], "init": null,
            "bitsize": null, "type": type_decl("f", "int")
        });
        let err = read_decl(&value).unwrap_err();
        assert!(matches!(err, AstError::Unsupported { ref node, .. } if node == "Decl"));
    }

    #[test]
    fn pointer_declarator_rejected() {
        let value = json!({
            "_nodetype": "PtrDecl", "coord": null, "quals": [],
            "type": type_decl("p", "float")
        });
        assert!(matches!(
            read_type(&value),
            Err(AstError::Unsupported { .. })
        ));
    }

    #[test]
    fn address_of_rejected() {
        let value = json!({
            "_nodetype": "UnaryOp", "coord": null, "op": "&", "expr": id("e")
        });
        assert!(matches!(read_expr(&value), Err(AstError::Unsupported { .. })));
    }

    #[test]
    fn volatile_qualifier_rejected() {
        let value = json!({
            "_nodetype": "Decl", "coord": null, "name": "x",
            "quals": ["volatile"], "storage": [], "funcspec": [], "init": null,
            "bitsize": null, "type": type_decl("x", "int")
        });
        assert!(read_decl(&value).is_err());
    }

    #[test]
    fn static_const_array_with_init() {
        let value = json!({
            "_nodetype": "Decl", "coord": null, "name": "P",
            "quals": ["const"], "storage": ["static"], "funcspec": [], "bitsize": null,
            "type": {
                "_nodetype": "ArrayDecl", "coord": null, "dim": null, "dim_quals": [],
                "type": {
                    "_nodetype": "TypeDecl", "coord": null, "declname": "P", "quals": ["const"],
                    "type": {"_nodetype": "IdentifierType", "coord": null, "names": ["float"]}
                }
            },
            "init": {"_nodetype": "InitList", "coord": null,
                     "exprs": [float_const("1.0"), float_const("2.5e-1")]}
        });
        let decl = read_decl(&value).unwrap();
        assert!(decl.is_static());
        assert!(decl.is_const());
        assert_eq!(decl.array_len(), Some(2));
        assert_eq!(decl.scalar_type(), ScalarType::Float);
    }

    #[test]
    fn statements_and_expression_items() {
        let value = json!({
            "_nodetype": "Compound", "coord": null,
            "block_items": [
                {"_nodetype": "Assignment", "coord": null, "op": "+=",
                 "lvalue": id("y"), "rvalue": float_const("1.0")},
                {"_nodetype": "While", "coord": null,
                 "cond": {"_nodetype": "BinaryOp", "coord": null, "op": "<",
                          "left": id("y"), "right": float_const("10.0")},
                 "stmt": {"_nodetype": "UnaryOp", "coord": null, "op": "p++", "expr": id("y")}},
                {"_nodetype": "Goto", "coord": null, "name": "done"},
                {"_nodetype": "Label", "coord": null, "name": "done",
                 "stmt": {"_nodetype": "Return", "coord": null, "expr": id("y")}}
            ]
        });
        let compound = read_compound(&value).unwrap();
        assert_eq!(compound.items.len(), 4);
        assert!(matches!(compound.items[0].kind, StmtKind::Expr(_)));
        assert!(matches!(compound.items[1].kind, StmtKind::While { .. }));
        assert!(matches!(&compound.items[2].kind, StmtKind::Goto(l) if l == "done"));
        assert!(matches!(&compound.items[3].kind, StmtKind::Label { name, .. } if name == "done"));
    }

    #[test]
    fn cast_resolves_scalar() {
        let value = json!({
            "_nodetype": "Cast", "coord": null,
            "to_type": {"_nodetype": "Typename", "coord": null, "name": null, "quals": [],
                        "type": type_decl("", "double")},
            "expr": id("n")
        });
        let expr = read_expr(&value).unwrap();
        assert!(matches!(expr.kind, ExprKind::Cast { to: ScalarType::Float, .. }));
    }

    #[test]
    fn parse_from_text() {
        let text = square_fn().to_string();
        assert!(parse_file_str(&text).is_ok());
        assert!(matches!(parse_file_str("{not json"), Err(AstError::Json(_))));
    }
}
