//! AST builders shared by the integration tests.

#![allow(dead_code)]

use cmmc::ast::*;

pub fn program(items: Vec<ExtDef>) -> Program {
    Program { items }
}

pub fn int_spec() -> Specifier {
    Specifier::Basic(Primitive::Int)
}

pub fn float_spec() -> Specifier {
    Specifier::Basic(Primitive::Float)
}

pub fn struct_def(name: &str, fields: Vec<Def>, line: u32) -> Specifier {
    Specifier::StructDef {
        name: Some(name.to_string()),
        fields,
        line,
    }
}

pub fn struct_ref(name: &str, line: u32) -> Specifier {
    Specifier::StructRef {
        name: name.to_string(),
        line,
    }
}

pub fn var_dec(name: &str, line: u32) -> VarDec {
    VarDec {
        name: name.to_string(),
        dims: vec![],
        line,
    }
}

pub fn array_dec(name: &str, dims: &[u32], line: u32) -> VarDec {
    VarDec {
        name: name.to_string(),
        dims: dims.to_vec(),
        line,
    }
}

pub fn def(spec: Specifier, decs: Vec<Dec>) -> Def {
    Def { spec, decs }
}

pub fn dec(var: VarDec) -> Dec {
    Dec { var, init: None }
}

pub fn dec_init(var: VarDec, init: Expr) -> Dec {
    Dec {
        var,
        init: Some(init),
    }
}

pub fn param(name: &str, line: u32) -> Param {
    Param {
        spec: int_spec(),
        dec: var_dec(name, line),
    }
}

pub fn array_param(name: &str, dims: &[u32], line: u32) -> Param {
    Param {
        spec: int_spec(),
        dec: array_dec(name, dims, line),
    }
}

pub fn globals(spec: Specifier, vars: Vec<VarDec>) -> ExtDef {
    ExtDef::Globals { spec, vars }
}

pub fn type_def(spec: Specifier) -> ExtDef {
    ExtDef::TypeDef { spec }
}

pub fn fun_decl(name: &str, spec: Specifier, params: Vec<Param>, line: u32) -> ExtDef {
    ExtDef::FunctionDecl {
        spec,
        header: FunHeader {
            name: name.to_string(),
            params,
            line,
        },
    }
}

pub fn fun_def(
    name: &str,
    spec: Specifier,
    params: Vec<Param>,
    body: CompSt,
    line: u32,
) -> ExtDef {
    ExtDef::FunctionDef {
        spec,
        header: FunHeader {
            name: name.to_string(),
            params,
            line,
        },
        body,
    }
}

pub fn block(defs: Vec<Def>, stmts: Vec<Stmt>) -> CompSt {
    CompSt { defs, stmts }
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr(expr)
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return { value }
}

pub fn if_stmt(cond: Expr, then_branch: Stmt) -> Stmt {
    Stmt::If {
        cond,
        then_branch: Box::new(then_branch),
        else_branch: None,
    }
}

pub fn while_stmt(cond: Expr, body: Stmt) -> Stmt {
    Stmt::While {
        cond,
        body: Box::new(body),
    }
}

pub fn var(name: &str, line: u32) -> Expr {
    Expr::new(ExprKind::Variable(name.to_string()), line)
}

pub fn lit(value: i32, line: u32) -> Expr {
    Expr::new(ExprKind::IntLit(value), line)
}

pub fn float_lit(value: f32, line: u32) -> Expr {
    Expr::new(ExprKind::FloatLit(value), line)
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let line = lhs.line;
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        line,
    )
}

pub fn neg(operand: Expr) -> Expr {
    let line = operand.line;
    Expr::new(
        ExprKind::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(operand),
        },
        line,
    )
}

pub fn not(operand: Expr) -> Expr {
    let line = operand.line;
    Expr::new(
        ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        },
        line,
    )
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    let line = target.line;
    Expr::new(
        ExprKind::Assign {
            target: Box::new(target),
            value: Box::new(value),
        },
        line,
    )
}

pub fn call(callee: &str, args: Vec<Expr>, line: u32) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: callee.to_string(),
            args,
        },
        line,
    )
}

pub fn index(base: Expr, idx: Expr) -> Expr {
    let line = base.line;
    Expr::new(
        ExprKind::Index {
            base: Box::new(base),
            index: Box::new(idx),
        },
        line,
    )
}

pub fn member(base: Expr, field: &str) -> Expr {
    let line = base.line;
    Expr::new(
        ExprKind::Member {
            base: Box::new(base),
            field: field.to_string(),
        },
        line,
    )
}
