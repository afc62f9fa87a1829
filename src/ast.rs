//! Syntax-tree contract consumed by the back end.
//!
//! The parser (out of scope here) is expected to hand over this typed tree.
//! `line` numbers are 1-based and name the source line a diagnostic should
//! point at.

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<ExtDef>,
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtDef {
    /// `int a, b[10];`
    Globals { spec: Specifier, vars: Vec<VarDec> },
    /// `struct S { ... };` — declares the type, no variables.
    TypeDef { spec: Specifier },
    /// Function prototype.
    FunctionDecl {
        spec: Specifier,
        header: FunHeader,
    },
    FunctionDef {
        spec: Specifier,
        header: FunHeader,
        body: CompSt,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Specifier {
    Basic(Primitive),
    /// `struct [name] { fields }`
    StructDef {
        name: Option<String>,
        fields: Vec<Def>,
        line: u32,
    },
    /// `struct name` referring to an earlier definition.
    StructRef { name: String, line: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Int,
    Float,
}

/// A declarator: the name plus any array dimensions, outermost first
/// (`a[3][4]` carries `dims: [3, 4]`).
#[derive(Debug, Clone, PartialEq)]
pub struct VarDec {
    pub name: String,
    pub dims: Vec<u32>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunHeader {
    pub name: String,
    pub params: Vec<Param>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub spec: Specifier,
    pub dec: VarDec,
}

/// `{ defs... stmts... }` — all local definitions precede the statements.
#[derive(Debug, Clone, PartialEq)]
pub struct CompSt {
    pub defs: Vec<Def>,
    pub stmts: Vec<Stmt>,
}

/// One specifier applied to one or more declarators, e.g. `int a, b = 1;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub spec: Specifier,
    pub decs: Vec<Dec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dec {
    pub var: VarDec,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Compound(CompSt),
    Return { value: Expr },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While { cond: Expr, body: Box<Stmt> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Expr { kind, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        field: String,
    },
    Variable(String),
    IntLit(i32),
    FloatLit(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    /// Operators translated through the conditional (label-based) scheme.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}
