//! Scope-aware semantic analysis.
//!
//! Walks the typed AST, populates the symbol table, and accumulates
//! diagnostics instead of stopping at the first problem. Diagnostics carry
//! a fixed code from the language's 19-entry taxonomy and render as
//! `Error type <N> at Line <line>: <message>.`

pub mod types;

use std::collections::HashSet;
use std::fmt;

use crate::ast::{
    BinaryOp, CompSt, Dec, Def, Expr, ExprKind, ExtDef, FunHeader, Primitive, Program, Specifier,
    Stmt, UnaryOp, VarDec,
};
use crate::symtab::{FunDecRecord, ScopeKind, ScopePolicy, SymbolTable};
use types::{compare_types, matched_field_lists, render_field_list, Field, Type, TypeRelation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UndefinedVariable = 1,
    UndefinedFunction = 2,
    RedefinedVariable = 3,
    RedefinedFunction = 4,
    AssignmentMismatch = 5,
    AssignmentToRvalue = 6,
    OperandMismatch = 7,
    ReturnMismatch = 8,
    ArgumentMismatch = 9,
    NotAnArray = 10,
    NotAFunction = 11,
    NonIntegerIndex = 12,
    IllegalFieldAccess = 13,
    NonExistentField = 14,
    RedefinedField = 15,
    DuplicatedStructName = 16,
    UndefinedStructure = 17,
    MissingFunctionDefinition = 18,
    InconsistentFunction = 19,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticError {
    pub code: ErrorCode,
    pub line: u32,
    pub message: String,
}

impl SemanticError {
    pub fn new(code: ErrorCode, line: u32, message: impl Into<String>) -> Self {
        SemanticError {
            code,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error type {} at Line {}: {}.",
            self.code as u8, self.line, self.message
        )
    }
}

impl std::error::Error for SemanticError {}

/// Result of checking one expression: its type plus whether an assignment
/// may store into it.
struct Checked {
    ty: Type,
    assignable: bool,
}

impl Checked {
    fn rvalue(ty: Type) -> Self {
        Checked {
            ty,
            assignable: false,
        }
    }

    fn lvalue(ty: Type) -> Self {
        Checked {
            ty,
            assignable: true,
        }
    }

    fn error() -> Self {
        Checked::rvalue(Type::Error)
    }
}

/// Outcome of reconciling a declaration or definition against the table.
enum AddFunctionOutcome {
    NewDeclaration,
    NewDefinition,
    DifferentKind,
    Redefined,
    NewlyDefined,
    ConsistentDeclaration,
    InconsistentDeclaration,
    InconsistentDefinition,
}

pub struct TypeChecker {
    table: SymbolTable,
    errors: Vec<SemanticError>,
}

impl TypeChecker {
    /// An analyzer with ordinary lexical scoping.
    pub fn new() -> Self {
        TypeChecker::with_policy(ScopePolicy::Nested)
    }

    /// `ScopePolicy::Flat` keeps every symbol in the finished table so it
    /// can drive IR generation afterwards.
    pub fn with_policy(policy: ScopePolicy) -> Self {
        TypeChecker {
            table: SymbolTable::new(policy),
            errors: Vec::new(),
        }
    }

    pub fn check_program(&mut self, program: &Program) -> Result<(), Vec<SemanticError>> {
        for item in &program.items {
            self.check_ext_def(item);
        }
        self.check_undefined_functions();
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors.clone())
        }
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_symbol_table(self) -> SymbolTable {
        self.table
    }

    pub fn errors(&self) -> &[SemanticError] {
        &self.errors
    }

    fn error(&mut self, code: ErrorCode, line: u32, message: impl Into<String>) {
        self.errors.push(SemanticError::new(code, line, message));
    }

    fn check_ext_def(&mut self, def: &ExtDef) {
        match def {
            ExtDef::Globals { spec, vars } => {
                let ty = self.check_specifier(spec);
                for var in vars {
                    self.declare_var(var, &ty, false);
                }
            }
            ExtDef::TypeDef { spec } => {
                self.check_specifier(spec);
            }
            ExtDef::FunctionDecl { spec, header } => {
                let ret = self.check_specifier(spec);
                // Params of a pure declaration still get a throwaway scope.
                self.table.enter_scope(ScopeKind::Ordinary);
                let fun = self.check_fun_header(header, ret, false);
                self.register_function(fun, header.line);
                self.table.exit_scope();
            }
            ExtDef::FunctionDef { spec, header, body } => {
                let ret = self.check_specifier(spec);
                // Parameters and body share one scope, entered before the
                // header so the function is visible to recursive calls.
                self.table.enter_scope(ScopeKind::Ordinary);
                let fun = self.check_fun_header(header, ret.clone(), true);
                self.register_function(fun, header.line);
                self.check_comp_st(body, &ret);
                self.table.exit_scope();
            }
        }
    }

    fn check_specifier(&mut self, spec: &Specifier) -> Type {
        match spec {
            Specifier::Basic(Primitive::Int) => Type::Int,
            Specifier::Basic(Primitive::Float) => Type::Float,
            Specifier::StructDef { name, fields, line } => {
                if let Some(tag) = name {
                    if self.table.is_duplicate_here(tag) {
                        self.error(
                            ErrorCode::DuplicatedStructName,
                            *line,
                            format!("Duplicated name \"{}\"", tag),
                        );
                        return Type::Error;
                    }
                }
                self.table.enter_scope(ScopeKind::StructBody);
                let field_list = self.check_defs(fields);
                self.table.exit_scope();
                self.table
                    .add_structure(name.clone().unwrap_or_default(), field_list)
            }
            Specifier::StructRef { name, line } => match self.table.lookup(name) {
                Some(symbol) => symbol.ty.clone(),
                None => {
                    self.error(
                        ErrorCode::UndefinedStructure,
                        *line,
                        format!("Undefined structure \"{}\"", name),
                    );
                    Type::Error
                }
            },
        }
    }

    /// Checks a definition block and returns the declared fields, in
    /// order, skipping declarators that failed.
    fn check_defs(&mut self, defs: &[Def]) -> Vec<Field> {
        let mut fields = Vec::new();
        for def in defs {
            let ty = self.check_specifier(&def.spec);
            for dec in &def.decs {
                if let Some(field) = self.check_dec(dec, &ty) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    fn check_dec(&mut self, dec: &Dec, base: &Type) -> Option<Field> {
        let field = self.declare_var(&dec.var, base, false)?;
        if let Some(init) = &dec.init {
            let value = self.check_expr(init);
            if compare_types(&field.ty, &value.ty) == TypeRelation::NotMatch {
                self.error(
                    ErrorCode::AssignmentMismatch,
                    dec.var.line,
                    "Type mismatched for assignment",
                );
            }
        }
        Some(field)
    }

    /// Builds the declarator's full type (folding array dimensions,
    /// outermost first) and inserts it, reporting redefinitions with the
    /// wording of the enclosing scope kind.
    fn declare_var(&mut self, var: &VarDec, base: &Type, from_param: bool) -> Option<Field> {
        let mut ty = base.clone();
        for dim in var.dims.iter().rev() {
            ty = Type::Array {
                elem: Box::new(ty),
                size: *dim,
            };
        }
        if self.table.is_duplicate_here(&var.name) {
            match self.table.current_kind() {
                ScopeKind::StructBody => self.error(
                    ErrorCode::RedefinedField,
                    var.line,
                    format!("Redefined field \"{}\"", var.name),
                ),
                ScopeKind::Ordinary => self.error(
                    ErrorCode::RedefinedVariable,
                    var.line,
                    format!("Redefined variable \"{}\"", var.name),
                ),
            }
            return None;
        }
        let by_reference =
            from_param && matches!(ty, Type::Array { .. } | Type::Structure { .. });
        self.table.insert_var(var.name.clone(), ty.clone(), by_reference);
        Some(Field::new(var.name.clone(), ty))
    }

    fn check_fun_header(&mut self, header: &FunHeader, ret: Type, is_defined: bool) -> Type {
        let mut params = Vec::new();
        for param in &header.params {
            let ty = self.check_specifier(&param.spec);
            if let Some(field) = self.declare_var(&param.dec, &ty, true) {
                params.push(field);
            }
        }
        Type::Function {
            name: header.name.clone(),
            params,
            ret: Box::new(ret),
            is_defined,
        }
    }

    fn register_function(&mut self, fun: Type, line: u32) {
        let name = match &fun {
            Type::Function { name, .. } => name.clone(),
            _ => return,
        };
        match self.check_and_add_function(&fun) {
            AddFunctionOutcome::NewDeclaration
            | AddFunctionOutcome::NewDefinition
            | AddFunctionOutcome::ConsistentDeclaration
            | AddFunctionOutcome::NewlyDefined => {
                self.table.record_function(line, name);
            }
            AddFunctionOutcome::Redefined => self.error(
                ErrorCode::RedefinedFunction,
                line,
                format!("Redefined function \"{}\"", name),
            ),
            AddFunctionOutcome::DifferentKind => self.error(
                ErrorCode::InconsistentFunction,
                line,
                format!("\"{}\" redeclared as different kind of symbol", name),
            ),
            AddFunctionOutcome::InconsistentDeclaration => self.error(
                ErrorCode::InconsistentFunction,
                line,
                format!("Inconsistent declaration of function \"{}\"", name),
            ),
            AddFunctionOutcome::InconsistentDefinition => self.error(
                ErrorCode::InconsistentFunction,
                line,
                format!("Inconsistent definition of function \"{}\"", name),
            ),
        }
    }

    fn check_and_add_function(&mut self, fun: &Type) -> AddFunctionOutcome {
        let (name, params, ret, is_def) = match fun {
            Type::Function {
                name,
                params,
                ret,
                is_defined,
            } => (name, params, ret, *is_defined),
            _ => return AddFunctionOutcome::DifferentKind,
        };
        let existing = self.table.lookup(name).map(|symbol| symbol.ty.clone());
        match existing {
            None => {
                self.table.add_function(fun.clone());
                if is_def {
                    AddFunctionOutcome::NewDefinition
                } else {
                    AddFunctionOutcome::NewDeclaration
                }
            }
            Some(Type::Function {
                params: known_params,
                ret: known_ret,
                is_defined: known_def,
                ..
            }) => {
                let consistent = matched_field_lists(params, &known_params)
                    && compare_types(ret, &known_ret) == TypeRelation::Match;
                if is_def {
                    if known_def {
                        AddFunctionOutcome::Redefined
                    } else if consistent {
                        self.table.mark_function_defined(name);
                        AddFunctionOutcome::NewlyDefined
                    } else {
                        AddFunctionOutcome::InconsistentDefinition
                    }
                } else if consistent {
                    AddFunctionOutcome::ConsistentDeclaration
                } else {
                    AddFunctionOutcome::InconsistentDeclaration
                }
            }
            Some(_) => AddFunctionOutcome::DifferentKind,
        }
    }

    /// One "Undefined function" per declared-but-never-defined name, no
    /// matter how many declarations or calls mentioned it.
    fn check_undefined_functions(&mut self) {
        if self.table.all_functions_defined() {
            return;
        }
        let records: Vec<FunDecRecord> = self.table.fun_dec_records().to_vec();
        let mut reported = HashSet::new();
        for record in records {
            if !reported.insert(record.name.clone()) {
                continue;
            }
            let undefined = matches!(
                self.table.lookup(&record.name).map(|s| &s.ty),
                Some(Type::Function {
                    is_defined: false,
                    ..
                })
            );
            if undefined {
                self.error(
                    ErrorCode::MissingFunctionDefinition,
                    record.line,
                    format!("Undefined function \"{}\"", record.name),
                );
            }
        }
    }

    fn check_comp_st(&mut self, body: &CompSt, ret: &Type) {
        self.check_defs(&body.defs);
        for stmt in &body.stmts {
            self.check_stmt(stmt, ret);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, ret: &Type) {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::Compound(body) => {
                self.table.enter_scope(ScopeKind::Ordinary);
                self.check_comp_st(body, ret);
                self.table.exit_scope();
            }
            Stmt::Return { value } => {
                let checked = self.check_expr(value);
                if compare_types(&checked.ty, ret) == TypeRelation::NotMatch {
                    self.error(
                        ErrorCode::ReturnMismatch,
                        value.line,
                        "Type mismatched for return",
                    );
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond);
                self.check_stmt(then_branch, ret);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch, ret);
                }
            }
            Stmt::While { cond, body } => {
                self.check_expr(cond);
                self.check_stmt(body, ret);
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Checked {
        match &expr.kind {
            ExprKind::Assign { target, value } => self.check_assign(target, value),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, expr.line),
            ExprKind::Call { callee, args } => self.check_call(callee, args, expr.line),
            ExprKind::Index { base, index } => self.check_index(base, index),
            ExprKind::Member { base, field } => self.check_member(base, field, expr.line),
            ExprKind::Variable(name) => match self.table.lookup(name) {
                Some(symbol) => {
                    let assignable = !matches!(symbol.ty, Type::Function { .. });
                    Checked {
                        ty: symbol.ty.clone(),
                        assignable,
                    }
                }
                None => {
                    self.error(
                        ErrorCode::UndefinedVariable,
                        expr.line,
                        format!("Undefined variable \"{}\"", name),
                    );
                    Checked::error()
                }
            },
            ExprKind::IntLit(_) => Checked::rvalue(Type::Int),
            ExprKind::FloatLit(_) => Checked::rvalue(Type::Float),
        }
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr) -> Checked {
        let left = self.check_expr(target);
        let right = self.check_expr(value);
        if left.ty == Type::Error {
            return Checked::error();
        }
        if !left.assignable {
            self.error(
                ErrorCode::AssignmentToRvalue,
                target.line,
                "The left-hand side of an assignment must be a variable",
            );
            return Checked::error();
        }
        if compare_types(&left.ty, &right.ty) == TypeRelation::NotMatch {
            self.error(
                ErrorCode::AssignmentMismatch,
                target.line,
                "Type mismatched for assignment",
            );
            return Checked::error();
        }
        Checked::lvalue(left.ty)
    }

    fn check_binary(&mut self, _op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Checked {
        let left = self.check_expr(lhs);
        let right = self.check_expr(rhs);
        match (&left.ty, &right.ty) {
            (Type::Int, Type::Int) | (Type::Float, Type::Float) => Checked::rvalue(left.ty),
            (Type::Error, _) | (_, Type::Error) => Checked::error(),
            _ => {
                self.error(
                    ErrorCode::OperandMismatch,
                    lhs.line,
                    "Type mismatched for operands",
                );
                Checked::error()
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, line: u32) -> Checked {
        let checked = self.check_expr(operand);
        let ok = match op {
            UnaryOp::Negate => matches!(checked.ty, Type::Int | Type::Float),
            UnaryOp::Not => checked.ty == Type::Int,
        };
        if ok {
            Checked::rvalue(checked.ty)
        } else {
            if checked.ty != Type::Error {
                self.error(ErrorCode::OperandMismatch, line, "Type mismatched for operands");
            }
            Checked::error()
        }
    }

    fn check_call(&mut self, callee: &str, args: &[Expr], line: u32) -> Checked {
        let known = self.table.lookup(callee).map(|symbol| symbol.ty.clone());
        match known {
            Some(Type::Function { params, ret, .. }) => {
                let arg_fields: Vec<Field> = args
                    .iter()
                    .map(|arg| Field::new("", self.check_expr(arg).ty))
                    .collect();
                if !matched_field_lists(&arg_fields, &params) {
                    if args.is_empty() {
                        self.error(
                            ErrorCode::ArgumentMismatch,
                            line,
                            format!("Function \"{}\" is not applicable for arguments", callee),
                        );
                    } else {
                        self.error(
                            ErrorCode::ArgumentMismatch,
                            line,
                            format!(
                                "Function \"{}({})\" is not applicable for arguments \"({})\"",
                                callee,
                                render_field_list(&params),
                                render_field_list(&arg_fields)
                            ),
                        );
                    }
                }
                Checked::rvalue((*ret).clone())
            }
            Some(_) => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.error(
                    ErrorCode::NotAFunction,
                    line,
                    format!("\"{}\" is not a function", callee),
                );
                Checked::error()
            }
            None => {
                for arg in args {
                    self.check_expr(arg);
                }
                // The runtime supplies read and write; calling them is fine
                // even though the table has never heard of them.
                if callee != "read" && callee != "write" {
                    self.error(
                        ErrorCode::UndefinedFunction,
                        line,
                        format!("Undefined function \"{}\"", callee),
                    );
                }
                Checked::error()
            }
        }
    }

    fn check_index(&mut self, base: &Expr, index: &Expr) -> Checked {
        let checked_base = self.check_expr(base);
        let checked_index = self.check_expr(index);
        if !matches!(checked_index.ty, Type::Int | Type::Error) {
            self.error(
                ErrorCode::NonIntegerIndex,
                index.line,
                format!("\"{}\" is not an integer", describe(index)),
            );
        }
        match checked_base.ty {
            Type::Array { elem, .. } => Checked::lvalue(*elem),
            Type::Error => Checked::error(),
            _ => {
                self.error(
                    ErrorCode::NotAnArray,
                    base.line,
                    format!("\"{}\" is not an array", describe(base)),
                );
                Checked::error()
            }
        }
    }

    fn check_member(&mut self, base: &Expr, field: &str, line: u32) -> Checked {
        let checked_base = self.check_expr(base);
        match checked_base.ty {
            Type::Structure { fields, .. } => {
                match fields.into_iter().find(|f| f.name == field) {
                    Some(found) => Checked::lvalue(found.ty),
                    None => {
                        self.error(
                            ErrorCode::NonExistentField,
                            line,
                            format!("Non-existent field \"{}\"", field),
                        );
                        Checked::error()
                    }
                }
            }
            Type::Error => Checked::error(),
            _ => {
                self.error(ErrorCode::IllegalFieldAccess, base.line, "Illegal use of \".\"");
                Checked::error()
            }
        }
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        TypeChecker::new()
    }
}

/// Short rendering of an expression for diagnostics that quote their
/// offending operand.
fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Variable(name) => name.clone(),
        ExprKind::IntLit(value) => value.to_string(),
        ExprKind::FloatLit(value) => value.to_string(),
        ExprKind::Member { field, .. } => field.clone(),
        ExprKind::Index { base, .. } => describe(base),
        ExprKind::Call { callee, .. } => callee.clone(),
        _ => "expression".to_string(),
    }
}
