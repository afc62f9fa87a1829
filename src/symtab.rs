//! Scoped symbol table shared by the analyzer and the IR generator.

use std::collections::HashMap;

use crate::typechecker::types::{Field, Type};

/// What kind of region a scope frame covers. Only the diagnostic wording
/// depends on it: a redefinition inside a struct body is a field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Ordinary,
    StructBody,
}

/// How the table treats scope exits.
///
/// `Nested` gives ordinary lexical scoping: frames pop and their symbols
/// disappear. `Flat` keeps every symbol in the root frame so the finished
/// table can drive IR generation after the analysis walk; frames still
/// push and pop, but only as kind markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePolicy {
    Nested,
    Flat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    /// Arrays and structures declared as parameters are passed by address.
    pub by_reference: bool,
}

/// One pending declaration or definition of a function, swept at the end
/// of analysis to report functions that were never defined.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDecRecord {
    pub line: u32,
    pub name: String,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            symbols: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    policy: ScopePolicy,
    records: Vec<FunDecRecord>,
}

impl SymbolTable {
    pub fn new(policy: ScopePolicy) -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeKind::Ordinary)],
            policy,
            records: Vec::new(),
        }
    }

    pub fn enter_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().map(|s| s.kind).unwrap_or(ScopeKind::Ordinary)
    }

    /// The frame new variables land in: the innermost one under `Nested`,
    /// always the root under `Flat`.
    fn target_frame(&mut self) -> &mut Scope {
        match self.policy {
            ScopePolicy::Nested => self.scopes.last_mut().unwrap(),
            ScopePolicy::Flat => self.scopes.first_mut().unwrap(),
        }
    }

    fn target_frame_ref(&self) -> &Scope {
        match self.policy {
            ScopePolicy::Nested => self.scopes.last().unwrap(),
            ScopePolicy::Flat => self.scopes.first().unwrap(),
        }
    }

    /// True when `name` would collide with a symbol already declared in
    /// the scope declarations currently go to.
    pub fn is_duplicate_here(&self, name: &str) -> bool {
        self.target_frame_ref().symbols.contains_key(name)
    }

    pub fn insert_var(&mut self, name: impl Into<String>, ty: Type, by_reference: bool) {
        let name = name.into();
        let symbol = Symbol {
            name: name.clone(),
            ty,
            by_reference,
        };
        self.target_frame().symbols.insert(name, symbol);
    }

    /// Stores the canonical structure type under its tag name and hands
    /// back a copy for the declaration site.
    pub fn add_structure(&mut self, name: impl Into<String>, fields: Vec<Field>) -> Type {
        let name = name.into();
        let ty = Type::Structure {
            name: name.clone(),
            fields,
        };
        self.insert_var(name, ty.clone(), false);
        ty
    }

    /// Functions always live in the root frame so that recursion and
    /// forward references resolve under either scope policy.
    pub fn add_function(&mut self, ty: Type) -> Type {
        let name = match &ty {
            Type::Function { name, .. } => name.clone(),
            _ => return Type::Error,
        };
        let symbol = Symbol {
            name: name.clone(),
            ty: ty.clone(),
            by_reference: false,
        };
        self.scopes[0].symbols.insert(name, symbol);
        ty
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(name))
    }

    /// Promotes a declared function to defined, in place.
    pub fn mark_function_defined(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(symbol) = scope.symbols.get_mut(name) {
                if let Type::Function { is_defined, .. } = &mut symbol.ty {
                    *is_defined = true;
                }
                return;
            }
        }
    }

    pub fn record_function(&mut self, line: u32, name: impl Into<String>) {
        self.records.push(FunDecRecord {
            line,
            name: name.into(),
        });
    }

    pub fn fun_dec_records(&self) -> &[FunDecRecord] {
        &self.records
    }

    pub fn all_functions_defined(&self) -> bool {
        self.scopes.iter().all(|scope| {
            scope.symbols.values().all(|symbol| {
                !matches!(
                    symbol.ty,
                    Type::Function {
                        is_defined: false,
                        ..
                    }
                )
            })
        })
    }
}
