//! AST to three-address code translation.
//!
//! Runs only on programs the analyzer accepted, against the finished (flat)
//! symbol table. Correctness-first and non-optimizing: every intermediate
//! value gets its own temporary.

use crate::ast::{BinaryOp, CompSt, Expr, ExprKind, ExtDef, Program, Stmt, UnaryOp};
use crate::ir::{remove_incomplete, BinOp, Instruction, LabelId, Operand, RelOp};
use crate::symtab::SymbolTable;
use crate::typechecker::types::{size_of, Type};
use crate::CompileError;

/// What lowering an expression produced: its semantic type, the operand
/// holding (or addressing) its value, and whether that operand is an
/// address-valued parameter binding.
struct Lowered {
    ty: Type,
    operand: Option<Operand>,
    by_reference: bool,
}

pub struct Lowering<'a> {
    table: &'a SymbolTable,
    code: Vec<Instruction>,
    next_temp: u32,
    next_label: u32,
}

impl<'a> Lowering<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Lowering {
            table,
            code: Vec::new(),
            next_temp: 1,
            next_label: 1,
        }
    }

    pub fn lower_program(mut self, program: &Program) -> Result<Vec<Instruction>, CompileError> {
        for item in &program.items {
            match item {
                ExtDef::Globals { vars, .. } => {
                    for var in vars {
                        self.lower_storage(&var.name)?;
                    }
                }
                ExtDef::TypeDef { .. } | ExtDef::FunctionDecl { .. } => {}
                ExtDef::FunctionDef { header, body, .. } => {
                    self.emit(Instruction::Function {
                        name: header.name.clone(),
                    });
                    for param in &header.params {
                        self.emit(Instruction::Param {
                            var: Operand::Variable(param.dec.name.clone()),
                        });
                    }
                    self.lower_comp_st(body)?;
                }
            }
        }
        remove_incomplete(&mut self.code);
        Ok(self.code)
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn new_temp(&mut self) -> Operand {
        let temp = Operand::Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    fn new_label(&mut self) -> LabelId {
        let label = LabelId(self.next_label);
        self.next_label += 1;
        label
    }

    fn symbol_type(&self, name: &str) -> Result<&Type, CompileError> {
        self.table
            .lookup(name)
            .map(|symbol| &symbol.ty)
            .ok_or_else(|| internal(format!("no symbol for \"{}\"", name)))
    }

    /// Arrays and structures need their storage reserved; scalars live in
    /// their stack slot alone.
    fn lower_storage(&mut self, name: &str) -> Result<(), CompileError> {
        let ty = self.symbol_type(name)?;
        if matches!(ty, Type::Array { .. } | Type::Structure { .. }) {
            let size = size_of(ty);
            self.emit(Instruction::Dec {
                name: name.to_string(),
                size,
            });
        }
        Ok(())
    }

    fn lower_comp_st(&mut self, body: &CompSt) -> Result<(), CompileError> {
        for def in &body.defs {
            for dec in &def.decs {
                self.lower_storage(&dec.var.name)?;
                if let Some(init) = &dec.init {
                    // Array element initializers are not supported; a
                    // scalar initializer is a plain assignment.
                    if dec.var.dims.is_empty() {
                        self.emit_value(init, Some(Operand::Variable(dec.var.name.clone())))?;
                    }
                }
            }
        }
        for stmt in &body.stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.emit_value(expr, None)?;
            }
            Stmt::Compound(body) => self.lower_comp_st(body)?,
            Stmt::Return { value } => {
                let temp = self.new_temp();
                self.emit_value(value, Some(temp.clone()))?;
                self.emit(Instruction::Return { value: temp });
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch: None,
            } => {
                let on_true = self.new_label();
                let on_false = self.new_label();
                self.emit_cond(cond, on_true, on_false)?;
                self.emit(Instruction::Label { label: on_true });
                self.lower_stmt(then_branch)?;
                self.emit(Instruction::Label { label: on_false });
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch: Some(else_branch),
            } => {
                let on_true = self.new_label();
                let on_false = self.new_label();
                let join = self.new_label();
                self.emit_cond(cond, on_true, on_false)?;
                self.emit(Instruction::Label { label: on_true });
                self.lower_stmt(then_branch)?;
                self.emit(Instruction::Goto { target: join });
                self.emit(Instruction::Label { label: on_false });
                self.lower_stmt(else_branch)?;
                self.emit(Instruction::Label { label: join });
            }
            Stmt::While { cond, body } => {
                let head = self.new_label();
                let enter = self.new_label();
                let exit = self.new_label();
                self.emit(Instruction::Label { label: head });
                self.emit_cond(cond, enter, exit)?;
                self.emit(Instruction::Label { label: enter });
                self.lower_stmt(body)?;
                self.emit(Instruction::Goto { target: head });
                self.emit(Instruction::Label { label: exit });
            }
        }
        Ok(())
    }

    /// Evaluates `expr`, propagating its value into `place` when one is
    /// given. `place: None` means the value is unwanted; the propagation
    /// instruction is still emitted with an empty destination and swept by
    /// the cleanup pass.
    fn emit_value(
        &mut self,
        expr: &Expr,
        place: Option<Operand>,
    ) -> Result<Lowered, CompileError> {
        match &expr.kind {
            ExprKind::IntLit(value) => {
                let constant = Operand::Constant(*value);
                self.emit(Instruction::Assign {
                    dst: place,
                    src: constant.clone(),
                });
                Ok(Lowered {
                    ty: Type::Int,
                    operand: Some(constant),
                    by_reference: false,
                })
            }
            ExprKind::FloatLit(_) => Err(CompileError::NotImplemented {
                feature: "float literals in generated code".to_string(),
            }),
            ExprKind::Variable(name) => {
                let symbol = self
                    .table
                    .lookup(name)
                    .ok_or_else(|| internal(format!("no symbol for \"{}\"", name)))?;
                let var = Operand::Variable(name.clone());
                let lowered = Lowered {
                    ty: symbol.ty.clone(),
                    operand: Some(var.clone()),
                    by_reference: symbol.by_reference,
                };
                self.emit(Instruction::Assign {
                    dst: place,
                    src: var,
                });
                Ok(lowered)
            }
            ExprKind::Assign { target, value } => {
                let temp = self.new_temp();
                self.emit_value(value, Some(temp.clone()))?;
                let left = self.emit_value(target, place)?;
                // The left side just ended with its own propagation
                // instruction; the store goes right before it, so a
                // compound lvalue's address temp is reused for the write.
                let at = self.code.len() - 1;
                self.code.insert(
                    at,
                    Instruction::Assign {
                        dst: left.operand.clone(),
                        src: temp,
                    },
                );
                Ok(left)
            }
            ExprKind::Binary { op, .. } if op.is_boolean() => self.emit_boolean(expr, place),
            ExprKind::Unary {
                op: UnaryOp::Not, ..
            } => self.emit_boolean(expr, place),
            ExprKind::Binary { op, lhs, rhs } => {
                let t1 = self.new_temp();
                let t2 = self.new_temp();
                let left = self.emit_value(lhs, Some(t1.clone()))?;
                self.emit_value(rhs, Some(t2.clone()))?;
                self.emit(Instruction::Binary {
                    op: arith_op(*op)?,
                    dst: place.clone(),
                    lhs: t1,
                    rhs: t2,
                });
                Ok(Lowered {
                    ty: left.ty,
                    operand: place,
                    by_reference: false,
                })
            }
            ExprKind::Unary {
                op: UnaryOp::Negate,
                operand,
            } => {
                let temp = self.new_temp();
                let value = self.emit_value(operand, Some(temp.clone()))?;
                self.emit(Instruction::Binary {
                    op: BinOp::Sub,
                    dst: place.clone(),
                    lhs: Operand::Constant(0),
                    rhs: temp,
                });
                Ok(Lowered {
                    ty: value.ty,
                    operand: place,
                    by_reference: false,
                })
            }
            ExprKind::Call { callee, args } => self.emit_call(callee, args, place),
            ExprKind::Index { base, index } => self.emit_index(base, index, place),
            ExprKind::Member { base, field } => self.emit_member(base, field, place),
        }
    }

    /// A boolean expression used as a value: `place := 0`, then the
    /// condition translation jumps to a `place := 1` on success.
    fn emit_boolean(
        &mut self,
        expr: &Expr,
        place: Option<Operand>,
    ) -> Result<Lowered, CompileError> {
        let on_true = self.new_label();
        let on_false = self.new_label();
        self.emit(Instruction::Assign {
            dst: place.clone(),
            src: Operand::Constant(0),
        });
        self.emit_cond(expr, on_true, on_false)?;
        self.emit(Instruction::Label { label: on_true });
        self.emit(Instruction::Assign {
            dst: place.clone(),
            src: Operand::Constant(1),
        });
        self.emit(Instruction::Label { label: on_false });
        Ok(Lowered {
            ty: Type::Int,
            operand: place,
            by_reference: false,
        })
    }

    /// Condition translation: control transfers to `on_true` or
    /// `on_false`, never falls through.
    fn emit_cond(
        &mut self,
        expr: &Expr,
        on_true: LabelId,
        on_false: LabelId,
    ) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                if let Some(relop) = rel_op(*op) {
                    let t1 = self.new_temp();
                    let t2 = self.new_temp();
                    self.emit_value(lhs, Some(t1.clone()))?;
                    self.emit_value(rhs, Some(t2.clone()))?;
                    self.emit(Instruction::If {
                        lhs: t1,
                        op: relop,
                        rhs: t2,
                        target: on_true,
                    });
                    self.emit(Instruction::Goto { target: on_false });
                    return Ok(());
                }
                match op {
                    BinaryOp::And => {
                        let midway = self.new_label();
                        self.emit_cond(lhs, midway, on_false)?;
                        self.emit(Instruction::Label { label: midway });
                        self.emit_cond(rhs, on_true, on_false)
                    }
                    BinaryOp::Or => {
                        let midway = self.new_label();
                        self.emit_cond(lhs, on_true, midway)?;
                        self.emit(Instruction::Label { label: midway });
                        self.emit_cond(rhs, on_true, on_false)
                    }
                    _ => self.emit_cond_default(expr, on_true, on_false),
                }
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.emit_cond(operand, on_false, on_true),
            _ => self.emit_cond_default(expr, on_true, on_false),
        }
    }

    /// Anything that is not itself a boolean shape: evaluate and compare
    /// against zero.
    fn emit_cond_default(
        &mut self,
        expr: &Expr,
        on_true: LabelId,
        on_false: LabelId,
    ) -> Result<(), CompileError> {
        let temp = self.new_temp();
        self.emit_value(expr, Some(temp.clone()))?;
        self.emit(Instruction::If {
            lhs: temp,
            op: RelOp::Ne,
            rhs: Operand::Constant(0),
            target: on_true,
        });
        self.emit(Instruction::Goto { target: on_false });
        Ok(())
    }

    fn emit_call(
        &mut self,
        callee: &str,
        args: &[Expr],
        place: Option<Operand>,
    ) -> Result<Lowered, CompileError> {
        if callee == "write" {
            let arg = args
                .first()
                .ok_or_else(|| internal("write without an argument"))?;
            let temp = self.new_temp();
            self.emit_value(arg, Some(temp.clone()))?;
            self.emit(Instruction::Write { value: temp });
            return Ok(Lowered {
                ty: Type::Int,
                operand: place,
                by_reference: false,
            });
        }
        if callee == "read" {
            self.emit(Instruction::Read { dst: place.clone() });
            return Ok(Lowered {
                ty: Type::Int,
                operand: place,
                by_reference: false,
            });
        }

        let mut temps = Vec::with_capacity(args.len());
        for arg in args {
            let temp = self.new_temp();
            let value = self.emit_value(arg, Some(temp.clone()))?;
            if matches!(value.ty, Type::Array { .. } | Type::Structure { .. }) {
                // Aggregates are passed by address: replace the value
                // propagation that was just emitted.
                let operand = value
                    .operand
                    .ok_or_else(|| internal("aggregate argument produced no operand"))?;
                self.code.pop();
                let addr = if value.by_reference {
                    operand
                } else {
                    Operand::address_of(operand)
                };
                self.emit(Instruction::Assign {
                    dst: Some(temp.clone()),
                    src: addr,
                });
            }
            temps.push(temp);
        }
        for (index, temp) in temps.into_iter().enumerate().rev() {
            self.emit(Instruction::Arg { value: temp, index });
        }
        self.emit(Instruction::AssignCall {
            dst: place.clone(),
            callee: callee.to_string(),
        });
        let ret = match self.symbol_type(callee)? {
            Type::Function { ret, .. } => (**ret).clone(),
            other => return Err(internal(format!("calling non-function \"{}\"", other))),
        };
        Ok(Lowered {
            ty: ret,
            operand: place,
            by_reference: false,
        })
    }

    fn emit_index(
        &mut self,
        base: &Expr,
        index: &Expr,
        place: Option<Operand>,
    ) -> Result<Lowered, CompileError> {
        let lowered_base = self.emit_value(base, None)?;
        let operand = lowered_base
            .operand
            .ok_or_else(|| internal("array base produced no operand"))?;
        let base_addr = if lowered_base.by_reference {
            match operand {
                Operand::Deref(inner) => *inner,
                other => other,
            }
        } else {
            Operand::address_of(operand)
        };
        let elem = match &lowered_base.ty {
            Type::Array { elem, .. } => (**elem).clone(),
            other => return Err(internal(format!("indexing into {}", other))),
        };
        let t1 = self.new_temp();
        self.emit_value(index, Some(t1.clone()))?;
        let t2 = self.new_temp();
        self.emit(Instruction::Binary {
            op: BinOp::Mul,
            dst: Some(t2.clone()),
            lhs: t1,
            rhs: Operand::Constant(size_of(&elem) as i32),
        });
        let t3 = self.new_temp();
        self.emit(Instruction::Assign {
            dst: Some(t3.clone()),
            src: base_addr,
        });
        self.emit(Instruction::Binary {
            op: BinOp::Add,
            dst: Some(t3.clone()),
            lhs: t3.clone(),
            rhs: t2,
        });
        let result = Operand::deref(t3);
        self.emit(Instruction::Assign {
            dst: place,
            src: result.clone(),
        });
        Ok(Lowered {
            ty: elem,
            operand: Some(result),
            by_reference: false,
        })
    }

    fn emit_member(
        &mut self,
        base: &Expr,
        field: &str,
        place: Option<Operand>,
    ) -> Result<Lowered, CompileError> {
        let lowered_base = self.emit_value(base, None)?;
        let operand = lowered_base
            .operand
            .ok_or_else(|| internal("struct base produced no operand"))?;
        let src = if lowered_base.by_reference {
            operand
        } else {
            Operand::address_of(operand)
        };
        let (offset, field_ty) = match &lowered_base.ty {
            Type::Structure { fields, .. } => {
                let mut offset = 0u32;
                let mut found = None;
                for f in fields {
                    if f.name == field {
                        found = Some(f.ty.clone());
                        break;
                    }
                    offset += size_of(&f.ty);
                }
                match found {
                    Some(ty) => (offset, ty),
                    None => return Err(internal(format!("no field \"{}\"", field))),
                }
            }
            other => return Err(internal(format!("member access into {}", other))),
        };
        let t2 = self.new_temp();
        self.emit(Instruction::Assign {
            dst: Some(t2.clone()),
            src,
        });
        let t3 = self.new_temp();
        self.emit(Instruction::Binary {
            op: BinOp::Add,
            dst: Some(t3.clone()),
            lhs: t2,
            rhs: Operand::Constant(offset as i32),
        });
        let result = Operand::deref(t3);
        self.emit(Instruction::Assign {
            dst: place,
            src: result.clone(),
        });
        Ok(Lowered {
            ty: field_ty,
            operand: Some(result),
            by_reference: false,
        })
    }
}

fn arith_op(op: BinaryOp) -> Result<BinOp, CompileError> {
    match op {
        BinaryOp::Add => Ok(BinOp::Add),
        BinaryOp::Subtract => Ok(BinOp::Sub),
        BinaryOp::Multiply => Ok(BinOp::Mul),
        BinaryOp::Divide => Ok(BinOp::Div),
        _ => Err(internal("boolean operator in arithmetic position")),
    }
}

fn rel_op(op: BinaryOp) -> Option<RelOp> {
    match op {
        BinaryOp::Equal => Some(RelOp::Eq),
        BinaryOp::NotEqual => Some(RelOp::Ne),
        BinaryOp::Less => Some(RelOp::Lt),
        BinaryOp::LessEqual => Some(RelOp::Le),
        BinaryOp::Greater => Some(RelOp::Gt),
        BinaryOp::GreaterEqual => Some(RelOp::Ge),
        _ => None,
    }
}

fn internal(message: impl Into<String>) -> CompileError {
    CompileError::Internal {
        message: message.into(),
    }
}
