//! MIPS32 code generation.
//!
//! Correctness-first register handling: scratch registers `$t0`-`$t7` are
//! handed out round-robin, every named operand owns a permanent
//! `$fp`-relative stack slot, values reload on use and spill right after
//! they are produced. The first four parameters and arguments travel in
//! `$a0`-`$a3`, the rest on the stack.

use crate::ir::{BinOp, Instruction, LabelId, Operand, RelOp};
use crate::CompileError;

use super::Backend;

pub struct MipsBackend;

impl Backend for MipsBackend {
    fn generate(&self, code: &[Instruction]) -> Result<String, CompileError> {
        let mut translator = Translator::new();
        translator.translate(code)?;
        Ok(translator.finish())
    }

    fn name(&self) -> &'static str {
        "mips32"
    }
}

const REG_NAMES: [&str; 32] = [
    "$zero", "$at", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4",
    "$t5", "$t6", "$t7", "$s0", "$s1", "$s2", "$s3", "$s4", "$s5", "$s6", "$s7", "$t8", "$t9",
    "$k0", "$k1", "$gp", "$sp", "$fp", "$ra",
];

const V1: usize = 3;

fn is_arg_reg(reg: usize) -> bool {
    (4..=7).contains(&reg)
}

struct Slot {
    name: String,
    offset: i32,
    reg: Option<usize>,
}

struct Alloc {
    reg: usize,
    needs_load: bool,
    offset: i32,
}

/// Stack-slot and register bookkeeping for the function being emitted.
struct Frame {
    slots: Vec<Slot>,
    bound: [Option<usize>; 32],
    sp_offset: i32,
    cur_reg: usize,
}

impl Frame {
    fn new() -> Self {
        Frame {
            slots: Vec::new(),
            bound: [None; 32],
            sp_offset: -44,
            cur_reg: 8,
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    fn offset_of(&self, name: &str) -> Option<i32> {
        self.index_of(name).map(|i| self.slots[i].offset)
    }

    /// Offset of the variable currently bound to `reg`, for spilling.
    fn bound_offset(&self, reg: usize) -> Option<i32> {
        self.bound[reg].map(|i| self.slots[i].offset)
    }

    fn next_scratch(&mut self) -> usize {
        let reg = self.cur_reg;
        self.cur_reg += 1;
        if self.cur_reg == 16 {
            self.cur_reg = 8;
        }
        reg
    }

    /// Binds `name` to a scratch register, carving out a stack slot of
    /// `size` bytes on first sight. A variable parked in an argument
    /// register stays there.
    fn alloc(&mut self, name: &str, size: i32) -> Alloc {
        let allocated = self.next_scratch();
        match self.index_of(name) {
            None => {
                self.sp_offset -= size;
                let offset = self.sp_offset;
                self.slots.push(Slot {
                    name: name.to_string(),
                    offset,
                    reg: Some(allocated),
                });
                self.bound[allocated] = Some(self.slots.len() - 1);
                Alloc {
                    reg: allocated,
                    needs_load: false,
                    offset,
                }
            }
            Some(index) => {
                let offset = self.slots[index].offset;
                match self.slots[index].reg {
                    Some(reg) if is_arg_reg(reg) => Alloc {
                        reg,
                        needs_load: false,
                        offset,
                    },
                    _ => {
                        self.slots[index].reg = Some(allocated);
                        self.bound[allocated] = Some(index);
                        Alloc {
                            reg: allocated,
                            needs_load: true,
                            offset,
                        }
                    }
                }
            }
        }
    }
}

/// Either an immediate or a register holding the value.
enum Val {
    Const(i32),
    Reg(usize),
}

struct Translator {
    lines: Vec<String>,
    frame: Frame,
    param_index: usize,
}

impl Translator {
    fn new() -> Self {
        let mut translator = Translator {
            lines: Vec::new(),
            frame: Frame::new(),
            param_index: 0,
        };
        translator.emit_preamble();
        translator
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    fn emit_preamble(&mut self) {
        for text in [
            ".data",
            "_prompt: .asciiz \"Enter an integer:\"",
            "_ret: .asciiz \"\\n\"",
            ".globl main",
            ".text",
            "read:",
            "li $v0, 4",
            "la $a0, _prompt",
            "syscall",
            "li $v0, 5",
            "syscall",
            "jr $ra",
            "",
            "write:",
            "li $v0, 1",
            "syscall",
            "li $v0, 4",
            "la $a0, _ret",
            "syscall",
            "move $v0, $0",
            "jr $ra",
            "",
        ] {
            self.line(text);
        }
    }

    fn translate(&mut self, code: &[Instruction]) -> Result<(), CompileError> {
        for instruction in code {
            match instruction {
                Instruction::Assign { dst, src } => self.translate_assign(dst, src)?,
                Instruction::Binary { op, dst, lhs, rhs } => {
                    self.translate_binop(*op, dst, lhs, rhs)?
                }
                Instruction::Dec { name, size } => {
                    self.frame.alloc(name, *size as i32);
                }
                Instruction::Function { name } => self.translate_function(name),
                Instruction::Param { var } => self.translate_param(var),
                Instruction::Return { value } => self.translate_return(value)?,
                Instruction::Arg { value, index } => self.translate_arg(value, *index)?,
                Instruction::Read { dst } => self.translate_read(dst)?,
                Instruction::Write { value } => self.translate_write(value)?,
                Instruction::AssignCall { dst, callee } => {
                    self.translate_call(dst, callee)?
                }
                Instruction::Label { label } => self.line(format!("{}:", label)),
                Instruction::Goto { target } => self.line(format!("j {}", target)),
                Instruction::If {
                    lhs,
                    op,
                    rhs,
                    target,
                } => self.translate_cond_goto(lhs, *op, rhs, *target)?,
            }
        }
        Ok(())
    }

    /// Materializes the operand into a register, reloading its slot when
    /// it is not already live. Constants go through `$v1`.
    fn reg_of(&mut self, operand: &Operand) -> Result<usize, CompileError> {
        if let Operand::Constant(value) = operand {
            self.line(format!("li $v1, {}", value));
            return Ok(V1);
        }
        let alloc = self.frame.alloc(&operand.to_string(), 4);
        if alloc.needs_load {
            self.line(format!(
                "lw {}, {}($fp)",
                REG_NAMES[alloc.reg], alloc.offset
            ));
        }
        Ok(alloc.reg)
    }

    fn value_of(&mut self, operand: &Operand) -> Result<Val, CompileError> {
        match operand {
            Operand::Constant(value) => Ok(Val::Const(*value)),
            other => Ok(Val::Reg(self.reg_of(other)?)),
        }
    }

    /// Writes a freshly produced register value back to its stack slot.
    /// Values living in argument registers stay put.
    fn spill(&mut self, reg: usize) -> Result<(), CompileError> {
        if is_arg_reg(reg) {
            return Ok(());
        }
        let offset = self
            .frame
            .bound_offset(reg)
            .ok_or_else(|| internal("spilling an unbound register"))?;
        self.line(format!("sw {}, {}($fp)", REG_NAMES[reg], offset));
        Ok(())
    }

    fn required<'o>(&self, dst: &'o Option<Operand>) -> Result<&'o Operand, CompileError> {
        dst.as_ref()
            .ok_or_else(|| internal("incomplete instruction reached the backend"))
    }

    fn translate_assign(
        &mut self,
        dst: &Option<Operand>,
        src: &Operand,
    ) -> Result<(), CompileError> {
        let dst = self.required(dst)?;
        match dst {
            Operand::Variable(_) | Operand::Temp(_) => {
                let x = self.reg_of(dst)?;
                match src {
                    Operand::Constant(value) => {
                        self.line(format!("li {}, {}", REG_NAMES[x], value));
                    }
                    Operand::Variable(_) | Operand::Temp(_) => {
                        let y = self.reg_of(src)?;
                        self.line(format!("move {}, {}", REG_NAMES[x], REG_NAMES[y]));
                    }
                    Operand::Address(inner) => {
                        let offset = self
                            .frame
                            .offset_of(&inner.to_string())
                            .ok_or_else(|| internal("address of a variable with no slot"))?;
                        self.line(format!("addi {}, $fp, {}", REG_NAMES[x], offset));
                    }
                    Operand::Deref(inner) => {
                        let y = self.reg_of(inner)?;
                        self.line(format!("lw {}, 0({})", REG_NAMES[x], REG_NAMES[y]));
                    }
                }
                self.spill(x)
            }
            Operand::Deref(inner) => {
                let x = self.reg_of(inner)?;
                match src {
                    Operand::Constant(value) => {
                        self.line(format!("li $v1, {}", value));
                        self.line(format!("sw $v1, 0({})", REG_NAMES[x]));
                    }
                    Operand::Variable(_) | Operand::Temp(_) => {
                        let y = self.reg_of(src)?;
                        self.line(format!("sw {}, 0({})", REG_NAMES[y], REG_NAMES[x]));
                    }
                    _ => return Err(internal("unsupported source for an indirect store")),
                }
                self.spill(x)
            }
            _ => Err(internal("unsupported assignment destination")),
        }
    }

    fn translate_binop(
        &mut self,
        op: BinOp,
        dst: &Option<Operand>,
        lhs: &Operand,
        rhs: &Operand,
    ) -> Result<(), CompileError> {
        let dst = self.required(dst)?;
        let result = self.reg_of(dst)?;
        let result_name = REG_NAMES[result];
        let lhs = self.value_of(lhs)?;
        let rhs = self.value_of(rhs)?;
        match (op, lhs, rhs) {
            (_, Val::Const(a), Val::Const(b)) => {
                let value = op
                    .apply(a, b)
                    .ok_or_else(|| internal("constant division by zero"))?;
                self.line(format!("li {}, {}", result_name, value));
            }
            (BinOp::Add, Val::Reg(a), Val::Const(k)) | (BinOp::Add, Val::Const(k), Val::Reg(a)) => {
                self.line(format!("addi {}, {}, {}", result_name, REG_NAMES[a], k));
            }
            (BinOp::Add, Val::Reg(a), Val::Reg(b)) => {
                self.line(format!(
                    "add {}, {}, {}",
                    result_name, REG_NAMES[a], REG_NAMES[b]
                ));
            }
            (BinOp::Sub, Val::Reg(a), Val::Const(k)) => {
                self.line(format!(
                    "addi {}, {}, {}",
                    result_name,
                    REG_NAMES[a],
                    -(k as i64)
                ));
            }
            (BinOp::Sub, Val::Const(k), Val::Reg(b)) => {
                self.line(format!("li $v1, {}", k));
                self.line(format!("sub {}, $v1, {}", result_name, REG_NAMES[b]));
            }
            (BinOp::Sub, Val::Reg(a), Val::Reg(b)) => {
                self.line(format!(
                    "sub {}, {}, {}",
                    result_name, REG_NAMES[a], REG_NAMES[b]
                ));
            }
            (BinOp::Mul, Val::Reg(a), Val::Const(k)) | (BinOp::Mul, Val::Const(k), Val::Reg(a)) => {
                self.line(format!("li $v1, {}", k));
                self.line(format!("mul {}, {}, $v1", result_name, REG_NAMES[a]));
            }
            (BinOp::Mul, Val::Reg(a), Val::Reg(b)) => {
                self.line(format!(
                    "mul {}, {}, {}",
                    result_name, REG_NAMES[a], REG_NAMES[b]
                ));
            }
            (BinOp::Div, Val::Reg(a), Val::Const(k)) => {
                self.line(format!("li $v1, {}", k));
                self.line(format!("div {}, $v1", REG_NAMES[a]));
                self.line(format!("mflo {}", result_name));
            }
            (BinOp::Div, Val::Const(k), Val::Reg(b)) => {
                self.line(format!("li $v1, {}", k));
                self.line(format!("div $v1, {}", REG_NAMES[b]));
                self.line(format!("mflo {}", result_name));
            }
            (BinOp::Div, Val::Reg(a), Val::Reg(b)) => {
                self.line(format!("div {}, {}", REG_NAMES[a], REG_NAMES[b]));
                self.line(format!("mflo {}", result_name));
            }
        }
        self.spill(result)
    }

    fn translate_function(&mut self, name: &str) {
        self.line(format!("{}:", name));
        if name == "main" {
            self.line("sw $ra, 0($sp)");
            self.line("sw $fp, -4($sp)");
            self.line("move $fp, $sp");
        }
        self.param_index = 0;
        self.frame.sp_offset = -44;
    }

    /// Params say where the caller put each variable: `$a0`-`$a3` for the
    /// first four, caller-frame stack slots above `$fp` for the rest.
    fn translate_param(&mut self, var: &Operand) {
        let name = var.to_string();
        if self.param_index <= 3 {
            let reg = 4 + self.param_index;
            self.frame.slots.push(Slot {
                name,
                offset: 0,
                reg: Some(reg),
            });
            self.frame.bound[reg] = Some(self.frame.slots.len() - 1);
        } else {
            self.frame.slots.push(Slot {
                name,
                offset: 4 * (self.param_index as i32 - 3),
                reg: None,
            });
        }
        self.param_index += 1;
    }

    fn translate_return(&mut self, value: &Operand) -> Result<(), CompileError> {
        match value {
            Operand::Constant(k) => self.line(format!("li $v0, {}", k)),
            other => {
                let reg = self.reg_of(other)?;
                self.line(format!("move $v0, {}", REG_NAMES[reg]));
            }
        }
        self.line("move $v1, $ra");
        self.line("lw $ra, 0($fp)");
        self.line("lw $fp, -4($fp)");
        self.line("jr $v1");
        Ok(())
    }

    fn translate_arg(&mut self, value: &Operand, index: usize) -> Result<(), CompileError> {
        if index <= 3 {
            let target = REG_NAMES[4 + index];
            match value {
                Operand::Constant(k) => self.line(format!("li {}, {}", target, k)),
                other => {
                    let reg = self.reg_of(other)?;
                    self.line(format!("move {}, {}", target, REG_NAMES[reg]));
                }
            }
        } else {
            match value {
                Operand::Constant(k) => self.line(format!("li $v1, {}", k)),
                other => {
                    let reg = self.reg_of(other)?;
                    self.line(format!("move $v1, {}", REG_NAMES[reg]));
                }
            }
            self.frame.sp_offset -= 4;
            self.line(format!("sw $v1, {}($fp)", self.frame.sp_offset));
        }
        Ok(())
    }

    /// Shared `$ra`/`$fp` save, helper call, restore sequence for the
    /// runtime `read`/`write` routines.
    fn call_helper(&mut self, name: &str) {
        let sp = self.frame.sp_offset;
        self.line(format!("sw $ra, {}($fp)", sp - 4));
        self.line(format!("sw $fp, {}($fp)", sp - 8));
        self.line(format!("addi $fp, $fp, {}", sp - 4));
        self.line(format!("jal {}", name));
        self.line("lw $fp, -4($fp)");
        self.line("lw $ra, 0($fp)");
    }

    /// Copies `$v0` into the destination's register and its stack slot.
    fn take_result(&mut self, dst: &Operand) -> Result<(), CompileError> {
        let reg = self.reg_of(dst)?;
        self.line(format!("move {}, $v0", REG_NAMES[reg]));
        if !is_arg_reg(reg) {
            let offset = self
                .frame
                .offset_of(&dst.to_string())
                .ok_or_else(|| internal("call result has no stack slot"))?;
            self.line(format!("sw $v0, {}($fp)", offset));
        }
        Ok(())
    }

    fn translate_read(&mut self, dst: &Option<Operand>) -> Result<(), CompileError> {
        let dst = self.required(dst)?;
        self.call_helper("read");
        self.take_result(dst)
    }

    fn translate_write(&mut self, value: &Operand) -> Result<(), CompileError> {
        let reg = self.reg_of(value)?;
        self.line(format!("move $a0, {}", REG_NAMES[reg]));
        self.call_helper("write");
        Ok(())
    }

    fn translate_call(
        &mut self,
        dst: &Option<Operand>,
        callee: &str,
    ) -> Result<(), CompileError> {
        let dst = self.required(dst)?.clone();
        let sp = self.frame.sp_offset;
        let saved = [
            ("$ra", 4),
            ("$fp", 8),
            ("$t0", 12),
            ("$t1", 16),
            ("$t2", 20),
            ("$t3", 24),
            ("$t4", 28),
            ("$t5", 32),
            ("$t6", 36),
            ("$t7", 40),
            ("$t8", 44),
            ("$t9", 48),
        ];
        for (reg, offset) in saved {
            self.line(format!("sw {}, {}($fp)", reg, sp - offset));
        }
        self.line(format!("add $fp, $fp, {}", sp - 4));
        self.line(format!("jal {}", callee));
        for (reg, offset) in &saved[2..] {
            self.line(format!("lw {}, {}($fp)", reg, sp - offset));
        }
        self.frame.sp_offset -= 4;
        self.take_result(&dst)
    }

    fn translate_cond_goto(
        &mut self,
        lhs: &Operand,
        op: RelOp,
        rhs: &Operand,
        target: LabelId,
    ) -> Result<(), CompileError> {
        if let (Operand::Constant(a), Operand::Constant(b)) = (lhs, rhs) {
            if op.holds(*a, *b) {
                self.line(format!("j {}", target));
            }
            return Ok(());
        }
        let x = self.reg_of(lhs)?;
        let y = self.reg_of(rhs)?;
        self.line(format!(
            "{} {}, {}, {}",
            branch_for(op),
            REG_NAMES[x],
            REG_NAMES[y],
            target
        ));
        Ok(())
    }
}

fn branch_for(op: RelOp) -> &'static str {
    match op {
        RelOp::Eq => "beq",
        RelOp::Ne => "bne",
        RelOp::Lt => "blt",
        RelOp::Le => "ble",
        RelOp::Gt => "bgt",
        RelOp::Ge => "bge",
    }
}

fn internal(message: impl Into<String>) -> CompileError {
    CompileError::Internal {
        message: message.into(),
    }
}
