//! Canonical text form of the IR, one instruction per line.

use std::fmt;

use super::{BinOp, Instruction, LabelId, Operand, RelOp};

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Variable(name) => write!(f, "{}", name),
            Operand::Temp(id) => write!(f, "t{}", id),
            Operand::Constant(value) => write!(f, "#{}", value),
            Operand::Address(inner) => write!(f, "&{}", inner),
            Operand::Deref(inner) => write!(f, "*{}", inner),
        }
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label{}", self.0)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

struct Dst<'a>(&'a Option<Operand>);

impl fmt::Display for Dst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(operand) => write!(f, "{}", operand),
            None => write!(f, "_"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { dst, src } => write!(f, "{} := {}", Dst(dst), src),
            Instruction::Binary { op, dst, lhs, rhs } => {
                write!(f, "{} := {} {} {}", Dst(dst), lhs, op, rhs)
            }
            Instruction::Dec { name, size } => write!(f, "DEC {} {}", name, size),
            Instruction::Function { name } => write!(f, "FUNCTION {} :", name),
            Instruction::Param { var } => write!(f, "PARAM {}", var),
            Instruction::Return { value } => write!(f, "RETURN {}", value),
            Instruction::Arg { value, .. } => write!(f, "ARG {}", value),
            Instruction::Read { dst } => write!(f, "READ {}", Dst(dst)),
            Instruction::Write { value } => write!(f, "WRITE {}", value),
            Instruction::AssignCall { dst, callee } => {
                write!(f, "{} := CALL {}", Dst(dst), callee)
            }
            Instruction::Label { label } => write!(f, "LABEL {} :", label),
            Instruction::Goto { target } => write!(f, "GOTO {}", target),
            Instruction::If {
                lhs,
                op,
                rhs,
                target,
            } => write!(f, "IF {} {} {} GOTO {}", lhs, op, rhs, target),
        }
    }
}

/// Whole-program rendering, one instruction per line.
pub fn render(code: &[Instruction]) -> String {
    let mut out = String::new();
    for instruction in code {
        out.push_str(&instruction.to_string());
        out.push('\n');
    }
    out
}
