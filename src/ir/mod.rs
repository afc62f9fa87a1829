//! Three-address intermediate representation.

pub mod printer;

/// A value an instruction reads or writes. Everything except a constant
/// carries a name or id that the backend later binds to a register and a
/// stack slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Variable(String),
    Temp(u32),
    Constant(i32),
    Address(Box<Operand>),
    Deref(Box<Operand>),
}

impl Operand {
    /// `&x`, collapsing `&*x` to `x` at construction time.
    pub fn address_of(inner: Operand) -> Operand {
        match inner {
            Operand::Deref(x) => *x,
            other => Operand::Address(Box::new(other)),
        }
    }

    /// `*x`, collapsing `*&x` to `x` at construction time.
    pub fn deref(inner: Operand) -> Operand {
        match inner {
            Operand::Address(x) => *x,
            other => Operand::Deref(Box::new(other)),
        }
    }
}

/// Jump targets are not values; they get their own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Constant folding; division by zero is not foldable.
    pub fn apply(self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            BinOp::Add => Some(lhs.wrapping_add(rhs)),
            BinOp::Sub => Some(lhs.wrapping_sub(rhs)),
            BinOp::Mul => Some(lhs.wrapping_mul(rhs)),
            BinOp::Div => {
                if rhs == 0 {
                    None
                } else {
                    Some(lhs.wrapping_div(rhs))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            RelOp::Eq => lhs == rhs,
            RelOp::Ne => lhs != rhs,
            RelOp::Lt => lhs < rhs,
            RelOp::Le => lhs <= rhs,
            RelOp::Gt => lhs > rhs,
            RelOp::Ge => lhs >= rhs,
        }
    }
}

/// One line of three-address code.
///
/// Destination slots are optional: the generator leaves them empty when an
/// expression is evaluated for effect only, and `remove_incomplete` drops
/// those instructions before the backend ever sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Assign {
        dst: Option<Operand>,
        src: Operand,
    },
    Binary {
        op: BinOp,
        dst: Option<Operand>,
        lhs: Operand,
        rhs: Operand,
    },
    /// Reserve `size` bytes of storage for an array or structure variable.
    Dec { name: String, size: u32 },
    Function { name: String },
    Param { var: Operand },
    Return { value: Operand },
    /// Actual argument, tagged with its zero-based declaration index.
    Arg { value: Operand, index: usize },
    Read { dst: Option<Operand> },
    Write { value: Operand },
    AssignCall {
        dst: Option<Operand>,
        callee: String,
    },
    Label { label: LabelId },
    Goto { target: LabelId },
    If {
        lhs: Operand,
        op: RelOp,
        rhs: Operand,
        target: LabelId,
    },
}

impl Instruction {
    pub fn is_complete(&self) -> bool {
        match self {
            Instruction::Assign { dst, .. }
            | Instruction::Binary { dst, .. }
            | Instruction::Read { dst, .. }
            | Instruction::AssignCall { dst, .. } => dst.is_some(),
            _ => true,
        }
    }
}

/// Deletes every instruction with an absent destination. Idempotent.
pub fn remove_incomplete(code: &mut Vec<Instruction>) {
    code.retain(Instruction::is_complete);
}
