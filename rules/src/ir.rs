//! The opaque IR the rule engine pattern-matches against. A minimal
//! `IrProgram`/`IrSection`/`IrOp` trio: just enough surface for pattern
//! matching and for hand-built end-to-end tests, standing in for whatever
//! front-end would otherwise produce it.

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum IrOperand {
    Reg(u32),
    Imm(i64),
    Label(u32),
}

impl IrOperand {
    pub fn as_reg(&self) -> Option<u32> {
        match self {
            IrOperand::Reg(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_imm(&self) -> Option<i64> {
        match self {
            IrOperand::Imm(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<u32> {
        match self {
            IrOperand::Label(l) => Some(*l),
            _ => None,
        }
    }
}

/// One IR instruction: a mnemonic (`"movii32"`, `"addii32"`, ...), its
/// operand list, and the virtual register it defines, if any.
#[derive(Clone, PartialEq, Debug)]
pub struct IrOp {
    pub mnemonic: String,
    pub operands: Vec<IrOperand>,
    pub result: Option<u32>,
}

impl IrOp {
    pub fn new(mnemonic: impl Into<String>, operands: Vec<IrOperand>) -> IrOp {
        IrOp {
            mnemonic: mnemonic.into(),
            operands,
            result: None,
        }
    }

    pub fn with_result(mut self, result: u32) -> IrOp {
        self.result = Some(result);
        self
    }

    /// A bare label marker, matched by name `"label"` with a single
    /// `Label` operand carrying its id.
    pub fn label(id: u32) -> IrOp {
        IrOp::new("label", vec![IrOperand::Label(id)])
    }
}

#[derive(Clone, Default, Debug)]
pub struct IrSection {
    pub ops: Vec<IrOp>,
    pub reg_counter: u32,
    pub label_counter: u32,
}

impl IrSection {
    pub fn new() -> IrSection {
        IrSection::default()
    }

    pub fn push(&mut self, op: IrOp) -> &mut IrSection {
        self.ops.push(op);
        self
    }
}

#[derive(Clone, Default, Debug)]
pub struct IrProgram {
    pub sections: Vec<IrSection>,
}

impl IrProgram {
    pub fn new() -> IrProgram {
        IrProgram::default()
    }
}
