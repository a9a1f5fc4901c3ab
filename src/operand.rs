use crate::reg::IntReg;
use armgen_support::{EnumFromStr, InteropGetName};
use armgen_support_derive::{EnumFromStr, InteropGetName};
use num_derive::{FromPrimitive, ToPrimitive};

/// ARM's Operand2: the flexible second source of a data-processing
/// instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand2 {
    Reg(IntReg),
    /// Already rotated/encoded 12-bit immediate: `(rotate << 8) | imm8`.
    /// Builders never hand-assemble this value directly; it always comes
    /// out of `crate::imm::encode_imm`/`encode_lvl2`.
    Imm(u32),
    Shifted {
        rm: IntReg,
        kind: ShiftKind,
        amount: ShiftAmount,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShiftAmount {
    Immediate(u8),
    Reg(IntReg),
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, InteropGetName, EnumFromStr,
)]
pub enum ShiftKind {
    LSL,
    ASL,
    LSR,
    ASR,
    ROR,
    RRX,
}

impl std::fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl Operand2 {
    pub fn imm(&self) -> Option<u32> {
        match self {
            Operand2::Imm(v) => Some(*v),
            _ => None,
        }
    }

    pub fn reg(&self) -> Option<IntReg> {
        match self {
            Operand2::Reg(r) => Some(*r),
            Operand2::Shifted { rm, .. } => Some(*rm),
            Operand2::Imm(_) => None,
        }
    }
}
