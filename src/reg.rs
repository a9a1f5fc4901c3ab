//! Register namespaces. Each architecture keeps its own
//! opaque index space: low values are fixed/architectural, everything at
//! or above the fixed count is a virtual register awaiting allocation.
//!
//! Modeled as newtypes rather than bare `u32` so a builder can't
//! accidentally pass an FPA register where an integer register was
//! expected - the arena `Index` newtype in `op_pool` follows the same idiom.

use crate::constants;

/// An ARM integer register, fixed (`< 16`) or virtual (`>= 16`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct IntReg(pub u32);

impl IntReg {
    pub const R0: IntReg = IntReg(0);
    pub const LOCALS: IntReg = IntReg(constants::REG_LOCALS);
    pub const GLOBALS: IntReg = IntReg(constants::REG_GLOBALS);
    pub const SP: IntReg = IntReg(constants::REG_SP);
    pub const PC: IntReg = IntReg(constants::REG_PC);

    pub fn num(self) -> u32 {
        self.0
    }

    pub fn is_fixed(self) -> bool {
        self.0 < constants::FIXED_INT_REGS
    }

    /// `is_fixed` answering the liveness-facing question: only R0-R11 ever
    /// participate in the virtual-register liveness sets the register
    /// allocator walks.
    pub fn counts_toward_liveness(self) -> bool {
        self.0 < constants::MAX_LIVENESS_INT_REGS
    }
}

/// An FPA register, fixed (`< 8`) or virtual.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct FpaReg(pub u32);

impl FpaReg {
    pub fn num(self) -> u32 {
        self.0
    }

    pub fn is_fixed(self) -> bool {
        self.0 < constants::FIXED_FPA_REGS
    }
}

/// A VFP register. VFP exposes the same physical storage as either 16
/// doubles or 32 singles; which view is fixed/virtual is tracked
/// separately, since VFP uses 16 double or 32 single virtual registers
/// above its own fixed range.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum VfpReg {
    Double(u32),
    Single(u32),
}

impl VfpReg {
    pub fn is_fixed(self) -> bool {
        match self {
            VfpReg::Double(n) => n < constants::FIXED_VFP_DOUBLE_REGS,
            VfpReg::Single(n) => n < constants::FIXED_VFP_SINGLE_REGS,
        }
    }

    pub fn num(self) -> u32 {
        match self {
            VfpReg::Double(n) | VfpReg::Single(n) => n,
        }
    }
}

/// Reserved IR register identifiers, ahead of the first IR temporary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IrReservedReg {
    Global,
    Local,
    Stack,
}

/// Base IR register id at which ordinary (non-reserved) IR temporaries
/// start counting. Mirrors `SUBTILIS_IR_REG_TEMP_START` from the original
/// source: ids below this are the three reserved registers above.
pub const TEMP_START: u32 = 3;

/// Maps an opaque IR register id into the ARM integer namespace. Reserved
/// ids map onto the fixed registers that the section prologue has already
/// dedicated to them; temporaries are shifted by `FIXED_INT_REGS` so they
/// land squarely in virtual-register space and can never collide with a
/// fixed register number.
pub fn map_ir_int_reg(ir_id: u32) -> IntReg {
    if ir_id == reserved_id(IrReservedReg::Global) {
        IntReg::GLOBALS
    } else if ir_id == reserved_id(IrReservedReg::Local) {
        IntReg::LOCALS
    } else if ir_id == reserved_id(IrReservedReg::Stack) {
        IntReg::SP
    } else {
        IntReg(constants::FIXED_INT_REGS + (ir_id - TEMP_START))
    }
}

fn reserved_id(reg: IrReservedReg) -> u32 {
    match reg {
        IrReservedReg::Global => 0,
        IrReservedReg::Local => 1,
        IrReservedReg::Stack => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_boundary() {
        assert!(IntReg(15).is_fixed());
        assert!(!IntReg(16).is_fixed());
        assert!(FpaReg(7).is_fixed());
        assert!(!FpaReg(8).is_fixed());
    }

    #[test]
    fn liveness_excludes_r12_through_r15() {
        assert!(IntReg(11).counts_toward_liveness());
        assert!(!IntReg(12).counts_toward_liveness());
        assert!(!IntReg(15).counts_toward_liveness());
    }

    #[test]
    fn reserved_ir_regs_map_to_fixed_registers() {
        assert_eq!(map_ir_int_reg(0), IntReg::GLOBALS);
        assert_eq!(map_ir_int_reg(1), IntReg::LOCALS);
        assert_eq!(map_ir_int_reg(2), IntReg::SP);
    }

    #[test]
    fn temporaries_land_in_virtual_space() {
        let r = map_ir_int_reg(TEMP_START);
        assert!(!r.is_fixed());
        assert_eq!(r, IntReg(constants::FIXED_INT_REGS));
    }
}
