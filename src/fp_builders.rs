//! Floating point instruction builders and the `FpArchitecture` vtable that
//! lets the rest of the codegen target FPA or VFP through one interface. A
//! trait object stands in for what a C-style struct of function pointers
//! would do here.

use crate::condition::ConditionCode;
use crate::fp::encode_fpa_real;
use crate::instruction::{
    FpaCoTransfer, FpaCoprocessor, FpaData, FpaFixFloat, FpaOp, FpaOperand, FpaTransfer,
    Instruction, LiteralDest, LiteralLoad, Op, Rounding,
};
use crate::op_pool::{Index, OpPool};
use crate::reg::{FpaReg, IntReg};
use crate::section::Section;

/// Abstracts FPA vs VFP behind one API.
/// VFP has no immediate data-processing form at all, so its
/// `encode_real` always returns `None`: every VFP float constant goes
/// through the literal pool. That's a real asymmetry between the two
/// backends, not a gap in this trait.
pub trait FpArchitecture {
    fn max_regs(&self) -> u32;
    fn max_offset_words(&self) -> i32;
    fn is_fixed(&self, reg: u32) -> bool;
    fn encode_real(&self, v: f64) -> Option<u8>;
}

pub struct Fpa;

impl FpArchitecture for Fpa {
    fn max_regs(&self) -> u32 {
        crate::constants::FIXED_FPA_REGS
    }

    fn max_offset_words(&self) -> i32 {
        crate::constants::FPA_MAX_WORD_OFFSET as i32
    }

    fn is_fixed(&self, reg: u32) -> bool {
        reg < crate::constants::FIXED_FPA_REGS
    }

    fn encode_real(&self, v: f64) -> Option<u8> {
        encode_fpa_real(v)
    }
}

pub struct Vfp;

impl FpArchitecture for Vfp {
    fn max_regs(&self) -> u32 {
        crate::constants::FIXED_VFP_DOUBLE_REGS
    }

    fn max_offset_words(&self) -> i32 {
        crate::constants::FPA_MAX_WORD_OFFSET as i32
    }

    fn is_fixed(&self, reg: u32) -> bool {
        reg < crate::constants::FIXED_VFP_DOUBLE_REGS
    }

    fn encode_real(&self, _v: f64) -> Option<u8> {
        None
    }
}

/// `MVF`/`MNF` with an immediate operand: negative values flip the
/// mnemonic and encode the negation; values outside the 8-entry table
/// spill through a real-constant literal load.
#[allow(clippy::too_many_arguments)]
pub fn add_mvfmnf_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    rounding: Rounding,
    size: u8,
    dest: FpaReg,
    imm: f64,
) -> Index {
    let (op, imm) = if imm < 0.0 {
        (FpaOp::MNF, -imm)
    } else {
        (FpaOp::MVF, imm)
    };

    if let Some(encoded) = encode_fpa_real(imm) {
        return section.add_instruction(
            pool,
            Instruction::FpaData(FpaData {
                op,
                ccode,
                rounding,
                size,
                dest,
                op1: None,
                op2: FpaOperand::Imm(encoded),
            }),
        );
    }

    let label = section.add_real_constant(if op == FpaOp::MNF { -imm } else { imm });
    section.add_instruction(
        pool,
        Instruction::FpaData(FpaData {
            op: FpaOp::MVF,
            ccode,
            rounding,
            size,
            dest,
            op1: None,
            op2: FpaOperand::Reg(dest),
        }),
    );
    section.add_instruction(
        pool,
        Instruction::LiteralLoad(LiteralLoad {
            ccode,
            dest: LiteralDest::Fpa(dest),
            label,
            link_time: false,
        }),
    )
}

/// A dyadic FPA data op whose second operand is an immediate: encode
/// inline if it's one of the 8 table entries, otherwise materialize it
/// into a fresh FPA register first.
#[allow(clippy::too_many_arguments)]
pub fn add_data_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    op: FpaOp,
    ccode: ConditionCode,
    rounding: Rounding,
    size: u8,
    dest: FpaReg,
    op1: FpaReg,
    imm: f64,
) -> Index {
    if let Some(encoded) = encode_fpa_real(imm) {
        return section.add_instruction(
            pool,
            Instruction::FpaData(FpaData {
                op,
                ccode,
                rounding,
                size,
                dest,
                op1: Some(op1),
                op2: FpaOperand::Imm(encoded),
            }),
        );
    }

    let tmp = section.alloc_fpa_vreg();
    add_mvfmnf_imm(section, pool, ccode, rounding, size, tmp, imm);
    section.add_instruction(
        pool,
        Instruction::FpaData(FpaData {
            op,
            ccode,
            rounding,
            size,
            dest,
            op1: Some(op1),
            op2: FpaOperand::Reg(tmp),
        }),
    )
}

/// `FIX`/`FLT`: converts between an integer register and an FPA register.
pub fn add_tran(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    op: FpaFixFloat,
    ccode: ConditionCode,
    rounding: Rounding,
    size: u8,
    int_reg: IntReg,
    fp_reg: FpaReg,
) -> Index {
    section.add_instruction(
        pool,
        Instruction::FpaTransfer(FpaTransfer {
            op,
            ccode,
            rounding,
            size,
            int_reg,
            fp_reg,
        }),
    )
}

/// `WFS`/`RFS`: transfers the FPA status word to/from an integer register.
pub fn add_cptran(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    op: FpaCoTransfer,
    ccode: ConditionCode,
    reg: IntReg,
) -> Index {
    section.add_instruction(pool, Instruction::FpaCoprocessor(FpaCoprocessor { op, ccode, reg }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mvf_encodes_table_entries_inline() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        add_mvfmnf_imm(&mut section, &mut pool, ConditionCode::AL, Rounding::Nearest, 8, FpaReg(0), 4.0);
        assert_eq!(section.len(), 1);
        assert_eq!(section.real_constants.len(), 0);
    }

    #[test]
    fn mvf_negative_table_entry_flips_to_mnf() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        let idx = add_mvfmnf_imm(&mut section, &mut pool, ConditionCode::AL, Rounding::Nearest, 8, FpaReg(0), -4.0);
        if let Op::Instruction(Instruction::FpaData(d)) = pool.get(idx) {
            assert_eq!(d.op, FpaOp::MNF);
        } else {
            panic!("expected FPA data op");
        }
    }

    #[test]
    fn mvf_outside_table_spills_to_real_constant() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        add_mvfmnf_imm(&mut section, &mut pool, ConditionCode::AL, Rounding::Nearest, 8, FpaReg(0), 3.5);
        assert_eq!(section.real_constants.len(), 1);
    }

    #[test]
    fn vfp_never_encodes_immediates() {
        let vfp = Vfp;
        assert_eq!(vfp.encode_real(4.0), None);
        let fpa = Fpa;
        assert_eq!(fpa.encode_real(4.0), Some(4));
    }
}
