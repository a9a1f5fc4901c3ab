//! Constructive ARM instruction builders. Each `add_*` function
//! appends one or more instructions implementing a semantic operation,
//! choosing the shortest legal encoding and falling back to a literal-pool
//! load only when the immediate genuinely doesn't fit.

use crate::condition::ConditionCode;
use crate::imm::{encode_imm, encode_lvl2};
use crate::instruction::{
    BranchTarget, DataProcessing, DpOp, Instruction, LinkType, LiteralDest, LiteralLoad,
    MtranMode, Multiply, Op, SingleTransfer, TransferOp,
};
use crate::op_pool::{Index, OpPool};
use crate::operand::Operand2;
use crate::reg::IntReg;
use crate::section::Section;

fn dp(
    op: DpOp,
    ccode: ConditionCode,
    set_flags: bool,
    dest: IntReg,
    op1: Option<IntReg>,
    op2: Operand2,
) -> Instruction {
    Instruction::DataProcessing(DataProcessing {
        op,
        ccode,
        set_flags,
        dest,
        op1,
        op2,
    })
}

/// Flips an add-shaped opcode to its "negated operand" sibling, used as a
/// fallback step (ADD<->SUB, MOV<->MVN, CMP<->CMN).
fn alt_op(op: DpOp) -> Option<DpOp> {
    match op {
        DpOp::ADD => Some(DpOp::SUB),
        DpOp::SUB => Some(DpOp::ADD),
        DpOp::MOV => Some(DpOp::MVN),
        DpOp::MVN => Some(DpOp::MOV),
        DpOp::CMP => Some(DpOp::CMN),
        DpOp::CMN => Some(DpOp::CMP),
        _ => None,
    }
}

/// The shared fallback cascade every immediate-taking data-processing
/// builder goes through: direct encode, negated-operand encode, two-op
/// split, and finally a literal-pool load.
#[allow(clippy::too_many_arguments)]
fn add_dp_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    op: DpOp,
    ccode: ConditionCode,
    set_flags: bool,
    dest: IntReg,
    op1: Option<IntReg>,
    imm: u32,
) -> Index {
    // Step 1: single rotated immediate.
    if let Some(e) = encode_imm(imm) {
        return section.add_instruction(pool, dp(op, ccode, set_flags, dest, op1, Operand2::Imm(e)));
    }

    // Step 2: negate and retry with the alt opcode.
    if (imm as i32) < 0 {
        if let Some(alt) = alt_op(op) {
            let negated = (imm as i32).wrapping_neg() as u32;
            if let Some(e) = encode_imm(negated) {
                return section.add_instruction(pool, dp(alt, ccode, set_flags, dest, op1, Operand2::Imm(e)));
            }
        }
    }

    // Step 3: flag-setting conditional ops skip the lvl-2 split (it would
    // clobber flags on the intermediate instruction) and fall to step 5.
    let try_lvl2 = !(set_flags && ccode != ConditionCode::AL);

    if try_lvl2 {
        if let Some((e1, e2)) = encode_lvl2(imm) {
            let tmp = section.alloc_int_vreg();
            section.add_instruction(pool, dp(op, ccode, false, tmp, op1, Operand2::Imm(e1)));
            return section.add_instruction(pool, dp(op, ccode, set_flags, dest, Some(tmp), Operand2::Imm(e2)));
        }
    }

    // Step 5: spill through the literal pool.
    let label = section.add_int_constant(imm, false);
    let tmp = section.alloc_int_vreg();
    section.add_instruction(
        pool,
        Instruction::LiteralLoad(LiteralLoad {
            ccode,
            dest: LiteralDest::Int(tmp),
            label,
            link_time: false,
        }),
    );
    section.add_instruction(pool, dp(op, ccode, set_flags, dest, op1, Operand2::Reg(tmp)))
}

pub fn add_mov_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    dest: IntReg,
    imm: u32,
) -> Index {
    add_dp_imm(section, pool, DpOp::MOV, ccode, false, dest, None, imm)
}

pub fn add_add_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    set_flags: bool,
    dest: IntReg,
    op1: IntReg,
    imm: u32,
) -> Index {
    add_dp_imm(section, pool, DpOp::ADD, ccode, set_flags, dest, Some(op1), imm)
}

pub fn add_sub_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    set_flags: bool,
    dest: IntReg,
    op1: IntReg,
    imm: u32,
) -> Index {
    add_dp_imm(section, pool, DpOp::SUB, ccode, set_flags, dest, Some(op1), imm)
}

pub fn add_cmp_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    op1: IntReg,
    imm: u32,
) -> Index {
    add_dp_imm(section, pool, DpOp::CMP, ccode, true, IntReg::R0, Some(op1), imm)
}

pub fn add_cmn_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    op1: IntReg,
    imm: u32,
) -> Index {
    add_dp_imm(section, pool, DpOp::CMN, ccode, true, IntReg::R0, Some(op1), imm)
}

/// `RSB dst', op1, #0` then `SUB dst, dst', #|op2|`: the two-instruction
/// negate-then-subtract form used when a plain RSB-imm would not itself
/// fit.
pub fn add_rsb_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    dest: IntReg,
    op1: IntReg,
    imm: i32,
) -> Index {
    if imm >= 0 {
        return add_dp_imm(
            section,
            pool,
            DpOp::RSB,
            ccode,
            false,
            dest,
            Some(op1),
            imm as u32,
        );
    }
    let negated = section.alloc_int_vreg();
    section.add_instruction(
        pool,
        dp(DpOp::RSB, ccode, false, negated, Some(op1), Operand2::Imm(0)),
    );
    add_sub_imm(section, pool, ccode, false, dest, negated, imm.unsigned_abs())
}

/// `MUL dest, rm, rs`: ARM cannot encode `dest == rm`, so swap the
/// multiplicands when needed; `dest == rm == rs` has no valid encoding at
/// all.
pub fn add_mul(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    set_flags: bool,
    dest: IntReg,
    rm: IntReg,
    rs: IntReg,
) -> Result<Index, crate::error::BuilderError> {
    let (rm, rs) = if dest == rm {
        if dest == rs {
            return Err(crate::error::BuilderError::MulSelfAlias);
        }
        (rs, rm)
    } else {
        (rm, rs)
    };
    Ok(section.add_instruction(
        pool,
        Instruction::Multiply(Multiply {
            ccode,
            set_flags,
            accumulate: false,
            dest,
            rm,
            rs,
            rn: None,
        }),
    ))
}

/// Materializes `imm` into a scratch register, then multiplies by it.
pub fn add_mul_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    dest: IntReg,
    rm: IntReg,
    imm: u32,
) -> Result<Index, crate::error::BuilderError> {
    let tmp = section.alloc_int_vreg();
    add_mov_imm(section, pool, ccode, tmp, imm);
    add_mul(section, pool, ccode, false, dest, rm, tmp)
}

/// `LDR`/`STR` with an immediate offset. In-range offsets (`|offset| <=
/// 4095`) use the immediate form directly; out-of-range offsets are
/// materialized into a register via a literal load first.
#[allow(clippy::too_many_arguments)]
pub fn add_stran_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    op: TransferOp,
    ccode: ConditionCode,
    dest: IntReg,
    base: IntReg,
    offset: i32,
    byte: bool,
) -> Index {
    if offset.unsigned_abs() <= crate::constants::SDT_MAX_OFFSET as u32 {
        return section.add_instruction(
            pool,
            Instruction::SingleTransfer(SingleTransfer {
                op,
                ccode,
                dest,
                base,
                offset: Operand2::Imm(offset.unsigned_abs()),
                pre_indexed: true,
                write_back: false,
                subtract: offset < 0,
                byte,
            }),
        );
    }

    let label = section.add_int_constant(offset as u32, false);
    let tmp = section.alloc_int_vreg();
    section.add_instruction(
        pool,
        Instruction::LiteralLoad(LiteralLoad {
            ccode,
            dest: LiteralDest::Int(tmp),
            label,
            link_time: false,
        }),
    );
    section.add_instruction(
        pool,
        Instruction::SingleTransfer(SingleTransfer {
            op,
            ccode,
            dest,
            base,
            offset: Operand2::Reg(tmp),
            pre_indexed: true,
            write_back: false,
            subtract: false,
            byte,
        }),
    )
}

/// `STR reg, [SP, #4]!`: pre-indexed, write-back, descending.
pub fn add_push(section: &mut Section, pool: &mut OpPool<Op>, ccode: ConditionCode, reg: IntReg) -> Index {
    section.add_instruction(
        pool,
        Instruction::SingleTransfer(SingleTransfer {
            op: TransferOp::Str,
            ccode,
            dest: reg,
            base: IntReg::SP,
            offset: Operand2::Imm(4),
            pre_indexed: true,
            write_back: true,
            subtract: true,
            byte: false,
        }),
    )
}

/// `LDR reg, [SP], #4`: post-indexed, write-back, ascending.
pub fn add_pop(section: &mut Section, pool: &mut OpPool<Op>, ccode: ConditionCode, reg: IntReg) -> Index {
    section.add_instruction(
        pool,
        Instruction::SingleTransfer(SingleTransfer {
            op: TransferOp::Ldr,
            ccode,
            dest: reg,
            base: IntReg::SP,
            offset: Operand2::Imm(4),
            pre_indexed: false,
            write_back: true,
            subtract: false,
            byte: false,
        }),
    )
}

/// Inserts a spill sequence before `pos`: a literal load of `offset` into
/// `spill_reg`, then a pre-indexed register-offset transfer. Used when a
/// spill slot's offset exceeds the immediate form's +-4095 range.
#[allow(clippy::too_many_arguments)]
pub fn insert_stran_spill_imm(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    pos: Index,
    op: TransferOp,
    ccode: ConditionCode,
    dest: IntReg,
    base: IntReg,
    spill_reg: IntReg,
    offset: u32,
) {
    let label = section.add_int_constant(offset, false);
    section.insert(
        pool,
        pos,
        Instruction::LiteralLoad(LiteralLoad {
            ccode,
            dest: LiteralDest::Int(spill_reg),
            label,
            link_time: false,
        }),
    );
    section.insert(
        pool,
        pos,
        Instruction::SingleTransfer(SingleTransfer {
            op,
            ccode,
            dest,
            base,
            offset: Operand2::Reg(spill_reg),
            pre_indexed: true,
            write_back: false,
            subtract: false,
            byte: false,
        }),
    );
}

/// Directly constructs an LDM/STM over a caller-supplied register bitmap,
/// used after register allocation to emit the final callee-save lists.
pub fn add_mtran(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    op: TransferOp,
    ccode: ConditionCode,
    base: IntReg,
    reg_list: u16,
    mode: MtranMode,
    write_back: bool,
) -> Index {
    section.add_instruction(
        pool,
        Instruction::MultiTransfer(crate::instruction::MultiTransfer {
            op,
            ccode,
            base,
            reg_list,
            mode,
            write_back,
            status: false,
        }),
    )
}

pub fn add_branch(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    link: bool,
    label: u32,
) -> Index {
    section.add_instruction(
        pool,
        Instruction::Branch(crate::instruction::Branch {
            ccode,
            link,
            local: true,
            link_type: LinkType::Void,
            target: BranchTarget::Label(label),
        }),
    )
}

pub fn add_swi(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    ccode: ConditionCode,
    code: u32,
    read_mask: u16,
    write_mask: u16,
) -> Index {
    section.add_instruction(
        pool,
        Instruction::Swi(crate::instruction::Swi {
            ccode,
            code,
            read_mask,
            write_mask,
        }),
    )
}

pub fn add_byte(section: &mut Section, pool: &mut OpPool<Op>, v: u8) -> Index {
    section.add_directive(pool, crate::instruction::Directive::Byte(v))
}

pub fn add_four_bytes(section: &mut Section, pool: &mut OpPool<Op>, v: u32) -> Index {
    section.add_directive(pool, crate::instruction::Directive::FourBytes(v))
}

pub fn add_string(section: &mut Section, pool: &mut OpPool<Op>, s: &str) -> Index {
    section.add_directive(pool, crate::instruction::Directive::Str(s.to_string()))
}

pub fn add_align(section: &mut Section, pool: &mut OpPool<Op>, to: u32) -> Index {
    section.add_directive(pool, crate::instruction::Directive::Align(to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Op;

    fn dest() -> IntReg {
        IntReg(16)
    }

    #[test]
    fn add_imm_127_is_a_single_instruction() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        add_add_imm(&mut section, &mut pool, ConditionCode::AL, false, dest(), IntReg(1), 127);
        assert_eq!(section.len(), 1);
    }

    #[test]
    fn add_imm_257_decomposes_into_two_instructions() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        add_add_imm(&mut section, &mut pool, ConditionCode::AL, false, dest(), IntReg(1), 257);
        assert_eq!(section.len(), 2);
    }

    #[test]
    fn add_imm_negative_as_u32_flips_to_sub() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        // 0xFFFFFF00 == -256 as i32: ADD should flip to SUB #256.
        add_add_imm(&mut section, &mut pool, ConditionCode::AL, false, dest(), IntReg(1), 0xFFFFFF00);
        assert_eq!(section.len(), 1);
        if let Some(Op::Instruction(Instruction::DataProcessing(dp))) =
            section.first().map(|i| pool.get(i).clone())
        {
            assert_eq!(dp.op, DpOp::SUB);
            // op2 stores the encoded rotated-immediate form, not the raw value.
            assert_eq!(dp.op2.imm(), Some(0xC01));
        } else {
            panic!("expected a single SUB");
        }
    }

    #[test]
    fn add_imm_unencodable_even_split_falls_back_to_literal_pool() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        // 0x1FFFF: 17 consecutive bits, not singly or lvl-2 encodable.
        add_add_imm(&mut section, &mut pool, ConditionCode::AL, false, dest(), IntReg(1), 0x1FFFF);
        // literal load + the final op.
        assert_eq!(section.len(), 2);
        assert_eq!(section.int_constants.len(), 1);
    }

    #[test]
    fn mul_with_aliased_destination_and_multiplier_swaps_operands() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        add_mul(&mut section, &mut pool, ConditionCode::AL, false, IntReg(1), IntReg(1), IntReg(2)).unwrap();
        if let Some(Op::Instruction(Instruction::Multiply(m))) =
            section.first().map(|i| pool.get(i).clone())
        {
            assert_eq!(m.rm, IntReg(2));
            assert_eq!(m.rs, IntReg(1));
        } else {
            panic!("expected a multiply");
        }
    }

    #[test]
    fn mul_with_all_operands_aliased_is_rejected() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        let err = add_mul(&mut section, &mut pool, ConditionCode::AL, false, IntReg(1), IntReg(1), IntReg(1))
            .unwrap_err();
        assert_eq!(err, crate::error::BuilderError::MulSelfAlias);
    }

    #[test]
    fn stran_out_of_range_offset_spills_through_a_register() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        add_stran_imm(&mut section, &mut pool, TransferOp::Ldr, ConditionCode::AL, dest(), IntReg::SP, 5000, false);
        assert_eq!(section.len(), 2);
    }
}
