//! Word decoder: the VM's own inverse of `encoder.rs`'s bit layouts.
//! It is only required to round-trip what this crate's encoder itself
//! produces, not to decode arbitrary third-party ARM binaries.

use crate::condition::ConditionCode;
use crate::constants::*;
use crate::error::VmError;
use crate::instruction::{
    Branch, BranchTarget, DataProcessing, DpOp, Instruction, LinkType, Multiply, MultiTransfer,
    MtranMode, SingleTransfer, Swi, TransferOp,
};
use crate::operand::{Operand2, ShiftAmount, ShiftKind};
use crate::reg::IntReg;
use num_traits::FromPrimitive;

fn shift_kind_from_bits(bits: u32) -> ShiftKind {
    match bits {
        0b00 => ShiftKind::LSL,
        0b01 => ShiftKind::LSR,
        0b10 => ShiftKind::ASR,
        _ => ShiftKind::ROR,
    }
}

fn decode_operand2(word: u32, immediate: bool) -> Operand2 {
    if immediate {
        return Operand2::Imm(word & DP_OPERAND2_MASK);
    }
    let rm = IntReg(word & 0xF);
    let kind = shift_kind_from_bits((word >> 5) & 0b11);
    if word & (1 << 4) == 0 {
        let amount = (word >> 7) & 0x1F;
        if amount == 0 && kind == ShiftKind::LSL {
            return Operand2::Reg(rm);
        }
        Operand2::Shifted {
            rm,
            kind,
            amount: ShiftAmount::Immediate(amount as u8),
        }
    } else {
        let rs = IntReg((word >> 8) & 0xF);
        Operand2::Shifted {
            rm,
            kind,
            amount: ShiftAmount::Reg(rs),
        }
    }
}

fn int_reg(word: u32, offset: u32, mask: u32) -> IntReg {
    IntReg((word & mask) >> offset)
}

/// Decodes one 32-bit word into its condition code and instruction.
/// Recognizes the same five classes `encoder.rs` emits: multiply, single
/// transfer, multi-transfer, branch, SWI, falling back to data-processing.
pub fn decode_word(word: u32) -> Result<(ConditionCode, Instruction), VmError> {
    let ccode = ConditionCode::from_u32(word >> COND_OFFSET).ok_or(VmError::IllegalInstruction(word))?;

    if word & SWI_CLASS_MASK == SWI_CLASS_VALUE {
        return Ok((
            ccode,
            Instruction::Swi(Swi {
                ccode,
                code: word & SWI_CODE_MASK,
                read_mask: 0,
                write_mask: 0,
            }),
        ));
    }

    if word & BRANCH_CLASS_MASK == BRANCH_CLASS_VALUE {
        let link = word & BRANCH_L_BIT != 0;
        let raw = word & BRANCH_OFFSET24_MASK;
        let signed = if raw & BRANCH_SIGN_BIT != 0 {
            (raw | BRANCH_SIGN_EXTEND) as i32
        } else {
            raw as i32
        };
        return Ok((
            ccode,
            Instruction::Branch(Branch {
                ccode,
                link,
                local: true,
                link_type: LinkType::Void,
                target: BranchTarget::Offset(signed),
            }),
        ));
    }

    if word & 0x0FC0_00F0 == MUL_CLASS_VALUE {
        let accumulate = word & MUL_A_BIT != 0;
        return Ok((
            ccode,
            Instruction::Multiply(Multiply {
                ccode,
                set_flags: word & DP_S_MASK != 0,
                accumulate,
                dest: int_reg(word, MUL_RD_OFFSET, MUL_RD_MASK),
                rm: IntReg(word & MUL_RM_MASK),
                rs: int_reg(word, MUL_RS_OFFSET, MUL_RS_MASK),
                rn: if accumulate {
                    Some(int_reg(word, MUL_RN_OFFSET, MUL_RN_MASK))
                } else {
                    None
                },
            }),
        ));
    }

    // SDT (01) and MTRAN (10) share `DP_CLASS_MASK`'s bit span but disagree
    // on its value; MOV PC,Rm (the indirect-branch shape) also carries
    // `DP_CLASS_MASK == 0` so must be checked ahead of plain data-processing.
    if word & SDT_CLASS_MASK == SDT_CLASS_VALUE {
        let is_register_offset = word & SDT_I_BIT != 0;
        return Ok((
            ccode,
            Instruction::SingleTransfer(SingleTransfer {
                op: if word & SDT_L_BIT != 0 { TransferOp::Ldr } else { TransferOp::Str },
                ccode,
                dest: int_reg(word, DP_RD_OFFSET, DP_RD_MASK),
                base: int_reg(word, DP_RN_OFFSET, DP_RN_MASK),
                offset: decode_operand2(word, !is_register_offset),
                pre_indexed: word & SDT_P_BIT != 0,
                write_back: word & SDT_W_BIT != 0,
                subtract: word & SDT_U_BIT == 0,
                byte: word & SDT_B_BIT != 0,
            }),
        ));
    }

    if word & 0x0E00_0000 == 0x0800_0000 {
        let u = word & (1 << 23) != 0;
        let p = word & (1 << 24) != 0;
        let mode = match (p, u) {
            (false, true) => MtranMode::IA,
            (true, true) => MtranMode::IB,
            (false, false) => MtranMode::DA,
            (true, false) => MtranMode::DB,
        };
        return Ok((
            ccode,
            Instruction::MultiTransfer(MultiTransfer {
                op: if word & SDT_L_BIT != 0 { TransferOp::Ldr } else { TransferOp::Str },
                ccode,
                base: int_reg(word, DP_RN_OFFSET, DP_RN_MASK),
                reg_list: (word & 0xFFFF) as u16,
                mode,
                write_back: word & SDT_W_BIT != 0,
                status: word & (1 << 22) != 0,
            }),
        ));
    }

    let op = DpOp::from_u32((word & DP_OP_MASK) >> DP_OP_OFFSET).ok_or(VmError::IllegalInstruction(word))?;
    let dest = int_reg(word, DP_RD_OFFSET, DP_RD_MASK);
    let op1 = if op.is_move() {
        None
    } else {
        Some(int_reg(word, DP_RN_OFFSET, DP_RN_MASK))
    };
    Ok((
        ccode,
        Instruction::DataProcessing(DataProcessing {
            op,
            ccode,
            set_flags: word & DP_S_MASK != 0,
            dest,
            op1,
            op2: decode_operand2(word, word & DP_I_BIT != 0),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op_pool::OpPool;
    use crate::section::Section;

    #[test]
    fn round_trips_a_mov_immediate() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(3), 42);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let (ccode, instr) = decode_word(words[0]).unwrap();
        assert_eq!(ccode, ConditionCode::AL);
        match instr {
            Instruction::DataProcessing(dp) => {
                assert_eq!(dp.op, DpOp::MOV);
                assert_eq!(dp.dest, IntReg(3));
                assert_eq!(dp.op2, Operand2::Imm(42));
            }
            _ => panic!("expected data processing"),
        }
    }

    #[test]
    fn round_trips_a_multiply() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_mul(&mut section, &mut pool, ConditionCode::AL, false, IntReg(0), IntReg(1), IntReg(2)).unwrap();
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let (_, instr) = decode_word(words[0]).unwrap();
        assert!(matches!(instr, Instruction::Multiply(_)));
    }

    #[test]
    fn round_trips_a_swi() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, 0x11, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let (_, instr) = decode_word(words[0]).unwrap();
        match instr {
            Instruction::Swi(s) => assert_eq!(s.code, 0x11),
            _ => panic!("expected swi"),
        }
    }
}
