//! Single traversal point over a section's instruction stream. Every
//! other consumer that needs to enumerate instructions - the dump
//! formatter, the encoder, the VM's disassembler, distance analysis, the
//! register allocator - goes through this module rather than walking
//! `Section`/`OpPool` by hand.
//!
//! The teacher's C original passes a struct of function pointers, one per
//! instruction category; a Rust trait with defaulted methods is the
//! direct idiomatic replacement; `walk` treats a default (unoverridden)
//! method as "no callback registered" and turns it into the same
//! `UnhandledOpKind` assertion the original raises.

use crate::error::EncodeError;
use crate::instruction::*;
use crate::op_pool::{Index, OpPool};

pub trait Visitor {
    fn data_processing(&mut self, _op: &DataProcessing) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("data_processing"))
    }
    fn multiply(&mut self, _op: &Multiply) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("multiply"))
    }
    fn single_transfer(&mut self, _op: &SingleTransfer) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("single_transfer"))
    }
    fn multi_transfer(&mut self, _op: &MultiTransfer) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("multi_transfer"))
    }
    fn branch(&mut self, _op: &Branch) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("branch"))
    }
    fn swi(&mut self, _op: &Swi) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("swi"))
    }
    fn literal_load(&mut self, _op: &LiteralLoad) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("literal_load"))
    }
    fn adr(&mut self, _op: &Adr) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("adr"))
    }
    fn cmov(&mut self, _op: &Cmov) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("cmov"))
    }
    fn fpa_data(&mut self, _op: &FpaData) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("fpa_data"))
    }
    fn fpa_compare(&mut self, _op: &FpaCompare) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("fpa_compare"))
    }
    fn fpa_transfer(&mut self, _op: &FpaTransfer) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("fpa_transfer"))
    }
    fn fpa_coprocessor(&mut self, _op: &FpaCoprocessor) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("fpa_coprocessor"))
    }
    fn vfp_data(&mut self, _op: &VfpData) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("vfp_data"))
    }
    fn vfp_compare(&mut self, _op: &VfpCompare) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("vfp_compare"))
    }
    fn vfp_transfer(&mut self, _op: &VfpTransfer) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("vfp_transfer"))
    }
    fn vfp_convert(&mut self, _op: &VfpConvert) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("vfp_convert"))
    }
    fn vfp_fpscr_transfer(&mut self, _op: &VfpFpscrTransfer) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("vfp_fpscr_transfer"))
    }
    fn directive(&mut self, _op: &Directive) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("directive"))
    }
    fn label(&mut self, _id: u32) -> Result<(), EncodeError> {
        Err(EncodeError::UnhandledOpKind("label"))
    }
}

fn dispatch(op: &Op, visitor: &mut dyn Visitor) -> Result<(), EncodeError> {
    match op {
        Op::Instruction(Instruction::DataProcessing(i)) => visitor.data_processing(i),
        Op::Instruction(Instruction::Multiply(i)) => visitor.multiply(i),
        Op::Instruction(Instruction::SingleTransfer(i)) => visitor.single_transfer(i),
        Op::Instruction(Instruction::MultiTransfer(i)) => visitor.multi_transfer(i),
        Op::Instruction(Instruction::Branch(i)) => visitor.branch(i),
        Op::Instruction(Instruction::Swi(i)) => visitor.swi(i),
        Op::Instruction(Instruction::LiteralLoad(i)) => visitor.literal_load(i),
        Op::Instruction(Instruction::Adr(i)) => visitor.adr(i),
        Op::Instruction(Instruction::Cmov(i)) => visitor.cmov(i),
        Op::Instruction(Instruction::FpaData(i)) => visitor.fpa_data(i),
        Op::Instruction(Instruction::FpaCompare(i)) => visitor.fpa_compare(i),
        Op::Instruction(Instruction::FpaTransfer(i)) => visitor.fpa_transfer(i),
        Op::Instruction(Instruction::FpaCoprocessor(i)) => visitor.fpa_coprocessor(i),
        Op::Instruction(Instruction::VfpData(i)) => visitor.vfp_data(i),
        Op::Instruction(Instruction::VfpCompare(i)) => visitor.vfp_compare(i),
        Op::Instruction(Instruction::VfpTransfer(i)) => visitor.vfp_transfer(i),
        Op::Instruction(Instruction::VfpConvert(i)) => visitor.vfp_convert(i),
        Op::Instruction(Instruction::VfpFpscrTransfer(i)) => visitor.vfp_fpscr_transfer(i),
        Op::Directive(d) => visitor.directive(d),
        Op::Label(id) => visitor.label(*id),
    }
}

/// Walks an entire section from its first op to its last.
pub fn walk(pool: &OpPool<Op>, first: Option<Index>, visitor: &mut dyn Visitor) -> Result<(), EncodeError> {
    walk_from_to(pool, first, None, visitor)
}

/// Walks from `start` (inclusive) to the end of the list.
pub fn walk_from(pool: &OpPool<Op>, start: Option<Index>, visitor: &mut dyn Visitor) -> Result<(), EncodeError> {
    walk_from_to(pool, start, None, visitor)
}

/// Walks from `start` (inclusive) up to but not including `end`.
pub fn walk_from_to(
    pool: &OpPool<Op>,
    start: Option<Index>,
    end: Option<Index>,
    visitor: &mut dyn Visitor,
) -> Result<(), EncodeError> {
    let mut cursor = start;
    while let Some(index) = cursor {
        if Some(index) == end {
            break;
        }
        dispatch(pool.get(index), visitor)?;
        cursor = pool.next(index);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionCode;
    use crate::operand::Operand2;
    use crate::reg::IntReg;
    use crate::section::Section;

    struct Counter {
        dp: u32,
        labels: u32,
    }

    impl Visitor for Counter {
        fn data_processing(&mut self, _op: &DataProcessing) -> Result<(), EncodeError> {
            self.dp += 1;
            Ok(())
        }
        fn label(&mut self, _id: u32) -> Result<(), EncodeError> {
            self.labels += 1;
            Ok(())
        }
    }

    #[test]
    fn walk_visits_every_node_in_order() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        section.add_instruction(
            &mut pool,
            Instruction::DataProcessing(DataProcessing {
                op: DpOp::MOV,
                ccode: ConditionCode::AL,
                set_flags: false,
                dest: IntReg(16),
                op1: None,
                op2: Operand2::Imm(1),
            }),
        );
        section.add_label(&mut pool, 0);
        let mut counter = Counter { dp: 0, labels: 0 };
        walk(&pool, section.first(), &mut counter).unwrap();
        assert_eq!(counter.dp, 1);
        assert_eq!(counter.labels, 1);
    }

    #[test]
    fn missing_callback_surfaces_as_unhandled_op_kind() {
        struct Empty;
        impl Visitor for Empty {}

        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        section.add_label(&mut pool, 0);
        let err = walk(&pool, section.first(), &mut Empty).unwrap_err();
        assert_eq!(err, EncodeError::UnhandledOpKind("label"));
    }
}
