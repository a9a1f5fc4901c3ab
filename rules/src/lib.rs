//! Rule engine glue: compiles the pattern mini-language once into
//! `Vec<CompiledRule>`, then walks an `IrProgram` linearly, firing the
//! longest matching rule's action at each position to drive
//! `armgen::builders`/`armgen::Section`.
//!
//! Built the way a `pest`-parsed mini-language usually is: compiled once
//! and then matched/walked linearly against its input, except the parsed
//! language is IR instruction patterns rather than assembly text, and the
//! "walk" drives codegen rather than producing an executable.

mod error;
mod ir;
mod parser;
mod pattern;

pub use error::EngineError;
pub use ir::{IrOp, IrOperand, IrProgram, IrSection};
pub use pattern::{compile_pattern, CompiledPattern, OperandPattern};

use armgen::builders;
use armgen::condition::ConditionCode;
use armgen::instruction::{DataProcessing, DpOp, Instruction, Op, TransferOp};
use armgen::op_pool::OpPool;
use armgen::operand::Operand2;
use armgen::reg::IntReg;
use armgen::section::Section;
use armgen::settings::Settings;
use armgen::Program;
use std::collections::HashMap;

const PRINT_BUFFER_LEN: u32 = 16;

/// Fixed scratch address for `printi32`'s conversion buffer, in the
/// reserved low workspace below the default `start_address` (0x8000) so it
/// never collides with loaded code, the heap, or the stack.
const PRINT_BUFFER_ADDR: u32 = 0x1000;

/// What a matched rule does once it's fired. One variant per rule in the
/// fixed table below; `lower_op` dispatches on this against the matched IR
/// window directly, since every action reads its operands positionally out
/// of a fixed instruction shape rather than a name-keyed capture map.
#[derive(Clone, Copy, Debug)]
enum RuleAction {
    MovImm,
    AddImm,
    StoreImm,
    LoadImm,
    Label,
    CompareAndBranch,
    PrintInt,
}

struct Rule {
    pattern: CompiledPattern,
    action: RuleAction,
}

/// The fixed rule table, longest pattern first so a multi-instruction
/// fusion is tried before its prefix would otherwise match as a
/// single-instruction rule.
pub struct RuleEngine {
    rules: Vec<Rule>,
}

const KNOWN_MNEMONICS: &[&str] = &[
    "movii32", "addii32", "storeoi32", "loadoi32", "ltii32", "jmpc", "printi32", "label",
];

impl RuleEngine {
    pub fn new() -> Result<RuleEngine, EngineError> {
        let mut rules = vec![
            Rule {
                pattern: compile_pattern("ltii32 r_1,*,*; jmpc r_1,label_1,*; label_1")?,
                action: RuleAction::CompareAndBranch,
            },
            Rule {
                pattern: compile_pattern("movii32 *, *")?,
                action: RuleAction::MovImm,
            },
            Rule {
                pattern: compile_pattern("addii32 *, *, *")?,
                action: RuleAction::AddImm,
            },
            Rule {
                pattern: compile_pattern("storeoi32 *, *, *")?,
                action: RuleAction::StoreImm,
            },
            Rule {
                pattern: compile_pattern("loadoi32 *, *, *")?,
                action: RuleAction::LoadImm,
            },
            Rule {
                pattern: compile_pattern("printi32 *")?,
                action: RuleAction::PrintInt,
            },
            Rule {
                pattern: compile_pattern("label *")?,
                action: RuleAction::Label,
            },
        ];
        rules.sort_by_key(|r| std::cmp::Reverse(r.pattern.len()));
        Ok(RuleEngine { rules })
    }

    /// Lowers every section of `ir` into an `armgen::Program`, firing the
    /// longest matching rule at each position.
    pub fn lower(&self, ir: &IrProgram, settings: Settings) -> Result<Program, EngineError> {
        let mut program = Program::new(settings);
        for (section_index, ir_section) in ir.sections.iter().enumerate() {
            let mut section = Section::new(ir_section.reg_counter, 0, ir_section.label_counter, 0);
            let mut pool = program.op_pool;
            let mut i = 0;
            while i < ir_section.ops.len() {
                let consumed = self.match_len_at(&ir_section.ops, i).ok_or_else(|| EngineError::NoMatchingRule {
                    section: section_index,
                    op_index: i,
                    mnemonic: ir_section.ops[i].mnemonic.clone(),
                })?;
                let window = &ir_section.ops[i..i + consumed.0];
                lower_op(&mut section, &mut pool, consumed.1, window)?;
                i += consumed.0;
            }
            program.op_pool = pool;
            program.add_section(section);
        }
        Ok(program)
    }

    /// Tries every rule (longest-pattern-first) at `start`, returning the
    /// number of IR ops it consumes and the action to fire.
    fn match_len_at(&self, ops: &[IrOp], start: usize) -> Option<(usize, RuleAction)> {
        'rules: for rule in &self.rules {
            if start + rule.pattern.len() > ops.len() {
                continue;
            }
            let mut bindings: HashMap<String, IrOperand> = HashMap::new();
            for (offset, step) in rule.pattern.iter().enumerate() {
                let op = &ops[start + offset];
                if !mnemonic_matches(&step.mnemonic, op, &bindings) {
                    continue 'rules;
                }
                if KNOWN_MNEMONICS.contains(&step.mnemonic.as_str()) {
                    if step.operands.len() != op.operands.len() {
                        continue 'rules;
                    }
                    for (pat, value) in step.operands.iter().zip(&op.operands) {
                        if let OperandPattern::Capture(name) = pat {
                            match bindings.get(name) {
                                Some(existing) if existing != value => continue 'rules,
                                Some(_) => {}
                                None => {
                                    bindings.insert(name.clone(), *value);
                                }
                            }
                        }
                    }
                }
            }
            return Some((rule.pattern.len(), rule.action));
        }
        None
    }
}

/// A step whose mnemonic isn't one of the known IR opcodes is a
/// back-reference to an earlier label capture (the `label_1` step in the
/// fused compare-and-branch pattern): it matches a `label` IR op whose id
/// equals the binding already recorded under that name.
fn mnemonic_matches(step_mnemonic: &str, op: &IrOp, bindings: &HashMap<String, IrOperand>) -> bool {
    if KNOWN_MNEMONICS.contains(&step_mnemonic) {
        return op.mnemonic == step_mnemonic;
    }
    op.mnemonic == "label"
        && bindings
            .get(step_mnemonic)
            .and_then(IrOperand::as_label)
            .map(|expected| op.operands.first().and_then(IrOperand::as_label) == Some(expected))
            .unwrap_or(false)
}

fn reg_operand(op: &IrOp, index: usize) -> IntReg {
    IntReg(op.operands[index].as_reg().unwrap_or(0))
}

fn imm_operand(op: &IrOp, index: usize) -> u32 {
    op.operands[index].as_imm().unwrap_or(0) as u32
}

fn label_operand(op: &IrOp, index: usize) -> u32 {
    op.operands[index].as_label().unwrap_or(0)
}

/// `ADD dest, src, #0`: the idiom used throughout for a plain register
/// copy, since the builder layer only exposes immediate-operand DP helpers
/// built around materializing immediates, not register-to-register moves.
fn copy_reg(section: &mut Section, pool: &mut OpPool<Op>, dest: IntReg, src: IntReg) {
    builders::add_add_imm(section, pool, ConditionCode::AL, false, dest, src, 0);
}

fn lower_op(
    section: &mut Section,
    pool: &mut OpPool<Op>,
    action: RuleAction,
    window: &[IrOp],
) -> Result<(), EngineError> {
    match action {
        RuleAction::MovImm => {
            let op = &window[0];
            builders::add_mov_imm(section, pool, ConditionCode::AL, reg_operand(op, 0), imm_operand(op, 1));
        }
        RuleAction::AddImm => {
            let op = &window[0];
            builders::add_add_imm(
                section,
                pool,
                ConditionCode::AL,
                false,
                reg_operand(op, 0),
                reg_operand(op, 1),
                imm_operand(op, 2),
            );
        }
        RuleAction::StoreImm => {
            let op = &window[0];
            builders::add_stran_imm(
                section,
                pool,
                TransferOp::Str,
                ConditionCode::AL,
                reg_operand(op, 0),
                reg_operand(op, 1),
                imm_operand(op, 2) as i32,
                false,
            );
        }
        RuleAction::LoadImm => {
            let op = &window[0];
            builders::add_stran_imm(
                section,
                pool,
                TransferOp::Ldr,
                ConditionCode::AL,
                reg_operand(op, 0),
                reg_operand(op, 1),
                imm_operand(op, 2) as i32,
                false,
            );
        }
        RuleAction::Label => {
            let op = &window[0];
            section.add_label(pool, label_operand(op, 0));
        }
        RuleAction::PrintInt => {
            let op = &window[0];
            let value = reg_operand(op, 0);
            // OS_ConvertInteger4 clobbers R0/R1 with the end pointer and the
            // remaining length, so the buffer base has to survive the call
            // in a scratch register of its own; no allocator runs over this
            // rule's fixed-register bundle, so R4 is used directly, same as
            // R0-R2 below.
            let buffer_reg = IntReg(4);
            copy_reg(section, pool, IntReg::R0, value);
            builders::add_mov_imm(section, pool, ConditionCode::AL, IntReg(1), PRINT_BUFFER_ADDR);
            copy_reg(section, pool, buffer_reg, IntReg(1));
            builders::add_mov_imm(section, pool, ConditionCode::AL, IntReg(2), PRINT_BUFFER_LEN);
            builders::add_swi(section, pool, ConditionCode::AL, 0xDC, 0b0111, 0b0011);
            copy_reg(section, pool, IntReg::R0, buffer_reg);
            builders::add_swi(section, pool, ConditionCode::AL, 0x02, 0b0001, 0);
        }
        RuleAction::CompareAndBranch => {
            let compare = &window[0];
            let label = label_operand(&window[1], 1);
            let lhs = reg_operand(compare, 1);
            let op2 = match compare.operands[2] {
                IrOperand::Imm(v) => Operand2::Imm(v as u32),
                _ => Operand2::Reg(reg_operand(compare, 2)),
            };
            section.add_instruction(
                pool,
                Instruction::DataProcessing(DataProcessing {
                    op: DpOp::CMP,
                    ccode: ConditionCode::AL,
                    set_flags: true,
                    dest: IntReg::R0,
                    op1: Some(lhs),
                    op2,
                }),
            );
            builders::add_branch(section, pool, ConditionCode::GE, false, label);
            section.add_label(pool, label);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armgen::settings::Settings;

    fn section_with(ops: Vec<IrOp>) -> IrProgram {
        let mut program = IrProgram::new();
        let mut section = IrSection::new();
        section.reg_counter = 16;
        section.label_counter = 0;
        for op in ops {
            section.push(op);
        }
        program.sections.push(section);
        program
    }

    #[test]
    fn movii32_lowers_to_a_single_mov() {
        let engine = RuleEngine::new().unwrap();
        let ir = section_with(vec![IrOp::new("movii32", vec![IrOperand::Reg(0), IrOperand::Imm(5)])]);
        let program = engine.lower(&ir, Settings::default()).unwrap();
        assert_eq!(program.sections[0].len(), 1);
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        let engine = RuleEngine::new().unwrap();
        let ir = section_with(vec![IrOp::new("nope", vec![])]);
        let err = engine.lower(&ir, Settings::default()).unwrap_err();
        assert!(matches!(err, EngineError::NoMatchingRule { .. }));
    }

    #[test]
    fn printi32_routes_through_os_write0_with_the_converted_digits() {
        let engine = RuleEngine::new().unwrap();
        let ir = section_with(vec![
            IrOp::new("movii32", vec![IrOperand::Reg(0), IrOperand::Imm(42)]),
            IrOp::new("printi32", vec![IrOperand::Reg(0)]),
        ]);
        let program = engine.lower(&ir, Settings::default()).unwrap();
        let words = armgen::encoder::encode_section(&program.sections[0], &program.op_pool).unwrap();
        let mut vm = armgen::vm::Vm::new(&words, &Settings::default());
        vm.run().unwrap();
        assert_eq!(vm.output(), b"42");
    }

    #[test]
    fn fused_compare_and_branch_emits_cmp_branch_and_label() {
        let engine = RuleEngine::new().unwrap();
        let ir = section_with(vec![
            IrOp::new("ltii32", vec![IrOperand::Reg(16), IrOperand::Reg(0), IrOperand::Imm(10)]),
            IrOp::new("jmpc", vec![IrOperand::Reg(16), IrOperand::Label(0), IrOperand::Reg(0)]),
            IrOp::label(0),
        ]);
        let program = engine.lower(&ir, Settings::default()).unwrap();
        assert_eq!(program.sections[0].len(), 3);
    }
}
