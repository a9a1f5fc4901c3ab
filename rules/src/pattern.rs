//! Compiles a pattern string in the textual pattern mini-language into an
//! internal match tree once, at rule-table construction time; matching an
//! already-compiled pattern against an IR window afterwards is pure data
//! comparison.

use crate::error::ParseError;
use crate::parser::{PatternParser, Rule};
use pest::Parser;

#[derive(Clone, Debug)]
pub enum OperandPattern {
    Wildcard,
    /// A named capture. Repeating the same name elsewhere in the pattern
    /// is a back-reference: the captured operand must compare equal.
    Capture(String),
}

#[derive(Clone, Debug)]
pub struct InstructionPattern {
    pub mnemonic: String,
    pub operands: Vec<OperandPattern>,
}

/// A full compiled pattern: one or more instruction shapes matched in
/// sequence against consecutive IR ops.
pub type CompiledPattern = Vec<InstructionPattern>;

pub fn compile_pattern(src: &str) -> Result<CompiledPattern, ParseError> {
    let program = PatternParser::parse(Rule::program, src)?.next().unwrap();
    let pattern = program.into_inner().next().unwrap();

    let mut steps = Vec::new();
    for instr in pattern.into_inner() {
        if instr.as_rule() != Rule::instruction_pattern {
            continue;
        }
        let mut inner = instr.into_inner();
        let mnemonic = inner.next().unwrap().as_str().to_string();
        let mut operands = Vec::new();
        if let Some(list) = inner.next() {
            for operand in list.into_inner() {
                let text = operand.as_str();
                operands.push(if text == "*" {
                    OperandPattern::Wildcard
                } else {
                    OperandPattern::Capture(text.to_string())
                });
            }
        }
        steps.push(InstructionPattern { mnemonic, operands });
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_single_step_wildcard_pattern() {
        let steps = compile_pattern("movii32 *, *").unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].mnemonic, "movii32");
        assert_eq!(steps[0].operands.len(), 2);
        assert!(matches!(steps[0].operands[0], OperandPattern::Wildcard));
    }

    #[test]
    fn compiles_a_multi_step_pattern_with_named_captures() {
        let steps = compile_pattern("ltii32 r_1,*,*; jmpc r_1,label_1,*; label_1").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].mnemonic, "label_1");
        if let OperandPattern::Capture(name) = &steps[0].operands[0] {
            assert_eq!(name, "r_1");
        } else {
            panic!("expected a capture");
        }
    }
}
