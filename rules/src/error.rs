//! Error taxonomy for the rule engine: hand-rolled enums with manual
//! `From` impls, same house style as the core crate's `error.rs`.

use crate::parser::Rule;
use pest::error::Error as PestError;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    Pest(PestError<Rule>),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Pest(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl From<PestError<Rule>> for ParseError {
    fn from(err: PestError<Rule>) -> ParseError {
        ParseError::Pest(err)
    }
}

/// Lowering-time failures: no compiled rule matched the IR at some
/// position, or a matched rule's builder call failed.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    Parse(ParseError),
    /// No rule's pattern matched the IR ops starting at this index.
    NoMatchingRule { section: usize, op_index: usize, mnemonic: String },
    Builder(armgen::error::BuilderError),
    Encode(armgen::error::EncodeError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineError::Parse(e) => fmt::Display::fmt(e, f),
            EngineError::NoMatchingRule { section, op_index, mnemonic } => write!(
                f,
                "no rule matches `{}` at section {} op {}",
                mnemonic, section, op_index
            ),
            EngineError::Builder(e) => fmt::Display::fmt(e, f),
            EngineError::Encode(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> EngineError {
        EngineError::Parse(e)
    }
}

impl From<armgen::error::BuilderError> for EngineError {
    fn from(e: armgen::error::BuilderError) -> EngineError {
        EngineError::Builder(e)
    }
}

impl From<armgen::error::EncodeError> for EngineError {
    fn from(e: armgen::error::EncodeError) -> EngineError {
        EngineError::Encode(e)
    }
}
