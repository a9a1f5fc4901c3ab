//! Small, crate-agnostic helpers shared by the armgen workspace: an endianness
//! alias and the `EnumFromStr`/`InteropGetName` traits backing the
//! `#[derive(...)]` macros in `armgen-support-derive`, used for enums that
//! round-trip through mnemonics (condition codes, shift kinds, SWI names)
//! rather than just through raw bit patterns.

use std::{error::Error, fmt};

/// Byte order used throughout the workspace for on-disk images and VM memory.
/// ARM32/RISC OS is little-endian; this alias keeps that assumption in one place.
pub type Endian = byteorder::LittleEndian;

/// Exposes a stable, nul-terminated byte-string name for an enum variant,
/// intended for FFI-style lookups where a `&'static str` is inconvenient.
pub trait InteropGetName {
    fn interop_name(&self) -> &'static [u8];
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to parse \"{}\" as {}.",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {
    fn description(&self) -> &str {
        "Failed to parse enum."
    }
}

/// Parses a fieldless enum from its variant name. Derived via
/// `#[derive(EnumFromStr)]`; used by the rule engine and the disassembler
/// wherever a mnemonic needs to resolve back to a typed enum.
pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}
