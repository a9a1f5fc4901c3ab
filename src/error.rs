//! Error taxonomy for the core crate. Hand-rolled enums with manual `From`
//! impls at each boundary, following the house style of the rest of this
//! workspace (no `thiserror`/`anyhow` anywhere in the dependency tree).

use std::fmt;

/// Pool/section/program level failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PoolError {
    /// The pool's index space would overflow `usize` on the next grow.
    OutOfIndices,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PoolError::OutOfIndices => write!(f, "op pool exhausted its index space"),
        }
    }
}

/// Builder-precondition violations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BuilderError {
    /// `MUL dest, rm, rs` requested with `dest == rm == rs`, which ARM2
    /// cannot encode (the multiplier and the accumulator alias the result).
    MulSelfAlias,
    /// A caller asked for an FPA/VFP offset that the FP interface in use
    /// cannot express even after materializing the base address.
    FpOffsetOutOfRange,
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuilderError::MulSelfAlias => {
                write!(f, "MUL destination may not alias both multiplicands")
            }
            BuilderError::FpOffsetOutOfRange => {
                write!(f, "floating point transfer offset out of range")
            }
        }
    }
}

/// Encoder failures: out-of-range branch/PC-relative distances, and an
/// instruction kind the walker has no callback for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    BranchOutOfRange { words: i64 },
    LiteralOutOfRange { bytes: i64 },
    UnresolvedLabel(u32),
    /// Walker totality violation: an op kind appeared with no registered
    /// callback.
    UnhandledOpKind(&'static str),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeError::BranchOutOfRange { words } => {
                write!(f, "branch distance {} words exceeds +-2^23", words)
            }
            EncodeError::LiteralOutOfRange { bytes } => {
                write!(f, "literal pool distance {} bytes exceeds 4095", bytes)
            }
            EncodeError::UnresolvedLabel(id) => write!(f, "label {} was never defined", id),
            EncodeError::UnhandledOpKind(kind) => {
                write!(f, "walker has no callback registered for {}", kind)
            }
        }
    }
}

/// VM execution failures. The VM exists for testing, not for running
/// adversarial code, so every failure is fatal and carries a short
/// human-readable reason.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VmError {
    IllegalInstruction(u32),
    BadMemoryAccess { address: u32, size: u32 },
    UnsupportedSwi(u32),
    DivisionByZero,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmError::IllegalInstruction(word) => {
                write!(f, "illegal instruction word 0x{:08X}", word)
            }
            VmError::BadMemoryAccess { address, size } => write!(
                f,
                "memory access out of range: address 0x{:08X} size {}",
                address, size
            ),
            VmError::UnsupportedSwi(code) => write!(f, "unsupported SWI 0x{:X}", code),
            VmError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    Pool(PoolError),
    Builder(BuilderError),
    Encode(EncodeError),
    Vm(VmError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Pool(e) => fmt::Display::fmt(e, f),
            Error::Builder(e) => fmt::Display::fmt(e, f),
            Error::Encode(e) => fmt::Display::fmt(e, f),
            Error::Vm(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {}

impl From<PoolError> for Error {
    fn from(e: PoolError) -> Error {
        Error::Pool(e)
    }
}

impl From<BuilderError> for Error {
    fn from(e: BuilderError) -> Error {
        Error::Builder(e)
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Error {
        Error::Encode(e)
    }
}

impl From<VmError> for Error {
    fn from(e: VmError) -> Error {
        Error::Vm(e)
    }
}
