//! ARM32 code-generation backend: an in-memory instruction representation,
//! rotated-immediate encoding, constructive instruction builders, a
//! two-pass linear encoder, and a reference VM to run the result against.
//!
//! Modules are layered bottom-up: small data-only modules first (`reg`, `operand`,
//! `condition`, `instruction`), then the arena/ownership layer (`op_pool`,
//! `section`, `program`), then the producing side (`builders`,
//! `fp_builders`), then the single-dispatch-point consuming side
//! (`walker`, `encoder`), and finally `vm` to close the loop.

extern crate num;
#[macro_use]
extern crate num_derive;

pub mod builders;
pub mod condition;
pub mod constants;
pub mod encoder;
pub mod error;
pub mod fp;
pub mod fp_builders;
pub mod imm;
pub mod instruction;
pub mod memory;
pub mod op_pool;
pub mod operand;
pub mod program;
pub mod reg;
pub mod section;
pub mod settings;
pub mod vm;
pub mod walker;

pub use error::Error;
pub use program::Program;
pub use section::Section;
pub use settings::{FpArch, Settings};
