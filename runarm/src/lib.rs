//! CLI driver library: loads a raw ARM image, optionally disassembles it
//! for diagnostics, then executes it under the VM and reports the exit
//! code. Kept separate from `main.rs` so the run/report logic is
//! unit-testable without a process boundary.

use armgen::settings::Settings;
use armgen::vm::{disassemble_word, Vm};
use armimage::ArmImage;
use std::fmt;
use std::io::Write;

/// CLI-level error taxonomy, composed via manual `From` impls over the
/// crates it drives.
#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Vm(armgen::error::VmError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{}", e),
            CliError::Vm(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> CliError {
        CliError::Io(e)
    }
}

impl From<armgen::error::VmError> for CliError {
    fn from(e: armgen::error::VmError) -> CliError {
        CliError::Vm(e)
    }
}

/// Loads `path`, runs it under the VM with `memory` bytes of RAM, printing
/// a disassembly to stdout first if `disassemble` is set. Returns the
/// program's exit code; output captured from `OS_WriteC`/`OS_Write0`/etc.
/// is flushed to stdout once the run completes.
pub fn run(path: &str, memory: u32, disassemble: bool) -> Result<i32, CliError> {
    let image = armimage::read_file(path)?;

    if disassemble {
        print_disassembly(&image);
    }

    let mut settings = Settings::default();
    settings.memory_size = memory;

    let mut vm = Vm::new(&image.words(), &settings);
    if image.entry_offset() != 0 {
        vm.set_reg(15, settings.start_address + image.entry_offset() + 8);
    }
    let exit_code = vm.run()?;

    std::io::stdout().write_all(vm.output())?;
    Ok(exit_code)
}

fn print_disassembly(image: &ArmImage) {
    for (i, word) in image.instructions().iter().enumerate() {
        match disassemble_word(*word) {
            Ok((ccode, instr)) => println!("{:04}: {:?} ({:?})", i, instr, ccode),
            Err(_) => println!("{:04}: <data 0x{:08X}>", i, word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armgen::builders;
    use armgen::condition::ConditionCode;
    use armgen::op_pool::OpPool;
    use armgen::reg::IntReg;
    use armgen::section::Section;

    #[test]
    fn runs_an_image_and_reports_its_exit_code() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(0), 9);
        builders::add_swi(&mut section, &mut pool, ConditionCode::AL, 0x11, 0, 0);
        let words = armgen::encoder::encode_section(&section, &pool).unwrap();

        let path = "test_runarm_image.armimage";
        armimage::write_file(path, &ArmImage::new(0, words, Vec::new())).unwrap();

        let exit_code = run(path, Settings::default().memory_size, false).unwrap();
        assert_eq!(exit_code, 9);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn honors_a_nonzero_entry_offset() {
        let mut pool = OpPool::new();
        let mut skipped = Section::new(0, 0, 0, 0);
        builders::add_swi(&mut skipped, &mut pool, ConditionCode::AL, 0x11, 0, 0);
        let skipped_words = armgen::encoder::encode_section(&skipped, &pool).unwrap();

        let mut pool = OpPool::new();
        let mut entry = Section::new(0, 0, 0, 0);
        builders::add_mov_imm(&mut entry, &mut pool, ConditionCode::AL, IntReg(0), 4);
        builders::add_swi(&mut entry, &mut pool, ConditionCode::AL, 0x11, 0, 0);
        let entry_words = armgen::encoder::encode_section(&entry, &pool).unwrap();

        let mut instructions = skipped_words;
        let entry_offset = (instructions.len() * 4) as u32;
        instructions.extend(entry_words);

        let path = "test_runarm_entry_offset.armimage";
        armimage::write_file(path, &ArmImage::new(entry_offset, instructions, Vec::new())).unwrap();

        let exit_code = run(path, Settings::default().memory_size, false).unwrap();
        assert_eq!(exit_code, 4);

        std::fs::remove_file(path).unwrap();
    }
}
