//! SWI dispatch table. Covers the RISC OS calls the rule engine's
//! `printi32`/string/exit lowering actually emits, plus the documented
//! subset of `OS_Word`/`OS_GetEnv`/`OS_ReadPoint`/`OS_Byte` a hosted
//! program can issue directly via an inline SWI; anything else surfaces
//! as `VmError::UnsupportedSwi` rather than being silently ignored.

use super::Vm;
use crate::error::VmError;
use crate::memory::{Storage, StorageMut};

pub const OS_WRITE_C: u32 = 0x00;
pub const OS_WRITE0: u32 = 0x02;
pub const OS_NEW_LINE: u32 = 0x03;
pub const OS_READ_C: u32 = 0x04;
pub const OS_BYTE: u32 = 0x06;
pub const OS_WORD: u32 = 0x07;
pub const OS_WRITE_N: u32 = 0x46;
pub const OS_READ_POINT: u32 = 0x32;
pub const OS_GET_ENV: u32 = 0x10;
pub const OS_EXIT: u32 = 0x11;
pub const OS_CONVERT_HEX8: u32 = 0xD4;
pub const OS_CONVERT_INTEGER4: u32 = 0xDC;
/// Character-output SWIs: `256 + c` writes the byte `c`.
pub const CHARACTER_SWI_BASE: u32 = 0x100;

/// `OS_Word` reason code for the read-clock call the rule engine's
/// lowering can target: `R0 == 1` means "write the monotonic clock to the
/// word at `R1`".
const OS_WORD_READ_CLOCK: u32 = 1;

/// Placeholder for the RISC OS error-block pointer the real
/// `OS_ConvertInteger4`/`OS_ConvertHex8` write to the end of memory on
/// overflow; this VM never decodes it as an error block, it only needs to
/// be a fixed, recognisable sentinel word.
const ERROR_CODE_BUFFER_OVERFLOW: u32 = 0x0000_0006;

pub fn dispatch(vm: &mut Vm, code: u32) -> Result<(), VmError> {
    match code {
        OS_WRITE_C => {
            let byte = vm.reg(0) as u8;
            vm.push_output(byte);
        }
        OS_WRITE0 => {
            let addr = vm.reg(0);
            let bytes = vm.memory().read_cstr(addr).map_err(|_| VmError::BadMemoryAccess { address: addr, size: 0 })?;
            let len = bytes.len() as u32;
            for b in bytes {
                vm.push_output(b);
            }
            vm.set_reg(0, addr + len + 1);
        }
        OS_NEW_LINE => vm.push_output(b'\n'),
        OS_READ_C => vm.set_reg(0, 0),
        OS_BYTE => {}
        OS_WORD => {
            if vm.reg(0) == OS_WORD_READ_CLOCK {
                let addr = vm.reg(1);
                let value = vm.tick_clock();
                let _ = vm.memory_mut().write_word(addr, value as u32);
            }
        }
        OS_WRITE_N => {
            let addr = vm.reg(0);
            let n = vm.reg(1);
            for i in 0..n {
                let byte = vm
                    .memory()
                    .read_byte(addr + i)
                    .map_err(|_| VmError::BadMemoryAccess { address: addr + i, size: 1 })?;
                vm.push_output(byte);
            }
        }
        OS_READ_POINT => {
            vm.set_reg(2, 0);
            vm.set_reg(3, 0);
            vm.set_reg(4, 0);
        }
        OS_GET_ENV => {
            vm.set_reg(0, 0);
            vm.set_reg(1, vm.memory().length() - 4);
            vm.set_reg(2, 0);
        }
        OS_EXIT => {
            let exit_code = vm.reg(0) as i32;
            vm.request_quit(exit_code);
            for r in 0..16 {
                vm.set_reg(r, 0);
            }
        }
        OS_CONVERT_HEX8 => convert_numeric(vm, |v| format!("{:08X}", v)),
        OS_CONVERT_INTEGER4 => convert_numeric(vm, |v| format!("{}", v as i32)),
        c if c >= CHARACTER_SWI_BASE && c < CHARACTER_SWI_BASE + 0x100 => {
            vm.push_output((c - CHARACTER_SWI_BASE) as u8);
        }
        other => return Err(VmError::UnsupportedSwi(other)),
    }
    Ok(())
}

/// Shared body of `OS_ConvertHex8`/`OS_ConvertInteger4`: formats `R0` into
/// the buffer `[R1, R1+R2)`, nul-terminated, then returns the buffer start
/// in `R0`, the end pointer in `R1`, and the remaining length in `R2`. If
/// the formatted text (plus its nul) doesn't fit, sets the V flag and
/// writes a fixed error-code word to the last word of memory instead.
fn convert_numeric(vm: &mut Vm, format: impl Fn(u32) -> String) {
    let value = vm.reg(0);
    let buffer = vm.reg(1);
    let size = vm.reg(2);
    let text = format(value);
    let bytes = text.as_bytes();
    if bytes.len() as u32 + 1 > size {
        let error_addr = vm.memory().length() - 4;
        let _ = vm.memory_mut().write_word(error_addr, ERROR_CODE_BUFFER_OVERFLOW);
        vm.set_overflow_flag(true);
        vm.set_reg(0, error_addr);
        return;
    }
    for (i, b) in bytes.iter().enumerate() {
        let _ = vm.memory_mut().write_byte(buffer + i as u32, *b);
    }
    let write_len = bytes.len() as u32;
    let _ = vm.memory_mut().write_byte(buffer + write_len, 0);
    vm.set_reg(0, buffer);
    vm.set_reg(1, buffer + write_len);
    vm.set_reg(2, size - write_len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionCode;
    use crate::op_pool::OpPool;
    use crate::reg::IntReg;
    use crate::section::Section;
    use crate::settings::Settings;

    fn run(words: &[u32]) -> Vm {
        let mut vm = Vm::new(words, &Settings::default());
        vm.run().unwrap();
        vm
    }

    #[test]
    fn os_write_c_appends_one_byte() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(0), b'H' as u32);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, OS_WRITE_C, 0, 0);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, OS_EXIT, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let vm = run(&words);
        assert_eq!(vm.output(), b"H");
    }

    #[test]
    fn os_get_env_reports_the_last_word_of_memory_in_r1() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, OS_GET_ENV, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let vm = run(&words);
        // OS_EXIT zeroes every register, so this leaves it off and relies
        // on run() stopping at the end of the loaded code instead.
        assert_eq!(vm.reg(0), 0);
        assert_eq!(vm.reg(1), Settings::default().memory_size - 4);
    }

    #[test]
    fn os_word_read_clock_writes_a_nonzero_word_at_r1() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        let clock_addr = 0x2000;
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(0), OS_WORD_READ_CLOCK);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(1), clock_addr);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, OS_WORD, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let vm = run(&words);
        assert_eq!(vm.memory().read_word(clock_addr).unwrap(), 1);
    }

    #[test]
    fn os_read_point_clears_r2_through_r4() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(2), 7);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(3), 7);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(4), 7);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, OS_READ_POINT, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let vm = run(&words);
        assert_eq!((vm.reg(2), vm.reg(3), vm.reg(4)), (0, 0, 0));
    }

    #[test]
    fn convert_integer4_overflow_sets_v_flag_and_error_word() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        let buffer = 0x2000;
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(0), 123456);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(1), buffer);
        crate::builders::add_mov_imm(&mut section, &mut pool, ConditionCode::AL, IntReg(2), 2);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, OS_CONVERT_INTEGER4, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let vm = run(&words);
        let error_addr = Settings::default().memory_size - 4;
        assert!(vm.flags().v);
        assert_eq!(vm.reg(0), error_addr);
        assert_eq!(vm.memory().read_word(error_addr).unwrap(), ERROR_CODE_BUFFER_OVERFLOW);
    }

    #[test]
    fn unsupported_swi_codes_are_rejected() {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        crate::builders::add_swi(&mut section, &mut pool, ConditionCode::AL, 0xABCDE, 0, 0);
        let words = crate::encoder::encode_section(&section, &pool).unwrap();
        let mut vm = Vm::new(&words, &Settings::default());
        assert_eq!(vm.run(), Err(VmError::UnsupportedSwi(0xABCDE)));
    }
}
