//! Reference interpreter. Exists so the rest of this crate has something to
//! test generated code against, not to model a real ARM2/ARM3 core
//! cycle-for-cycle. It decodes its own encoder's output - branch distances
//! and PC-relative literal loads use the same "PC reads as instruction
//! address + 8" convention `encoder.rs` assumes when it computes
//! `label_word - word_index - 2`.
//!
//! FPA/VFP execution is out of scope here, mirroring the encoder's own
//! scope decision: `fpa_data`/`vfp_data`/etc. decode to
//! `VmError::IllegalInstruction` rather than being interpreted.

mod decode;
pub mod swi;

use crate::condition::{ConditionCode, Flags};
use crate::constants::*;
use crate::error::VmError;
use crate::instruction::{BranchTarget, DpOp, Instruction, TransferOp};
use crate::memory::{Memory, Storage, StorageMut};
use crate::operand::{Operand2, ShiftAmount, ShiftKind};
use crate::settings::Settings;
use decode::decode_word;

/// Decodes one ARM word without running it, for the `runarm` CLI's `-d`
/// diagnostic dump.
pub fn disassemble_word(word: u32) -> Result<(ConditionCode, Instruction), VmError> {
    decode_word(word)
}

/// Interpreter state: 16 integer registers, condition flags, and a flat
/// byte memory. `R15` is always kept at "fetch address + 8", matching the
/// value an instruction would read out of `pc`.
pub struct Vm {
    regs: [u32; 16],
    flags: Flags,
    memory: Memory,
    code_words: u32,
    start_address: u32,
    quit: bool,
    exit_code: i32,
    output: Vec<u8>,
    clock_ticks: i32,
}

fn map_err(_: ()) -> VmError {
    // The only failure `Storage`/`StorageMut` report is an out-of-range
    // access; the address/size detail isn't threaded through `Result<_, ()>`,
    // so this is the best this boundary can do without widening that trait.
    VmError::BadMemoryAccess { address: 0, size: 0 }
}

impl Vm {
    /// Loads `words` at `settings.start_address` and sets `R15` to the
    /// first fetch.
    pub fn new(words: &[u32], settings: &Settings) -> Vm {
        let mut memory = Memory::new(settings.memory_size);
        for (i, word) in words.iter().enumerate() {
            memory
                .write_word(settings.start_address + i as u32 * WORD_BYTES, *word)
                .expect("program fits in memory");
        }
        let mut regs = [0u32; 16];
        regs[REG_SP as usize] = settings.memory_size;
        regs[REG_PC as usize] = settings.start_address + 8;
        Vm {
            regs,
            flags: Flags::default(),
            memory,
            code_words: words.len() as u32,
            start_address: settings.start_address,
            quit: false,
            exit_code: 0,
            output: Vec::new(),
            clock_ticks: 0,
        }
    }

    pub fn reg(&self, n: u32) -> u32 {
        self.regs[n as usize]
    }

    pub fn set_reg(&mut self, n: u32, v: u32) {
        self.regs[n as usize] = v;
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    fn fetch_address(&self) -> u32 {
        self.regs[REG_PC as usize] - 8
    }

    fn word_index(&self, addr: u32) -> u32 {
        (addr - self.start_address) / WORD_BYTES
    }

    /// Runs until `OS_Exit`, a `quit` request, or the program counter walks
    /// off the end of the loaded code.
    pub fn run(&mut self) -> Result<i32, VmError> {
        while !self.quit && self.word_index(self.fetch_address()) < self.code_words {
            self.step()?;
        }
        Ok(self.exit_code)
    }

    /// Executes exactly one instruction.
    pub fn step(&mut self) -> Result<(), VmError> {
        let fetch_addr = self.fetch_address();
        let word = self.memory.read_word(fetch_addr).map_err(|_| VmError::BadMemoryAccess {
            address: fetch_addr,
            size: WORD_BYTES,
        })?;
        let (ccode, instr) = decode_word(word)?;

        let mut branched = false;
        if ccode.eval(self.flags) {
            self.execute(&instr, fetch_addr, &mut branched)?;
        }
        if !branched {
            self.regs[REG_PC as usize] = fetch_addr + WORD_BYTES + 8;
        }
        Ok(())
    }

    fn execute(&mut self, instr: &Instruction, fetch_addr: u32, branched: &mut bool) -> Result<(), VmError> {
        match instr {
            Instruction::DataProcessing(dp) => {
                let op1 = dp.op1.map(|r| self.reg(r.num())).unwrap_or(0);
                let (op2, shift_carry) = self.eval_operand2(&dp.op2);
                let (result, write_dest, c, v) = data_processing_result(dp.op, op1, op2, shift_carry, self.flags);
                if write_dest {
                    self.set_reg(dp.dest.num(), result);
                    if dp.dest.num() == REG_PC {
                        self.regs[REG_PC as usize] = result + 8;
                        *branched = true;
                    }
                }
                if dp.set_flags {
                    self.flags.n = (result >> 31) & 1 == 1;
                    self.flags.z = result == 0;
                    self.flags.c = c;
                    self.flags.v = v;
                }
            }
            Instruction::Multiply(m) => {
                let rm = self.reg(m.rm.num());
                let rs = self.reg(m.rs.num());
                let mut result = rm.wrapping_mul(rs);
                if let Some(rn) = m.rn {
                    result = result.wrapping_add(self.reg(rn.num()));
                }
                self.set_reg(m.dest.num(), result);
                if m.set_flags {
                    self.flags.n = (result >> 31) & 1 == 1;
                    self.flags.z = result == 0;
                }
            }
            Instruction::SingleTransfer(t) => {
                let (offset, _) = self.eval_operand2(&t.offset);
                let base = self.reg(t.base.num());
                let signed_offset = if t.subtract {
                    -(offset as i64)
                } else {
                    offset as i64
                };
                let effective = if t.pre_indexed {
                    (base as i64 + signed_offset) as u32
                } else {
                    base
                };
                match t.op {
                    TransferOp::Ldr => {
                        let value = if t.byte {
                            self.memory.read_byte(effective).map_err(map_err)? as u32
                        } else {
                            self.memory.read_word(effective).map_err(map_err)?
                        };
                        self.set_reg(t.dest.num(), value);
                    }
                    TransferOp::Str => {
                        let value = self.reg(t.dest.num());
                        if t.byte {
                            self.memory.write_byte(effective, value as u8).map_err(map_err)?;
                        } else {
                            self.memory.write_word(effective, value).map_err(map_err)?;
                        }
                    }
                }
                if t.write_back || !t.pre_indexed {
                    let written_back = if t.pre_indexed {
                        effective
                    } else {
                        (base as i64 + signed_offset) as u32
                    };
                    self.set_reg(t.base.num(), written_back);
                }
            }
            Instruction::Branch(b) => {
                if b.link {
                    self.regs[14] = fetch_addr + 4;
                }
                let target = match b.target {
                    BranchTarget::Offset(words) => (fetch_addr as i64 + 8 + words as i64 * 4) as u32,
                    BranchTarget::Indirect(reg) => self.reg(reg.num()),
                    BranchTarget::Label(id) => return Err(VmError::IllegalInstruction(0xFFFF_0000 | id)),
                };
                self.regs[REG_PC as usize] = target + 8;
                *branched = true;
            }
            Instruction::MultiTransfer(mt) => {
                let list: Vec<u32> = (0..16).filter(|i| mt.reg_list & (1 << i) != 0).collect();
                let count = list.len() as i64;
                let base = self.reg(mt.base.num()) as i64;
                let (ascending, pre) = match mt.mode {
                    crate::instruction::MtranMode::IA | crate::instruction::MtranMode::FA => (true, false),
                    crate::instruction::MtranMode::IB | crate::instruction::MtranMode::ED => (true, true),
                    crate::instruction::MtranMode::DA | crate::instruction::MtranMode::FD => (false, false),
                    crate::instruction::MtranMode::DB | crate::instruction::MtranMode::EA => (false, true),
                };
                let start_address = match (ascending, pre) {
                    (true, false) => base,
                    (true, true) => base + 4,
                    (false, false) => base - count * 4 + 4,
                    (false, true) => base - count * 4,
                };
                for (i, reg) in list.iter().enumerate() {
                    let address = (start_address + i as i64 * 4) as u32;
                    match mt.op {
                        TransferOp::Ldr => {
                            let value = self.memory.read_word(address).map_err(map_err)?;
                            self.set_reg(*reg, value);
                        }
                        TransferOp::Str => {
                            let value = self.reg(*reg);
                            self.memory.write_word(address, value).map_err(map_err)?;
                        }
                    }
                }
                if mt.write_back {
                    let new_base = if ascending { base + count * 4 } else { base - count * 4 };
                    self.set_reg(mt.base.num(), new_base as u32);
                }
            }
            Instruction::Swi(s) => swi::dispatch(self, s.code & !SWI_X_BIT)?,
            _ => return Err(VmError::IllegalInstruction(0)),
        }
        Ok(())
    }

    fn eval_operand2(&self, op2: &Operand2) -> (u32, bool) {
        match op2 {
            Operand2::Imm(encoded) => (crate::imm::decode_imm(*encoded), self.flags.c),
            Operand2::Reg(r) => (self.reg(r.num()), self.flags.c),
            Operand2::Shifted { rm, kind, amount } => {
                let amount = match amount {
                    ShiftAmount::Immediate(n) => *n as u32,
                    ShiftAmount::Reg(r) => self.reg(r.num()) & 0xFF,
                };
                shifted_value(self.reg(rm.num()), *kind, amount, self.flags.c)
            }
        }
    }

    pub fn request_quit(&mut self, exit_code: i32) {
        self.quit = true;
        self.exit_code = exit_code;
    }

    pub fn push_output(&mut self, byte: u8) {
        self.output.push(byte);
    }

    pub fn set_overflow_flag(&mut self, v: bool) {
        self.flags.v = v;
    }

    /// Ticks the synthetic monotonic clock `OS_Word`'s read-clock subset
    /// reports; centisecond-accurate on real RISC OS, just strictly
    /// increasing here so the VM stays deterministic.
    pub fn tick_clock(&mut self) -> i32 {
        self.clock_ticks = self.clock_ticks.wrapping_add(1);
        self.clock_ticks
    }
}

/// Barrel shifter: LSL/LSR/ASR/ROR/RRX each have their own carry-out
/// behaviour at shift amounts 0, 1..31, 32, and above 32.
fn shifted_value(rm: u32, kind: ShiftKind, amount: u32, carry_in: bool) -> (u32, bool) {
    match kind {
        ShiftKind::LSL | ShiftKind::ASL => match amount {
            0 => (rm, carry_in),
            1..=31 => (rm << amount, (rm >> (32 - amount)) & 1 == 1),
            32 => (0, rm & 1 == 1),
            _ => (0, false),
        },
        ShiftKind::LSR => match amount {
            0 => (rm, carry_in),
            1..=31 => (rm >> amount, (rm >> (amount - 1)) & 1 == 1),
            32 => (0, (rm >> 31) & 1 == 1),
            _ => (0, false),
        },
        ShiftKind::ASR => {
            let signed = rm as i32;
            match amount {
                0 => (rm, carry_in),
                1..=31 => ((signed >> amount) as u32, (rm >> (amount - 1)) & 1 == 1),
                _ => {
                    let all_sign = (signed >> 31) as u32;
                    (all_sign, all_sign & 1 == 1)
                }
            }
        }
        ShiftKind::ROR => {
            let amt = amount % 32;
            match (amount, amt) {
                (0, _) => (rm, carry_in),
                (_, 0) => (rm, (rm >> 31) & 1 == 1),
                (_, amt) => (rm.rotate_right(amt), (rm >> (amt - 1)) & 1 == 1),
            }
        }
        ShiftKind::RRX => ((rm >> 1) | ((carry_in as u32) << 31), rm & 1 == 1),
    }
}

fn add_with_flags(a: u32, b: u32) -> (u32, bool, bool) {
    let (result, carry) = a.overflowing_add(b);
    let overflow = (a as i32).checked_add(b as i32).is_none();
    (result, carry, overflow)
}

fn sub_with_flags(a: u32, b: u32) -> (u32, bool, bool) {
    let (result, borrow) = a.overflowing_sub(b);
    let overflow = (a as i32).checked_sub(b as i32).is_none();
    (result, !borrow, overflow)
}

/// Computes a data-processing op's result plus whether it writes `dest`
/// and the flags it would set. `ADC`/`SBC`/`RSC`
/// fold the carry flag into the second operand before running the
/// underlying add/subtract, which matches ARM's result bit-for-bit but not
/// its double-carry-out edge case at `0xFFFFFFFF + carry`.
fn data_processing_result(op: DpOp, op1: u32, op2: u32, shift_carry: bool, flags: Flags) -> (u32, bool, bool, bool) {
    match op {
        DpOp::AND | DpOp::TST => (op1 & op2, !matches!(op, DpOp::TST), shift_carry, flags.v),
        DpOp::EOR | DpOp::TEQ => (op1 ^ op2, !matches!(op, DpOp::TEQ), shift_carry, flags.v),
        DpOp::ORR => (op1 | op2, true, shift_carry, flags.v),
        DpOp::BIC => (op1 & !op2, true, shift_carry, flags.v),
        DpOp::MOV => (op2, true, shift_carry, flags.v),
        DpOp::MVN => (!op2, true, shift_carry, flags.v),
        DpOp::ADD | DpOp::CMN => {
            let (r, c, v) = add_with_flags(op1, op2);
            (r, !matches!(op, DpOp::CMN), c, v)
        }
        DpOp::SUB | DpOp::CMP => {
            let (r, c, v) = sub_with_flags(op1, op2);
            (r, !matches!(op, DpOp::CMP), c, v)
        }
        DpOp::RSB => {
            let (r, c, v) = sub_with_flags(op2, op1);
            (r, true, c, v)
        }
        DpOp::ADC => {
            let (r, c, v) = add_with_flags(op1, op2.wrapping_add(flags.c as u32));
            (r, true, c, v)
        }
        DpOp::SBC => {
            let (r, c, v) = sub_with_flags(op1, op2.wrapping_add(1u32.wrapping_sub(flags.c as u32)));
            (r, true, c, v)
        }
        DpOp::RSC => {
            let (r, c, v) = sub_with_flags(op2, op1.wrapping_add(1u32.wrapping_sub(flags.c as u32)));
            (r, true, c, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionCode;
    use crate::op_pool::OpPool;
    use crate::reg::IntReg;
    use crate::section::Section;

    fn assemble(f: impl FnOnce(&mut Section, &mut OpPool<crate::instruction::Op>)) -> Vec<u32> {
        let mut pool = OpPool::new();
        let mut section = Section::new(0, 0, 0, 0);
        f(&mut section, &mut pool);
        crate::encoder::encode_section(&section, &pool).unwrap()
    }

    #[test]
    fn mov_imm_lands_in_the_register() {
        let words = assemble(|s, p| {
            crate::builders::add_mov_imm(s, p, ConditionCode::AL, IntReg(0), 42);
        });
        let mut vm = Vm::new(&words, &Settings::default());
        vm.run().unwrap();
        assert_eq!(vm.reg(0), 42);
    }

    #[test]
    fn add_sets_carry_on_unsigned_overflow() {
        let words = assemble(|s, p| {
            crate::builders::add_mov_imm(s, p, ConditionCode::AL, IntReg(0), 0xFF);
            crate::builders::add_add_imm(s, p, ConditionCode::AL, true, IntReg(0), IntReg(0), 1);
        });
        let mut vm = Vm::new(&words, &Settings::default());
        vm.run().unwrap();
        assert_eq!(vm.reg(0), 0x100);
        assert!(!vm.flags().c);
    }

    #[test]
    fn backward_branch_loops() {
        let words = assemble(|s, p| {
            crate::builders::add_mov_imm(s, p, ConditionCode::AL, IntReg(0), 3);
            s.add_label(p, 1);
            crate::builders::add_sub_imm(s, p, ConditionCode::AL, true, IntReg(0), IntReg(0), 1);
            crate::builders::add_branch(s, p, ConditionCode::NE, false, 1);
        });
        let mut vm = Vm::new(&words, &Settings::default());
        vm.run().unwrap();
        assert_eq!(vm.reg(0), 0);
    }

    #[test]
    fn hello_program_prints_hello_and_a_newline() {
        let words = assemble(|s, p| {
            for &byte in b"HELLO" {
                crate::builders::add_mov_imm(s, p, ConditionCode::AL, IntReg(0), byte as u32);
                crate::builders::add_swi(s, p, ConditionCode::AL, swi::OS_WRITE_C, 0, 0);
            }
            crate::builders::add_swi(s, p, ConditionCode::AL, swi::OS_NEW_LINE, 0, 0);
            crate::builders::add_swi(s, p, ConditionCode::AL, swi::OS_EXIT, 0, 0);
        });
        let mut vm = Vm::new(&words, &Settings::default());
        let code = vm.run().unwrap();
        assert_eq!(code, 0);
        assert_eq!(vm.output(), b"HELLO\n");
    }

    #[test]
    fn swi_os_exit_sets_the_exit_code_and_stops_the_loop() {
        let words = assemble(|s, p| {
            crate::builders::add_mov_imm(s, p, ConditionCode::AL, IntReg(0), 7);
            crate::builders::add_swi(s, p, ConditionCode::AL, swi::OS_EXIT, 0, 0);
            crate::builders::add_mov_imm(s, p, ConditionCode::AL, IntReg(1), 99);
        });
        let mut vm = Vm::new(&words, &Settings::default());
        let code = vm.run().unwrap();
        assert_eq!(code, 7);
        assert_eq!(vm.reg(1), 0);
    }
}
