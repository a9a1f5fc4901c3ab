//! Tagged-union instruction representation. Every variant here is switched
//! on, never dispatched virtually; the walker (`crate::walker`) is the one
//! place in the crate allowed to assume that switch is total.
//!
//! **Contract.** Adding a new instruction kind means extending: this enum,
//! the walker's callback set, the encoder's case table, and the VM's case
//! table. Forgetting one shows up as an `UnhandledOpKind` at runtime rather
//! than a compile error - the walker is not generic over the instruction
//! set, it *is* the instruction set's dispatch point.

use crate::condition::ConditionCode;
use crate::operand::Operand2;
use crate::reg::{FpaReg, IntReg, VfpReg};
use num_derive::{FromPrimitive, ToPrimitive};

/// The 4-bit ARM data-processing opcode field. Declared in encoding order
/// so `ToPrimitive`/`FromPrimitive` give the real bit pattern directly.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum DpOp {
    AND,
    EOR,
    SUB,
    RSB,
    ADD,
    ADC,
    SBC,
    RSC,
    TST,
    TEQ,
    CMP,
    CMN,
    ORR,
    MOV,
    BIC,
    MVN,
}

impl DpOp {
    /// TST/TEQ/CMP/CMN always set flags and never write `dest`; ARM still
    /// encodes an (ignored) Rd field for them.
    pub fn is_comparison(self) -> bool {
        matches!(self, DpOp::TST | DpOp::TEQ | DpOp::CMP | DpOp::CMN)
    }

    /// MOV/MVN take no first operand register.
    pub fn is_move(self) -> bool {
        matches!(self, DpOp::MOV | DpOp::MVN)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DataProcessing {
    pub op: DpOp,
    pub ccode: ConditionCode,
    pub set_flags: bool,
    pub dest: IntReg,
    pub op1: Option<IntReg>,
    pub op2: Operand2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Multiply {
    pub ccode: ConditionCode,
    pub set_flags: bool,
    pub accumulate: bool,
    pub dest: IntReg,
    pub rm: IntReg,
    pub rs: IntReg,
    /// Accumulator operand of MLA; `None` for plain MUL.
    pub rn: Option<IntReg>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransferOp {
    Ldr,
    Str,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SingleTransfer {
    pub op: TransferOp,
    pub ccode: ConditionCode,
    pub dest: IntReg,
    pub base: IntReg,
    /// Either a raw (non-rotated) 12-bit magnitude as `Operand2::Imm` or a
    /// (possibly shifted) register - reuses `Operand2`'s shape, not its
    /// rotated-immediate encoding.
    pub offset: Operand2,
    pub pre_indexed: bool,
    pub write_back: bool,
    pub subtract: bool,
    pub byte: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MtranMode {
    IA,
    IB,
    DA,
    DB,
    FA,
    FD,
    EA,
    ED,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MultiTransfer {
    pub op: TransferOp,
    pub ccode: ConditionCode,
    pub base: IntReg,
    /// Bit `n` set means `Rn` is in the register list.
    pub reg_list: u16,
    pub mode: MtranMode,
    pub write_back: bool,
    pub status: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkType {
    Void,
    Int,
    Real,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BranchTarget {
    Label(u32),
    Offset(i32),
    Indirect(IntReg),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Branch {
    pub ccode: ConditionCode,
    pub link: bool,
    pub local: bool,
    pub link_type: LinkType,
    pub target: BranchTarget,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Swi {
    pub ccode: ConditionCode,
    pub code: u32,
    pub read_mask: u16,
    pub write_mask: u16,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LiteralDest {
    Int(IntReg),
    Fpa(FpaReg),
    Vfp(VfpReg),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LiteralLoad {
    pub ccode: ConditionCode,
    pub dest: LiteralDest,
    /// Section-local constant-pool label the encoder resolves to a
    /// PC-relative offset.
    pub label: u32,
    /// Whether the referenced integer constant participates in link-time
    /// relocation (ignored for FP destinations).
    pub link_time: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Adr {
    pub ccode: ConditionCode,
    pub dest: IntReg,
    pub label: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cmov {
    /// Not yet lowered: expands to `CMP op1, #0` plus two conditional MOVs.
    Synthesized {
        dest: IntReg,
        op1: IntReg,
        op2: IntReg,
        op3: IntReg,
    },
    /// Already lowered against a preceding comparison's flags.
    Fused {
        dest: IntReg,
        op2: IntReg,
        op3: IntReg,
        true_cond: ConditionCode,
        false_cond: ConditionCode,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum FpaOp {
    ADF,
    MUF,
    SUF,
    RSF,
    DVF,
    RDF,
    POW,
    RPW,
    RMF,
    FML,
    FDV,
    FRD,
    POL,
    MVF,
    MNF,
    ABS,
    RND,
    SQT,
    LOG,
    LGN,
    EXP,
    SIN,
    COS,
    TAN,
    ASN,
    ACS,
    ATN,
    URD,
    NRM,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Nearest,
    PlusInfinity,
    MinusInfinity,
    Zero,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FpaOperand {
    Reg(FpaReg),
    /// Index into the 8 values FPA can encode immediately; see
    /// `crate::fp::encode_fpa_real`.
    Imm(u8),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FpaData {
    pub op: FpaOp,
    pub ccode: ConditionCode,
    pub rounding: Rounding,
    pub size: u8,
    pub dest: FpaReg,
    pub op1: Option<FpaReg>,
    pub op2: FpaOperand,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FpaCompareOp {
    CMF,
    CNF,
    CMFE,
    CNFE,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FpaCompare {
    pub op: FpaCompareOp,
    pub ccode: ConditionCode,
    pub op1: FpaReg,
    pub op2: FpaOperand,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FpaFixFloat {
    Fix,
    Flt,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FpaTransfer {
    pub op: FpaFixFloat,
    pub ccode: ConditionCode,
    pub rounding: Rounding,
    pub size: u8,
    pub int_reg: IntReg,
    pub fp_reg: FpaReg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FpaCoTransfer {
    Wfs,
    Rfs,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FpaCoprocessor {
    pub op: FpaCoTransfer,
    pub ccode: ConditionCode,
    pub reg: IntReg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum VfpDataOp {
    FABS,
    FADD,
    FCPY,
    FDIV,
    FMUL,
    FNEG,
    FSQRT,
    FSUB,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VfpData {
    pub op: VfpDataOp,
    pub ccode: ConditionCode,
    pub dest: VfpReg,
    pub op1: VfpReg,
    pub op2: VfpReg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VfpCompare {
    pub ccode: ConditionCode,
    pub quiet: bool,
    pub op1: VfpReg,
    pub op2: VfpReg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VfpTransfer {
    pub op: FpaFixFloat,
    pub ccode: ConditionCode,
    pub rounding: Rounding,
    pub int_reg: IntReg,
    pub fp_reg: VfpReg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VfpConvert {
    pub ccode: ConditionCode,
    pub dest: VfpReg,
    pub src: VfpReg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VfpFpscrTransfer {
    pub ccode: ConditionCode,
    pub to_cpsr: bool,
}

/// Every executable ARM/FPA/VFP operation this crate can build or encode.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Instruction {
    DataProcessing(DataProcessing),
    Multiply(Multiply),
    SingleTransfer(SingleTransfer),
    MultiTransfer(MultiTransfer),
    Branch(Branch),
    Swi(Swi),
    LiteralLoad(LiteralLoad),
    Adr(Adr),
    Cmov(Cmov),
    FpaData(FpaData),
    FpaCompare(FpaCompare),
    FpaTransfer(FpaTransfer),
    FpaCoprocessor(FpaCoprocessor),
    VfpData(VfpData),
    VfpCompare(VfpCompare),
    VfpTransfer(VfpTransfer),
    VfpConvert(VfpConvert),
    VfpFpscrTransfer(VfpFpscrTransfer),
}

/// Non-executable stream entries.
#[derive(Clone, PartialEq, Debug)]
pub enum Directive {
    Byte(u8),
    TwoBytes(u16),
    FourBytes(u32),
    Double(f64),
    /// Word-order-reversed double, for FPA's big-endian-word float layout.
    DoubleReversed(f64),
    Float(f32),
    Str(String),
    Align(u32),
    Phi,
}

/// A single node in a section's instruction stream: an executable
/// instruction, a directive, or a label definition.
#[derive(Clone, PartialEq, Debug)]
pub enum Op {
    Instruction(Instruction),
    Directive(Directive),
    Label(u32),
}

impl From<Instruction> for Op {
    fn from(i: Instruction) -> Op {
        Op::Instruction(i)
    }
}

impl From<Directive> for Op {
    fn from(d: Directive) -> Op {
        Op::Directive(d)
    }
}
