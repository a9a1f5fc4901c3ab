use armgen_support::{EnumFromStr, InteropGetName};
use armgen_support_derive::{EnumFromStr, InteropGetName};
use num_derive::{FromPrimitive, ToPrimitive};

/// ARM's 4-bit condition field. Gates execution of every instruction on
/// the current N/Z/C/V flags.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, InteropGetName, EnumFromStr,
)]
pub enum ConditionCode {
    EQ,
    NE,
    CS,
    CC,
    MI,
    PL,
    VS,
    VC,
    HI,
    LS,
    GE,
    LT,
    GT,
    LE,
    AL,
    NV,
}

impl std::fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Host-side flag register used by the builders (to fold constant
/// comparisons away, eventually) and by the VM.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Flags {
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
}

impl ConditionCode {
    /// `CS` and `HS` share the carry-set encoding; likewise `CC`/`LO`.
    /// Only the canonical name is modeled since both read identically.
    pub fn eval(self, flags: Flags) -> bool {
        match self {
            ConditionCode::EQ => flags.z,
            ConditionCode::NE => !flags.z,
            ConditionCode::CS => flags.c,
            ConditionCode::CC => !flags.c,
            ConditionCode::MI => flags.n,
            ConditionCode::PL => !flags.n,
            ConditionCode::VS => flags.v,
            ConditionCode::VC => !flags.v,
            ConditionCode::HI => flags.c && !flags.z,
            ConditionCode::LS => !flags.c || flags.z,
            ConditionCode::GE => flags.n == flags.v,
            ConditionCode::LT => flags.n != flags.v,
            ConditionCode::GT => !flags.z && (flags.n == flags.v),
            ConditionCode::LE => flags.z || (flags.n != flags.v),
            ConditionCode::AL => true,
            ConditionCode::NV => false,
        }
    }

    /// Logical negation, used when fusing a CMOV into two conditional MOVs.
    pub fn invert(self) -> ConditionCode {
        match self {
            ConditionCode::EQ => ConditionCode::NE,
            ConditionCode::NE => ConditionCode::EQ,
            ConditionCode::CS => ConditionCode::CC,
            ConditionCode::CC => ConditionCode::CS,
            ConditionCode::MI => ConditionCode::PL,
            ConditionCode::PL => ConditionCode::MI,
            ConditionCode::VS => ConditionCode::VC,
            ConditionCode::VC => ConditionCode::VS,
            ConditionCode::HI => ConditionCode::LS,
            ConditionCode::LS => ConditionCode::HI,
            ConditionCode::GE => ConditionCode::LT,
            ConditionCode::LT => ConditionCode::GE,
            ConditionCode::GT => ConditionCode::LE,
            ConditionCode::LE => ConditionCode::GT,
            ConditionCode::AL => ConditionCode::NV,
            ConditionCode::NV => ConditionCode::AL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_reads_zero_flag() {
        let flags = Flags {
            z: true,
            ..Default::default()
        };
        assert!(ConditionCode::EQ.eval(flags));
        assert!(!ConditionCode::NE.eval(flags));
    }

    #[test]
    fn ge_compares_n_and_v() {
        let flags = Flags {
            n: true,
            v: true,
            ..Default::default()
        };
        assert!(ConditionCode::GE.eval(flags));
        assert!(!ConditionCode::LT.eval(flags));
    }

    #[test]
    fn invert_is_involution() {
        for cc in [
            ConditionCode::EQ,
            ConditionCode::CS,
            ConditionCode::MI,
            ConditionCode::VS,
            ConditionCode::HI,
            ConditionCode::GE,
            ConditionCode::GT,
            ConditionCode::AL,
        ] {
            assert_eq!(cc.invert().invert(), cc);
        }
    }

    #[test]
    fn from_str_round_trips_through_debug_name() {
        assert_eq!(ConditionCode::from_str("GE"), Ok(ConditionCode::GE));
        assert!(ConditionCode::from_str("XX").is_err());
    }
}
