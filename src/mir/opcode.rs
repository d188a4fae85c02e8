//! The microcode opcode catalog.
//!
//! Every opcode has a fixed [`Shape`]: the subset of the left, right and destination slots
//! it uses. The catalog is a single data table (`for_each_opcode!`) which generates both
//! the [`Opcode`] enum with its shape lookup and the `make_*` factory functions in
//! [`crate::mir::factory`], so the two can never drift apart.
//!
//! # Catalog
//!
//! | Category | Opcodes | Shape |
//! |----------|---------|-------|
//! | Data movement / conversion | ldc mov neg lnot bnot xds xdu low high f2i f2u i2f u2f f2f fneg | l, d |
//! | Arithmetic / bitwise | add sub mul udiv sdiv umod smod or and xor shl shr sar fadd fsub fmul fdiv | l, r, d |
//! | Flag synthesis | cfadd ofadd cfshl cfshr seto setp setnz setz setae setb seta setbe setg setge setl setle | l, r, d |
//! | | sets | l, d |
//! | Control flow | jnz jz jae jb ja jbe jg jge jl jle icall | l, r, d |
//! | | jcnd call | l, d |
//! | | jtbl | l, r |
//! | | ijmp | r, d |
//! | | goto | l |
//! | | ret nop | - |
//! | Stack / memory | stx ldx | l, r, d |
//! | | push | l |
//! | | pop und | d |
//! | External | ext | l, r, d |

use strum::{EnumCount, EnumIter, IntoStaticStr};

use crate::mir::Condition;

/// The slots an opcode uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Shape {
    /// No operands
    Nullary,
    /// `l`
    Left,
    /// `d`
    Dest,
    /// `l, d`
    LeftDest,
    /// `r, d`
    RightDest,
    /// `l, r`
    LeftRight,
    /// `l, r, d`
    Full,
}

impl Shape {
    /// Returns `true` if the left slot is used.
    #[must_use]
    pub const fn has_left(self) -> bool {
        matches!(
            self,
            Shape::Left | Shape::LeftDest | Shape::LeftRight | Shape::Full
        )
    }

    /// Returns `true` if the right slot is used.
    #[must_use]
    pub const fn has_right(self) -> bool {
        matches!(self, Shape::RightDest | Shape::LeftRight | Shape::Full)
    }

    /// Returns `true` if the destination slot is used.
    #[must_use]
    pub const fn has_dest(self) -> bool {
        matches!(
            self,
            Shape::Dest | Shape::LeftDest | Shape::RightDest | Shape::Full
        )
    }

    /// Number of used slots.
    #[must_use]
    pub const fn arity(self) -> usize {
        self.has_left() as usize + self.has_right() as usize + self.has_dest() as usize
    }
}

/// Invokes `$m!` with the complete opcode table.
///
/// Each row reads `Variant => factory, Shape, "description";`.
macro_rules! for_each_opcode {
    ($m:ident) => {
        $m! {
            Nop   => make_nop,   Nullary,   "no operation";
            Stx   => make_stx,   Full,      "store register to memory: `stx l, {r=sel, d=off}`";
            Ldx   => make_ldx,   Full,      "load register from memory: `ldx {l=sel, r=off}, d`";
            Ldc   => make_ldc,   LeftDest,  "load constant";
            Mov   => make_mov,   LeftDest,  "move";
            Neg   => make_neg,   LeftDest,  "negate";
            Lnot  => make_lnot,  LeftDest,  "logical not";
            Bnot  => make_bnot,  LeftDest,  "bitwise not";
            Xds   => make_xds,   LeftDest,  "extend (signed)";
            Xdu   => make_xdu,   LeftDest,  "extend (unsigned)";
            Low   => make_low,   LeftDest,  "take low part";
            High  => make_high,  LeftDest,  "take high part";
            Add   => make_add,   Full,      "`l + r -> d`";
            Sub   => make_sub,   Full,      "`l - r -> d`";
            Mul   => make_mul,   Full,      "`l * r -> d`";
            Udiv  => make_udiv,  Full,      "unsigned `l / r -> d`";
            Sdiv  => make_sdiv,  Full,      "signed `l / r -> d`";
            Umod  => make_umod,  Full,      "unsigned `l % r -> d`";
            Smod  => make_smod,  Full,      "signed `l % r -> d`";
            Or    => make_or,    Full,      "bitwise or";
            And   => make_and,   Full,      "bitwise and";
            Xor   => make_xor,   Full,      "bitwise xor";
            Shl   => make_shl,   Full,      "shift logical left";
            Shr   => make_shr,   Full,      "shift logical right";
            Sar   => make_sar,   Full,      "shift arithmetic right";
            Cfadd => make_cfadd, Full,      "carry bit of `l + r`";
            Ofadd => make_ofadd, Full,      "overflow bit of `l + r`";
            Cfshl => make_cfshl, Full,      "carry bit of `l << r`";
            Cfshr => make_cfshr, Full,      "carry bit of `l >> r`";
            Sets  => make_sets,  LeftDest,  "`d = SF=1` (sign)";
            Seto  => make_seto,  Full,      "`d = OF=1` (overflow of `l - r`)";
            Setp  => make_setp,  Full,      "`d = PF=1` (unordered/parity)";
            Setnz => make_setnz, Full,      "`d = ZF=0` (not equal)";
            Setz  => make_setz,  Full,      "`d = ZF=1` (equal)";
            Setae => make_setae, Full,      "`d = CF=0` (above or equal)";
            Setb  => make_setb,  Full,      "`d = CF=1` (below)";
            Seta  => make_seta,  Full,      "`d = CF=0 & ZF=0` (above)";
            Setbe => make_setbe, Full,      "`d = CF=1 | ZF=1` (below or equal)";
            Setg  => make_setg,  Full,      "`d = SF=OF & ZF=0` (greater)";
            Setge => make_setge, Full,      "`d = SF=OF` (greater or equal)";
            Setl  => make_setl,  Full,      "`d = SF!=OF` (less)";
            Setle => make_setle, Full,      "`d = SF!=OF | ZF=1` (less or equal)";
            Jcnd  => make_jcnd,  LeftDest,  "jump to `d` if `l` is non-zero";
            Jnz   => make_jnz,   Full,      "jump if ZF=0 (not equal)";
            Jz    => make_jz,    Full,      "jump if ZF=1 (equal)";
            Jae   => make_jae,   Full,      "jump if CF=0 (above or equal)";
            Jb    => make_jb,    Full,      "jump if CF=1 (below)";
            Ja    => make_ja,    Full,      "jump if CF=0 & ZF=0 (above)";
            Jbe   => make_jbe,   Full,      "jump if CF=1 | ZF=1 (below or equal)";
            Jg    => make_jg,    Full,      "jump if SF=OF & ZF=0 (greater)";
            Jge   => make_jge,   Full,      "jump if SF=OF (greater or equal)";
            Jl    => make_jl,    Full,      "jump if SF!=OF (less)";
            Jle   => make_jle,   Full,      "jump if SF!=OF | ZF=1 (less or equal)";
            Jtbl  => make_jtbl,  LeftRight, "table jump, `r` holds the case table";
            Ijmp  => make_ijmp,  RightDest, "indirect jump: `ijmp {r=sel, d=off}`";
            Goto  => make_goto,  Left,      "unconditional jump, `l` is an address or block";
            Call  => make_call,  LeftDest,  "call `l` (address, block or helper), result in `d`";
            Icall => make_icall, Full,      "indirect call: `icall {l=sel, r=off}, d`";
            Ret   => make_ret,   Nullary,   "return";
            Push  => make_push,  Left,      "push `l`";
            Pop   => make_pop,   Dest,      "pop into `d`";
            Und   => make_und,   Dest,      "mark `d` as undefined";
            Ext   => make_ext,   Full,      "external instruction, not modelled by microcode";
            F2i   => make_f2i,   LeftDest,  "`int(l) -> d`, floating point to integer";
            F2u   => make_f2u,   LeftDest,  "`uint(l) -> d`, floating point to unsigned integer";
            I2f   => make_i2f,   LeftDest,  "`fp(l) -> d`, integer to floating point";
            U2f   => make_u2f,   LeftDest,  "`fp(l) -> d`, unsigned integer to floating point";
            F2f   => make_f2f,   LeftDest,  "change floating point precision";
            Fneg  => make_fneg,  LeftDest,  "`-l -> d`, change sign";
            Fadd  => make_fadd,  Full,      "`l + r -> d`, floating point add";
            Fsub  => make_fsub,  Full,      "`l - r -> d`, floating point subtract";
            Fmul  => make_fmul,  Full,      "`l * r -> d`, floating point multiply";
            Fdiv  => make_fdiv,  Full,      "`l / r -> d`, floating point divide";
        }
    };
}
pub(crate) use for_each_opcode;

macro_rules! define_opcodes {
    ($( $variant:ident => $factory:ident, $shape:ident, $doc:literal; )*) => {
        /// A microcode opcode.
        ///
        /// `Display` prints the lower-case mnemonic.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            EnumIter, EnumCount, IntoStaticStr, strum::Display,
        )]
        #[strum(serialize_all = "lowercase")]
        pub enum Opcode {
            $(
                #[doc = $doc]
                $variant,
            )*
        }

        impl Opcode {
            /// The slots this opcode uses.
            #[must_use]
            pub const fn shape(self) -> Shape {
                match self {
                    $( Opcode::$variant => Shape::$shape, )*
                }
            }

            /// One line description of the opcode.
            #[must_use]
            pub const fn description(self) -> &'static str {
                match self {
                    $( Opcode::$variant => $doc, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Lower-case mnemonic.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// The condition tested by a `setXX` or `jXX` opcode.
    #[must_use]
    pub const fn condition(self) -> Option<Condition> {
        match self {
            Opcode::Setnz | Opcode::Jnz => Some(Condition::Nz),
            Opcode::Setz | Opcode::Jz => Some(Condition::Z),
            Opcode::Setae | Opcode::Jae => Some(Condition::Ae),
            Opcode::Setb | Opcode::Jb => Some(Condition::B),
            Opcode::Seta | Opcode::Ja => Some(Condition::A),
            Opcode::Setbe | Opcode::Jbe => Some(Condition::Be),
            Opcode::Setg | Opcode::Jg => Some(Condition::G),
            Opcode::Setge | Opcode::Jge => Some(Condition::Ge),
            Opcode::Setl | Opcode::Jl => Some(Condition::L),
            Opcode::Setle | Opcode::Jle => Some(Condition::Le),
            Opcode::Sets => Some(Condition::S),
            Opcode::Seto => Some(Condition::O),
            Opcode::Setp => Some(Condition::P),
            _ => None,
        }
    }

    /// The opcode testing the complementary condition (`jz` for `jnz`, `setbe` for `seta`).
    #[must_use]
    pub const fn negate_condition(self) -> Option<Opcode> {
        Some(match self {
            Opcode::Setnz => Opcode::Setz,
            Opcode::Setz => Opcode::Setnz,
            Opcode::Setae => Opcode::Setb,
            Opcode::Setb => Opcode::Setae,
            Opcode::Seta => Opcode::Setbe,
            Opcode::Setbe => Opcode::Seta,
            Opcode::Setg => Opcode::Setle,
            Opcode::Setle => Opcode::Setg,
            Opcode::Setge => Opcode::Setl,
            Opcode::Setl => Opcode::Setge,
            Opcode::Jnz => Opcode::Jz,
            Opcode::Jz => Opcode::Jnz,
            Opcode::Jae => Opcode::Jb,
            Opcode::Jb => Opcode::Jae,
            Opcode::Ja => Opcode::Jbe,
            Opcode::Jbe => Opcode::Ja,
            Opcode::Jg => Opcode::Jle,
            Opcode::Jle => Opcode::Jg,
            Opcode::Jge => Opcode::Jl,
            Opcode::Jl => Opcode::Jge,
            _ => return None,
        })
    }

    /// Returns `true` for the `setXX` family.
    #[must_use]
    pub const fn is_set(self) -> bool {
        matches!(
            self,
            Opcode::Sets
                | Opcode::Seto
                | Opcode::Setp
                | Opcode::Setnz
                | Opcode::Setz
                | Opcode::Setae
                | Opcode::Setb
                | Opcode::Seta
                | Opcode::Setbe
                | Opcode::Setg
                | Opcode::Setge
                | Opcode::Setl
                | Opcode::Setle
        )
    }

    /// Returns `true` for conditional jumps, including `jcnd`.
    #[must_use]
    pub const fn is_conditional_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jcnd
                | Opcode::Jnz
                | Opcode::Jz
                | Opcode::Jae
                | Opcode::Jb
                | Opcode::Ja
                | Opcode::Jbe
                | Opcode::Jg
                | Opcode::Jge
                | Opcode::Jl
                | Opcode::Jle
        )
    }

    /// Returns `true` for every opcode that may transfer control.
    #[must_use]
    pub const fn is_flow(self) -> bool {
        self.is_conditional_jump()
            || matches!(
                self,
                Opcode::Goto
                    | Opcode::Jtbl
                    | Opcode::Ijmp
                    | Opcode::Call
                    | Opcode::Icall
                    | Opcode::Ret
            )
    }

    /// Returns `true` for direct and indirect calls.
    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(self, Opcode::Call | Opcode::Icall)
    }

    /// Returns `true` for the floating point opcodes.
    #[must_use]
    pub const fn is_fpu(self) -> bool {
        matches!(
            self,
            Opcode::F2i
                | Opcode::F2u
                | Opcode::I2f
                | Opcode::U2f
                | Opcode::F2f
                | Opcode::Fneg
                | Opcode::Fadd
                | Opcode::Fsub
                | Opcode::Fmul
                | Opcode::Fdiv
        )
    }

    /// Returns `true` if the destination slot receives the instruction's result.
    ///
    /// Stores, indirect jumps and conditional jumps use `d` as an address or jump target
    /// rather than as an output.
    #[must_use]
    pub const fn writes_dest(self) -> bool {
        self.shape().has_dest()
            && !matches!(self, Opcode::Stx | Opcode::Ijmp)
            && !self.is_conditional_jump()
    }
}

/// Total number of opcodes in the catalog.
pub const OPCODE_COUNT: usize = Opcode::COUNT;

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_catalog_size() {
        assert_eq!(Opcode::iter().count(), OPCODE_COUNT);
        assert_eq!(OPCODE_COUNT, 73);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::Add.to_string(), "add");
        assert_eq!(Opcode::Setnz.mnemonic(), "setnz");
        assert_eq!(Opcode::F2i.mnemonic(), "f2i");
        assert_eq!(Opcode::Goto.to_string(), "goto");
    }

    #[test]
    fn test_shapes() {
        assert_eq!(Opcode::Nop.shape(), Shape::Nullary);
        assert_eq!(Opcode::Goto.shape(), Shape::Left);
        assert_eq!(Opcode::Pop.shape(), Shape::Dest);
        assert_eq!(Opcode::Sets.shape(), Shape::LeftDest);
        assert_eq!(Opcode::Ijmp.shape(), Shape::RightDest);
        assert_eq!(Opcode::Jtbl.shape(), Shape::LeftRight);
        assert_eq!(Opcode::Ext.shape(), Shape::Full);
        assert_eq!(Shape::Full.arity(), 3);
        assert_eq!(Shape::RightDest.arity(), 2);
        assert_eq!(Shape::Nullary.arity(), 0);
    }

    #[test]
    fn test_conditions_cover_set_and_jump_families() {
        for op in Opcode::iter() {
            if op.is_set() {
                assert!(op.condition().is_some(), "{op}");
            }
            if op.is_conditional_jump() && op != Opcode::Jcnd {
                assert!(op.condition().is_some(), "{op}");
            }
        }
        assert_eq!(Opcode::Jcnd.condition(), None);
        assert_eq!(Opcode::Ja.condition(), Some(Condition::A));
        assert_eq!(Opcode::Setge.condition(), Some(Condition::Ge));
    }

    #[test]
    fn test_negated_opcodes_match_negated_conditions() {
        for op in Opcode::iter() {
            if let Some(negated) = op.negate_condition() {
                assert_eq!(
                    negated.condition(),
                    op.condition().and_then(Condition::negate),
                    "{op}"
                );
                assert_eq!(negated.negate_condition(), Some(op));
            }
        }
    }

    #[test]
    fn test_writes_dest() {
        assert!(Opcode::Add.writes_dest());
        assert!(Opcode::Call.writes_dest());
        assert!(Opcode::Pop.writes_dest());
        assert!(!Opcode::Stx.writes_dest());
        assert!(!Opcode::Jz.writes_dest());
        assert!(!Opcode::Goto.writes_dest());
    }
}
