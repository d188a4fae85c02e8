//! Shape-checked instruction factories.
//!
//! One `make_<mnemonic>` function exists per opcode. Each takes the address tag and exactly
//! the operands the opcode's [`Shape`](crate::mir::Shape) uses, in `l, r, d` order; the
//! remaining slots are filled with [`Operand::Null`]. Passing the wrong number of operands
//! is therefore a compile error rather than a malformed instruction.
//!
//! Operands are accepted as `impl Into<Operand>`, so registers, immediates, nested
//! instructions and call descriptors can be passed directly.
//!
//! ```rust
//! use hexsuite::mir::{factory, Opcode, Reg};
//!
//! // r0.4 = (r8.1 zero-extended) + 1
//! let ext = factory::make_xdu(0x1000, Reg::new(8, 1), Reg::new(16, 4));
//! let add = factory::make_add(0x1000, ext, (1u64, 4), Reg::new(0, 4));
//!
//! assert_eq!(add.opcode, Opcode::Add);
//! assert_eq!(add.l.size(), 4);
//! ```

use crate::mir::{opcode::for_each_opcode, Ea, Instruction, Opcode, Operand};

/// Builds an instruction from an explicit opcode and all three slots.
///
/// This is the escape hatch for generated code that picks the opcode at runtime; prefer the
/// typed `make_*` functions otherwise.
#[must_use]
pub fn minsn(
    ea: Ea,
    opcode: Opcode,
    l: impl Into<Operand>,
    r: impl Into<Operand>,
    d: impl Into<Operand>,
) -> Instruction {
    Instruction::with_operands(ea, opcode, l, r, d)
}

macro_rules! factory {
    (Nullary, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), "`: ", $doc, ".")]
        #[must_use]
        pub fn $name(ea: Ea) -> Instruction {
            Instruction::new(ea, Opcode::$variant)
        }
    };
    (Left, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), " l`: ", $doc, ".")]
        #[must_use]
        pub fn $name(ea: Ea, l: impl Into<Operand>) -> Instruction {
            minsn(ea, Opcode::$variant, l, Operand::Null, Operand::Null)
        }
    };
    (Dest, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), " d`: ", $doc, ".")]
        #[must_use]
        pub fn $name(ea: Ea, d: impl Into<Operand>) -> Instruction {
            minsn(ea, Opcode::$variant, Operand::Null, Operand::Null, d)
        }
    };
    (LeftDest, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), " l, d`: ", $doc, ".")]
        #[must_use]
        pub fn $name(ea: Ea, l: impl Into<Operand>, d: impl Into<Operand>) -> Instruction {
            minsn(ea, Opcode::$variant, l, Operand::Null, d)
        }
    };
    (RightDest, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), " r, d`: ", $doc, ".")]
        #[must_use]
        pub fn $name(ea: Ea, r: impl Into<Operand>, d: impl Into<Operand>) -> Instruction {
            minsn(ea, Opcode::$variant, Operand::Null, r, d)
        }
    };
    (LeftRight, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), " l, r`: ", $doc, ".")]
        #[must_use]
        pub fn $name(ea: Ea, l: impl Into<Operand>, r: impl Into<Operand>) -> Instruction {
            minsn(ea, Opcode::$variant, l, r, Operand::Null)
        }
    };
    (Full, $variant:ident, $name:ident, $doc:literal) => {
        #[doc = concat!("Builds `", stringify!($variant), " l, r, d`: ", $doc, ".")]
        #[must_use]
        pub fn $name(
            ea: Ea,
            l: impl Into<Operand>,
            r: impl Into<Operand>,
            d: impl Into<Operand>,
        ) -> Instruction {
            minsn(ea, Opcode::$variant, l, r, d)
        }
    };
}

macro_rules! define_factories {
    ($( $variant:ident => $factory:ident, $shape:ident, $doc:literal; )*) => {
        $( factory!($shape, $variant, $factory, $doc); )*
    };
}

for_each_opcode!(define_factories);
