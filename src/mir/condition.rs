//! Condition codes of the flag-synthesis and conditional-jump opcodes.
//!
//! Microcode has no implicit flags register. Instead, `setXX l, r, d` writes the boolean
//! outcome of a condition over the flags that `l - r` *would* produce, and `jXX l, r, d`
//! branches on the same condition. Downstream consumers match on the opcode itself, so the
//! predicate attached to each opcode must be exact.
//!
//! # Predicate table
//!
//! | Condition | Predicate | Meaning |
//! |-----------|-----------|---------|
//! | NZ | ZF=0 | Not equal |
//! | Z | ZF=1 | Equal |
//! | AE | CF=0 | Above or equal (unsigned) |
//! | B | CF=1 | Below (unsigned) |
//! | A | CF=0 & ZF=0 | Above (unsigned) |
//! | BE | CF=1 \| ZF=1 | Below or equal (unsigned) |
//! | G | SF=OF & ZF=0 | Greater (signed) |
//! | GE | SF=OF | Greater or equal (signed) |
//! | L | SF≠OF | Less (signed) |
//! | LE | SF≠OF \| ZF=1 | Less or equal (signed) |
//! | S | SF=1 | Sign |
//! | O | OF=1 | Overflow |
//! | P | PF=1 | Parity / unordered |
//!
//! # Example
//!
//! ```rust
//! use hexsuite::mir::{Condition, Flags};
//!
//! let flags = Flags::of_sub(5, 3, 4);
//! assert!(Condition::A.holds(flags));
//! assert!(Condition::G.holds(flags));
//! assert!(!Condition::Be.holds(flags));
//! ```

use std::fmt;

/// A boolean predicate over the would-be flags of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// ZF=0
    Nz,
    /// ZF=1
    Z,
    /// CF=0
    Ae,
    /// CF=1
    B,
    /// CF=0 & ZF=0
    A,
    /// CF=1 | ZF=1
    Be,
    /// SF=OF & ZF=0
    G,
    /// SF=OF
    Ge,
    /// SF≠OF
    L,
    /// SF≠OF | ZF=1
    Le,
    /// SF=1
    S,
    /// OF=1
    O,
    /// PF=1
    P,
}

/// Flag state produced by an arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    /// Carry (unsigned borrow/overflow)
    pub cf: bool,
    /// Zero
    pub zf: bool,
    /// Sign (most significant bit of the result)
    pub sf: bool,
    /// Signed overflow
    pub of: bool,
    /// Even parity of the low result byte
    pub pf: bool,
}

/// Bit mask and sign bit for a width in bytes; widths outside 1..=8 are treated as 8.
const fn width_masks(width: i32) -> (u64, u64) {
    if width > 0 && width < 8 {
        let bits = width * 8;
        ((1u64 << bits) - 1, 1u64 << (bits - 1))
    } else {
        (u64::MAX, 1u64 << 63)
    }
}

impl Flags {
    fn from_result(res: u64, sign: u64, cf: bool, of: bool) -> Self {
        Self {
            cf,
            zf: res == 0,
            sf: res & sign != 0,
            of,
            pf: (res & 0xFF).count_ones() % 2 == 0,
        }
    }

    /// Flags of `l - r` computed at `width` bytes.
    #[must_use]
    pub fn of_sub(l: u64, r: u64, width: i32) -> Self {
        let (mask, sign) = width_masks(width);
        let (a, b) = (l & mask, r & mask);
        let res = a.wrapping_sub(b) & mask;
        let of = (a ^ b) & (a ^ res) & sign != 0;
        Self::from_result(res, sign, a < b, of)
    }

    /// Flags of `l + r` computed at `width` bytes.
    #[must_use]
    pub fn of_add(l: u64, r: u64, width: i32) -> Self {
        let (mask, sign) = width_masks(width);
        let (a, b) = (l & mask, r & mask);
        let wide = u128::from(a) + u128::from(b);
        let res = (wide as u64) & mask;
        let cf = wide > u128::from(mask);
        let of = !(a ^ b) & (a ^ res) & sign != 0;
        Self::from_result(res, sign, cf, of)
    }
}

impl Condition {
    /// Evaluates the predicate over `flags`.
    #[must_use]
    pub const fn holds(self, flags: Flags) -> bool {
        match self {
            Condition::Nz => !flags.zf,
            Condition::Z => flags.zf,
            Condition::Ae => !flags.cf,
            Condition::B => flags.cf,
            Condition::A => !flags.cf && !flags.zf,
            Condition::Be => flags.cf || flags.zf,
            Condition::G => flags.sf == flags.of && !flags.zf,
            Condition::Ge => flags.sf == flags.of,
            Condition::L => flags.sf != flags.of,
            Condition::Le => flags.sf != flags.of || flags.zf,
            Condition::S => flags.sf,
            Condition::O => flags.of,
            Condition::P => flags.pf,
        }
    }

    /// Evaluates the predicate over the flags of `l - r` at `width` bytes.
    #[must_use]
    pub fn compare(self, l: u64, r: u64, width: i32) -> bool {
        self.holds(Flags::of_sub(l, r, width))
    }

    /// The complementary condition, if the table has one.
    ///
    /// Sign, overflow and parity have no complement in the opcode catalog.
    #[must_use]
    pub const fn negate(self) -> Option<Self> {
        match self {
            Condition::Nz => Some(Condition::Z),
            Condition::Z => Some(Condition::Nz),
            Condition::Ae => Some(Condition::B),
            Condition::B => Some(Condition::Ae),
            Condition::A => Some(Condition::Be),
            Condition::Be => Some(Condition::A),
            Condition::G => Some(Condition::Le),
            Condition::Ge => Some(Condition::L),
            Condition::L => Some(Condition::Ge),
            Condition::Le => Some(Condition::G),
            Condition::S | Condition::O | Condition::P => None,
        }
    }

    /// Returns true if the condition uses signed comparison semantics.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Condition::G | Condition::Ge | Condition::L | Condition::Le
        )
    }

    /// Returns true if the condition uses unsigned comparison semantics.
    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Condition::A | Condition::Ae | Condition::B | Condition::Be
        )
    }

    /// Returns true if the condition tests only the zero flag.
    #[must_use]
    pub const fn is_zero_flag_only(self) -> bool {
        matches!(self, Condition::Z | Condition::Nz)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Condition::Nz => "nz",
            Condition::Z => "z",
            Condition::Ae => "ae",
            Condition::B => "b",
            Condition::A => "a",
            Condition::Be => "be",
            Condition::G => "g",
            Condition::Ge => "ge",
            Condition::L => "l",
            Condition::Le => "le",
            Condition::S => "s",
            Condition::O => "o",
            Condition::P => "p",
        };
        f.write_str(name)
    }
}
