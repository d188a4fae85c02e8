//! Microcode operands.
//!
//! An [`Operand`] fills one slot (left, right or destination) of an
//! [`Instruction`](crate::mir::Instruction). It is a tagged union: exactly one variant is
//! active at any time, and the variants that own further IR (nested instructions and call
//! descriptors) own it exclusively through a `Box`.
//!
//! # Ownership
//!
//! - **Move**: [`Operand::take`] (or [`std::mem::take`]) transfers the payload and leaves
//!   [`Operand::Null`] behind. This is O(1).
//! - **Copy**: [`Clone`] deep-copies the payload, including any nested instruction tree or
//!   call descriptor. The two copies never alias.
//!
//! # Construction
//!
//! Every variant has a constructor, and the common ones also convert through [`From`], so
//! factories accepting `impl Into<Operand>` can be called with plain values:
//!
//! ```rust
//! use hexsuite::mir::{Operand, Reg, Helper};
//!
//! let imm: Operand = (42u64, 4).into();
//! let reg: Operand = Reg::new(8, 4).into();
//! let helper: Operand = Helper("__readfsqword").into();
//!
//! assert_eq!(imm.value(), Some(42));
//! assert_eq!(reg.size(), 4);
//! assert!(helper.is_helper());
//! ```

use std::fmt;

use strum::{EnumIter, IntoStaticStr};

use crate::{
    mir::{CallInfo, Instruction},
    Error, Result,
};

/// Effective address in the analysed program.
pub type Ea = u64;

/// The "no address" marker used by the host.
pub const BADADDR: Ea = Ea::MAX;

/// Microcode register number.
pub type MReg = i32;

/// "No register" marker.
pub const MR_NONE: MReg = -1;

/// Width marker meaning "size not specified, infer it".
pub const NOSIZE: i32 = -1;

/// Identifies the stack frame of a host function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FrameId(pub u32);

/// A microcode register together with the width it is accessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    /// Microcode register number
    pub r: MReg,
    /// Access width in bytes, [`NOSIZE`] to infer
    pub width: i32,
}

impl Reg {
    /// Creates a register reference of the given width.
    #[must_use]
    pub const fn new(r: MReg, width: i32) -> Self {
        Self { r, width }
    }

    /// Creates a register reference whose width is inferred by the host.
    #[must_use]
    pub const fn unsized_reg(r: MReg) -> Self {
        Self { r, width: NOSIZE }
    }

    /// Creates a register reference from a processor register number.
    ///
    /// Microcode registers are byte granular: processor register `n` starts at
    /// microcode register `n * 8`.
    #[must_use]
    pub const fn phys(reg: u16, width: i32) -> Self {
        Self {
            r: reg as MReg * 8,
            width,
        }
    }
}

/// Name of a helper pseudo-function, converts into [`Operand::Helper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Helper<'a>(pub &'a str);

/// Global address, converts into [`Operand::Global`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Global(pub Ea);

/// Block serial number, converts into [`Operand::Block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(pub u32);

/// Kind tag of an [`Operand`], one per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum OperandKind {
    /// [`Operand::Null`]
    Null,
    /// [`Operand::Helper`]
    Helper,
    /// [`Operand::Global`]
    Global,
    /// [`Operand::Block`]
    Block,
    /// [`Operand::Stack`]
    Stack,
    /// [`Operand::Insn`]
    Insn,
    /// [`Operand::Reg`]
    Reg,
    /// [`Operand::RegPair`]
    RegPair,
    /// [`Operand::Number`]
    Number,
    /// [`Operand::Float`]
    Float,
    /// [`Operand::Call`]
    Call,
}

impl From<&Operand> for OperandKind {
    fn from(op: &Operand) -> Self {
        match op {
            Operand::Null => OperandKind::Null,
            Operand::Helper(_) => OperandKind::Helper,
            Operand::Global(_) => OperandKind::Global,
            Operand::Block(_) => OperandKind::Block,
            Operand::Stack { .. } => OperandKind::Stack,
            Operand::Insn(_) => OperandKind::Insn,
            Operand::Reg(_) => OperandKind::Reg,
            Operand::RegPair { .. } => OperandKind::RegPair,
            Operand::Number { .. } => OperandKind::Number,
            Operand::Float { .. } => OperandKind::Float,
            Operand::Call(_) => OperandKind::Call,
        }
    }
}

/// One operand slot of a microcode instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Empty slot.
    Null,
    /// Reference to a named helper pseudo-function.
    Helper(String),
    /// Reference to a global memory location.
    Global(Ea),
    /// Reference to a control-flow block.
    Block(u32),
    /// Reference to a slot in a function's stack frame.
    Stack {
        /// Owning frame
        frame: FrameId,
        /// Signed offset into the frame
        offset: i64,
    },
    /// The result of a nested instruction.
    Insn(Box<Instruction>),
    /// A register.
    Reg(Reg),
    /// Two registers holding the low and high halves of a wide value.
    RegPair {
        /// Register holding the low half
        lo: MReg,
        /// Register holding the high half
        hi: MReg,
        /// Width of each half in bytes
        width: i32,
    },
    /// An integer immediate, stored unsigned and masked to its width.
    Number {
        /// Unsigned payload
        value: u64,
        /// Width in bytes
        width: i32,
    },
    /// A floating point immediate, stored as its raw IEEE754 bit image.
    Float {
        /// Bit image, zero extended to 64 bits
        bits: u64,
        /// Width in bytes (4 or 8)
        width: i32,
    },
    /// The result of a call described by a call descriptor.
    Call(Box<CallInfo>),
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Null
    }
}

/// Truncates `value` to `width` bytes; widths outside 1..=7 leave it untouched.
const fn mask_to_width(value: u64, width: i32) -> u64 {
    if width > 0 && width < 8 {
        value & ((1u64 << (width * 8)) - 1)
    } else {
        value
    }
}

impl Operand {
    /// Helper pseudo-function reference.
    #[must_use]
    pub fn helper(name: impl Into<String>) -> Self {
        Operand::Helper(name.into())
    }

    /// Global variable reference.
    #[must_use]
    pub const fn global(address: Ea) -> Self {
        Operand::Global(address)
    }

    /// Block reference.
    #[must_use]
    pub const fn block(id: u32) -> Self {
        Operand::Block(id)
    }

    /// Stack variable reference at `offset` in `frame`.
    #[must_use]
    pub const fn stack(frame: FrameId, offset: i64) -> Self {
        Operand::Stack { frame, offset }
    }

    /// Nested instruction result; takes ownership of `insn`.
    #[must_use]
    pub fn insn(insn: impl Into<Box<Instruction>>) -> Self {
        Operand::Insn(insn.into())
    }

    /// Register operand.
    #[must_use]
    pub const fn reg(reg: Reg) -> Self {
        Operand::Reg(reg)
    }

    /// Register pair; the width of `lo` is used for both halves.
    #[must_use]
    pub const fn reg_pair(lo: Reg, hi: Reg) -> Self {
        Operand::RegPair {
            lo: lo.r,
            hi: hi.r,
            width: lo.width,
        }
    }

    /// Unsigned integer immediate.
    #[must_use]
    pub const fn number(value: u64, width: i32) -> Self {
        Operand::Number {
            value: mask_to_width(value, width),
            width,
        }
    }

    /// Signed integer immediate; stored as its two's complement image.
    #[must_use]
    pub const fn signed(value: i64, width: i32) -> Self {
        Self::number(value as u64, width)
    }

    /// Single precision immediate.
    #[must_use]
    pub fn float(value: f32) -> Self {
        Operand::Float {
            bits: u64::from(value.to_bits()),
            width: 4,
        }
    }

    /// Double precision immediate.
    #[must_use]
    pub fn double(value: f64) -> Self {
        Operand::Float {
            bits: value.to_bits(),
            width: 8,
        }
    }

    /// Floating point immediate from a little-endian byte image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FloatWidth`] if `bytes` is not 4 or 8 bytes long.
    pub fn fp_from_bytes(bytes: &[u8]) -> Result<Self> {
        match *bytes {
            [a, b, c, d] => Ok(Operand::Float {
                bits: u64::from(u32::from_le_bytes([a, b, c, d])),
                width: 4,
            }),
            [a, b, c, d, e, g, h, i] => Ok(Operand::Float {
                bits: u64::from_le_bytes([a, b, c, d, e, g, h, i]),
                width: 8,
            }),
            _ => Err(Error::FloatWidth(bytes.len())),
        }
    }

    /// Call result; takes ownership of `info`.
    #[must_use]
    pub fn call(info: impl Into<Box<CallInfo>>) -> Self {
        Operand::Call(info.into())
    }

    /// Returns the kind tag of the active variant.
    #[must_use]
    pub fn kind(&self) -> OperandKind {
        OperandKind::from(self)
    }

    /// Moves the payload out, leaving [`Operand::Null`] in its place.
    #[must_use]
    pub fn take(&mut self) -> Operand {
        std::mem::take(self)
    }

    /// Replaces the payload, returning the previous one.
    pub fn replace(&mut self, other: impl Into<Operand>) -> Operand {
        std::mem::replace(self, other.into())
    }

    /// Returns `true` for an empty slot.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Operand::Null)
    }

    /// Returns `true` for helper references.
    #[must_use]
    pub const fn is_helper(&self) -> bool {
        matches!(self, Operand::Helper(_))
    }

    /// Returns `true` for immediates (integer or floating point).
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Operand::Number { .. } | Operand::Float { .. })
    }

    /// Size of the value in bytes, [`NOSIZE`] when the operand carries no size.
    ///
    /// Nested instructions take the size of their destination; calls take the size of
    /// their return type (zero for `void`); register pairs are twice the width of a half.
    #[must_use]
    pub fn size(&self) -> i32 {
        match self {
            Operand::Null
            | Operand::Helper(_)
            | Operand::Global(_)
            | Operand::Block(_)
            | Operand::Stack { .. } => NOSIZE,
            Operand::Insn(insn) => insn.d.size(),
            Operand::Reg(reg) => reg.width,
            Operand::RegPair { width, .. } => {
                if *width == NOSIZE {
                    NOSIZE
                } else {
                    width * 2
                }
            }
            Operand::Number { width, .. } | Operand::Float { width, .. } => *width,
            Operand::Call(info) => info.return_size(),
        }
    }

    /// The unsigned payload of an integer immediate.
    #[must_use]
    pub const fn value(&self) -> Option<u64> {
        match self {
            Operand::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The payload of an integer immediate, sign extended from its width.
    #[must_use]
    pub const fn signed_value(&self) -> Option<i64> {
        match self {
            Operand::Number { value, width } if *width > 0 && *width < 8 => {
                let shift = 64 - *width * 8;
                Some(((*value << shift) as i64) >> shift)
            }
            Operand::Number { value, .. } => Some(*value as i64),
            _ => None,
        }
    }

    /// The value of a floating point immediate, widened to `f64`.
    #[must_use]
    pub fn fp_value(&self) -> Option<f64> {
        match self {
            Operand::Float { bits, width: 4 } => {
                Some(f64::from(f32::from_bits((*bits & 0xFFFF_FFFF) as u32)))
            }
            Operand::Float { bits, width: 8 } => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// The register of a register operand.
    #[must_use]
    pub const fn as_reg(&self) -> Option<Reg> {
        match self {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        }
    }

    /// The nested instruction, if any.
    #[must_use]
    pub fn as_insn(&self) -> Option<&Instruction> {
        match self {
            Operand::Insn(insn) => Some(insn),
            _ => None,
        }
    }

    /// The nested instruction, mutably.
    pub fn as_insn_mut(&mut self) -> Option<&mut Instruction> {
        match self {
            Operand::Insn(insn) => Some(insn),
            _ => None,
        }
    }

    /// The call descriptor, if any.
    #[must_use]
    pub fn as_call(&self) -> Option<&CallInfo> {
        match self {
            Operand::Call(info) => Some(info),
            _ => None,
        }
    }

    /// The call descriptor, mutably.
    pub fn as_call_mut(&mut self) -> Option<&mut CallInfo> {
        match self {
            Operand::Call(info) => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = self.into();
        f.write_str(name)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Null => f.write_str("_"),
            Operand::Helper(name) => write!(f, "!{name}"),
            Operand::Global(ea) => write!(f, "${ea:#X}"),
            Operand::Block(id) => write!(f, "@{id}"),
            Operand::Stack { offset, .. } if *offset < 0 => {
                write!(f, "%var_-{:X}", offset.unsigned_abs())
            }
            Operand::Stack { offset, .. } => write!(f, "%var_{offset:X}"),
            Operand::Insn(insn) => write!(f, "({insn})"),
            Operand::Reg(Reg { r, width }) if *width == NOSIZE => write!(f, "r{r}"),
            Operand::Reg(Reg { r, width }) => write!(f, "r{r}.{width}"),
            Operand::RegPair { lo, hi, width } => write!(f, "r{hi}:r{lo}.{width}"),
            Operand::Number { value, width } => write!(f, "#{value:#X}.{width}"),
            Operand::Float { .. } => {
                write!(f, "#{}.{}", self.fp_value().unwrap_or(f64::NAN), self.size())
            }
            Operand::Call(info) => write!(f, "<{info}>"),
        }
    }
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::reg(reg)
    }
}

impl From<(Reg, Reg)> for Operand {
    fn from((lo, hi): (Reg, Reg)) -> Self {
        Operand::reg_pair(lo, hi)
    }
}

impl From<Helper<'_>> for Operand {
    fn from(helper: Helper<'_>) -> Self {
        Operand::helper(helper.0)
    }
}

impl From<Global> for Operand {
    fn from(global: Global) -> Self {
        Operand::global(global.0)
    }
}

impl From<BlockId> for Operand {
    fn from(block: BlockId) -> Self {
        Operand::block(block.0)
    }
}

impl From<(FrameId, i64)> for Operand {
    fn from((frame, offset): (FrameId, i64)) -> Self {
        Operand::stack(frame, offset)
    }
}

impl From<Instruction> for Operand {
    fn from(insn: Instruction) -> Self {
        Operand::insn(insn)
    }
}

impl From<Box<Instruction>> for Operand {
    fn from(insn: Box<Instruction>) -> Self {
        Operand::Insn(insn)
    }
}

impl From<CallInfo> for Operand {
    fn from(info: CallInfo) -> Self {
        Operand::call(info)
    }
}

impl From<Box<CallInfo>> for Operand {
    fn from(info: Box<CallInfo>) -> Self {
        Operand::Call(info)
    }
}

impl From<(u64, i32)> for Operand {
    fn from((value, width): (u64, i32)) -> Self {
        Operand::number(value, width)
    }
}

impl From<(i64, i32)> for Operand {
    fn from((value, width): (i64, i32)) -> Self {
        Operand::signed(value, width)
    }
}

impl From<f32> for Operand {
    fn from(value: f32) -> Self {
        Operand::float(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::double(value)
    }
}
