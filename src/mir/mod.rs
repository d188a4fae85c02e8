//! Microcode intermediate representation.
//!
//! This module holds the value types the rest of the crate builds on: [`Operand`],
//! [`Instruction`], [`CallInfo`] and the [`Opcode`] catalog with its per-opcode
//! [`factory`] functions.
//!
//! # Architecture
//!
//! Microcode is a three-address IR. Every [`Instruction`] has a left, right and destination
//! slot, and each [`Opcode`] uses a fixed subset of them (its [`Shape`]). Operands may nest
//! whole instructions ([`Operand::Insn`]) or call descriptors ([`Operand::Call`]), so an
//! instruction is the root of an owned tree:
//!
//! ```text
//! mov (call !abs<int32 __fastcall(int32 (xds r8.1, r24.4))>), r16.4
//!  └─ l: Insn ─ call
//!              ├─ l: Helper "abs"
//!              └─ d: Call ─ args[0]: Insn ─ xds
//! ```
//!
//! Ownership is strictly tree-shaped. Moving an operand ([`Operand::take`]) leaves
//! [`Operand::Null`] behind; cloning deep-copies the whole subtree.
//!
//! # Key Components
//!
//! - [`Operand`] / [`OperandKind`] - one operand slot and its kind tag
//! - [`Instruction`] - opcode plus three slots
//! - [`Opcode`] / [`Shape`] - the catalog and the slots each opcode uses
//! - [`factory`] - one shape-checked `make_*` constructor per opcode
//! - [`CallInfo`] / [`CallConfig`] - call descriptors and their builder
//! - [`Condition`] / [`Flags`] - predicates of the `setXX` and `jXX` families
//! - [`OperandVisitor`] / [`InsnVisitor`] - closure-friendly tree walks

mod callinfo;
mod condition;
pub mod factory;
mod instruction;
mod opcode;
mod operand;
mod types;
mod visit;

pub use callinfo::{
    call_info, call_info_pure, CallArg, CallConfig, CallConv, CallFlags, CallInfo, FuncRole,
};
pub use condition::{Condition, Flags};
pub use instruction::Instruction;
pub use opcode::{Opcode, Shape, OPCODE_COUNT};
pub use operand::{
    BlockId, Ea, FrameId, Global, Helper, MReg, Operand, OperandKind, Reg, BADADDR, MR_NONE,
    NOSIZE,
};
pub use types::{TypeInfo, POINTER_SIZE};
pub use visit::{minsn_visitor, mop_visitor, InsnVisitor, MinsnVisitor, MopVisitor, OperandVisitor};
