//! The boundary between this crate and the host decompiler.
//!
//! The host owns the real microcode storage, the optimization pipeline and the event bus.
//! This module describes what the crate consumes from it as traits:
//!
//! - **Storage**: [`MicroBlock`], [`MicroFunction`], [`Codegen`] and [`TypeLibrary`] give
//!   handlers access to blocks, functions, the code generator and the type library.
//! - **Registration**: [`OptimizerHost`] and [`EventHost`] accept and release handlers.
//! - **Handler protocols**: [`OptInsn`], [`OptBlock`], [`FilterHandler`], [`EventHandler`]
//!   and [`CtreeVisitor`] are what the adapters in [`crate::components`] and
//!   [`crate::ctree`] implement and what the host calls back into.
//!
//! Handlers are registered as [`Weak`] references. The host never keeps an adapter alive,
//! and a handler whose adapter has been dropped simply stops being reachable.
//!
//! [`LocalHost`] is an in-process implementation of the registration traits, used by the
//! tests and by embedders that want to drive handlers themselves.

use std::{cell::RefCell, rc::Weak};

use bitflags::bitflags;
use strum::{FromRepr, IntoStaticStr};

use crate::mir::{Ea, FrameId, Instruction, Operand, TypeInfo};

mod events;
mod local;
mod ranges;

pub use events::{ArgKind, EventKind, FunctionEvent, RawArg};
pub use local::{
    HostEvent, HostEventKind, HostLog, LocalBlock, LocalCodegen, LocalFunction, LocalHost,
    LocalHostConfig, LocalTypeLibrary, Subsystem,
};
pub use ranges::{basic_blocks, instructions, named_types, predecessors, successors, NamedTypes};

bitflags! {
    /// Flags passed to instruction optimizers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OptFlags: u32 {
        /// Optimize all operands of the instruction, including nested ones
        const ADDREXPRS = 0x0001;
        /// The stack pointer has been resolved for the instruction
        const MINSTKREF = 0x0002;
        /// Instruction combination is running
        const COMBINSNS = 0x0004;
        /// Do not optimize memory loads
        const NO_LDXOPT = 0x0008;
    }
}

bitflags! {
    /// Flags of a statement/expression tree visitor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CvFlags: u32 {
        /// Prune the current subtree after the visit callback returns
        const PRUNE = 0x0001;
        /// Maintain the parent stack
        const PARENTS = 0x0002;
        /// Call the leave callbacks on the way back up
        const POST = 0x0004;
        /// Restart the walk after the tree was modified
        const RESTART = 0x0008;
        /// Visit statements only, do not descend into expressions
        const INSNS = 0x0010;
    }
}

bitflags! {
    /// Namespace selection for named type iteration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NamedTypeFlags: u32 {
        /// Symbol namespace with mangled names (the zero value)
        const SYMM = 0x0000;
        /// Type namespace
        const TYPE = 0x0001;
        /// Do not inspect base libraries
        const NOBASE = 0x0002;
        /// Symbol namespace with unmangled names
        const SYMU = 0x0008;
    }
}

impl Default for NamedTypeFlags {
    fn default() -> Self {
        NamedTypeFlags::TYPE | NamedTypeFlags::SYMM
    }
}

/// Result code of microcode generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, IntoStaticStr, strum::Display,
)]
#[repr(i32)]
pub enum MErr {
    /// Success
    Ok = 0,
    /// No error, switch to a new block
    Block = 1,
    /// Internal error
    Interr = -1,
    /// Cannot convert the instruction to microcode
    Insn = -2,
    /// Not enough memory
    Mem = -3,
    /// Bad block found
    Badblk = -4,
    /// Positive stack pointer value found
    Badsp = -5,
    /// Prolog analysis failed
    Prolog = -6,
    /// Wrong switch idiom
    Switch = -7,
    /// Exception analysis failed
    Exception = -8,
    /// Stack frame is too big
    Hugestack = -9,
    /// Local variable allocation failed
    Lvars = -10,
    /// 16-bit functions cannot be decompiled
    Bitness = -11,
    /// Could not determine call arguments
    Badcall = -12,
    /// Function frame is wrong
    Badframe = -13,
    /// Undefined type
    Unktype = -14,
    /// Inconsistent database information
    Badidb = -15,
    /// Wrong basic type sizes
    Sizeof = -16,
    /// Redecompilation has been requested
    Redo = -17,
    /// Decompilation has been cancelled
    Canceled = -18,
    /// Maximal recursion depth reached
    Recdepth = -19,
    /// Variables would overlap
    Overlap = -20,
    /// Partially initialized variable
    Partinit = -21,
    /// Too complex function
    Complex = -22,
    /// Too big function
    Funcsize = -29,
    /// Bad input ranges
    Badranges = -30,
    /// Special segments cannot be decompiled
    Extern = -28,
}

impl MErr {
    /// The host's numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns `true` for [`MErr::Ok`] and [`MErr::Block`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, MErr::Ok | MErr::Block)
    }
}

impl From<bool> for MErr {
    fn from(handled: bool) -> Self {
        if handled {
            MErr::Ok
        } else {
            MErr::Insn
        }
    }
}

/// How control leaves a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum BlockKind {
    /// Not computed yet
    #[default]
    Unknown,
    /// Ends the function (`ret`, or a call that does not return)
    Stop,
    /// Falls through or jumps to exactly one successor
    OneWay,
    /// Conditional jump
    TwoWay,
    /// Table jump
    NWay,
    /// Block in an external segment
    External,
}

/// Microcode maturity level, from raw generation to local variable allocation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, FromRepr, strum::Display,
)]
#[repr(u8)]
pub enum Maturity {
    /// Nothing generated yet
    #[default]
    Zero = 0,
    /// Raw microcode
    Generated = 1,
    /// Preoptimized pass is complete
    Preoptimized = 2,
    /// Local optimization of each block is complete
    Locopt = 3,
    /// Function call detection is complete
    Calls = 4,
    /// First global optimization pass
    Glbopt1 = 5,
    /// Second global optimization pass
    Glbopt2 = 6,
    /// Third global optimization pass
    Glbopt3 = 7,
    /// Local variables are allocated
    Lvars = 8,
}

impl Maturity {
    /// Converts a raw maturity level delivered by the host.
    #[must_use]
    pub fn from_level(level: i64) -> Option<Self> {
        u8::try_from(level).ok().and_then(Maturity::from_repr)
    }
}

/// A basic block of host microcode.
pub trait MicroBlock {
    /// Serial number of the block inside its function.
    fn serial(&self) -> u32;

    /// How control leaves this block.
    fn kind(&self) -> BlockKind;

    /// Start address of the block.
    fn start(&self) -> Ea;

    /// Serials of the successor blocks.
    fn successors(&self) -> &[u32];

    /// Serials of the predecessor blocks.
    fn predecessors(&self) -> &[u32];

    /// Instructions of the block, in execution order.
    fn insns(&self) -> &[Instruction];

    /// Instruction storage, for in-place rewriting and insertion.
    fn insns_mut(&mut self) -> &mut Vec<Instruction>;

    /// Number of instructions.
    fn len(&self) -> usize {
        self.insns().len()
    }

    /// Returns `true` if the block has no instructions.
    fn is_empty(&self) -> bool {
        self.insns().is_empty()
    }
}

/// A function of host microcode: an ordered set of blocks.
pub trait MicroFunction {
    /// Entry address of the function.
    fn entry_ea(&self) -> Ea;

    /// The stack frame stack references point into.
    fn frame(&self) -> FrameId;

    /// Current maturity.
    fn maturity(&self) -> Maturity;

    /// Number of blocks.
    fn block_count(&self) -> usize;

    /// The block with serial `serial`.
    fn block(&self, serial: u32) -> Option<&dyn MicroBlock>;

    /// The block with serial `serial`, mutably.
    fn block_mut(&mut self, serial: u32) -> Option<&mut dyn MicroBlock>;
}

/// State of the code generator while it converts one native instruction.
pub trait Codegen {
    /// Address of the native instruction being converted.
    fn insn_ea(&self) -> Ea;

    /// Mnemonic of the native instruction.
    fn mnemonic(&self) -> &str;

    /// Number of native operands.
    fn operand_count(&self) -> usize;

    /// Loads native operand `index` as a microcode operand.
    fn load_operand(&mut self, index: usize) -> Option<Operand>;

    /// Appends a finished instruction to the current block.
    fn emit(&mut self, insn: Instruction);
}

/// Read-only access to the host's type library.
pub trait TypeLibrary {
    /// First name in the namespace selected by `flags`.
    fn first_named_type(&self, flags: NamedTypeFlags) -> Option<&str>;

    /// Name following `name` in the namespace selected by `flags`.
    fn next_named_type(&self, name: &str, flags: NamedTypeFlags) -> Option<&str>;

    /// Looks up a type by name.
    fn named_type(&self, name: &str, flags: NamedTypeFlags) -> Option<TypeInfo>;
}

/// An instruction-level optimization handler.
pub trait OptInsn {
    /// Optimizes `insn`, which belongs to `blk`. Returns the number of changes made.
    fn func(&mut self, blk: &mut dyn MicroBlock, insn: &mut Instruction, flags: OptFlags) -> i32;
}

/// A block-level optimization handler.
pub trait OptBlock {
    /// Optimizes `blk`. Returns the number of changes made.
    fn func(&mut self, blk: &mut dyn MicroBlock) -> i32;
}

/// A code generation filter.
pub trait FilterHandler {
    /// Returns `true` if the filter wants to convert the current native instruction.
    fn matches(&mut self, cdg: &mut dyn Codegen) -> bool;

    /// Converts the current native instruction.
    fn apply(&mut self, cdg: &mut dyn Codegen) -> MErr;
}

/// A raw event bus listener.
pub trait EventHandler {
    /// Handles one event. `args` follow the layout documented on [`EventKind`].
    fn handle(&mut self, kind: EventKind, args: &mut [RawArg<'_>]) -> isize;
}

/// A visitor over the host's statement (`S`) and expression (`E`) tree.
///
/// The host walks the tree and calls the visit callbacks on the way down and, with
/// [`CvFlags::POST`], the leave callbacks on the way up. A non-zero return stops the walk.
pub trait CtreeVisitor<S, E> {
    /// Walk configuration.
    fn flags(&self) -> CvFlags;

    /// Called when entering a statement.
    fn visit_insn(&mut self, _stmt: &mut S) -> i32 {
        0
    }

    /// Called when entering an expression.
    fn visit_expr(&mut self, _expr: &mut E) -> i32 {
        0
    }

    /// Called when leaving a statement.
    fn leave_insn(&mut self, _stmt: &mut S) -> i32 {
        0
    }

    /// Called when leaving an expression.
    fn leave_expr(&mut self, _expr: &mut E) -> i32 {
        0
    }

    /// Returns and clears a pending request to skip the children of the current node.
    fn take_prune(&mut self) -> bool {
        false
    }
}

/// Registered instruction optimizer.
pub type InsnHandlerRef = Weak<RefCell<dyn OptInsn>>;
/// Registered block optimizer.
pub type BlockHandlerRef = Weak<RefCell<dyn OptBlock>>;
/// Registered code generation filter.
pub type FilterRef = Weak<RefCell<dyn FilterHandler>>;
/// Registered event bus listener.
pub type EventHandlerRef = Weak<RefCell<dyn EventHandler>>;

/// Optimizer registration.
///
/// Registration failures are reported by the `bool` results and through the host's own
/// diagnostics; they never panic.
pub trait OptimizerHost {
    /// Registers an instruction optimizer.
    fn install_optinsn_handler(&self, handler: InsnHandlerRef) -> bool;

    /// Deregisters an instruction optimizer. Returns `false` if it was not registered.
    fn remove_optinsn_handler(&self, handler: &InsnHandlerRef) -> bool;

    /// Registers a block optimizer.
    fn install_optblock_handler(&self, handler: BlockHandlerRef) -> bool;

    /// Deregisters a block optimizer. Returns `false` if it was not registered.
    fn remove_optblock_handler(&self, handler: &BlockHandlerRef) -> bool;

    /// Registers (`install == true`) or deregisters a code generation filter.
    fn install_microcode_filter(&self, filter: FilterRef, install: bool) -> bool;
}

/// Event bus registration.
pub trait EventHost {
    /// Registers a listener.
    fn install_hexrays_callback(&self, handler: EventHandlerRef) -> bool;

    /// Deregisters a listener. Returns the number of registrations removed.
    fn remove_hexrays_callback(&self, handler: &EventHandlerRef) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merr_codes() {
        assert_eq!(MErr::Ok.code(), 0);
        assert_eq!(MErr::Insn.code(), -2);
        assert_eq!(MErr::from_repr(-18), Some(MErr::Canceled));
        assert_eq!(MErr::from(true), MErr::Ok);
        assert_eq!(MErr::from(false), MErr::Insn);
        assert!(MErr::Block.is_success());
        assert!(!MErr::Insn.is_success());
    }

    #[test]
    fn test_maturity_levels() {
        assert_eq!(Maturity::from_level(3), Some(Maturity::Locopt));
        assert_eq!(Maturity::from_level(-1), None);
        assert_eq!(Maturity::from_level(9), None);
        assert!(Maturity::Glbopt1 > Maturity::Calls);
    }

    #[test]
    fn test_named_type_flags_default() {
        let flags = NamedTypeFlags::default();
        assert!(flags.contains(NamedTypeFlags::TYPE));
        assert!(!flags.contains(NamedTypeFlags::SYMU));
    }
}
