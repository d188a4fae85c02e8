//! Event bus kinds and their argument layout.
//!
//! The host delivers events with an untyped argument list. This module holds the single
//! table describing which arguments each [`EventKind`] carries; both the reference host
//! and the typed dispatcher in [`crate::components`] rely on it.
//!
//! # Argument table
//!
//! | Event | Arguments |
//! |-------|-----------|
//! | `preoptimized`, `locopt`, `prealloc`, `glbopt`, `resolve_stkaddrs`, `calls_done` | function |
//! | `combine` | block, instruction |
//! | `build_callinfo` | block, type, call descriptor out-slot |
//! | `interr` | error code |
//! | `maturity` | function, new maturity level |

use strum::{EnumIter, IntoStaticStr};

use crate::{
    host::{MicroBlock, MicroFunction},
    mir::{CallInfo, Instruction, TypeInfo},
    Error, Result,
};

/// Kinds of events the host publishes on its event bus.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// Microcode has been generated and preoptimized.
    Preoptimized,
    /// Local optimization of every block is complete.
    Locopt,
    /// Local variables are about to be allocated.
    Prealloc,
    /// Global optimization is complete.
    Glbopt,
    /// Stack addresses have been resolved.
    ResolveStkaddrs,
    /// Call detection is complete.
    CallsDone,
    /// An instruction is about to be combined with its neighbours.
    Combine,
    /// The host asks for a call descriptor of a call whose type it knows.
    BuildCallinfo,
    /// An internal error occurred.
    Interr,
    /// The function reached a new maturity level.
    Maturity,
}

impl EventKind {
    /// The argument layout delivered with this event.
    #[must_use]
    pub const fn signature(self) -> &'static [ArgKind] {
        match self {
            EventKind::Preoptimized
            | EventKind::Locopt
            | EventKind::Prealloc
            | EventKind::Glbopt
            | EventKind::ResolveStkaddrs
            | EventKind::CallsDone => &[ArgKind::Function],
            EventKind::Combine => &[ArgKind::Block, ArgKind::Insn],
            EventKind::BuildCallinfo => &[ArgKind::Block, ArgKind::Type, ArgKind::CallSlot],
            EventKind::Interr => &[ArgKind::Int],
            EventKind::Maturity => &[ArgKind::Function, ArgKind::Int],
        }
    }

    /// Checks `args` against [`EventKind::signature`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventArity`] if the number of arguments differs, or
    /// [`Error::EventArgument`] for the first argument of the wrong kind.
    pub fn check_args(self, args: &[RawArg<'_>]) -> Result<()> {
        let expected = self.signature();
        if args.len() != expected.len() {
            return Err(Error::EventArity {
                kind: self,
                expected: expected.len(),
                found: args.len(),
            });
        }

        for (index, (arg, want)) in args.iter().zip(expected).enumerate() {
            let found = arg.kind();
            if found != *want {
                return Err(Error::EventArgument {
                    kind: self,
                    index,
                    expected: want.into(),
                    found: found.into(),
                });
            }
        }
        Ok(())
    }
}

/// The events whose only argument is the function being decompiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum FunctionEvent {
    /// See [`EventKind::Preoptimized`]
    Preoptimized,
    /// See [`EventKind::Locopt`]
    Locopt,
    /// See [`EventKind::Prealloc`]
    Prealloc,
    /// See [`EventKind::Glbopt`]
    Glbopt,
    /// See [`EventKind::ResolveStkaddrs`]
    ResolveStkaddrs,
    /// See [`EventKind::CallsDone`]
    CallsDone,
}

impl From<FunctionEvent> for EventKind {
    fn from(event: FunctionEvent) -> Self {
        match event {
            FunctionEvent::Preoptimized => EventKind::Preoptimized,
            FunctionEvent::Locopt => EventKind::Locopt,
            FunctionEvent::Prealloc => EventKind::Prealloc,
            FunctionEvent::Glbopt => EventKind::Glbopt,
            FunctionEvent::ResolveStkaddrs => EventKind::ResolveStkaddrs,
            FunctionEvent::CallsDone => EventKind::CallsDone,
        }
    }
}

/// Kind tag of a [`RawArg`], as listed in the argument table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ArgKind {
    /// [`RawArg::Function`]
    Function,
    /// [`RawArg::Block`]
    Block,
    /// [`RawArg::Insn`]
    Insn,
    /// [`RawArg::Type`]
    Type,
    /// [`RawArg::CallSlot`]
    CallSlot,
    /// [`RawArg::Int`]
    Int,
}

impl From<&RawArg<'_>> for ArgKind {
    fn from(arg: &RawArg<'_>) -> Self {
        match arg {
            RawArg::Function(_) => ArgKind::Function,
            RawArg::Block(_) => ArgKind::Block,
            RawArg::Insn(_) => ArgKind::Insn,
            RawArg::Type(_) => ArgKind::Type,
            RawArg::CallSlot(_) => ArgKind::CallSlot,
            RawArg::Int(_) => ArgKind::Int,
        }
    }
}

/// One untyped event argument as delivered by the host.
pub enum RawArg<'a> {
    /// The function being decompiled
    Function(&'a mut dyn MicroFunction),
    /// A block of that function
    Block(&'a mut dyn MicroBlock),
    /// An instruction
    Insn(&'a mut Instruction),
    /// A type from the type library
    Type(&'a TypeInfo),
    /// Out-slot for a call descriptor the handler may fill
    CallSlot(&'a mut Option<Box<CallInfo>>),
    /// An integer (error code, maturity level)
    Int(i64),
}

impl RawArg<'_> {
    /// The kind tag of this argument.
    #[must_use]
    pub fn kind(&self) -> ArgKind {
        ArgKind::from(self)
    }
}

impl std::fmt::Debug for RawArg<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawArg::Int(value) => write!(f, "Int({value})"),
            RawArg::Insn(insn) => write!(f, "Insn({insn})"),
            RawArg::Type(ty) => write!(f, "Type({ty})"),
            other => {
                let name: &'static str = other.kind().into();
                f.write_str(name)
            }
        }
    }
}
