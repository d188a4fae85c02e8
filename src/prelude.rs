//! # hexsuite Prelude
//!
//! The types and traits needed to build microcode and install passes, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all hexsuite operations
pub use crate::Error;

/// The result type used throughout hexsuite
pub use crate::Result;

// ================================================================================================
// Microcode
// ================================================================================================

/// Opcode factories
pub use crate::mir::factory;

/// Operands and their conversion helpers
pub use crate::mir::{
    BlockId, Ea, FrameId, Global, Helper, MReg, Operand, OperandKind, Reg, BADADDR, NOSIZE,
};

/// Instructions and the opcode catalog
pub use crate::mir::{Condition, Instruction, Opcode, Shape};

/// Types and call descriptors
pub use crate::mir::{
    call_info, call_info_pure, CallArg, CallConfig, CallConv, CallFlags, CallInfo, TypeInfo,
};

/// Instruction tree visitors
pub use crate::mir::{minsn_visitor, mop_visitor, InsnVisitor, OperandVisitor};

// ================================================================================================
// Host Boundary
// ================================================================================================

/// Host storage and registration traits
pub use crate::host::{
    Codegen, EventHost, MicroBlock, MicroFunction, OptimizerHost, TypeLibrary,
};

/// Host flags, result codes and events
pub use crate::host::{
    CvFlags, EventKind, FunctionEvent, MErr, Maturity, NamedTypeFlags, OptFlags, RawArg,
};

/// The in-process reference host
pub use crate::host::{
    LocalBlock, LocalCodegen, LocalFunction, LocalHost, LocalHostConfig, LocalTypeLibrary,
    Subsystem,
};

// ================================================================================================
// Components
// ================================================================================================

/// Installable adapters
pub use crate::components::{
    BlockOptimizer, Component, ComponentList, EventCallback, EventDispatcher, HexraysCallback,
    InsnOptimizer, MicrocodeFilter,
};

/// Tree visitors
pub use crate::ctree::{CtreeItem, PostVisitor, PreVisitor, TraversalControl, TreeCallback};

/// Host tree visitor protocol
pub use crate::host::CtreeVisitor;
