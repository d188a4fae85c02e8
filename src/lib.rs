// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # hexsuite
//!
//! Typed construction of decompiler microcode and installable optimization passes.
//!
//! `hexsuite` sits between analysis code and a host decompiler's middle-end. It provides two
//! things:
//!
//! - **A microcode model** ([`mir`]): operands, instructions built through one factory per
//!   opcode, call descriptors, and visitors over instruction trees. Factories take exactly the
//!   operands their opcode uses, so a malformed instruction does not compile.
//! - **Installable passes** ([`components`], [`ctree`]): closures wrapped as instruction and
//!   block optimizers, code generation filters, event bus listeners and tree visitors, all
//!   switched on and off through the [`components::Component`] trait.
//!
//! The host itself is described by the traits in [`host`]. [`host::LocalHost`] implements
//! them in-process for tests and for embedders that drive passes themselves.
//!
//! ## Quick Start
//!
//! ```rust
//! use hexsuite::prelude::*;
//!
//! let host = LocalHost::new();
//!
//! // Fold `add x, #0` into `mov x`.
//! let mut fold = InsnOptimizer::new(&host, |_: &mut dyn MicroBlock, insn: &mut Instruction, _| {
//!     if insn.opcode == Opcode::Add && insn.r.value() == Some(0) {
//!         let (l, d) = (insn.l.take(), insn.d.take());
//!         *insn = factory::make_mov(insn.ea, l, d);
//!         1
//!     } else {
//!         0
//!     }
//! });
//! fold.install();
//!
//! let mut func = LocalFunction::new(0x1000, FrameId(0));
//! func.add_block(0x1000);
//! func.blocks[0].push(factory::make_add(0x1000, Reg::new(8, 4), (0u64, 4), Reg::new(0, 4)));
//!
//! assert_eq!(host.optimize_function(&mut func, OptFlags::default()), 1);
//! assert_eq!(func.blocks[0].insns[0].to_string(), "mov r8.4, r0.4");
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber. Component
//! transitions are logged at `debug`, events a dispatcher ignores at `trace`, and refused
//! registrations and undecodable event arguments at `warn`.

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use hexsuite::prelude::*;
///
/// let insn = factory::make_xor(0, Reg::new(0, 4), Reg::new(0, 4), Reg::new(0, 4));
/// assert_eq!(insn.opcode.shape(), Shape::Full);
/// ```
pub mod prelude;

/// Microcode operands, instructions, call descriptors and their visitors.
///
/// # Key Types
///
/// - [`mir::Operand`] - One operand slot, a tagged union owning any nested payload
/// - [`mir::Instruction`] - Opcode plus left, right and destination slots
/// - [`mir::Opcode`] - The opcode catalog, each entry with a fixed [`mir::Shape`]
/// - [`mir::CallInfo`] - Call descriptor: convention, return type, typed arguments
///
/// # Main Functions
///
/// - [`mir::factory`] - One `make_*` builder per opcode
/// - [`mir::call_info`] / [`mir::call_info_pure`] - Call descriptor builders
/// - [`mir::mop_visitor`] / [`mir::minsn_visitor`] - Closure visitors over instruction trees
pub mod mir;

/// The host decompiler boundary and an in-process reference host.
pub mod host;

/// Installable optimizer, filter and event adapters.
pub mod components;

/// Visitors over the host's statement and expression tree.
pub mod ctree;

pub(crate) mod error;

/// `hexsuite` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `hexsuite` Error type
///
/// The error type for the few checked operations of this crate: event argument decoding,
/// floating point immediates built from raw bytes, and reference host registration.
pub use error::Error;
