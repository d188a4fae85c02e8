//! Installable handler adapters.
//!
//! A [`Component`] is anything that can be switched between *installed* and *uninstalled*.
//! The adapters in this module wrap a plain closure into the handler protocol the host
//! expects and register it with the host while installed:
//!
//! | Adapter | Closure | Host registry |
//! |---------|---------|---------------|
//! | [`InsnOptimizer`] | `(block, insn, flags) -> changes` | instruction optimizers |
//! | [`BlockOptimizer`] | `(block) -> changes` | block optimizers |
//! | [`MicrocodeFilter`] | `(codegen) -> handled` | code generation filters |
//! | [`HexraysCallback`] | `(event, raw args) -> result` | event bus |
//! | [`EventDispatcher`] | typed per event, see [`EventCallback`] | event bus |
//!
//! # State
//!
//! Components start uninstalled. [`Component::install`] and [`Component::uninstall`] are
//! idempotent: only a transition touches the host. After `set_state(true)` returns the
//! handler is registered (unless the host refused it), after `set_state(false)` it is not.
//! Dropping an installed adapter uninstalls it.
//!
//! The adapter owns the closure; the host only receives a [`Weak`](std::rc::Weak)
//! reference to it, so closures must be `'static`.
//!
//! # Examples
//!
//! ```rust
//! use hexsuite::prelude::*;
//!
//! let host = LocalHost::new();
//! let mut nops = InsnOptimizer::new(&host, |_blk: &mut dyn MicroBlock, insn: &mut Instruction, _| {
//!     if insn.opcode == Opcode::Und {
//!         insn.make_nop();
//!         1
//!     } else {
//!         0
//!     }
//! });
//!
//! nops.install();
//! nops.install();
//! assert_eq!(host.registered(Subsystem::InsnOptimizer), 1);
//!
//! nops.uninstall();
//! assert_eq!(host.registered(Subsystem::InsnOptimizer), 0);
//! ```

mod callback;
mod filter;
mod optimizer;

pub use callback::{EventCallback, EventDispatcher, HexraysCallback};
pub use filter::MicrocodeFilter;
pub use optimizer::{BlockOptimizer, InsnOptimizer};

/// An installable unit with binary state.
pub trait Component {
    /// Switches the component to `enable`. Repeating the current state does nothing.
    fn set_state(&mut self, enable: bool);

    /// Returns `true` while installed.
    fn is_installed(&self) -> bool;

    /// Same as `set_state(true)`.
    fn install(&mut self) {
        self.set_state(true);
    }

    /// Same as `set_state(false)`.
    fn uninstall(&mut self) {
        self.set_state(false);
    }
}

/// An ordered group of components toggled together.
///
/// The list holds borrowed components and one aggregate state. A state change is forwarded
/// to every member, in order, only when the aggregate state actually changes.
///
/// ```rust
/// use hexsuite::prelude::*;
///
/// let host = LocalHost::new();
/// let mut a = BlockOptimizer::new(&host, |_: &mut dyn MicroBlock| 0);
/// let mut b = BlockOptimizer::new(&host, |_: &mut dyn MicroBlock| 0);
///
/// let mut list = ComponentList::new(
///     vec![&mut a as &mut dyn Component, &mut b as &mut dyn Component],
///     false,
/// );
/// list.install();
/// assert_eq!(host.registered(Subsystem::BlockOptimizer), 2);
/// list.uninstall();
/// assert_eq!(host.registered(Subsystem::BlockOptimizer), 0);
/// ```
pub struct ComponentList<'a> {
    list: Vec<&'a mut dyn Component>,
    state: bool,
}

impl<'a> ComponentList<'a> {
    /// Creates a list whose aggregate state starts as `state`.
    ///
    /// The members are not touched; `state` should describe what they already are.
    #[must_use]
    pub fn new(list: Vec<&'a mut dyn Component>, state: bool) -> Self {
        Self { list, state }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl Component for ComponentList<'_> {
    fn set_state(&mut self, enable: bool) {
        if std::mem::replace(&mut self.state, enable) == enable {
            return;
        }
        for component in &mut self.list {
            component.set_state(enable);
        }
    }

    fn is_installed(&self) -> bool {
        self.state
    }
}
