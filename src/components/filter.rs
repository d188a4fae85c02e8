//! Code generation filter adapter.

use std::{cell::RefCell, rc::Rc};

use crate::{
    components::Component,
    host::{Codegen, FilterHandler, FilterRef, MErr, OptimizerHost},
};

type Predicate = Box<dyn FnMut(&mut dyn Codegen) -> bool>;

struct FilterStorage {
    apply: Predicate,
    matches: Predicate,
}

impl FilterHandler for FilterStorage {
    fn matches(&mut self, cdg: &mut dyn Codegen) -> bool {
        (self.matches)(cdg)
    }

    fn apply(&mut self, cdg: &mut dyn Codegen) -> MErr {
        MErr::from((self.apply)(cdg))
    }
}

/// Intercepts the conversion of native instructions to microcode.
///
/// The closure is offered every native instruction its match predicate accepts. It either
/// emits replacement microcode through the [`Codegen`] and returns `true`, which the host
/// sees as [`MErr::Ok`], or returns `false` ([`MErr::Insn`]) and lets the next filter or the
/// host's own generator handle the instruction.
///
/// Without [`MicrocodeFilter::with_match`] every instruction matches.
///
/// ```rust
/// use hexsuite::prelude::*;
///
/// let host = LocalHost::new();
/// let mut cpuid = MicrocodeFilter::new(&host, |cdg: &mut dyn Codegen| {
///     let ea = cdg.insn_ea();
///     cdg.emit(factory::make_call(ea, Helper("__cpuid"), Operand::Null));
///     true
/// })
/// .with_match(|cdg: &mut dyn Codegen| cdg.mnemonic() == "cpuid");
/// cpuid.install();
///
/// let mut cdg = LocalCodegen::new(0x401000, "cpuid", Vec::new());
/// assert_eq!(host.run_filters(&mut cdg), MErr::Ok);
/// assert_eq!(cdg.emitted.len(), 1);
///
/// let mut cdg = LocalCodegen::new(0x401002, "rdtsc", Vec::new());
/// assert_eq!(host.run_filters(&mut cdg), MErr::Insn);
/// ```
pub struct MicrocodeFilter<'h> {
    host: &'h dyn OptimizerHost,
    storage: Rc<RefCell<FilterStorage>>,
    installed: bool,
}

impl<'h> MicrocodeFilter<'h> {
    /// Wraps `apply`. The filter starts uninstalled and matches every instruction.
    pub fn new<F>(host: &'h dyn OptimizerHost, apply: F) -> Self
    where
        F: FnMut(&mut dyn Codegen) -> bool + 'static,
    {
        Self {
            host,
            storage: Rc::new(RefCell::new(FilterStorage {
                apply: Box::new(apply),
                matches: Box::new(|_: &mut dyn Codegen| true),
            })),
            installed: false,
        }
    }

    /// Replaces the match predicate. Only instructions it accepts reach the closure.
    #[must_use]
    pub fn with_match<P>(self, matches: P) -> Self
    where
        P: FnMut(&mut dyn Codegen) -> bool + 'static,
    {
        self.storage.borrow_mut().matches = Box::new(matches);
        self
    }

    fn handle(&self) -> FilterRef {
        let storage: Rc<RefCell<dyn FilterHandler>> = self.storage.clone();
        Rc::downgrade(&storage)
    }
}

impl Component for MicrocodeFilter<'_> {
    fn set_state(&mut self, enable: bool) {
        if self.installed == enable {
            return;
        }

        if !self.host.install_microcode_filter(self.handle(), enable) && enable {
            tracing::warn!("microcode filter: registration refused by host");
            return;
        }
        self.installed = enable;
        tracing::debug!(installed = enable, "microcode filter state changed");
    }

    fn is_installed(&self) -> bool {
        self.installed
    }
}

impl Drop for MicrocodeFilter<'_> {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        host::{HostEventKind, LocalCodegen, LocalHost, LocalHostConfig, Subsystem},
        mir::{factory, Instruction, Opcode, Operand},
    };

    fn emit_nop(cdg: &mut dyn Codegen) -> bool {
        let ea = cdg.insn_ea();
        cdg.emit(factory::make_nop(ea));
        true
    }

    #[test]
    fn test_true_maps_to_ok() {
        let host = LocalHost::new();
        let mut filter = MicrocodeFilter::new(&host, emit_nop);
        filter.install();

        let mut cdg = LocalCodegen::new(0x10, "pause", Vec::new());
        assert_eq!(host.run_filters(&mut cdg), MErr::Ok);
        assert_eq!(cdg.emitted, [Instruction::new(0x10, Opcode::Nop)]);
    }

    #[test]
    fn test_false_maps_to_insn() {
        let host = LocalHost::new();
        let mut filter = MicrocodeFilter::new(&host, |_: &mut dyn Codegen| false);
        filter.install();

        let mut cdg = LocalCodegen::new(0x10, "pause", Vec::new());
        assert_eq!(host.run_filters(&mut cdg), MErr::Insn);
        assert_eq!(host.log().count_in(Subsystem::MicrocodeFilter, HostEventKind::Invoked), 1);
    }

    #[test]
    fn test_predicate_gates_apply() {
        let host = LocalHost::new();
        let applied = Rc::new(Cell::new(0));
        let seen = applied.clone();
        let mut filter = MicrocodeFilter::new(&host, move |cdg: &mut dyn Codegen| {
            seen.set(seen.get() + 1);
            let src = cdg.load_operand(0).unwrap_or(Operand::Null);
            let ea = cdg.insn_ea();
            cdg.emit(factory::make_push(ea, src));
            true
        })
        .with_match(|cdg: &mut dyn Codegen| cdg.operand_count() == 1);
        filter.install();

        let mut skipped = LocalCodegen::new(0x20, "nop", Vec::new());
        assert_eq!(host.run_filters(&mut skipped), MErr::Insn);
        assert_eq!(applied.get(), 0);

        let mut taken = LocalCodegen::new(0x24, "push", vec![Operand::number(7, 4)]);
        assert_eq!(host.run_filters(&mut taken), MErr::Ok);
        assert_eq!(applied.get(), 1);
        assert_eq!(taken.emitted[0].opcode, Opcode::Push);
    }

    #[test]
    fn test_first_handling_filter_wins() {
        let host = LocalHost::new();
        let mut decline = MicrocodeFilter::new(&host, |_: &mut dyn Codegen| false);
        let mut accept = MicrocodeFilter::new(&host, emit_nop);
        let mut never = MicrocodeFilter::new(&host, |_: &mut dyn Codegen| {
            panic!("filter after the handling one must not run")
        });
        decline.install();
        accept.install();
        never.install();

        let mut cdg = LocalCodegen::new(0, "hlt", Vec::new());
        assert_eq!(host.run_filters(&mut cdg), MErr::Ok);
        assert_eq!(cdg.emitted.len(), 1);
    }

    #[test]
    fn test_lifecycle() {
        let host = LocalHost::with_config(LocalHostConfig::strict(1));
        let mut first = MicrocodeFilter::new(&host, emit_nop);
        let mut second = MicrocodeFilter::new(&host, emit_nop);

        first.install();
        second.install();
        assert!(first.is_installed());
        assert!(!second.is_installed());

        first.uninstall();
        first.uninstall();
        assert_eq!(host.registered(Subsystem::MicrocodeFilter), 0);
        assert_eq!(host.log().count(HostEventKind::Deregistered), 1);

        second.install();
        drop(second);
        assert_eq!(host.registered(Subsystem::MicrocodeFilter), 0);
    }
}
