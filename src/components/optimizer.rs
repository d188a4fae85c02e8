//! Instruction and block optimizer adapters.

use std::{cell::RefCell, rc::Rc};

use crate::{
    components::Component,
    host::{BlockHandlerRef, InsnHandlerRef, MicroBlock, OptBlock, OptFlags, OptInsn, OptimizerHost},
    mir::Instruction,
};

struct InsnStorage<F> {
    func: F,
}

impl<F> OptInsn for InsnStorage<F>
where
    F: FnMut(&mut dyn MicroBlock, &mut Instruction, OptFlags) -> i32,
{
    fn func(&mut self, blk: &mut dyn MicroBlock, insn: &mut Instruction, flags: OptFlags) -> i32 {
        (self.func)(blk, insn, flags)
    }
}

/// Runs a closure on every instruction the host optimizes.
///
/// The closure receives the block, the instruction and the optimizer flags, may rewrite the
/// instruction in place, and returns the number of changes it made.
pub struct InsnOptimizer<'h> {
    host: &'h dyn OptimizerHost,
    handler: Rc<RefCell<dyn OptInsn>>,
    installed: bool,
}

impl<'h> InsnOptimizer<'h> {
    /// Wraps `func`. The optimizer starts uninstalled.
    pub fn new<F>(host: &'h dyn OptimizerHost, func: F) -> Self
    where
        F: FnMut(&mut dyn MicroBlock, &mut Instruction, OptFlags) -> i32 + 'static,
    {
        Self::from_handler(host, Rc::new(RefCell::new(InsnStorage { func })))
    }

    /// Wraps an existing handler object.
    pub fn from_handler(host: &'h dyn OptimizerHost, handler: Rc<RefCell<dyn OptInsn>>) -> Self {
        Self {
            host,
            handler,
            installed: false,
        }
    }

    /// The wrapped handler, for calling it directly.
    #[must_use]
    pub fn handler(&self) -> &Rc<RefCell<dyn OptInsn>> {
        &self.handler
    }

    fn handle(&self) -> InsnHandlerRef {
        Rc::downgrade(&self.handler)
    }
}

impl Component for InsnOptimizer<'_> {
    fn set_state(&mut self, enable: bool) {
        if self.installed == enable {
            return;
        }

        if enable {
            if !self.host.install_optinsn_handler(self.handle()) {
                tracing::warn!("insn optimizer: registration refused by host");
                return;
            }
        } else {
            self.host.remove_optinsn_handler(&self.handle());
        }
        self.installed = enable;
        tracing::debug!(installed = enable, "insn optimizer state changed");
    }

    fn is_installed(&self) -> bool {
        self.installed
    }
}

impl Drop for InsnOptimizer<'_> {
    fn drop(&mut self) {
        self.uninstall();
    }
}

struct BlockStorage<F> {
    func: F,
}

impl<F> OptBlock for BlockStorage<F>
where
    F: FnMut(&mut dyn MicroBlock) -> i32,
{
    fn func(&mut self, blk: &mut dyn MicroBlock) -> i32 {
        (self.func)(blk)
    }
}

/// Runs a closure on every block the host optimizes.
///
/// The closure returns the number of changes it made to the block.
pub struct BlockOptimizer<'h> {
    host: &'h dyn OptimizerHost,
    handler: Rc<RefCell<dyn OptBlock>>,
    installed: bool,
}

impl<'h> BlockOptimizer<'h> {
    /// Wraps `func`. The optimizer starts uninstalled.
    pub fn new<F>(host: &'h dyn OptimizerHost, func: F) -> Self
    where
        F: FnMut(&mut dyn MicroBlock) -> i32 + 'static,
    {
        Self::from_handler(host, Rc::new(RefCell::new(BlockStorage { func })))
    }

    /// Wraps an existing handler object.
    pub fn from_handler(host: &'h dyn OptimizerHost, handler: Rc<RefCell<dyn OptBlock>>) -> Self {
        Self {
            host,
            handler,
            installed: false,
        }
    }

    /// The wrapped handler, for calling it directly.
    #[must_use]
    pub fn handler(&self) -> &Rc<RefCell<dyn OptBlock>> {
        &self.handler
    }

    fn handle(&self) -> BlockHandlerRef {
        Rc::downgrade(&self.handler)
    }
}

impl Component for BlockOptimizer<'_> {
    fn set_state(&mut self, enable: bool) {
        if self.installed == enable {
            return;
        }

        if enable {
            if !self.host.install_optblock_handler(self.handle()) {
                tracing::warn!("block optimizer: registration refused by host");
                return;
            }
        } else {
            self.host.remove_optblock_handler(&self.handle());
        }
        self.installed = enable;
        tracing::debug!(installed = enable, "block optimizer state changed");
    }

    fn is_installed(&self) -> bool {
        self.installed
    }
}

impl Drop for BlockOptimizer<'_> {
    fn drop(&mut self) {
        self.uninstall();
    }
}
