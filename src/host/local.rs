//! An in-process host.
//!
//! [`LocalHost`] implements the registration traits and drives registered handlers over
//! microcode held in [`LocalFunction`] / [`LocalBlock`]. It follows the same protocol as
//! the real decompiler closely enough to exercise adapters end to end:
//!
//! - instruction optimizers run once per instruction, in registration order
//! - block optimizers run once per block, in registration order
//! - code generation filters are asked in registration order; the first one that matches
//!   and reports [`MErr::Ok`] handles the instruction
//! - event listeners are called in registration order until one returns non-zero
//!
//! Every registration, deregistration, refusal and invocation is appended to a [`HostLog`].
//!
//! # Examples
//!
//! ```rust
//! use hexsuite::host::{LocalHost, LocalHostConfig, Subsystem, HostEventKind};
//!
//! let host = LocalHost::with_config(LocalHostConfig::strict(1));
//! assert_eq!(host.log().count(HostEventKind::Registered), 0);
//! assert_eq!(host.registered(Subsystem::EventCallback), 0);
//! ```

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt,
    ops::Bound,
    rc::Weak,
};

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
    host::{
        BlockHandlerRef, BlockKind, Codegen, EventHandlerRef, EventHost, EventKind, FilterRef,
        InsnHandlerRef, Maturity, MErr, MicroBlock, MicroFunction, NamedTypeFlags, OptFlags,
        OptimizerHost, RawArg, TypeLibrary,
    },
    mir::{Ea, FrameId, Instruction, Opcode, Operand, TypeInfo},
    Error, Result,
};

/// Handler registries of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Subsystem {
    /// Instruction optimizers
    InsnOptimizer,
    /// Block optimizers
    BlockOptimizer,
    /// Code generation filters
    MicrocodeFilter,
    /// Event bus listeners
    EventCallback,
}

/// What happened to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HostEventKind {
    /// A handler was registered
    Registered,
    /// A handler was deregistered
    Deregistered,
    /// A registration was refused
    Refused,
    /// A handler was invoked
    Invoked,
}

/// One entry of the host history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    /// What happened
    pub kind: HostEventKind,
    /// Which registry it happened in
    pub subsystem: Subsystem,
    /// The bus event, for listener invocations
    pub event: Option<EventKind>,
    /// Handler result, for invocations
    pub result: i64,
}

impl HostEvent {
    fn new(kind: HostEventKind, subsystem: Subsystem) -> Self {
        Self {
            kind,
            subsystem,
            event: None,
            result: 0,
        }
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.subsystem, self.kind)?;
        if let Some(event) = self.event {
            write!(f, " {event}")?;
        }
        if self.kind == HostEventKind::Invoked {
            write!(f, " -> {}", self.result)?;
        }
        Ok(())
    }
}

/// Append-only history of a [`LocalHost`].
///
/// Events can be appended through a shared reference, so handlers running inside the host
/// never contend with the log.
#[derive(Debug)]
pub struct HostLog {
    events: boxcar::Vec<HostEvent>,
}

impl Default for HostLog {
    fn default() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }
}

impl HostLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&self, event: HostEvent) {
        self.events.push(event);
    }

    /// Total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// All events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &HostEvent> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Events of one kind.
    pub fn filter_kind(&self, kind: HostEventKind) -> impl Iterator<Item = &HostEvent> + '_ {
        self.iter().filter(move |event| event.kind == kind)
    }

    /// Number of events of one kind.
    #[must_use]
    pub fn count(&self, kind: HostEventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Number of events of one kind in one subsystem.
    #[must_use]
    pub fn count_in(&self, subsystem: Subsystem, kind: HostEventKind) -> usize {
        self.filter_kind(kind)
            .filter(|event| event.subsystem == subsystem)
            .count()
    }

    /// Events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<HostEventKind, usize> {
        let mut counts = HashMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Human-readable summary in [`HostEventKind`] order, e.g. `"1 registered, 2 invoked"`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();
        HostEventKind::iter()
            .filter_map(|kind| counts.get(&kind).map(|count| format!("{count} {kind}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Configuration of a [`LocalHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHostConfig {
    /// Maximum number of instruction optimizers, `None` for unlimited
    pub insn_capacity: Option<usize>,
    /// Maximum number of block optimizers, `None` for unlimited
    pub block_capacity: Option<usize>,
    /// Maximum number of code generation filters, `None` for unlimited
    pub filter_capacity: Option<usize>,
    /// Maximum number of event listeners, `None` for unlimited
    pub callback_capacity: Option<usize>,
    /// Whether to keep a [`HostLog`]
    pub record_history: bool,
}

impl Default for LocalHostConfig {
    fn default() -> Self {
        Self {
            insn_capacity: None,
            block_capacity: None,
            filter_capacity: None,
            callback_capacity: None,
            record_history: true,
        }
    }
}

impl LocalHostConfig {
    /// Caps every subsystem at `capacity` registrations.
    #[must_use]
    pub fn strict(capacity: usize) -> Self {
        Self {
            insn_capacity: Some(capacity),
            block_capacity: Some(capacity),
            filter_capacity: Some(capacity),
            callback_capacity: Some(capacity),
            record_history: true,
        }
    }

    /// Capacity of `subsystem`.
    #[must_use]
    pub fn capacity(&self, subsystem: Subsystem) -> Option<usize> {
        match subsystem {
            Subsystem::InsnOptimizer => self.insn_capacity,
            Subsystem::BlockOptimizer => self.block_capacity,
            Subsystem::MicrocodeFilter => self.filter_capacity,
            Subsystem::EventCallback => self.callback_capacity,
        }
    }
}

/// Adds `handler` to `registry` unless it is already present or the registry is full.
fn register<T: ?Sized>(
    registry: &RefCell<Vec<Weak<RefCell<T>>>>,
    handler: Weak<RefCell<T>>,
    subsystem: Subsystem,
    capacity: Option<usize>,
) -> Result<bool> {
    let mut registry = registry.borrow_mut();
    registry.retain(|entry| entry.strong_count() > 0);

    if registry.iter().any(|entry| Weak::ptr_eq(entry, &handler)) {
        return Ok(false);
    }
    if let Some(capacity) = capacity {
        if registry.len() >= capacity {
            return Err(Error::HostCapacity {
                subsystem: subsystem.into(),
                capacity,
            });
        }
    }

    registry.push(handler);
    Ok(true)
}

/// Removes every registration of `handler`, returning how many were removed.
fn deregister<T: ?Sized>(
    registry: &RefCell<Vec<Weak<RefCell<T>>>>,
    handler: &Weak<RefCell<T>>,
) -> usize {
    let mut registry = registry.borrow_mut();
    let before = registry.len();
    registry.retain(|entry| !Weak::ptr_eq(entry, handler));
    before - registry.len()
}

/// Position of the `placeholder` left for the visited instruction.
///
/// `hint` is where it was put and `len` the block length at that time. A handler that
/// inserted or removed instructions may have shifted it; the closest match to `hint` wins.
/// Returns `None` if the handler removed it.
fn find_placeholder(
    insns: &[Instruction],
    placeholder: &Instruction,
    hint: usize,
    len: usize,
) -> Option<usize> {
    if insns.len() == len && insns.get(hint) == Some(placeholder) {
        return Some(hint);
    }
    insns
        .iter()
        .enumerate()
        .filter(|(_, insn)| *insn == placeholder)
        .map(|(position, _)| position)
        .min_by_key(|position| position.abs_diff(hint))
}

/// A host that keeps its registries in memory and drives handlers on request.
///
/// Registries hold [`Weak`] references and are snapshotted before handlers run, so handlers
/// may install or remove other handlers while being invoked.
#[derive(Default)]
pub struct LocalHost {
    config: LocalHostConfig,
    insn_handlers: RefCell<Vec<InsnHandlerRef>>,
    block_handlers: RefCell<Vec<BlockHandlerRef>>,
    filters: RefCell<Vec<FilterRef>>,
    callbacks: RefCell<Vec<EventHandlerRef>>,
    log: HostLog,
}

impl LocalHost {
    /// Creates a host with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host with `config`.
    #[must_use]
    pub fn with_config(config: LocalHostConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LocalHostConfig {
        &self.config
    }

    /// The host history.
    #[must_use]
    pub fn log(&self) -> &HostLog {
        &self.log
    }

    /// Number of live registrations in `subsystem`.
    #[must_use]
    pub fn registered(&self, subsystem: Subsystem) -> usize {
        fn live<T: ?Sized>(registry: &RefCell<Vec<Weak<RefCell<T>>>>) -> usize {
            registry
                .borrow()
                .iter()
                .filter(|entry| entry.strong_count() > 0)
                .count()
        }

        match subsystem {
            Subsystem::InsnOptimizer => live(&self.insn_handlers),
            Subsystem::BlockOptimizer => live(&self.block_handlers),
            Subsystem::MicrocodeFilter => live(&self.filters),
            Subsystem::EventCallback => live(&self.callbacks),
        }
    }

    fn record(&self, event: HostEvent) {
        if self.config.record_history {
            self.log.record(event);
        }
    }

    fn record_invocation(&self, subsystem: Subsystem, event: Option<EventKind>, result: i64) {
        self.record(HostEvent {
            kind: HostEventKind::Invoked,
            subsystem,
            event,
            result,
        });
    }

    /// Registration outcome to the `bool` of the host traits, logging refusals.
    fn finish_registration(&self, subsystem: Subsystem, outcome: Result<bool>) -> bool {
        match outcome {
            Ok(true) => {
                self.record(HostEvent::new(HostEventKind::Registered, subsystem));
                true
            }
            Ok(false) => {
                tracing::warn!("{subsystem}: handler is already registered");
                false
            }
            Err(error) => {
                tracing::warn!("{error}");
                self.record(HostEvent::new(HostEventKind::Refused, subsystem));
                false
            }
        }
    }

    fn finish_removal(&self, subsystem: Subsystem, removed: usize) -> usize {
        for _ in 0..removed {
            self.record(HostEvent::new(HostEventKind::Deregistered, subsystem));
        }
        removed
    }

    /// Registers an instruction optimizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostCapacity`] if the registry is full.
    pub fn try_install_optinsn_handler(&self, handler: InsnHandlerRef) -> Result<bool> {
        register(
            &self.insn_handlers,
            handler,
            Subsystem::InsnOptimizer,
            self.config.insn_capacity,
        )
    }

    /// Registers a block optimizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostCapacity`] if the registry is full.
    pub fn try_install_optblock_handler(&self, handler: BlockHandlerRef) -> Result<bool> {
        register(
            &self.block_handlers,
            handler,
            Subsystem::BlockOptimizer,
            self.config.block_capacity,
        )
    }

    /// Registers a code generation filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostCapacity`] if the registry is full.
    pub fn try_install_microcode_filter(&self, filter: FilterRef) -> Result<bool> {
        register(
            &self.filters,
            filter,
            Subsystem::MicrocodeFilter,
            self.config.filter_capacity,
        )
    }

    /// Registers an event listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostCapacity`] if the registry is full.
    pub fn try_install_hexrays_callback(&self, handler: EventHandlerRef) -> Result<bool> {
        register(
            &self.callbacks,
            handler,
            Subsystem::EventCallback,
            self.config.callback_capacity,
        )
    }

    /// Runs every instruction optimizer over every instruction of `blk`.
    ///
    /// While handlers run, the instruction is moved out of the block and its slot holds a
    /// `nop`. Handlers may insert or remove instructions through the block; the visited
    /// instruction is put back wherever its slot ended up, and the sweep continues after
    /// it. Returns the total number of changes reported.
    pub fn run_insn_optimizers(&self, blk: &mut dyn MicroBlock, flags: OptFlags) -> i32 {
        let handlers = self.insn_handlers.borrow().clone();
        let mut changes: i32 = 0;
        let mut index = 0;

        while index < blk.len() {
            let Some(slot) = blk.insns_mut().get_mut(index) else {
                break;
            };
            let placeholder = Instruction::new(slot.ea, Opcode::Nop);
            let mut insn = std::mem::replace(slot, placeholder.clone());
            let len = blk.len();

            for handler in handlers.iter().filter_map(Weak::upgrade) {
                let Ok(mut handler) = handler.try_borrow_mut() else {
                    tracing::warn!("insn optimizer is already running, skipping re-entrant call");
                    continue;
                };
                let result = handler.func(blk, &mut insn, flags);
                self.record_invocation(Subsystem::InsnOptimizer, None, i64::from(result));
                changes = changes.saturating_add(result);
            }

            match find_placeholder(blk.insns(), &placeholder, index, len) {
                Some(position) => {
                    if let Some(slot) = blk.insns_mut().get_mut(position) {
                        *slot = insn;
                    }
                    index = position + 1;
                }
                None => {
                    tracing::debug!(index, "visited instruction was removed from its block");
                }
            }
        }
        changes
    }

    /// Runs every block optimizer over `blk`. Returns the total number of changes reported.
    pub fn run_block_optimizers(&self, blk: &mut dyn MicroBlock) -> i32 {
        let handlers = self.block_handlers.borrow().clone();
        let mut changes: i32 = 0;

        for handler in handlers.iter().filter_map(Weak::upgrade) {
            let Ok(mut handler) = handler.try_borrow_mut() else {
                tracing::warn!("block optimizer is already running, skipping re-entrant call");
                continue;
            };
            let result = handler.func(blk);
            self.record_invocation(Subsystem::BlockOptimizer, None, i64::from(result));
            changes = changes.saturating_add(result);
        }
        changes
    }

    /// Runs instruction and then block optimizers over every block of `func`.
    pub fn optimize_function(&self, func: &mut dyn MicroFunction, flags: OptFlags) -> i32 {
        let mut changes: i32 = 0;
        for serial in 0..func.block_count() {
            let Ok(serial) = u32::try_from(serial) else {
                break;
            };
            if let Some(blk) = func.block_mut(serial) {
                changes = changes
                    .saturating_add(self.run_insn_optimizers(blk, flags))
                    .saturating_add(self.run_block_optimizers(blk));
            }
        }
        changes
    }

    /// Offers the current native instruction to the registered filters.
    ///
    /// Returns [`MErr::Ok`] if a filter handled it, [`MErr::Insn`] otherwise.
    pub fn run_filters(&self, cdg: &mut dyn Codegen) -> MErr {
        let filters = self.filters.borrow().clone();

        for filter in filters.iter().filter_map(Weak::upgrade) {
            let Ok(mut filter) = filter.try_borrow_mut() else {
                continue;
            };
            if !filter.matches(cdg) {
                continue;
            }

            let result = filter.apply(cdg);
            self.record_invocation(
                Subsystem::MicrocodeFilter,
                None,
                i64::from(result.code()),
            );
            if result == MErr::Ok {
                return MErr::Ok;
            }
        }
        MErr::Insn
    }

    /// Publishes an event to the registered listeners.
    ///
    /// Listeners run in registration order until one returns non-zero; that value is
    /// returned, or 0 if every listener returned 0.
    pub fn dispatch(&self, kind: EventKind, args: &mut [RawArg<'_>]) -> isize {
        let callbacks = self.callbacks.borrow().clone();

        for callback in callbacks.iter().filter_map(Weak::upgrade) {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                tracing::warn!("{kind}: listener is already running, skipping re-entrant call");
                continue;
            };
            let result = callback.handle(kind, args);
            self.record_invocation(Subsystem::EventCallback, Some(kind), result as i64);
            if result != 0 {
                return result;
            }
        }
        0
    }
}

impl OptimizerHost for LocalHost {
    fn install_optinsn_handler(&self, handler: InsnHandlerRef) -> bool {
        let outcome = self.try_install_optinsn_handler(handler);
        self.finish_registration(Subsystem::InsnOptimizer, outcome)
    }

    fn remove_optinsn_handler(&self, handler: &InsnHandlerRef) -> bool {
        let removed = deregister(&self.insn_handlers, handler);
        self.finish_removal(Subsystem::InsnOptimizer, removed) > 0
    }

    fn install_optblock_handler(&self, handler: BlockHandlerRef) -> bool {
        let outcome = self.try_install_optblock_handler(handler);
        self.finish_registration(Subsystem::BlockOptimizer, outcome)
    }

    fn remove_optblock_handler(&self, handler: &BlockHandlerRef) -> bool {
        let removed = deregister(&self.block_handlers, handler);
        self.finish_removal(Subsystem::BlockOptimizer, removed) > 0
    }

    fn install_microcode_filter(&self, filter: FilterRef, install: bool) -> bool {
        if install {
            let outcome = self.try_install_microcode_filter(filter);
            self.finish_registration(Subsystem::MicrocodeFilter, outcome)
        } else {
            let removed = deregister(&self.filters, &filter);
            self.finish_removal(Subsystem::MicrocodeFilter, removed) > 0
        }
    }
}

impl EventHost for LocalHost {
    fn install_hexrays_callback(&self, handler: EventHandlerRef) -> bool {
        let outcome = self.try_install_hexrays_callback(handler);
        self.finish_registration(Subsystem::EventCallback, outcome)
    }

    fn remove_hexrays_callback(&self, handler: &EventHandlerRef) -> usize {
        let removed = deregister(&self.callbacks, handler);
        self.finish_removal(Subsystem::EventCallback, removed)
    }
}

/// A block held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalBlock {
    /// Serial number
    pub serial: u32,
    /// Exit kind
    pub kind: BlockKind,
    /// Start address
    pub start: Ea,
    /// Successor serials
    pub succs: Vec<u32>,
    /// Predecessor serials
    pub preds: Vec<u32>,
    /// Instructions
    pub insns: Vec<Instruction>,
}

impl LocalBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new(serial: u32, start: Ea) -> Self {
        Self {
            serial,
            start,
            ..Self::default()
        }
    }

    /// Appends an instruction.
    pub fn push(&mut self, insn: Instruction) {
        self.insns.push(insn);
    }
}

impl MicroBlock for LocalBlock {
    fn serial(&self) -> u32 {
        self.serial
    }

    fn kind(&self) -> BlockKind {
        self.kind
    }

    fn start(&self) -> Ea {
        self.start
    }

    fn successors(&self) -> &[u32] {
        &self.succs
    }

    fn predecessors(&self) -> &[u32] {
        &self.preds
    }

    fn insns(&self) -> &[Instruction] {
        &self.insns
    }

    fn insns_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.insns
    }
}

/// A function held in memory. Block serials are their index in `blocks`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalFunction {
    /// Entry address
    pub entry: Ea,
    /// Stack frame id
    pub frame: FrameId,
    /// Current maturity
    pub maturity: Maturity,
    /// Blocks, indexed by serial
    pub blocks: Vec<LocalBlock>,
}

impl LocalFunction {
    /// Creates a function without blocks.
    #[must_use]
    pub fn new(entry: Ea, frame: FrameId) -> Self {
        Self {
            entry,
            frame,
            ..Self::default()
        }
    }

    /// Appends a block starting at `start` and returns its serial.
    pub fn add_block(&mut self, start: Ea) -> u32 {
        let serial = u32::try_from(self.blocks.len()).unwrap_or(u32::MAX);
        self.blocks.push(LocalBlock::new(serial, start));
        serial
    }

    /// Adds an edge `from -> to`. Unknown serials are ignored.
    pub fn link(&mut self, from: u32, to: u32) {
        if (from as usize) >= self.blocks.len() || (to as usize) >= self.blocks.len() {
            tracing::warn!("ignoring edge {from} -> {to}: no such block");
            return;
        }
        self.blocks[from as usize].succs.push(to);
        self.blocks[to as usize].preds.push(from);
    }
}

impl MicroFunction for LocalFunction {
    fn entry_ea(&self) -> Ea {
        self.entry
    }

    fn frame(&self) -> FrameId {
        self.frame
    }

    fn maturity(&self) -> Maturity {
        self.maturity
    }

    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn block(&self, serial: u32) -> Option<&dyn MicroBlock> {
        self.blocks
            .get(serial as usize)
            .map(|blk| blk as &dyn MicroBlock)
    }

    fn block_mut(&mut self, serial: u32) -> Option<&mut dyn MicroBlock> {
        self.blocks
            .get_mut(serial as usize)
            .map(|blk| blk as &mut dyn MicroBlock)
    }
}

/// A code generator converting one native instruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalCodegen {
    /// Native instruction address
    pub ea: Ea,
    /// Native mnemonic
    pub mnemonic: String,
    /// Native operands, already translated
    pub operands: Vec<Operand>,
    /// Instructions emitted so far
    pub emitted: Vec<Instruction>,
}

impl LocalCodegen {
    /// Creates a code generator for the native instruction at `ea`.
    #[must_use]
    pub fn new(ea: Ea, mnemonic: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            ea,
            mnemonic: mnemonic.into(),
            operands,
            emitted: Vec::new(),
        }
    }
}

impl Codegen for LocalCodegen {
    fn insn_ea(&self) -> Ea {
        self.ea
    }

    fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    fn operand_count(&self) -> usize {
        self.operands.len()
    }

    fn load_operand(&mut self, index: usize) -> Option<Operand> {
        self.operands.get(index).cloned()
    }

    fn emit(&mut self, insn: Instruction) {
        self.emitted.push(insn);
    }
}

/// A type library held in memory.
///
/// Types live in the type namespace ([`NamedTypeFlags::TYPE`]); symbols live in the symbol
/// namespace. Names iterate in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalTypeLibrary {
    types: BTreeMap<String, TypeInfo>,
    symbols: BTreeMap<String, TypeInfo>,
}

impl LocalTypeLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named type.
    pub fn add_type(&mut self, name: impl Into<String>, ty: TypeInfo) {
        self.types.insert(name.into(), ty);
    }

    /// Adds a typed symbol.
    pub fn add_symbol(&mut self, name: impl Into<String>, ty: TypeInfo) {
        self.symbols.insert(name.into(), ty);
    }

    fn namespace(&self, flags: NamedTypeFlags) -> &BTreeMap<String, TypeInfo> {
        if flags.contains(NamedTypeFlags::TYPE) {
            &self.types
        } else {
            &self.symbols
        }
    }
}

impl TypeLibrary for LocalTypeLibrary {
    fn first_named_type(&self, flags: NamedTypeFlags) -> Option<&str> {
        self.namespace(flags).keys().next().map(String::as_str)
    }

    fn next_named_type(&self, name: &str, flags: NamedTypeFlags) -> Option<&str> {
        self.namespace(flags)
            .range::<str, _>((Bound::Excluded(name), Bound::Unbounded))
            .next()
            .map(|(key, _)| key.as_str())
    }

    fn named_type(&self, name: &str, flags: NamedTypeFlags) -> Option<TypeInfo> {
        self.namespace(flags).get(name).cloned()
    }
}
