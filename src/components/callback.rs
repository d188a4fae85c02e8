//! Event bus adapters.
//!
//! [`HexraysCallback`] hands the raw event kind and argument list to its closure.
//! [`EventDispatcher`] is built on top of it: it listens for a single [`EventKind`], decodes
//! the raw arguments into the shape documented in [`crate::host::EventKind`] and calls a
//! closure typed for that shape.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    components::Component,
    host::{
        EventHandler, EventHandlerRef, EventHost, EventKind, FunctionEvent, Maturity,
        MicroBlock, MicroFunction, RawArg,
    },
    mir::{CallInfo, Instruction, TypeInfo},
    Error, Result,
};

struct RawStorage<F> {
    func: F,
}

impl<F> EventHandler for RawStorage<F>
where
    F: FnMut(EventKind, &mut [RawArg<'_>]) -> isize,
{
    fn handle(&mut self, kind: EventKind, args: &mut [RawArg<'_>]) -> isize {
        (self.func)(kind, args)
    }
}

/// A listener receiving every event of the host's event bus undecoded.
pub struct HexraysCallback<'h> {
    host: &'h dyn EventHost,
    handler: Rc<RefCell<dyn EventHandler>>,
    installed: bool,
}

impl<'h> HexraysCallback<'h> {
    /// Wraps `func`. The callback starts uninstalled.
    pub fn new<F>(host: &'h dyn EventHost, func: F) -> Self
    where
        F: FnMut(EventKind, &mut [RawArg<'_>]) -> isize + 'static,
    {
        Self::from_handler(host, Rc::new(RefCell::new(RawStorage { func })))
    }

    /// Wraps an existing handler object.
    pub fn from_handler(host: &'h dyn EventHost, handler: Rc<RefCell<dyn EventHandler>>) -> Self {
        Self {
            host,
            handler,
            installed: false,
        }
    }

    /// The wrapped handler, for calling it directly.
    #[must_use]
    pub fn handler(&self) -> &Rc<RefCell<dyn EventHandler>> {
        &self.handler
    }

    fn handle(&self) -> EventHandlerRef {
        Rc::downgrade(&self.handler)
    }
}

impl Component for HexraysCallback<'_> {
    fn set_state(&mut self, enable: bool) {
        if self.installed == enable {
            return;
        }

        if enable {
            if !self.host.install_hexrays_callback(self.handle()) {
                tracing::warn!("event callback: registration refused by host");
                return;
            }
        } else {
            self.host.remove_hexrays_callback(&self.handle());
        }
        self.installed = enable;
        tracing::debug!(installed = enable, "event callback state changed");
    }

    fn is_installed(&self) -> bool {
        self.installed
    }
}

impl Drop for HexraysCallback<'_> {
    fn drop(&mut self) {
        self.uninstall();
    }
}

type FunctionFn = Box<dyn FnMut(&mut dyn MicroFunction) -> isize>;
type CombineFn = Box<dyn FnMut(&mut dyn MicroBlock, &mut Instruction) -> isize>;
type BuildCallinfoFn =
    Box<dyn FnMut(&mut dyn MicroBlock, &TypeInfo, &mut Option<Box<CallInfo>>) -> isize>;
type InterrFn = Box<dyn FnMut(i64) -> isize>;
type MaturityFn = Box<dyn FnMut(&mut dyn MicroFunction, Maturity) -> isize>;

/// A closure typed for the arguments of one event kind.
///
/// The variant chosen at construction fixes both the event the closure listens for and the
/// argument shape it receives.
pub enum EventCallback {
    /// One of the events carrying only the function.
    Function(FunctionEvent, FunctionFn),
    /// [`EventKind::Combine`]: the block and the instruction about to be combined.
    Combine(CombineFn),
    /// [`EventKind::BuildCallinfo`]: the block, the call type and the slot for the
    /// descriptor. Storing a descriptor in the slot hands it to the host.
    BuildCallinfo(BuildCallinfoFn),
    /// [`EventKind::Interr`]: the internal error code.
    Interr(InterrFn),
    /// [`EventKind::Maturity`]: the function and its new maturity.
    Maturity(MaturityFn),
}

impl EventCallback {
    /// The event this callback listens for.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventCallback::Function(event, _) => EventKind::from(*event),
            EventCallback::Combine(_) => EventKind::Combine,
            EventCallback::BuildCallinfo(_) => EventKind::BuildCallinfo,
            EventCallback::Interr(_) => EventKind::Interr,
            EventCallback::Maturity(_) => EventKind::Maturity,
        }
    }

    /// Decodes `args` and calls the closure, returning its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventArity`] or [`Error::EventArgument`] if `args` does not have the
    /// shape of [`EventCallback::kind`], and [`Error::EventArgument`] if a maturity event
    /// carries an unknown level. The closure is not called in either case.
    pub fn invoke(&mut self, args: &mut [RawArg<'_>]) -> Result<isize> {
        let kind = self.kind();
        match (self, args) {
            (EventCallback::Function(_, func), [RawArg::Function(mba)]) => Ok(func(&mut **mba)),
            (EventCallback::Combine(func), [RawArg::Block(blk), RawArg::Insn(insn)]) => {
                Ok(func(&mut **blk, &mut **insn))
            }
            (
                EventCallback::BuildCallinfo(func),
                [RawArg::Block(blk), RawArg::Type(ty), RawArg::CallSlot(slot)],
            ) => Ok(func(&mut **blk, *ty, &mut **slot)),
            (EventCallback::Interr(func), [RawArg::Int(code)]) => Ok(func(*code)),
            (EventCallback::Maturity(func), [RawArg::Function(mba), RawArg::Int(level)]) => {
                match Maturity::from_level(*level) {
                    Some(maturity) => Ok(func(&mut **mba, maturity)),
                    None => Err(Error::EventArgument {
                        kind,
                        index: 1,
                        expected: "maturity",
                        found: "int",
                    }),
                }
            }
            // Every well-formed argument list is matched above.
            (_, args) => kind.check_args(args).map(|()| 0),
        }
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCallback({})", self.kind())
    }
}

/// Calls a typed closure for one kind of event.
///
/// Registers a single [`HexraysCallback`] with the host. Events of other kinds are ignored
/// with the neutral result 0 and never reach the closure. Arguments that do not decode are
/// logged and also answered with 0.
///
/// ```rust
/// use hexsuite::prelude::*;
/// use std::{cell::Cell, rc::Rc};
///
/// let host = LocalHost::new();
/// let errors = Rc::new(Cell::new(0));
/// let seen = errors.clone();
///
/// let mut on_error = EventDispatcher::on_interr(&host, move |code| {
///     seen.set(code);
///     0
/// });
/// on_error.install();
///
/// host.dispatch(EventKind::Interr, &mut [RawArg::Int(50920)]);
/// host.dispatch(EventKind::Maturity, &mut [RawArg::Int(3)]);
/// assert_eq!(errors.get(), 50920);
/// ```
pub struct EventDispatcher<'h> {
    callback: HexraysCallback<'h>,
    kind: EventKind,
}

impl<'h> EventDispatcher<'h> {
    /// Wraps `callback`. The dispatcher starts uninstalled.
    pub fn new(host: &'h dyn EventHost, mut callback: EventCallback) -> Self {
        let kind = callback.kind();
        let raw = HexraysCallback::new(host, move |event, args| {
            if event != kind {
                tracing::trace!(%kind, %event, "dispatcher ignoring event");
                return 0;
            }
            match callback.invoke(args) {
                Ok(result) => result,
                Err(error) => {
                    tracing::warn!("{kind} dispatcher: {error}");
                    0
                }
            }
        });

        Self {
            callback: raw,
            kind,
        }
    }

    /// Listens for one of the function-only events.
    pub fn on_function<F>(host: &'h dyn EventHost, event: FunctionEvent, func: F) -> Self
    where
        F: FnMut(&mut dyn MicroFunction) -> isize + 'static,
    {
        Self::new(host, EventCallback::Function(event, Box::new(func)))
    }

    /// Listens for [`EventKind::Combine`].
    pub fn on_combine<F>(host: &'h dyn EventHost, func: F) -> Self
    where
        F: FnMut(&mut dyn MicroBlock, &mut Instruction) -> isize + 'static,
    {
        Self::new(host, EventCallback::Combine(Box::new(func)))
    }

    /// Listens for [`EventKind::BuildCallinfo`].
    pub fn on_build_callinfo<F>(host: &'h dyn EventHost, func: F) -> Self
    where
        F: FnMut(&mut dyn MicroBlock, &TypeInfo, &mut Option<Box<CallInfo>>) -> isize + 'static,
    {
        Self::new(host, EventCallback::BuildCallinfo(Box::new(func)))
    }

    /// Listens for [`EventKind::Interr`].
    pub fn on_interr<F>(host: &'h dyn EventHost, func: F) -> Self
    where
        F: FnMut(i64) -> isize + 'static,
    {
        Self::new(host, EventCallback::Interr(Box::new(func)))
    }

    /// Listens for [`EventKind::Maturity`].
    pub fn on_maturity<F>(host: &'h dyn EventHost, func: F) -> Self
    where
        F: FnMut(&mut dyn MicroFunction, Maturity) -> isize + 'static,
    {
        Self::new(host, EventCallback::Maturity(Box::new(func)))
    }

    /// The event this dispatcher listens for.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl Component for EventDispatcher<'_> {
    fn set_state(&mut self, enable: bool) {
        self.callback.set_state(enable);
    }

    fn is_installed(&self) -> bool {
        self.callback.is_installed()
    }
}
