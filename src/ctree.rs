//! Closure-driven visitors over the host's statement and expression tree.
//!
//! The host owns the tree and the traversal order; this module only supplies the
//! [`CtreeVisitor`] implementations it calls back into. A [`PreVisitor`] runs its closure when
//! a node is entered, a [`PostVisitor`] when it is left.
//!
//! The closure receives the node as a [`CtreeItem`]. Whether it also receives the
//! [`TraversalControl`] is chosen when the [`TreeCallback`] is built:
//!
//! ```rust
//! use hexsuite::ctree::{CtreeItem, PreVisitor, TraversalControl, TreeCallback};
//! use hexsuite::host::{CtreeVisitor, CvFlags};
//!
//! struct Stmt;
//! struct Expr(u32);
//!
//! let mut visitor: PreVisitor<Stmt, Expr> = PreVisitor::new(
//!     CvFlags::empty(),
//!     TreeCallback::with_control(|item: CtreeItem<'_, Stmt, Expr>, control: &mut TraversalControl| {
//!         if let CtreeItem::Expr(expr) = item {
//!             if expr.0 == 0 {
//!                 control.prune_now();
//!             }
//!         }
//!         0
//!     }),
//! );
//!
//! visitor.visit_expr(&mut Expr(0));
//! assert!(visitor.take_prune());
//! assert!(!visitor.take_prune());
//! ```

use crate::host::{CtreeVisitor, CvFlags};

/// The node handed to a tree visitor closure.
#[derive(Debug)]
pub enum CtreeItem<'a, S, E> {
    /// A statement
    Stmt(&'a mut S),
    /// An expression
    Expr(&'a mut E),
}

impl<S, E> CtreeItem<'_, S, E> {
    /// Returns `true` for statements.
    #[must_use]
    pub fn is_stmt(&self) -> bool {
        matches!(self, CtreeItem::Stmt(_))
    }

    /// Returns `true` for expressions.
    #[must_use]
    pub fn is_expr(&self) -> bool {
        matches!(self, CtreeItem::Expr(_))
    }
}

/// Traversal state a closure may inspect and steer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalControl {
    flags: CvFlags,
    prune: bool,
}

impl TraversalControl {
    fn new(flags: CvFlags) -> Self {
        Self {
            flags,
            prune: false,
        }
    }

    /// The flags the walk runs with.
    #[must_use]
    pub fn flags(&self) -> CvFlags {
        self.flags
    }

    /// Returns `true` during a post-order walk.
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.flags.contains(CvFlags::POST)
    }

    /// Skips the children of the node being visited.
    ///
    /// Only meaningful on the way down; once a node is left its children have been walked.
    pub fn prune_now(&mut self) {
        self.prune = true;
    }

    fn take_prune(&mut self) -> bool {
        std::mem::take(&mut self.prune)
    }
}

type NodeFn<S, E> = Box<dyn FnMut(CtreeItem<'_, S, E>) -> i32>;
type ControlFn<S, E> = Box<dyn FnMut(CtreeItem<'_, S, E>, &mut TraversalControl) -> i32>;

/// A tree visitor closure in one of its two accepted shapes.
pub enum TreeCallback<S, E> {
    /// `(item) -> result`
    Node(NodeFn<S, E>),
    /// `(item, control) -> result`
    WithControl(ControlFn<S, E>),
}

impl<S, E> TreeCallback<S, E> {
    /// A closure that only receives the node.
    pub fn node<F>(func: F) -> Self
    where
        F: FnMut(CtreeItem<'_, S, E>) -> i32 + 'static,
    {
        TreeCallback::Node(Box::new(func))
    }

    /// A closure that receives the node and the traversal control.
    pub fn with_control<F>(func: F) -> Self
    where
        F: FnMut(CtreeItem<'_, S, E>, &mut TraversalControl) -> i32 + 'static,
    {
        TreeCallback::WithControl(Box::new(func))
    }

    fn call(&mut self, item: CtreeItem<'_, S, E>, control: &mut TraversalControl) -> i32 {
        match self {
            TreeCallback::Node(func) => func(item),
            TreeCallback::WithControl(func) => func(item, control),
        }
    }
}

/// Runs a closure on every statement and expression as it is entered.
pub struct PreVisitor<S, E> {
    callback: TreeCallback<S, E>,
    control: TraversalControl,
}

impl<S, E> PreVisitor<S, E> {
    /// Creates a visitor walking with `flags`.
    #[must_use]
    pub fn new(flags: CvFlags, callback: TreeCallback<S, E>) -> Self {
        Self {
            callback,
            control: TraversalControl::new(flags),
        }
    }
}

impl<S, E> CtreeVisitor<S, E> for PreVisitor<S, E> {
    fn flags(&self) -> CvFlags {
        self.control.flags
    }

    fn visit_insn(&mut self, stmt: &mut S) -> i32 {
        self.callback.call(CtreeItem::Stmt(stmt), &mut self.control)
    }

    fn visit_expr(&mut self, expr: &mut E) -> i32 {
        self.callback.call(CtreeItem::Expr(expr), &mut self.control)
    }

    fn take_prune(&mut self) -> bool {
        self.control.take_prune()
    }
}

/// Runs a closure on every statement and expression as it is left.
///
/// The visitor always walks with [`CvFlags::POST`] so the host calls the leave callbacks.
pub struct PostVisitor<S, E> {
    callback: TreeCallback<S, E>,
    control: TraversalControl,
}

impl<S, E> PostVisitor<S, E> {
    /// Creates a visitor walking with `flags | POST`.
    #[must_use]
    pub fn new(flags: CvFlags, callback: TreeCallback<S, E>) -> Self {
        Self {
            callback,
            control: TraversalControl::new(flags | CvFlags::POST),
        }
    }
}

impl<S, E> CtreeVisitor<S, E> for PostVisitor<S, E> {
    fn flags(&self) -> CvFlags {
        self.control.flags
    }

    fn leave_insn(&mut self, stmt: &mut S) -> i32 {
        self.callback.call(CtreeItem::Stmt(stmt), &mut self.control)
    }

    fn leave_expr(&mut self, expr: &mut E) -> i32 {
        self.callback.call(CtreeItem::Expr(expr), &mut self.control)
    }

    fn take_prune(&mut self) -> bool {
        self.control.take_prune()
    }
}
