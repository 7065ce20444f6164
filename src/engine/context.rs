//! Render contexts - lifecycle scopes mirroring the rendered tree.
//!
//! Every function component and every element gets its own context, created
//! as a child of the context the walker was in. A context owns the cleanup
//! callbacks registered while its subtree rendered (effect stop handles,
//! listener teardown, cache teardown) and the contexts of nested subtrees.
//! Destroying a context runs every cleanup exactly once and cascades to all
//! descendants, so tearing down a subtree is one call.
//!
//! A thread-local side table associates a live element with the context that
//! produced it. The association is weak in both directions: it never extends
//! a lifetime, it only lets the walker find "who owns this node" right before
//! replacing or removing it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::dom::Element;

/// Cleanup callback type, shared with everything that registers teardown.
pub type Cleanup = Box<dyn FnOnce()>;

/// A lifecycle scope in the render tree.
///
/// Invariants:
/// - a non-root context has exactly one parent, set at creation;
/// - it sits in its parent's child list from creation until destruction;
/// - destruction runs each registered cleanup exactly once, cascades into
///   every descendant, and is idempotent.
pub struct RenderContext {
    parent: Weak<RenderContext>,
    children: RefCell<Vec<Rc<RenderContext>>>,
    cleanups: RefCell<Vec<Cleanup>>,
    destroyed: Cell<bool>,
}

impl RenderContext {
    /// Create a root context for an independently mounted tree.
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            parent: Weak::new(),
            children: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            destroyed: Cell::new(false),
        })
    }

    /// Create a child context registered under `self`.
    pub fn child(self: &Rc<Self>) -> Rc<Self> {
        let child = Rc::new(Self {
            parent: Rc::downgrade(self),
            children: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            destroyed: Cell::new(false),
        });
        self.children.borrow_mut().push(child.clone());
        child
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Register `f` to run when this context is destroyed.
    ///
    /// Registrations accumulate; invocation order on destroy is unspecified
    /// but each function runs exactly once. Registering on an already
    /// destroyed context runs `f` immediately, which keeps unsubscription
    /// run-once-safe for writes that race with teardown.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        if self.destroyed.get() {
            f();
            return;
        }
        self.cleanups.borrow_mut().push(Box::new(f));
    }

    /// Destroy this context: detach it from its parent, run its cleanups,
    /// and cascade into every descendant. Idempotent.
    ///
    /// The cascade uses an explicit worklist so deeply nested trees cannot
    /// overflow the call stack.
    pub fn destroy(self: &Rc<Self>) {
        if self.destroyed.get() {
            return;
        }
        if let Some(parent) = self.parent.upgrade() {
            parent
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(c, self));
        }

        let mut worklist = vec![self.clone()];
        while let Some(context) = worklist.pop() {
            if context.destroyed.replace(true) {
                continue;
            }
            // Take both lists before running anything: a cleanup may write a
            // signal whose subscriber re-enters this context, and must find
            // it already marked destroyed with nothing left to run.
            let cleanups = context.cleanups.take();
            let children = context.children.take();
            for cleanup in cleanups {
                cleanup();
            }
            worklist.extend(children);
        }
    }
}

// =============================================================================
// Element <-> context side mapping
// =============================================================================

thread_local! {
    static NODE_CONTEXTS: RefCell<HashMap<usize, (Weak<Element>, Weak<RenderContext>)>> =
        RefCell::new(HashMap::new());
}

/// Associate `element` with the context that produced it.
///
/// The entry is removed when the context is destroyed; both sides are held
/// weakly, and lookups validate the element against the stored handle so a
/// recycled allocation address can never resolve to a stale context.
pub fn link_node_context(element: &Rc<Element>, context: &Rc<RenderContext>) {
    let key = Rc::as_ptr(element) as usize;
    let element_weak = Rc::downgrade(element);
    NODE_CONTEXTS.with(|map| {
        map.borrow_mut()
            .insert(key, (element_weak.clone(), Rc::downgrade(context)));
    });
    context.on_cleanup(move || {
        NODE_CONTEXTS.with(|map| {
            let mut map = map.borrow_mut();
            if let Some((stored, _)) = map.get(&key) {
                if Weak::ptr_eq(stored, &element_weak) {
                    map.remove(&key);
                }
            }
        });
    });
}

/// The context that produced `element`, if it is linked and still alive.
pub fn context_for_node(element: &Rc<Element>) -> Option<Rc<RenderContext>> {
    let key = Rc::as_ptr(element) as usize;
    NODE_CONTEXTS.with(|map| {
        let map = map.borrow();
        let (stored, context) = map.get(&key)?;
        let stored = stored.upgrade()?;
        if !Rc::ptr_eq(&stored, element) {
            return None;
        }
        context.upgrade()
    })
}

// =============================================================================
// Tests
// =============================================================================
