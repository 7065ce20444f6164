//! Mount API - root lifecycle for an application tree.
//!
//! [`create_root`] ties a container element to a fresh root render context.
//! [`Root::render`] reconciles a description into the container; calling it
//! again reconciles against the previous output instead of starting over.
//! [`Root::unmount`] destroys the context tree and empties the container.
//!
//! # Example
//!
//! ```ignore
//! use spark_dom::{create_root, el, Element};
//! use spark_signals::signal;
//!
//! let container = Element::new("body");
//! let root = create_root(container.clone());
//!
//! let count = signal(0i32);
//! let label = signal("count is 0".to_string());
//! root.render(el("button").child(label.clone()).into_view());
//!
//! // Reactive updates flow without re-rendering:
//! label.set("count is 1".to_string());
//!
//! // Tear the whole tree down:
//! root.unmount();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::Element;
use crate::engine::context::RenderContext;
use crate::engine::render::{discard, render};
use crate::view::{RenderOutput, View};

/// A mounted application tree: one container element, one root context, and
/// the output of the latest render pass.
pub struct Root {
    container: Rc<Element>,
    context: Rc<RenderContext>,
    output: RefCell<RenderOutput>,
}

/// Create a root for rendering into `container`.
pub fn create_root(container: Rc<Element>) -> Root {
    Root {
        container,
        context: RenderContext::root(),
        output: RefCell::new(RenderOutput::None),
    }
}

impl Root {
    /// Reconcile `view` into the container, against the previous render.
    ///
    /// The first call mounts; later calls update in place. Rendering on an
    /// unmounted root does nothing and warns.
    pub fn render(&self, view: impl Into<View>) -> RenderOutput {
        if self.context.is_destroyed() {
            eprintln!("[spark-dom] render on an unmounted root; ignoring");
            return RenderOutput::None;
        }
        let previous = self.output.borrow().clone();
        let output = render(&self.context, &self.container, view.into(), Some(&previous));
        *self.output.borrow_mut() = output.clone();
        output
    }

    /// The context every render pass on this root runs under.
    pub fn context(&self) -> &Rc<RenderContext> {
        &self.context
    }

    /// The container this root renders into.
    pub fn container(&self) -> &Rc<Element> {
        &self.container
    }

    /// Destroy the context tree (stopping every subscription) and remove the
    /// rendered nodes from the container.
    pub fn unmount(self) {
        self.teardown();
    }

    fn teardown(&self) {
        self.context.destroy();
        let output = self.output.replace(RenderOutput::None);
        discard(&self.container, &output);
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        if !self.context.is_destroyed() {
            self.teardown();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
