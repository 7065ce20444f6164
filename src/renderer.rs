//! Renderer abstraction - deferred custom rendering logic.
//!
//! A [`Renderer`] packages a unit of rendering logic the tree-walker invokes
//! uniformly alongside plain nodes: when the walker reaches its position it
//! hands the initializer a render callback bound to the current parent and
//! context, and returns whatever the initializer produced, verbatim.
//!
//! The built-in control flow primitives (`map`, `when`, `suspense`) are all
//! Renderer instances; user code can define its own the same way.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::Element;
use crate::engine::context::RenderContext;
use crate::view::{RenderOutput, View};

/// Render callback handed to a renderer's initializer.
///
/// `render_fn(view, previous)` reconciles `view` under the parent and context
/// the walker was at when it reached the renderer:
/// - `previous: None` inherits the walker's previous output at that position;
/// - `previous: Some(&RenderOutput::None)` renders fresh (append);
/// - `previous: Some(output)` reconciles against `output`, replacing it.
pub type RenderFn = Rc<dyn Fn(View, Option<&RenderOutput>) -> RenderOutput>;

type InitFn = Box<dyn FnOnce(RenderFn, Rc<RenderContext>, Rc<Element>) -> RenderOutput>;

/// A deferred, parameterized unit of custom rendering logic.
///
/// The initializer runs exactly once, at the position where the renderer
/// appears in a description; its props are the closure's captures. Cloning a
/// renderer shares the one-shot initializer; rendering a second copy after
/// the first ran renders nothing and warns.
#[derive(Clone)]
pub struct Renderer {
    init: Rc<RefCell<Option<InitFn>>>,
}

impl Renderer {
    pub fn new(
        init: impl FnOnce(RenderFn, Rc<RenderContext>, Rc<Element>) -> RenderOutput + 'static,
    ) -> Self {
        Self {
            init: Rc::new(RefCell::new(Some(Box::new(init)))),
        }
    }

    /// Build a renderer view directly.
    pub fn view(
        init: impl FnOnce(RenderFn, Rc<RenderContext>, Rc<Element>) -> RenderOutput + 'static,
    ) -> View {
        View::Renderer(Self::new(init))
    }

    pub(crate) fn run(
        &self,
        render_fn: RenderFn,
        context: Rc<RenderContext>,
        parent: Rc<Element>,
    ) -> RenderOutput {
        match self.init.borrow_mut().take() {
            Some(init) => init(render_fn, context, parent),
            None => {
                eprintln!("[spark-dom] renderer initialized twice; rendering nothing");
                RenderOutput::None
            }
        }
    }
}
