//! Tree descriptions and render output.
//!
//! [`View`] is the declarative input to the reconciler: a closed tagged enum
//! with one variant per walker case, so dispatch is a single exhaustive
//! match. Descriptions are immutable once produced and consumed by value,
//! once per reconciliation pass.
//!
//! [`RenderOutput`] is what a pass produces: nothing, one host node, or an
//! ordered group of outputs. Outputs compare by node identity.
//!
//! Props follow the `PropValue` pattern: an attribute is a static string, a
//! signal, or a getter, and the reactive variants stay live after mounting.

use std::rc::Rc;

use spark_signals::Signal;

use crate::deferred::Deferred;
use crate::dom::{EventHandler, NodeRef};
use crate::renderer::Renderer;

// =============================================================================
// Render output
// =============================================================================

/// Output of one reconciliation pass at one position.
#[derive(Clone, Debug)]
pub enum RenderOutput {
    /// Rendered to nothing.
    None,
    /// A single host node.
    Node(NodeRef),
    /// An ordered group (sequences and fragments), entries possibly nested.
    Many(Vec<RenderOutput>),
}

impl RenderOutput {
    /// All host nodes in this output, in order, flattened.
    pub fn nodes(&self) -> Vec<NodeRef> {
        let mut nodes = Vec::new();
        self.collect_nodes(&mut nodes);
        nodes
    }

    fn collect_nodes(&self, into: &mut Vec<NodeRef>) {
        match self {
            RenderOutput::None => {}
            RenderOutput::Node(node) => into.push(node.clone()),
            RenderOutput::Many(outputs) => {
                for output in outputs {
                    output.collect_nodes(into);
                }
            }
        }
    }

    /// Top-level entries, for positional reconciliation of sequences.
    pub(crate) fn items(&self) -> Vec<RenderOutput> {
        match self {
            RenderOutput::None => Vec::new(),
            RenderOutput::Node(_) => vec![self.clone()],
            RenderOutput::Many(outputs) => outputs.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// The single node, when this output is exactly one node.
    pub fn single(&self) -> Option<NodeRef> {
        match self {
            RenderOutput::Node(node) => Some(node.clone()),
            _ => None,
        }
    }
}

/// Identity comparison: same nodes in the same shape.
impl PartialEq for RenderOutput {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RenderOutput::None, RenderOutput::None) => true,
            (RenderOutput::Node(a), RenderOutput::Node(b)) => a.ptr_eq(b),
            (RenderOutput::Many(a), RenderOutput::Many(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
            }
            _ => false,
        }
    }
}

// =============================================================================
// Output refs
// =============================================================================

/// Binding that receives the rendered output of an element, component or
/// fragment: either a callback or a reactive container written on assignment.
#[derive(Clone)]
pub enum OutputRef {
    Callback(Rc<dyn Fn(&RenderOutput)>),
    Signal(Signal<RenderOutput>),
}

impl OutputRef {
    pub fn callback(f: impl Fn(&RenderOutput) + 'static) -> Self {
        OutputRef::Callback(Rc::new(f))
    }

    pub(crate) fn assign(&self, output: &RenderOutput) {
        match self {
            OutputRef::Callback(f) => f(output),
            OutputRef::Signal(signal) => {
                signal.set(output.clone());
            }
        }
    }
}

// =============================================================================
// Attribute values
// =============================================================================

/// An attribute value: static, signal-bound, or computed by a getter.
///
/// The reactive variants are applied immediately at mount and re-applied on
/// every change for as long as the element is alive.
#[derive(Clone)]
pub enum AttrValue {
    Static(String),
    Signal(Signal<String>),
    Getter(Rc<dyn Fn() -> String>),
}

impl AttrValue {
    pub fn getter(f: impl Fn() -> String + 'static) -> Self {
        AttrValue::Getter(Rc::new(f))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Static(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Static(value)
    }
}

impl From<Signal<String>> for AttrValue {
    fn from(signal: Signal<String>) -> Self {
        AttrValue::Signal(signal)
    }
}

// =============================================================================
// Element description
// =============================================================================

/// Declarative description of one host element, built with [`el`].
///
/// # Example
///
/// ```ignore
/// use spark_dom::{el, OutputRef};
/// use spark_signals::signal;
///
/// let label = signal("count is 0".to_string());
/// let view = el("button")
///     .attr("x-data", label.clone())
///     .on("click", move |_| label.set("clicked".to_string()))
///     .style("color", "red")
///     .child("press me")
///     .into_view();
/// ```
#[derive(Clone)]
pub struct ElementView {
    pub tag: String,
    pub attrs: Vec<(String, AttrValue)>,
    pub styles: Vec<(String, String)>,
    pub listeners: Vec<(String, EventHandler)>,
    pub children: Vec<View>,
    pub node_ref: Option<OutputRef>,
}

/// Start describing an element with the given tag.
pub fn el(tag: &str) -> ElementView {
    ElementView {
        tag: tag.to_string(),
        attrs: Vec::new(),
        styles: Vec::new(),
        listeners: Vec::new(),
        children: Vec::new(),
        node_ref: None,
    }
}

impl ElementView {
    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.push((property.to_string(), value.to_string()));
        self
    }

    pub fn on(mut self, event: &str, handler: impl Fn(&crate::dom::Event) + 'static) -> Self {
        self.listeners.push((event.to_string(), Rc::new(handler)));
        self
    }

    pub fn child(mut self, child: impl Into<View>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = View>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn node_ref(mut self, node_ref: OutputRef) -> Self {
        self.node_ref = Some(node_ref);
        self
    }

    pub fn into_view(self) -> View {
        View::Element(self)
    }
}

// =============================================================================
// Components and fragments
// =============================================================================

/// A function component: a captured render closure (props are the captures)
/// plus an optional output ref.
#[derive(Clone)]
pub struct Component {
    pub(crate) call: Rc<dyn Fn() -> View>,
    pub(crate) node_ref: Option<OutputRef>,
}

/// Wrap a render function as a component node. The function runs once per
/// reconciliation pass at this position, under a fresh render context.
pub fn component(f: impl Fn() -> View + 'static) -> View {
    View::Component(Component {
        call: Rc::new(f),
        node_ref: None,
    })
}

/// Like [`component`], with the rendered output assigned to `node_ref`.
pub fn component_with_ref(f: impl Fn() -> View + 'static, node_ref: OutputRef) -> View {
    View::Component(Component {
        call: Rc::new(f),
        node_ref: Some(node_ref),
    })
}

/// A fragment: children rendered positionally with no element of their own.
#[derive(Clone)]
pub struct Fragment {
    pub(crate) children: Vec<View>,
    pub(crate) node_ref: Option<OutputRef>,
}

pub fn fragment(children: impl IntoIterator<Item = View>) -> View {
    View::Fragment(Fragment {
        children: children.into_iter().collect(),
        node_ref: None,
    })
}

pub fn fragment_with_ref(children: impl IntoIterator<Item = View>, node_ref: OutputRef) -> View {
    View::Fragment(Fragment {
        children: children.into_iter().collect(),
        node_ref: Some(node_ref),
    })
}

// =============================================================================
// View
// =============================================================================

/// One node of a tree description.
#[derive(Clone)]
pub enum View {
    /// Renders to nothing.
    Empty,
    /// Primitive text.
    Text(String),
    /// Reactive binding: re-rendered at this position whenever a value the
    /// getter reads changes.
    Dynamic(Rc<dyn Fn() -> View>),
    /// Deferred content: placeholder now, real content once resolved.
    Deferred(Deferred<View>),
    /// Ordered sequence, reconciled positionally.
    Sequence(Vec<View>),
    /// A host element to create.
    Element(ElementView),
    /// A function component.
    Component(Component),
    /// Children without an enclosing element.
    Fragment(Fragment),
    /// Custom rendering logic, invoked by the walker at this position.
    Renderer(Renderer),
    /// Already-materialized output, passed through unchanged.
    Node(NodeRef),
}

/// A reactive view binding from an arbitrary getter.
pub fn dynamic(getter: impl Fn() -> View + 'static) -> View {
    View::Dynamic(Rc::new(getter))
}

impl From<&str> for View {
    fn from(value: &str) -> Self {
        View::Text(value.to_string())
    }
}

impl From<String> for View {
    fn from(value: String) -> Self {
        View::Text(value)
    }
}

macro_rules! text_view_from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for View {
            fn from(value: $ty) -> Self {
                View::Text(value.to_string())
            }
        })*
    };
}

text_view_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<Signal<String>> for View {
    fn from(signal: Signal<String>) -> Self {
        dynamic(move || View::Text(signal.get()))
    }
}

impl From<Deferred<View>> for View {
    fn from(deferred: Deferred<View>) -> Self {
        View::Deferred(deferred)
    }
}

impl From<Vec<View>> for View {
    fn from(children: Vec<View>) -> Self {
        View::Sequence(children)
    }
}

impl From<ElementView> for View {
    fn from(element: ElementView) -> Self {
        View::Element(element)
    }
}

impl From<NodeRef> for View {
    fn from(node: NodeRef) -> Self {
        View::Node(node)
    }
}

impl From<Renderer> for View {
    fn from(renderer: Renderer) -> Self {
        View::Renderer(renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Element, TextNode};

    #[test]
    fn test_output_nodes_flatten_nested_groups() {
        let a: NodeRef = TextNode::new("a").into();
        let b: NodeRef = Element::new("div").into();
        let output = RenderOutput::Many(vec![
            RenderOutput::Node(a.clone()),
            RenderOutput::None,
            RenderOutput::Many(vec![RenderOutput::Node(b.clone())]),
        ]);

        let nodes = output.nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].ptr_eq(&a));
        assert!(nodes[1].ptr_eq(&b));
    }

    #[test]
    fn test_output_equality_is_identity() {
        let a: NodeRef = TextNode::new("a").into();
        let other: NodeRef = TextNode::new("a").into();

        assert_eq!(RenderOutput::Node(a.clone()), RenderOutput::Node(a.clone()));
        assert_ne!(
            RenderOutput::Node(a),
            RenderOutput::Node(other),
            "equal content is not identity"
        );
    }
}
