//! Host tree - the mutable DOM-like tree the renderer keeps in sync.
//!
//! The reconciler does not talk to a browser; it mutates this in-process
//! tree through the same narrow contract a DOM offers: create element/text,
//! set attributes and styles, attach listeners, and move children around by
//! position. Tests drive user interaction through [`Element::dispatch`].
//!
//! # Identity
//!
//! Nodes are `Rc`-shared and compared by pointer identity ([`NodeRef::ptr_eq`]).
//! Reconciliation reuses nodes by identity, so "is this the same node" is a
//! pointer question, never a structural one.
//!
//! # Move semantics
//!
//! [`Element::append_child`] and [`Element::insert_before`] detach the node
//! from its current parent first. The keyed-list reorder pass relies on this:
//! inserting an already-mounted node *moves* it.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

// =============================================================================
// Structural mutation counter
// =============================================================================

thread_local! {
    static MUTATIONS: Cell<u64> = const { Cell::new(0) };
}

/// Total number of structural host-tree mutations (append, insert, replace,
/// remove) performed on this thread.
///
/// Snapshot before and after a reconciliation pass to observe how much the
/// pass actually touched the tree. Attribute, style and text-data writes are
/// not structural and are not counted.
pub fn mutations() -> u64 {
    MUTATIONS.with(|m| m.get())
}

fn count_mutation() {
    MUTATIONS.with(|m| m.set(m.get() + 1));
}

// =============================================================================
// Events
// =============================================================================

/// An event delivered to element listeners.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name the listener was registered under ("click", "keypress", ...).
    pub name: String,
    /// Event payload (input value, key, ...). Empty when the event carries none.
    pub value: String,
}

impl Event {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Event listener callback. `Rc` so handlers can be cloned into closures.
pub type EventHandler = Rc<dyn Fn(&Event)>;

// =============================================================================
// Nodes
// =============================================================================

/// A mutable element in the host tree.
pub struct Element {
    tag: String,
    attributes: RefCell<BTreeMap<String, String>>,
    styles: RefCell<BTreeMap<String, String>>,
    listeners: RefCell<Vec<(String, EventHandler)>>,
    children: RefCell<Vec<NodeRef>>,
    parent: RefCell<Option<Weak<Element>>>,
}

/// A text node in the host tree.
pub struct TextNode {
    data: RefCell<String>,
    parent: RefCell<Option<Weak<Element>>>,
}

/// Handle to a host-tree node: element or text.
#[derive(Clone)]
pub enum NodeRef {
    Element(Rc<Element>),
    Text(Rc<TextNode>),
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Element(element) => write!(f, "Element({:p})", Rc::as_ptr(element)),
            NodeRef::Text(text) => write!(f, "Text({:p})", Rc::as_ptr(text)),
        }
    }
}

impl TextNode {
    pub fn new(data: &str) -> Rc<Self> {
        Rc::new(Self {
            data: RefCell::new(data.to_string()),
            parent: RefCell::new(None),
        })
    }

    pub fn data(&self) -> String {
        self.data.borrow().clone()
    }

    /// Update the text content in place. Not a structural mutation.
    pub fn set_data(&self, data: &str) {
        *self.data.borrow_mut() = data.to_string();
    }
}

impl Element {
    pub fn new(tag: &str) -> Rc<Self> {
        Rc::new(Self {
            tag: tag.to_string(),
            attributes: RefCell::new(BTreeMap::new()),
            styles: RefCell::new(BTreeMap::new()),
            listeners: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(None),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    // =========================================================================
    // Attributes, styles, listeners
    // =========================================================================

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attribute(&self, name: &str) {
        self.attributes.borrow_mut().remove(name);
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn set_style(&self, property: &str, value: &str) {
        self.styles
            .borrow_mut()
            .insert(property.to_string(), value.to_string());
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.styles.borrow().get(property).cloned()
    }

    pub fn add_event_listener(&self, name: &str, handler: EventHandler) {
        self.listeners
            .borrow_mut()
            .push((name.to_string(), handler));
    }

    /// Deliver an event to every listener registered under its name.
    ///
    /// Listeners are snapshotted first so a handler may mutate the tree
    /// (including this element's listener list) while running.
    pub fn dispatch(&self, event: &Event) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| *name == event.name)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    // =========================================================================
    // Child access
    // =========================================================================

    pub fn children(&self) -> Vec<NodeRef> {
        self.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<NodeRef> {
        self.children.borrow().first().cloned()
    }

    /// The child immediately after `node`, or `None` if `node` is the last
    /// child or not a child at all.
    pub fn next_sibling(&self, node: &NodeRef) -> Option<NodeRef> {
        let children = self.children.borrow();
        let index = children.iter().position(|c| c.ptr_eq(node))?;
        children.get(index + 1).cloned()
    }

    fn index_of(&self, node: &NodeRef) -> Option<usize> {
        self.children.borrow().iter().position(|c| c.ptr_eq(node))
    }

    // =========================================================================
    // Child mutation
    // =========================================================================

    /// Append `child` as the last child, detaching it from any current parent.
    pub fn append_child(self: &Rc<Self>, child: &NodeRef) {
        child.remove_from_parent();
        child.set_parent(Some(Rc::downgrade(self)));
        self.children.borrow_mut().push(child.clone());
        count_mutation();
    }

    /// Insert `child` immediately before `reference`, detaching `child` from
    /// any current parent first (a move when it was already mounted here).
    /// Appends when `reference` is not a child of this element.
    pub fn insert_before(self: &Rc<Self>, child: &NodeRef, reference: &NodeRef) {
        child.remove_from_parent();
        child.set_parent(Some(Rc::downgrade(self)));
        let mut children = self.children.borrow_mut();
        match children.iter().position(|c| c.ptr_eq(reference)) {
            Some(index) => children.insert(index, child.clone()),
            None => children.push(child.clone()),
        }
        count_mutation();
    }

    /// Replace `old` with `new` at the same position. No-op when they are the
    /// same node or `old` is not a child of this element.
    pub fn replace_child(self: &Rc<Self>, new: &NodeRef, old: &NodeRef) {
        if new.ptr_eq(old) {
            return;
        }
        new.remove_from_parent();
        let index = match self.index_of(old) {
            Some(index) => index,
            None => return,
        };
        new.set_parent(Some(Rc::downgrade(self)));
        old.set_parent(None);
        self.children.borrow_mut()[index] = new.clone();
        count_mutation();
    }

    /// Remove `child` from this element. No-op when it is not a child.
    pub fn remove_child(&self, child: &NodeRef) {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|c| !c.ptr_eq(child));
        if children.len() != before {
            child.set_parent(None);
            count_mutation();
        }
    }

    // =========================================================================
    // Debug rendering
    // =========================================================================

    /// Serialize this element and its subtree as HTML-ish markup for test
    /// assertions and debugging. Attributes print in sorted order.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "<{}", self.tag);
        for (name, value) in self.attributes.borrow().iter() {
            let _ = write!(out, " {}=\"{}\"", name, value);
        }
        let styles = self.styles.borrow();
        if !styles.is_empty() {
            let body: Vec<String> = styles
                .iter()
                .map(|(property, value)| format!("{}: {}", property, value))
                .collect();
            let _ = write!(out, " style=\"{}\"", body.join("; "));
        }
        out.push('>');
        for child in self.children.borrow().iter() {
            out.push_str(&child.outer_html());
        }
        let _ = write!(out, "</{}>", self.tag);
        out
    }
}

impl NodeRef {
    /// Pointer identity: true when both handles refer to the same node.
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        match (self, other) {
            (NodeRef::Element(a), NodeRef::Element(b)) => Rc::ptr_eq(a, b),
            (NodeRef::Text(a), NodeRef::Text(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_element(&self) -> Option<&Rc<Element>> {
        match self {
            NodeRef::Element(element) => Some(element),
            NodeRef::Text(_) => None,
        }
    }

    pub fn parent(&self) -> Option<Rc<Element>> {
        let parent = match self {
            NodeRef::Element(element) => element.parent.borrow().clone(),
            NodeRef::Text(text) => text.parent.borrow().clone(),
        };
        parent.and_then(|weak| weak.upgrade())
    }

    fn set_parent(&self, parent: Option<Weak<Element>>) {
        match self {
            NodeRef::Element(element) => *element.parent.borrow_mut() = parent,
            NodeRef::Text(text) => *text.parent.borrow_mut() = parent,
        }
    }

    /// Detach this node from its parent, if any.
    pub fn remove_from_parent(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    pub fn outer_html(&self) -> String {
        match self {
            NodeRef::Element(element) => element.outer_html(),
            NodeRef::Text(text) => text.data(),
        }
    }
}

impl From<Rc<Element>> for NodeRef {
    fn from(element: Rc<Element>) -> Self {
        NodeRef::Element(element)
    }
}

impl From<Rc<TextNode>> for NodeRef {
    fn from(text: Rc<TextNode>) -> Self {
        NodeRef::Text(text)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_serialize() {
        let root = Element::new("div");
        root.set_attribute("id", "app");
        root.set_style("color", "red");
        let child = Element::new("span");
        root.append_child(&child.clone().into());
        child.append_child(&TextNode::new("hi").into());

        assert_eq!(
            root.outer_html(),
            "<div id=\"app\" style=\"color: red\"><span>hi</span></div>"
        );
    }

    #[test]
    fn test_insert_before_moves_existing_child() {
        let root = Element::new("ul");
        let a: NodeRef = Element::new("li").into();
        let b: NodeRef = Element::new("li").into();
        let c: NodeRef = Element::new("li").into();
        root.append_child(&a);
        root.append_child(&b);
        root.append_child(&c);

        // Moving c before a must not duplicate it.
        root.insert_before(&c, &a);
        let children = root.children();
        assert_eq!(children.len(), 3, "move must not duplicate the node");
        assert!(children[0].ptr_eq(&c));
        assert!(children[1].ptr_eq(&a));
        assert!(children[2].ptr_eq(&b));
        assert!(c.parent().is_some());
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let root = Element::new("div");
        let a: NodeRef = TextNode::new("a").into();
        let b: NodeRef = TextNode::new("b").into();
        let replacement: NodeRef = TextNode::new("x").into();
        root.append_child(&a);
        root.append_child(&b);

        root.replace_child(&replacement, &a);
        let children = root.children();
        assert!(children[0].ptr_eq(&replacement), "replacement takes a's slot");
        assert!(children[1].ptr_eq(&b));
        assert!(a.parent().is_none(), "replaced node is detached");
    }

    #[test]
    fn test_replace_child_same_node_counts_nothing() {
        let root = Element::new("div");
        let a: NodeRef = TextNode::new("a").into();
        root.append_child(&a);

        let before = mutations();
        root.replace_child(&a, &a);
        assert_eq!(mutations(), before, "self-replacement must not mutate");
    }

    #[test]
    fn test_remove_child_tolerates_non_child() {
        let root = Element::new("div");
        let stray: NodeRef = TextNode::new("x").into();
        let before = mutations();
        root.remove_child(&stray);
        assert_eq!(mutations(), before);
    }

    #[test]
    fn test_dispatch_runs_matching_listeners() {
        let root = Element::new("button");
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = clicks.clone();
        root.add_event_listener("click", Rc::new(move |_| clicks_clone.set(clicks_clone.get() + 1)));
        let other = Rc::new(Cell::new(0));
        let other_clone = other.clone();
        root.add_event_listener("keypress", Rc::new(move |_| other_clone.set(other_clone.get() + 1)));

        root.dispatch(&Event::new("click", ""));
        root.dispatch(&Event::new("click", ""));
        assert_eq!(clicks.get(), 2);
        assert_eq!(other.get(), 0, "only matching listeners run");
    }

    #[test]
    fn test_next_sibling() {
        let root = Element::new("div");
        let a: NodeRef = TextNode::new("a").into();
        let b: NodeRef = TextNode::new("b").into();
        root.append_child(&a);
        root.append_child(&b);

        assert!(root.next_sibling(&a).unwrap().ptr_eq(&b));
        assert!(root.next_sibling(&b).is_none());
    }
}
