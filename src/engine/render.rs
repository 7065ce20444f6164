//! Core tree-walker - the recursive reconciler.
//!
//! [`render`] interprets one description node at one position: it creates or
//! updates host nodes, wires reactive subscriptions into the right render
//! context, and recurses into children. Dispatch is one exhaustive match over
//! the [`View`] variants, in priority order.
//!
//! # Placement
//!
//! New output replaces previous output positionally: identical nodes are left
//! untouched, differing positions are replaced in place, missing positions
//! are appended, and leftover previous nodes are removed. Before a
//! materialized element is replaced or removed, the context that produced it
//! is looked up through the side mapping and destroyed, so no subscription
//! survives its subtree.
//!
//! # Subscription ownership
//!
//! Every reactive binding the walker creates is a `spark_signals::effect`
//! whose first run performs the initial render and whose stop handle is
//! registered as a cleanup on the owning context. Because each binding has
//! its own effect, signal reads made while rendering nested output are
//! tracked by the nested bindings, never by an enclosing effect.

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::effect;

use crate::dom::{Element, NodeRef, TextNode};
use crate::engine::context::{RenderContext, context_for_node, link_node_context};
use crate::renderer::RenderFn;
use crate::view::{AttrValue, ElementView, Fragment, RenderOutput, View};

/// Reconcile `view` under `parent`, against the output previously rendered
/// at this position. Returns the new output for the position.
pub fn render(
    context: &Rc<RenderContext>,
    parent: &Rc<Element>,
    view: View,
    previous: Option<&RenderOutput>,
) -> RenderOutput {
    match view {
        // Deferred content: placeholder now, the resolved value later, at
        // this same position. Concurrent deferreds each replace only their
        // own placeholder.
        View::Deferred(deferred) => {
            let placeholder = match previous {
                Some(prev) if !prev.is_empty() => prev.clone(),
                _ => RenderOutput::Node(NodeRef::Text(TextNode::new(""))),
            };
            place(parent, &placeholder, previous);

            let slot = Rc::new(RefCell::new(placeholder.clone()));
            let context = context.clone();
            let parent = parent.clone();
            let slot_for_resolve = slot.clone();
            deferred.on_resolve(move |resolved| {
                // The position may be gone by the time the value arrives;
                // a destroyed context cancels the resolution render.
                if context.is_destroyed() {
                    return;
                }
                let prev = slot_for_resolve.borrow().clone();
                let output = render(&context, &parent, resolved, Some(&prev));
                *slot_for_resolve.borrow_mut() = output;
            });
            placeholder
        }

        // Ordered sequence: positional reconciliation by index, leftover
        // previous outputs removed up front.
        View::Sequence(children) => {
            let prev_items = previous.map(|p| p.items()).unwrap_or_default();
            for extra in prev_items.iter().skip(children.len()) {
                discard(parent, extra);
            }
            let mut outputs = Vec::with_capacity(children.len());
            for (index, child) in children.into_iter().enumerate() {
                outputs.push(render(context, parent, child, prev_items.get(index)));
            }
            RenderOutput::Many(outputs)
        }

        // Already-materialized output passes through unchanged.
        View::Node(node) => {
            let output = RenderOutput::Node(node);
            place(parent, &output, previous);
            output
        }

        // Custom rendering logic: invoked once with a render callback bound
        // to this position; its result is returned verbatim.
        View::Renderer(renderer) => {
            let render_fn = bind_render_fn(context, parent, previous.cloned());
            renderer.run(render_fn, context.clone(), parent.clone())
        }

        // Reactive binding: the effect's first run renders the current
        // value; every later run re-renders at the same position, replacing
        // the prior output. The stop handle is the unsubscribe, owned by the
        // current context.
        View::Dynamic(getter) => {
            let slot = Rc::new(RefCell::new(
                previous.cloned().unwrap_or(RenderOutput::None),
            ));
            let effect_context = context.clone();
            let parent = parent.clone();
            let slot_for_effect = slot.clone();
            let stop = effect(move || {
                let view = getter();
                let prev = slot_for_effect.borrow().clone();
                let output = render(&effect_context, &parent, view, Some(&prev));
                *slot_for_effect.borrow_mut() = output;
            });
            context.on_cleanup(stop);
            let output = slot.borrow().clone();
            output
        }

        View::Empty => RenderOutput::None,

        // Primitive text: update a previous text node in place, otherwise
        // create and place a new one.
        View::Text(text) => {
            if let Some(RenderOutput::Node(NodeRef::Text(node))) = previous {
                if node.data() != text {
                    node.set_data(&text);
                }
                return RenderOutput::Node(NodeRef::Text(node.clone()));
            }
            let output = RenderOutput::Node(NodeRef::Text(TextNode::new(&text)));
            place(parent, &output, previous);
            output
        }

        // Fragment: children rendered positionally under the current
        // context, no element of their own.
        View::Fragment(fragment) => {
            let Fragment { children, node_ref } = fragment;
            let prev_items = previous.map(|p| p.items()).unwrap_or_default();
            for extra in prev_items.iter().skip(children.len()) {
                discard(parent, extra);
            }
            let mut outputs = Vec::with_capacity(children.len());
            for (index, child) in children.into_iter().enumerate() {
                outputs.push(render(context, parent, child, prev_items.get(index)));
            }
            let output = RenderOutput::Many(outputs);
            if let Some(node_ref) = &node_ref {
                node_ref.assign(&output);
            }
            output
        }

        // Function component: fresh child context, and when the result is a
        // single materialized element the context is linked to it so a later
        // replacement can find and destroy it.
        View::Component(component) => {
            let child_context = context.child();
            let result = (component.call)();
            let output = render(&child_context, parent, result, previous);
            if let Some(NodeRef::Element(element)) = output.single() {
                link_node_context(&element, &child_context);
            }
            if let Some(node_ref) = &component.node_ref {
                node_ref.assign(&output);
            }
            output
        }

        // Plain element: new host element, new child context linked to it,
        // attributes and children applied under that context, then placed.
        View::Element(description) => {
            let ElementView {
                tag,
                attrs,
                styles,
                listeners,
                children,
                node_ref,
            } = description;

            let element = Element::new(&tag);
            let child_context = context.child();
            link_node_context(&element, &child_context);

            for (name, value) in attrs {
                apply_attribute(&element, &child_context, name, value);
            }
            for (property, value) in styles {
                element.set_style(&property, &value);
            }
            for (event, handler) in listeners {
                element.add_event_listener(&event, handler);
            }
            for child in children {
                render(&child_context, &element, child, None);
            }

            let output = RenderOutput::Node(NodeRef::Element(element));
            place(parent, &output, previous);
            if let Some(node_ref) = &node_ref {
                node_ref.assign(&output);
            }
            output
        }
    }
}

/// Apply one attribute. Static values are set verbatim; signal and getter
/// values are applied now and re-applied by an effect owned by the element's
/// context.
fn apply_attribute(
    element: &Rc<Element>,
    context: &Rc<RenderContext>,
    name: String,
    value: AttrValue,
) {
    match value {
        AttrValue::Static(value) => element.set_attribute(&name, &value),
        AttrValue::Signal(signal) => {
            let element = element.clone();
            let stop = effect(move || element.set_attribute(&name, &signal.get()));
            context.on_cleanup(stop);
        }
        AttrValue::Getter(getter) => {
            let element = element.clone();
            let stop = effect(move || element.set_attribute(&name, &getter()));
            context.on_cleanup(stop);
        }
    }
}

/// Build the render callback handed to renderer initializers, closed over
/// the current context, parent, and previous output.
fn bind_render_fn(
    context: &Rc<RenderContext>,
    parent: &Rc<Element>,
    previous: Option<RenderOutput>,
) -> RenderFn {
    let context = context.clone();
    let parent = parent.clone();
    Rc::new(move |view, override_previous| match override_previous {
        Some(prev) => render(&context, &parent, view, Some(prev)),
        None => render(&context, &parent, view, previous.as_ref()),
    })
}

/// Place new output against previous output, positionally. Identical output
/// is left untouched entirely.
pub(crate) fn place(parent: &Rc<Element>, output: &RenderOutput, previous: Option<&RenderOutput>) {
    if previous.is_some_and(|prev| prev == output) {
        return;
    }
    let new_nodes = output.nodes();
    let prev_nodes = previous.map(|p| p.nodes()).unwrap_or_default();
    for (index, node) in new_nodes.iter().enumerate() {
        match prev_nodes.get(index) {
            Some(prev_node) if prev_node.ptr_eq(node) => {}
            Some(prev_node) => {
                destroy_node_context(prev_node);
                parent.replace_child(node, prev_node);
            }
            None => parent.append_child(node),
        }
    }
    for prev_node in prev_nodes.iter().skip(new_nodes.len()) {
        destroy_node_context(prev_node);
        parent.remove_child(prev_node);
    }
}

/// Destroy the context owning `node`, when the side mapping knows one.
pub(crate) fn destroy_node_context(node: &NodeRef) {
    if let Some(element) = node.as_element() {
        if let Some(context) = context_for_node(element) {
            context.destroy();
        }
    }
}

/// Tear a rendered output out of the tree: contexts destroyed, nodes removed.
pub(crate) fn discard(parent: &Rc<Element>, output: &RenderOutput) {
    for node in output.nodes() {
        destroy_node_context(&node);
        parent.remove_child(&node);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Event, mutations};
    use crate::view::{OutputRef, component, el};
    use spark_signals::signal;
    use std::cell::Cell;

    fn root() -> (Rc<RenderContext>, Rc<Element>) {
        (RenderContext::root(), Element::new("root"))
    }

    #[test]
    fn test_text_renders_and_updates_in_place() {
        let (context, parent) = root();
        let first = render(&context, &parent, "hello".into(), None);
        assert_eq!(parent.outer_html(), "<root>hello</root>");

        let before = mutations();
        let second = render(&context, &parent, "world".into(), Some(&first));
        assert_eq!(parent.outer_html(), "<root>world</root>");
        assert_eq!(mutations(), before, "text updates are not structural");
        assert_eq!(first, second, "the text node is reused");
    }

    #[test]
    fn test_element_renders_attributes_styles_children() {
        let (context, parent) = root();
        let view = el("button")
            .attr("x-kind", "primary")
            .style("color", "red")
            .child("press")
            .into_view();
        render(&context, &parent, view, None);
        assert_eq!(
            parent.outer_html(),
            "<root><button x-kind=\"primary\" style=\"color: red\">press</button></root>"
        );
    }

    #[test]
    fn test_element_listener_receives_dispatch() {
        let (context, parent) = root();
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = clicks.clone();
        let view = el("button")
            .on("click", move |_| clicks_clone.set(clicks_clone.get() + 1))
            .into_view();
        let output = render(&context, &parent, view, None);

        let element = output.single().unwrap();
        element
            .as_element()
            .unwrap()
            .dispatch(&Event::new("click", ""));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_reactive_attribute_tracks_signal() {
        let (context, parent) = root();
        let kind = signal("a".to_string());
        let view = el("div").attr("x-kind", kind.clone()).into_view();
        let output = render(&context, &parent, view, None);
        let element = output.single().unwrap();

        assert_eq!(element.as_element().unwrap().attribute("x-kind").unwrap(), "a");
        kind.set("b".to_string());
        assert_eq!(
            element.as_element().unwrap().attribute("x-kind").unwrap(),
            "b",
            "signal write re-applies the attribute on the same element"
        );
    }

    #[test]
    fn test_sequence_removes_extra_previous_outputs() {
        let (context, parent) = root();
        let three: View = vec!["a".into(), "b".into(), "c".into()].into();
        let first = render(&context, &parent, three, None);
        assert_eq!(parent.outer_html(), "<root>abc</root>");

        let two: View = vec!["a".into(), "b".into()].into();
        render(&context, &parent, two, Some(&first));
        assert_eq!(parent.outer_html(), "<root>ab</root>");
        assert_eq!(parent.child_count(), 2);
    }

    #[test]
    fn test_dynamic_rerenders_on_signal_write() {
        let (context, parent) = root();
        let value = signal("one".to_string());
        render(&context, &parent, value.clone().into(), None);
        assert_eq!(parent.outer_html(), "<root>one</root>");

        value.set("two".to_string());
        assert_eq!(parent.outer_html(), "<root>two</root>");
    }

    #[test]
    fn test_dynamic_subscription_dies_with_context() {
        let (context, parent) = root();
        let value = signal("one".to_string());
        render(&context, &parent, value.clone().into(), None);

        context.destroy();
        value.set("two".to_string());
        assert_eq!(
            parent.outer_html(),
            "<root>one</root>",
            "a destroyed context must not keep re-rendering"
        );
    }

    #[test]
    fn test_replacing_element_destroys_its_context() {
        let (context, parent) = root();
        let label = signal("first".to_string());
        let label_for_view = label.clone();
        let view = component(move || el("p").child(View::from(label_for_view.clone())).into_view());
        let first = render(&context, &parent, view, None);
        assert_eq!(parent.outer_html(), "<root><p>first</p></root>");

        render(&context, &parent, el("hr").into_view(), Some(&first));
        assert_eq!(parent.outer_html(), "<root><hr></hr></root>");

        // The replaced component's binding must be dead.
        label.set("second".to_string());
        assert_eq!(parent.outer_html(), "<root><hr></hr></root>");
    }

    #[test]
    fn test_materialized_node_passes_through_without_mutation() {
        let (context, parent) = root();
        let node: NodeRef = TextNode::new("x").into();
        let first = render(&context, &parent, node.clone().into(), None);

        let before = mutations();
        let second = render(&context, &parent, node.into(), Some(&first));
        assert_eq!(mutations(), before, "identical output places nothing");
        assert_eq!(first, second);
    }

    #[test]
    fn test_fragment_assigns_output_ref() {
        let (context, parent) = root();
        let seen = Rc::new(Cell::new(0usize));
        let seen_clone = seen.clone();
        let view = crate::view::fragment_with_ref(
            vec!["a".into(), "b".into()],
            OutputRef::callback(move |output| seen_clone.set(output.nodes().len())),
        );
        render(&context, &parent, view, None);
        assert_eq!(seen.get(), 2, "ref sees the fragment's rendered nodes");
    }

    #[test]
    fn test_deferred_places_placeholder_then_resolved_content() {
        let (context, parent) = root();
        let deferred: crate::deferred::Deferred<View> = crate::deferred::Deferred::new();
        render(
            &context,
            &parent,
            View::Sequence(vec!["before".into(), deferred.clone().into(), "after".into()]),
            None,
        );
        assert_eq!(parent.outer_html(), "<root>beforeafter</root>");
        assert_eq!(parent.child_count(), 3, "placeholder holds the position");

        deferred.resolve(el("b").child("late").into_view());
        assert_eq!(
            parent.outer_html(),
            "<root>before<b>late</b>after</root>",
            "resolution replaces the placeholder in place"
        );
    }

    #[test]
    fn test_deferred_resolution_after_destroy_is_cancelled() {
        let (context, parent) = root();
        let deferred: crate::deferred::Deferred<View> = crate::deferred::Deferred::new();
        render(&context, &parent, deferred.clone().into(), None);

        context.destroy();
        deferred.resolve("too late".into());
        assert_eq!(parent.outer_html(), "<root></root>");
    }
}
