//! Control flow primitives - keyed lists, conditionals, deferred boundaries.
//!
//! All three are [`Renderer`] instances: the tree-walker invokes them at
//! their position with a render callback bound to the surrounding parent and
//! context, and they own their reactivity from there.
//!
//! - [`map`] - keyed list rendering with per-key render caches
//! - [`when`] - conditional branch selection on a reactive condition
//! - [`suspense`] - fallback content for deferred children
//!
//! # Lifecycle
//!
//! Each primitive registers its effect's stop handle (and, for `map`, its
//! cache teardown) on the context it was rendered under, so destroying that
//! context tears the whole primitive down: no subscription outlives the
//! subtree that created it.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use spark_signals::{Signal, effect};

use crate::dom::Element;
use crate::engine::cache::RenderCache;
use crate::engine::render::destroy_node_context;
use crate::renderer::Renderer;
use crate::view::{RenderOutput, View};

/// Tear one cached output out of the tree: owning contexts destroyed via the
/// side mapping, nodes detached from their parents.
fn teardown_output(output: &RenderOutput) {
    for node in output.nodes() {
        destroy_node_context(&node);
        node.remove_from_parent();
    }
}

// =============================================================================
// map() - keyed list rendering
// =============================================================================

/// Render a list reactively, reusing each item's previous output by key.
///
/// On every change of `list`: a shared version counter is bumped, every
/// existing cache starts a pass at it, and each item in the new order either
/// takes its cached output (reuse, no re-render) or renders fresh into its
/// cache. Caches then end the pass and clean up unreferenced records
/// (destroying the owning contexts), keys with no live output are dropped,
/// and finally the parent's child order is reconciled against the new order,
/// moving only the nodes whose relative position actually changed.
///
/// The list assumes it is the only content of its parent element; give it an
/// enclosing element of its own.
///
/// An item whose key survives an update is *not* re-rendered, so when item
/// contents can change under a stable key, `render_item` should bind reactive
/// values rather than bake the data in.
///
/// Duplicate keys are reported and rendered through the same cache; keys
/// should be unique.
///
/// # Example
///
/// ```ignore
/// use spark_dom::{el, map};
/// use spark_signals::signal;
///
/// let todos = signal(vec!["write".to_string(), "ship".to_string()]);
/// let view = el("ul")
///     .child(map(
///         todos.clone(),
///         |todo, _index| el("li").child(todo.as_str()).into_view(),
///         |todo| todo.clone(),
///     ))
///     .into_view();
///
/// // Later: reordering moves the two <li> nodes without re-rendering them.
/// todos.set(vec!["ship".to_string(), "write".to_string()]);
/// ```
pub fn map<T, K, F, KF>(list: Signal<Vec<T>>, render_item: F, key_fn: KF) -> View
where
    T: Clone + PartialEq + 'static,
    K: Clone + Eq + Hash + Debug + 'static,
    F: Fn(&T, usize) -> View + 'static,
    KF: Fn(&T) -> K + 'static,
{
    Renderer::view(move |render_fn, context, parent| {
        let caches: Rc<RefCell<HashMap<K, RenderCache>>> = Rc::new(RefCell::new(HashMap::new()));
        let version = Cell::new(0u64);
        let current: Rc<RefCell<RenderOutput>> = Rc::new(RefCell::new(RenderOutput::None));

        let caches_for_effect = caches.clone();
        let current_for_effect = current.clone();
        let parent_for_effect = parent.clone();
        let stop = effect(move || {
            let items = list.get();
            let pass = version.get() + 1;
            version.set(pass);

            let mut caches = caches_for_effect.borrow_mut();
            for cache in caches.values_mut() {
                cache.start(pass);
            }

            let mut seen: HashSet<K> = HashSet::with_capacity(items.len());
            let mut outputs = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let key = key_fn(item);
                if !seen.insert(key.clone()) {
                    eprintln!(
                        "[spark-dom map()] duplicate key {:?}; keys should be unique",
                        key
                    );
                }
                let cache = caches.entry(key).or_insert_with(|| {
                    let mut cache = RenderCache::new();
                    cache.start(pass);
                    cache
                });
                let output = match cache.get() {
                    Some(output) => output,
                    None => {
                        let output = render_fn(render_item(item, index), Some(&RenderOutput::None));
                        cache.add(output.clone());
                        output
                    }
                };
                outputs.push(output);
            }

            caches.retain(|_, cache| {
                cache.end();
                cache.cleanup(&mut teardown_output)
            });

            reorder(&parent_for_effect, &outputs);
            *current_for_effect.borrow_mut() = RenderOutput::Many(outputs);
        });

        let caches_for_cleanup = caches.clone();
        context.on_cleanup(move || {
            stop();
            for (_, mut cache) in caches_for_cleanup.borrow_mut().drain() {
                cache.clear(&mut teardown_output);
            }
        });

        let output = current.borrow().clone();
        output
    })
}

/// Reconcile the live child order against the target order: walk a cursor
/// over the parent's children and move a node only when it is not already
/// the one under the cursor. Unchanged runs incur no mutation.
fn reorder(parent: &Rc<Element>, outputs: &[RenderOutput]) {
    let mut cursor = parent.first_child();
    for output in outputs {
        for node in output.nodes() {
            match cursor.clone() {
                None => parent.append_child(&node),
                Some(current) if !current.ptr_eq(&node) => parent.insert_before(&node, &current),
                Some(current) => cursor = parent.next_sibling(&current),
            }
        }
    }
}

// =============================================================================
// when() - conditional branch selection
// =============================================================================

/// Render one of two branches based on a reactive condition.
///
/// The condition runs inside an effect, so any reactive value it reads
/// re-evaluates it; the branches are re-rendered only when the boolean
/// actually flips, replacing the previous branch's output and destroying its
/// context. A branch re-entered later is rendered fresh, never resurrected
/// from the earlier visit.
///
/// Branches are lazy closures and may return any view, including a function
/// component.
///
/// Reactive values the branch's own output binds (dynamic children, signal
/// attributes) are tracked by their own effects, not by the condition
/// effect, so constructing a branch never retriggers selection.
pub fn when<C, TV, FV>(condition: C, if_true: TV, if_false: FV) -> View
where
    C: Fn() -> bool + 'static,
    TV: Fn() -> View + 'static,
    FV: Fn() -> View + 'static,
{
    Renderer::view(move |render_fn, context, _parent| {
        let last_result: Rc<Cell<Option<bool>>> = Rc::new(Cell::new(None));
        let last_output: Rc<RefCell<Option<RenderOutput>>> = Rc::new(RefCell::new(None));

        let last_result_for_effect = last_result.clone();
        let last_output_for_effect = last_output.clone();
        let stop = effect(move || {
            let result = condition();
            if last_result_for_effect.get() == Some(result) {
                return;
            }
            let first = last_result_for_effect.get().is_none();
            last_result_for_effect.set(Some(result));

            let branch = if result { if_true() } else { if_false() };
            let output = if first {
                // The initial render reconciles whatever the walker had at
                // this position.
                render_fn(branch, None)
            } else {
                let prev = last_output_for_effect.borrow().clone();
                render_fn(branch, prev.as_ref())
            };
            *last_output_for_effect.borrow_mut() = Some(output);
        });
        context.on_cleanup(stop);

        let output = last_output.borrow().clone().unwrap_or(RenderOutput::None);
        output
    })
}

// =============================================================================
// suspense() - deferred content boundary
// =============================================================================

/// Render `fallback` immediately as a placeholder for `children`.
///
/// The children are rendered against the fallback's output; when they are a
/// deferred value, the walker's deferred handling replaces the fallback in
/// place once the value resolves.
pub fn suspense(children: impl Into<View>, fallback: impl Into<View>) -> View {
    let children = children.into();
    let fallback = fallback.into();
    Renderer::view(move |render_fn, _context, _parent| {
        let placeholder = render_fn(fallback, None);
        render_fn(children, Some(&placeholder))
    })
}

// =============================================================================
// Tests
// =============================================================================
