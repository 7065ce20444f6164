//! # spark-dom
//!
//! Fine-grained reactive DOM renderer for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! fine-grained reactivity.
//!
//! ## Architecture
//!
//! spark-dom renders declarative [`View`] descriptions into a host node tree
//! with a recursive tree-walker, no virtual DOM. Reactive values are bound
//! where they are used: each dynamic child, signal attribute, or control flow
//! primitive owns one effect, so a signal write touches exactly the nodes
//! that read it.
//!
//! ```text
//! View description → render() walk → host nodes + live bindings
//!                       │
//!                       └─ RenderContext tree (one scope per subtree)
//! ```
//!
//! Every component and element subtree gets a [`RenderContext`]; destroying a
//! context stops every subscription its subtree created. Keyed lists reuse
//! rendered output across passes through per-key [`engine::RenderCache`]s.
//!
//! ## Modules
//!
//! - [`dom`] - host node tree (elements, text nodes, events)
//! - [`view`] - tree descriptions and render output
//! - [`engine`] - contexts, caches, and the tree-walker
//! - [`renderer`] - custom rendering logic units
//! - [`primitives`] - `map`, `when`, `suspense`
//! - [`deferred`] - asynchronously resolved values
//! - [`pipeline`] - mounting roots
//!
//! ## Example
//!
//! ```ignore
//! use spark_dom::{create_root, el, map, Element};
//! use spark_signals::signal;
//!
//! let todos = signal(vec!["learn".to_string(), "build".to_string()]);
//!
//! let container = Element::new("body");
//! let root = create_root(container.clone());
//! root.render(
//!     el("ul")
//!         .child(map(
//!             todos.clone(),
//!             |todo, _| el("li").child(todo.as_str()).into_view(),
//!             |todo| todo.clone(),
//!         ))
//!         .into_view(),
//! );
//!
//! todos.set(vec!["build".to_string(), "learn".to_string()]); // moves, no re-render
//! ```

pub mod deferred;
pub mod dom;
pub mod engine;
pub mod pipeline;
pub mod primitives;
pub mod renderer;
pub mod view;

// Re-export commonly used items
pub use deferred::Deferred;

pub use dom::{Element, Event, EventHandler, NodeRef, TextNode};

pub use engine::{Cleanup, RenderContext, render};

pub use renderer::{RenderFn, Renderer};

pub use view::{
    AttrValue, Component, ElementView, Fragment, OutputRef, RenderOutput, View, component,
    component_with_ref, dynamic, el, fragment, fragment_with_ref,
};

pub use pipeline::{Root, create_root};

pub use primitives::{map, suspense, when};
