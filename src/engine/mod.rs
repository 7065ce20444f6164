//! Rendering engine - contexts, caches, and the tree-walker.
//!
//! The engine turns declarative [`crate::view::View`] descriptions into live
//! host nodes and keeps them live:
//! - `context`: per-subtree lifecycle scopes and the element-to-context side
//!   mapping
//! - `cache`: per-key record of rendered output for keyed lists
//! - `render`: the recursive reconciler walking descriptions against
//!   previous output

pub mod cache;
pub mod context;
pub mod render;

pub use cache::RenderCache;
pub use context::{Cleanup, RenderContext, context_for_node, link_node_context};
pub use render::render;
