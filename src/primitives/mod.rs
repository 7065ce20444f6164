//! Built-in control flow primitives.
//!
//! - [`map`] - keyed list rendering with output reuse
//! - [`when`] - conditional branch selection
//! - [`suspense`] - fallback for deferred content
//!
//! All are ordinary [`crate::renderer::Renderer`] instances; user code can
//! build its own primitives the same way.

mod control_flow;

pub use control_flow::{map, suspense, when};
