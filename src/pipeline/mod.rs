//! Mounting pipeline - the public entry point for whole trees.

pub mod mount;

pub use mount::{Root, create_root};
