#![forbid(unsafe_code)]

//! The bindweed node tree: inheritable binding contexts over an object tree.
//!
//! Each [`BindableNode`] holds a context value and a set of declared
//! bindings. Context set on a node re-applies its bindings; a tree owner
//! (such as [`BindableContainer`]) then pushes the effective context down to
//! children, which repeat the cycle. A locally set context always overrides
//! an inherited one until an ancestor propagates again.
//!
//! Everything here is single-threaded and synchronous: notifications,
//! binding application, and propagation all run in-line on the caller.

pub mod container;
pub mod node;

pub use container::BindableContainer;
pub use node::{BindableNode, WeakNode};
