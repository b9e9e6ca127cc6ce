#![forbid(unsafe_code)]

//! Core contracts for the bindweed data-binding engine.
//!
//! This crate defines the seams the node engine is built against:
//!
//! - [`Binding`]: the opaque property-to-path expression contract, with
//!   [`BindingMode`] and the reserved property-name constants.
//! - [`BindingSet`]: the ordered declaration list with lazy by-name lookup.
//! - [`ChangedListeners`] / [`Subscription`]: the synchronous
//!   `PropertyChanged` fan-out protocol.
//!
//! The binding expression language itself (path parsing, getter/setter
//! resolution) lives behind the [`Binding`] trait and is not part of this
//! crate.

pub mod binding;
pub mod notify;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use binding::{
    Binding, BindingHandle, BindingMode, BindingSet, CONTEXT_PROPERTY, ENABLED_PROPERTY,
    IDENTITY_PATH, TAG_PROPERTY, binding_handle,
};
pub use notify::{ChangedListeners, Subscription};
