#![forbid(unsafe_code)]

//! bindweed public facade.
//!
//! Re-exports the binding contract from `bindweed-core` and the node tree
//! from `bindweed-tree`. Most users only need [`prelude`].

pub use bindweed_core::binding::{
    Binding, BindingHandle, BindingMode, BindingSet, CONTEXT_PROPERTY, ENABLED_PROPERTY,
    IDENTITY_PATH, TAG_PROPERTY, binding_handle,
};
pub use bindweed_core::notify::{ChangedListeners, Subscription};
pub use bindweed_tree::{BindableContainer, BindableNode, WeakNode};

/// Everything most applications need, in one import.
pub mod prelude {
    pub use bindweed_core::binding::{Binding, BindingHandle, BindingMode, binding_handle};
    pub use bindweed_core::notify::Subscription;
    pub use bindweed_tree::{BindableContainer, BindableNode, WeakNode};
}
