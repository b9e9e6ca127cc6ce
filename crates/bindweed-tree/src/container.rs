#![forbid(unsafe_code)]

//! A concrete tree owner: child registration and context fan-out.
//!
//! The node engine never discovers or iterates children itself; an owner
//! wires `parent` and delivers [`BindableNode::set_inherited_context`] to
//! each child whenever a node's effective context changes.
//! [`BindableContainer`] is that owner for the common case: it hangs off the
//! node's post-change hook, so children are notified after the node's own
//! bindings have re-applied — and, deliberately, *not* when an inherited
//! transform binding deferred the generic pass.
//!
//! # Invariants
//!
//! 1. Children receive `set_inherited_context(effective, false)` in
//!    registration order.
//! 2. `add_child` wires the child's parent reference and immediately seeds
//!    its inherited context from the container's current effective context.
//! 3. `dispose` tears children down before the container's own node.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::node::BindableNode;

/// A bindable node that owns children and propagates context to them.
pub struct BindableContainer<C> {
    node: BindableNode<C>,
    children: Rc<RefCell<Vec<BindableNode<C>>>>,
}

impl<C: Clone + PartialEq + 'static> Default for BindableContainer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for BindableContainer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindableContainer")
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

impl<C: Clone + PartialEq + 'static> BindableContainer<C> {
    /// Create a container with no children.
    #[must_use]
    pub fn new() -> Self {
        let node = BindableNode::new();
        let children: Rc<RefCell<Vec<BindableNode<C>>>> = Rc::new(RefCell::new(Vec::new()));

        let kids = Rc::clone(&children);
        node.set_context_changed_hook(move |node| {
            let effective = node.effective_context();
            let snapshot: Vec<BindableNode<C>> = kids.borrow().iter().cloned().collect();
            trace!(target: "bindweed::container", children = snapshot.len(), "propagating context");
            for child in snapshot {
                child.set_inherited_context(effective.clone(), false);
            }
        });

        Self { node, children }
    }

    /// The container's own node.
    #[must_use]
    pub fn node(&self) -> &BindableNode<C> {
        &self.node
    }

    /// Register a child: wires its parent reference to this container's node
    /// and seeds its inherited context from the current effective context.
    pub fn add_child(&self, child: &BindableNode<C>) {
        child.set_parent(&self.node);
        self.children.borrow_mut().push(child.clone());
        child.set_inherited_context(self.node.effective_context(), false);
    }

    /// Number of registered children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// Tear down children first, then the container's own node, and drop the
    /// child handles.
    pub fn dispose(&self) {
        let snapshot: Vec<BindableNode<C>> = self.children.borrow().iter().cloned().collect();
        for child in snapshot {
            child.dispose();
        }
        self.children.borrow_mut().clear();
        self.node.dispose();
    }
}
