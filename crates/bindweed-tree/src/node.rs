#![forbid(unsafe_code)]

//! Bindable tree nodes with inheritable binding contexts.
//!
//! A [`BindableNode`] carries a context value, declares named bindings
//! against paths inside that context, and re-evaluates them when context
//! changes — whether set locally or inherited from an ancestor through
//! [`BindableNode::set_inherited_context`]. Handles are cheap clones over
//! `Rc<RefCell<..>>` shared state; [`WeakNode`] is the non-owning form used
//! for parent references and binding targets.
//!
//! # Invariants
//!
//! 1. `effective_context()` is the inherited context when one is present,
//!    otherwise the local one.
//! 2. Assigning a context equal to the current local value is a no-op unless
//!    the one-shot force flag is set; the flag always resets on use.
//! 3. Setting the local context clears any inherited context: a directly-set
//!    value wins over inheritance until an ancestor propagates again.
//! 4. For one context change, the changing hook completes before any binding
//!    applies, and non-context bindings apply in declaration order.
//! 5. The binding named `"context"` is never applied by the generic changed
//!    pass; inherited-context propagation drives it (and, when its path is
//!    not `"."`, skips the generic pass entirely in the same call —
//!    downstream re-application happens only when the transform writes a
//!    differing context back into the node).
//! 6. After [`BindableNode::dispose`], every declared binding has been
//!    disposed and `target`/`context`/`inherited_context`/`parent` are
//!    cleared.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Binding `apply` panics | malformed path/config | propagates to caller |
//! | Binding re-enters its own lifecycle | expression bug | `RefCell` panic |
//! | Use after `dispose` | collaborator bug | undefined, unguarded |
//! | Missing binding for a name | nothing declared | silently skipped |

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use bindweed_core::binding::{
    BindingHandle, BindingMode, BindingSet, CONTEXT_PROPERTY, ENABLED_PROPERTY, IDENTITY_PATH,
    TAG_PROPERTY,
};
use bindweed_core::notify::{ChangedListeners, Subscription};

type Hook<C> = Rc<dyn Fn(&BindableNode<C>)>;

struct Inner<C> {
    parent: Option<WeakNode<C>>,
    context: Option<C>,
    inherited_context: Option<C>,
    force_context_changed: bool,
    enabled: bool,
    tag: String,
    target: Option<Rc<dyn Any>>,
    target_name: Option<String>,
    bindings: BindingSet<C>,
    listeners: ChangedListeners<BindableNode<C>>,
    context_changing: Option<Hook<C>>,
    context_changed: Option<Hook<C>>,
}

/// A tree node with a bindable context and declared property bindings.
///
/// Cloning yields another handle to the same node. Context values are
/// compared by `PartialEq`; all equality gates in this module are value
/// equality, per the propagation contract.
pub struct BindableNode<C> {
    inner: Rc<RefCell<Inner<C>>>,
}

impl<C> Clone for BindableNode<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning handle to a [`BindableNode`].
///
/// Used for the parent back-reference and as the type-erased binding target,
/// so neither relation ever extends a node's lifetime.
pub struct WeakNode<C> {
    inner: Weak<RefCell<Inner<C>>>,
}

impl<C> Clone for WeakNode<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<C> WeakNode<C> {
    /// Upgrade to a strong handle, if the node is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<BindableNode<C>> {
        self.inner.upgrade().map(|inner| BindableNode { inner })
    }
}

impl<C> std::fmt::Debug for WeakNode<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakNode")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<C> Default for BindableNode<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for BindableNode<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("BindableNode")
            .field("has_context", &inner.context.is_some())
            .field("has_inherited", &inner.inherited_context.is_some())
            .field("bindings", &inner.bindings.len())
            .finish()
    }
}

impl<C> BindableNode<C> {
    /// Create a node with no context, no parent, and no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                parent: None,
                context: None,
                inherited_context: None,
                force_context_changed: false,
                enabled: true,
                tag: String::new(),
                target: None,
                target_name: None,
                bindings: BindingSet::new(),
                listeners: ChangedListeners::new(),
                context_changing: None,
                context_changed: None,
            })),
        }
    }

    /// Downgrade to a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakNode<C> {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The parent node, if one was wired and is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<BindableNode<C>> {
        let weak = self.inner.borrow().parent.clone();
        weak.and_then(|weak| weak.upgrade())
    }

    /// Wire the parent back-reference. Called once by the tree owner; the
    /// relation is non-owning and never extends the parent's lifetime.
    pub fn set_parent(&self, parent: &BindableNode<C>) {
        self.inner.borrow_mut().parent = Some(parent.downgrade());
    }

    /// Register a `PropertyChanged` listener, fired synchronously with
    /// `(sender, property_name)` after every successful mutation.
    #[must_use = "dropping the Subscription unsubscribes the listener"]
    pub fn subscribe(&self, listener: impl Fn(&BindableNode<C>, &str) + 'static) -> Subscription
    where
        C: 'static,
    {
        let listeners = self.inner.borrow().listeners.clone();
        listeners.subscribe(listener)
    }

    /// Install the pre-change hook, run before any binding work on every
    /// context change. No default behavior.
    pub fn set_context_changing_hook(&self, hook: impl Fn(&BindableNode<C>) + 'static) {
        self.inner.borrow_mut().context_changing = Some(Rc::new(hook));
    }

    /// Install the post-change hook, run after the generic changed pass has
    /// re-applied the non-context bindings. Tree owners use this to push the
    /// new effective context down to children.
    pub fn set_context_changed_hook(&self, hook: impl Fn(&BindableNode<C>) + 'static) {
        self.inner.borrow_mut().context_changed = Some(Rc::new(hook));
    }

    /// The opaque target attachment, if any.
    #[must_use]
    pub fn target(&self) -> Option<Rc<dyn Any>> {
        self.inner.borrow().target.clone()
    }

    /// Attach or clear the opaque target object.
    pub fn set_target(&self, target: Option<Rc<dyn Any>>) {
        self.inner.borrow_mut().target = target;
    }

    /// Downcast the target attachment to a concrete type.
    #[must_use]
    pub fn target_as<T: 'static>(&self) -> Option<Rc<T>> {
        self.target().and_then(|target| target.downcast::<T>().ok())
    }

    /// Name of the bound target object, if any.
    #[must_use]
    pub fn target_name(&self) -> Option<String> {
        self.inner.borrow().target_name.clone()
    }

    /// Set the bound target object's name.
    pub fn set_target_name(&self, name: Option<String>) {
        self.inner.borrow_mut().target_name = name;
    }

    /// Current value of the one-shot force flag.
    #[must_use]
    pub fn force_context_changed(&self) -> bool {
        self.inner.borrow().force_context_changed
    }

    /// Arm (or disarm) the one-shot force flag. While armed, the next
    /// context assignment propagates even if the value is unchanged.
    pub fn set_force_context_changed(&self, force: bool) {
        self.inner.borrow_mut().force_context_changed = force;
    }

    fn run_context_changing_hook(&self) {
        let hook = self.inner.borrow().context_changing.clone();
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn run_context_changed_hook(&self) {
        let hook = self.inner.borrow().context_changed.clone();
        if let Some(hook) = hook {
            hook(self);
        }
    }

    fn fire_property_changed(&self, property_name: &str) {
        let listeners = self.inner.borrow().listeners.clone();
        listeners.notify(self, property_name);
    }
}

impl<C: Clone + PartialEq + 'static> BindableNode<C> {
    /// The locally set context, ignoring inheritance.
    #[must_use]
    pub fn context(&self) -> Option<C> {
        self.inner.borrow().context.clone()
    }

    /// The inherited context supplied by an ancestor, if any.
    #[must_use]
    pub fn inherited_context(&self) -> Option<C> {
        self.inner.borrow().inherited_context.clone()
    }

    /// The context bindings evaluate against: inherited when present,
    /// otherwise local.
    #[must_use]
    pub fn effective_context(&self) -> Option<C> {
        let inner = self.inner.borrow();
        inner
            .inherited_context
            .clone()
            .or_else(|| inner.context.clone())
    }

    /// Declare the node's bindings. Done once, at construction or load time;
    /// a fresh declaration replaces the whole set.
    pub fn declare_bindings(&self, bindings: Vec<BindingHandle<C>>) {
        self.inner.borrow_mut().bindings.declare(bindings);
    }

    /// Resolve a declared binding by property name. Absence means "nothing
    /// to do", not an error.
    #[must_use]
    pub fn get_binding(&self, property_name: &str) -> Option<BindingHandle<C>> {
        self.inner.borrow_mut().bindings.get(property_name)
    }

    /// Assign the local context.
    ///
    /// No-op unless `value` differs from the current local context or the
    /// one-shot force flag is armed. On proceeding: the flag resets, any
    /// inherited context is cleared, the changing hook runs, the value is
    /// assigned (firing `"context"` changed only if it actually differs),
    /// and the generic changed pass re-applies the non-context bindings.
    pub fn set_context(&self, value: Option<C>) {
        let proceed = {
            let inner = self.inner.borrow();
            inner.context != value || inner.force_context_changed
        };
        if !proceed {
            return;
        }
        trace!(target: "bindweed::node", "set_context: proceeding");
        {
            let mut inner = self.inner.borrow_mut();
            inner.force_context_changed = false;
            inner.inherited_context = None;
        }
        self.run_context_changing_hook();
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.context != value {
                inner.context = value;
                true
            } else {
                false
            }
        };
        if changed {
            self.fire_property_changed(CONTEXT_PROPERTY);
        }
        self.on_binding_context_changed();
    }

    /// Deliver an ancestor's effective context. Called by the tree owner on
    /// a child, never by the node on itself.
    ///
    /// No-op unless `value` differs from the current inherited context or
    /// `force` is true. A declared `"context"` binding with a non-identity
    /// path is unapplied, retargeted at this node with the new effective
    /// context, and re-applied with `is_initial = true`; in that case the
    /// generic changed pass is *not* run here — the transform is expected to
    /// write its derived value back through [`BindableNode::set_context`],
    /// which triggers its own downstream pass. Otherwise the generic pass
    /// runs directly.
    pub fn set_inherited_context(&self, value: Option<C>, force: bool) {
        let proceed = {
            let inner = self.inner.borrow();
            inner.inherited_context != value || force
        };
        if !proceed {
            return;
        }
        self.inner.borrow_mut().inherited_context = value;
        self.run_context_changing_hook();

        let transform = self
            .get_binding(CONTEXT_PROPERTY)
            .filter(|binding| binding.borrow().path() != IDENTITY_PATH);
        match transform {
            Some(binding) => {
                trace!(target: "bindweed::node", "set_inherited_context: transform branch");
                let effective = self.effective_context();
                let target: Rc<dyn Any> = Rc::new(self.downgrade());
                {
                    let mut binding = binding.borrow_mut();
                    binding.unapply();
                    binding.set_target(Some(target));
                    binding.set_context(effective);
                }
                binding.borrow_mut().apply(true);
            }
            None => {
                trace!(target: "bindweed::node", "set_inherited_context: generic pass");
                self.on_binding_context_changed();
            }
        }
    }

    /// The generic changed pass: retarget every non-context binding at this
    /// node with the current effective context and apply it, in declaration
    /// order, then run the post-change hook.
    fn on_binding_context_changed(&self) {
        let effective = self.effective_context();
        let entries = self.inner.borrow().bindings.iter_named();
        for (name, binding) in entries {
            // The context binding is driven by inherited propagation, not here.
            if name == CONTEXT_PROPERTY {
                continue;
            }
            let target: Rc<dyn Any> = Rc::new(self.downgrade());
            {
                let mut binding = binding.borrow_mut();
                binding.set_target(Some(target));
                binding.set_context(effective.clone());
            }
            binding.borrow_mut().apply(false);
        }
        self.run_context_changed_hook();
    }

    /// Equality-guarded property assignment: compare, assign on change, fire
    /// `PropertyChanged` with `property_name`. Returns whether the value
    /// changed. Underlies every simple property setter.
    pub fn set_property<T: PartialEq>(
        &self,
        storage: &mut T,
        value: T,
        property_name: &str,
    ) -> bool {
        if *storage == value {
            return false;
        }
        *storage = value;
        self.fire_property_changed(property_name);
        true
    }

    /// Report a local property change coming from the target side. If a
    /// two-way binding is declared for `property_name`, it is applied
    /// (pushing the new value into the bound context) *before* the generic
    /// changed event fires. Bindings in any other mode are left alone.
    pub fn notify_property_changed_and_apply(&self, property_name: &str) {
        if let Some(binding) = self.get_binding(property_name) {
            let two_way = binding.borrow().mode() == BindingMode::TwoWay;
            if two_way {
                binding.borrow_mut().apply(false);
            }
        }
        self.fire_property_changed(property_name);
    }

    /// Built-in `enabled` property.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.inner.borrow().enabled
    }

    /// Set `enabled`, firing `PropertyChanged("enabled")` on change.
    pub fn set_enabled(&self, value: bool) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.enabled != value {
                inner.enabled = value;
                true
            } else {
                false
            }
        };
        if changed {
            self.fire_property_changed(ENABLED_PROPERTY);
        }
    }

    /// Built-in `tag` property.
    #[must_use]
    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    /// Set `tag`, firing `PropertyChanged("tag")` on change.
    pub fn set_tag(&self, value: impl Into<String>) {
        let value = value.into();
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.tag != value {
                inner.tag = value;
                true
            } else {
                false
            }
        };
        if changed {
            self.fire_property_changed(TAG_PROPERTY);
        }
    }

    /// Number of declared bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.borrow().bindings.len()
    }

    /// Tear the node down: dispose every declared binding, clear the set,
    /// and null target, context, inherited context, and parent. Called
    /// exactly once per node lifetime; any other call after this is
    /// undefined and unguarded.
    pub fn dispose(&self) {
        trace!(target: "bindweed::node", "dispose");
        let handles = self.inner.borrow().bindings.iter_handles();
        for handle in handles {
            handle.borrow_mut().dispose();
        }
        let mut inner = self.inner.borrow_mut();
        inner.bindings.clear();
        inner.target = None;
        inner.context = None;
        inner.inherited_context = None;
        inner.parent = None;
    }
}
