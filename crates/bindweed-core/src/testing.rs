#![forbid(unsafe_code)]

//! Test doubles for the binding contract.
//!
//! [`RecordingBinding`] is a scripted [`Binding`] implementation that records
//! every lifecycle call it receives. Handles share their call log with the
//! original, so a test can declare the double on a node and assert against
//! the log afterwards. Enabled for downstream crates via the `test-helpers`
//! feature.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::{Binding, BindingHandle, BindingMode, binding_handle};

type ApplyHook<C> = Rc<dyn Fn(bool, Option<Rc<dyn Any>>, Option<C>)>;

struct Log<C> {
    target: Option<Rc<dyn Any>>,
    context: Option<C>,
    applies: Vec<bool>,
    unapplies: usize,
    disposes: usize,
    apply_hook: Option<ApplyHook<C>>,
}

/// A [`Binding`] double that records `apply`/`unapply`/`dispose` calls and
/// the last installed target and context.
pub struct RecordingBinding<C> {
    property_name: String,
    path: String,
    mode: BindingMode,
    log: Rc<RefCell<Log<C>>>,
}

impl<C> Clone for RecordingBinding<C> {
    fn clone(&self) -> Self {
        Self {
            property_name: self.property_name.clone(),
            path: self.path.clone(),
            mode: self.mode,
            log: Rc::clone(&self.log),
        }
    }
}

impl<C: Clone + 'static> RecordingBinding<C> {
    /// Create a double for `property_name` bound to `path` with `mode`.
    #[must_use]
    pub fn new(property_name: &str, path: &str, mode: BindingMode) -> Self {
        Self {
            property_name: property_name.to_owned(),
            path: path.to_owned(),
            mode,
            log: Rc::new(RefCell::new(Log {
                target: None,
                context: None,
                applies: Vec::new(),
                unapplies: 0,
                disposes: 0,
                apply_hook: None,
            })),
        }
    }

    /// Script behavior on `apply`: the hook receives
    /// `(is_initial, installed_target, installed_context)`.
    #[must_use]
    pub fn with_apply_hook(
        self,
        hook: impl Fn(bool, Option<Rc<dyn Any>>, Option<C>) + 'static,
    ) -> Self {
        self.log.borrow_mut().apply_hook = Some(Rc::new(hook));
        self
    }

    /// Wrap a shared clone of this double into a [`BindingHandle`].
    #[must_use]
    pub fn handle(&self) -> BindingHandle<C> {
        binding_handle(self.clone())
    }

    /// The `is_initial` flag of every `apply` call, in order.
    #[must_use]
    pub fn applies(&self) -> Vec<bool> {
        self.log.borrow().applies.clone()
    }

    /// Number of `unapply` calls received.
    #[must_use]
    pub fn unapply_count(&self) -> usize {
        self.log.borrow().unapplies
    }

    /// Number of `dispose` calls received.
    #[must_use]
    pub fn dispose_count(&self) -> usize {
        self.log.borrow().disposes
    }

    /// The most recently installed context, if any.
    #[must_use]
    pub fn installed_context(&self) -> Option<C> {
        self.log.borrow().context.clone()
    }

    /// Whether a target is currently installed.
    #[must_use]
    pub fn has_target(&self) -> bool {
        self.log.borrow().target.is_some()
    }

    /// The currently installed type-erased target, if any.
    #[must_use]
    pub fn installed_target(&self) -> Option<Rc<dyn Any>> {
        self.log.borrow().target.clone()
    }
}

impl<C: Clone + 'static> Binding<C> for RecordingBinding<C> {
    fn property_name(&self) -> &str {
        &self.property_name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn mode(&self) -> BindingMode {
        self.mode
    }

    fn set_target(&mut self, target: Option<Rc<dyn Any>>) {
        self.log.borrow_mut().target = target;
    }

    fn set_context(&mut self, context: Option<C>) {
        self.log.borrow_mut().context = context;
    }

    fn apply(&mut self, is_initial: bool) {
        let hook = {
            let mut log = self.log.borrow_mut();
            log.applies.push(is_initial);
            log.apply_hook
                .as_ref()
                .map(|hook| (Rc::clone(hook), log.target.clone(), log.context.clone()))
        };
        if let Some((hook, target, context)) = hook {
            hook(is_initial, target, context);
        }
    }

    fn unapply(&mut self) {
        self.log.borrow_mut().unapplies += 1;
    }

    fn dispose(&mut self) {
        self.log.borrow_mut().disposes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_lifecycle_calls() {
        let double = RecordingBinding::<i32>::new("enabled", "a.b", BindingMode::TwoWay);
        let handle = double.handle();

        handle.borrow_mut().set_context(Some(7));
        handle.borrow_mut().apply(true);
        handle.borrow_mut().apply(false);
        handle.borrow_mut().unapply();
        handle.borrow_mut().dispose();

        assert_eq!(double.applies(), vec![true, false]);
        assert_eq!(double.unapply_count(), 1);
        assert_eq!(double.dispose_count(), 1);
        assert_eq!(double.installed_context(), Some(7));
    }

    #[test]
    fn apply_hook_sees_installed_state() {
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        let double = RecordingBinding::<String>::new("context", "user.name", BindingMode::OneWay)
            .with_apply_hook(move |is_initial, _target, context| {
                *s.borrow_mut() = Some((is_initial, context));
            });
        let handle = double.handle();

        handle.borrow_mut().set_context(Some("alice".to_owned()));
        handle.borrow_mut().apply(true);

        assert_eq!(
            seen.borrow().clone(),
            Some((true, Some("alice".to_owned())))
        );
    }
}
