#![forbid(unsafe_code)]

//! The binding contract and the declared-binding lookup set.
//!
//! A [`Binding`] connects one named property on a target object to a path
//! inside a context value. The engine treats the expression itself as opaque:
//! it installs a target and a context, then drives [`Binding::apply`] /
//! [`Binding::unapply`] / [`Binding::dispose`] at the right lifecycle points.
//! The only path the engine ever inspects is the literal identity path
//! [`IDENTITY_PATH`] on the reserved [`CONTEXT_PROPERTY`] binding.
//!
//! [`BindingSet`] holds the ordered declaration list and resolves bindings by
//! property name through a lazily built index.
//!
//! # Invariants
//!
//! 1. At most one binding per property name is resolvable: later declarations
//!    override earlier ones sharing a name.
//! 2. The name index is built at most once per declaration set; declaring a
//!    fresh set drops it.
//! 3. A missing binding is `None`, never an error.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

/// Reserved name of the context binding, driven by inherited-context
/// propagation instead of the generic changed pass.
pub const CONTEXT_PROPERTY: &str = "context";
/// Name of the built-in `enabled` property.
pub const ENABLED_PROPERTY: &str = "enabled";
/// Name of the built-in `tag` property.
pub const TAG_PROPERTY: &str = "tag";

/// The identity path: a context binding with this path is a straight
/// passthrough and takes the generic propagation pass.
pub const IDENTITY_PATH: &str = ".";

/// Direction of a binding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BindingMode {
    /// Context → property on every context change.
    OneWay,
    /// Context → property, and property → context on local change.
    TwoWay,
    /// Context → property once, on initial application only.
    OneTime,
    /// Property → context only.
    OneWayToSource,
}

impl std::fmt::Display for BindingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OneWay => "oneway",
            Self::TwoWay => "twoway",
            Self::OneTime => "onetime",
            Self::OneWayToSource => "onewaytosource",
        };
        f.write_str(s)
    }
}

/// One property-to-path connection, evaluated against a context of type `C`.
///
/// Implementations own their path parsing and getter/setter resolution; the
/// engine only installs `target`/`context` and drives the lifecycle calls
/// below. `target` is type-erased so an expression implementation can
/// downcast to whatever object kind it binds against; the engine always
/// installs a non-owning node handle there.
///
/// Failures inside `apply`/`unapply` are configuration errors and propagate
/// to the caller as panics; the engine does not catch them.
pub trait Binding<C> {
    /// Name of the bound property on the target.
    fn property_name(&self) -> &str;

    /// The path expression inside the context.
    fn path(&self) -> &str;

    /// Direction of this binding.
    fn mode(&self) -> BindingMode;

    /// Install or clear the target object.
    fn set_target(&mut self, target: Option<Rc<dyn Any>>);

    /// Install or clear the context value to evaluate against.
    fn set_context(&mut self, context: Option<C>);

    /// Evaluate the binding. `is_initial` marks the first application against
    /// a freshly inherited context (the context-binding branch); ordinary
    /// re-evaluation and two-way write-back pass `false`.
    fn apply(&mut self, is_initial: bool);

    /// Release the current application, detaching from the installed context.
    fn unapply(&mut self);

    /// Release internal subscriptions and handles. Called exactly once, from
    /// node teardown.
    fn dispose(&mut self);
}

/// Shared handle to a declared binding.
///
/// Bindings are held behind `Rc<RefCell<..>>` so the engine can release node
/// borrows before re-entering binding code (an `apply` may call back into the
/// node, e.g. a two-way write).
pub type BindingHandle<C> = Rc<RefCell<dyn Binding<C>>>;

/// Wrap a concrete binding into a [`BindingHandle`].
pub fn binding_handle<C, B: Binding<C> + 'static>(binding: B) -> BindingHandle<C> {
    Rc::new(RefCell::new(binding))
}

/// Ordered declaration list with lazy by-name lookup.
///
/// The list is declared once (construction/deserialization time) and treated
/// as immutable afterwards; [`BindingSet::declare`] replaces the whole set
/// and drops any built index. Property names are captured at declaration
/// time so iteration never needs to borrow a binding that is mid-`apply`.
pub struct BindingSet<C> {
    bindings: Vec<(String, BindingHandle<C>)>,
    index: Option<AHashMap<String, BindingHandle<C>>>,
}

impl<C> Default for BindingSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for BindingSet<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingSet")
            .field("len", &self.bindings.len())
            .field("indexed", &self.index.is_some())
            .finish()
    }
}

impl<C> BindingSet<C> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            index: None,
        }
    }

    /// Replace the declared list. Drops any previously built index.
    pub fn declare(&mut self, bindings: Vec<BindingHandle<C>>) {
        self.bindings = bindings
            .into_iter()
            .map(|binding| {
                let name = binding.borrow().property_name().to_owned();
                (name, binding)
            })
            .collect();
        self.index = None;
    }

    /// Resolve a binding by property name.
    ///
    /// Builds the index on first use, walking the declaration list in order
    /// so later entries override earlier ones sharing a name. Returns `None`
    /// when no binding is declared for `name`.
    pub fn get(&mut self, name: &str) -> Option<BindingHandle<C>> {
        let index = self.index.get_or_insert_with(|| {
            let mut map = AHashMap::with_capacity(self.bindings.len());
            for (key, binding) in &self.bindings {
                map.insert(key.clone(), Rc::clone(binding));
            }
            map
        });
        index.get(name).cloned()
    }

    /// Snapshot of the declared bindings, in declaration order.
    #[must_use]
    pub fn iter_handles(&self) -> Vec<BindingHandle<C>> {
        self.bindings
            .iter()
            .map(|(_, binding)| Rc::clone(binding))
            .collect()
    }

    /// Snapshot of `(property_name, binding)` pairs, in declaration order.
    ///
    /// Names come from the declaration-time capture, so callers can filter by
    /// name without borrowing a binding that may currently be applying.
    #[must_use]
    pub fn iter_named(&self) -> Vec<(String, BindingHandle<C>)> {
        self.bindings
            .iter()
            .map(|(name, binding)| (name.clone(), Rc::clone(binding)))
            .collect()
    }

    /// Number of declared bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no bindings are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Drop every declared binding and the index.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBinding;
    use proptest::prelude::*;

    fn set_of(names: &[&str]) -> (BindingSet<i32>, Vec<RecordingBinding<i32>>) {
        let doubles: Vec<RecordingBinding<i32>> = names
            .iter()
            .map(|name| RecordingBinding::new(name, "a.b", BindingMode::OneWay))
            .collect();
        let mut set = BindingSet::new();
        set.declare(doubles.iter().map(|d| d.handle()).collect());
        (set, doubles)
    }

    #[test]
    fn get_resolves_by_name() {
        let (mut set, _doubles) = set_of(&["enabled", "tag"]);
        assert!(set.get("enabled").is_some());
        assert!(set.get("tag").is_some());
    }

    #[test]
    fn missing_binding_is_none() {
        let (mut set, _doubles) = set_of(&["enabled"]);
        assert!(set.get("nope").is_none());
    }

    #[test]
    fn later_declaration_overrides_earlier() {
        let a = RecordingBinding::<i32>::new("x", "first", BindingMode::OneWay);
        let b = RecordingBinding::<i32>::new("x", "second", BindingMode::OneWay);
        let mut set = BindingSet::new();
        set.declare(vec![a.handle(), b.handle()]);

        let resolved = set.get("x").expect("declared");
        assert_eq!(resolved.borrow().path(), "second");
    }

    #[test]
    fn declare_drops_stale_index() {
        let (mut set, _doubles) = set_of(&["enabled"]);
        assert!(set.get("enabled").is_some());

        let fresh = RecordingBinding::<i32>::new("tag", ".", BindingMode::OneWay);
        set.declare(vec![fresh.handle()]);
        assert!(set.get("enabled").is_none());
        assert!(set.get("tag").is_some());
    }

    #[test]
    fn clear_empties_set() {
        let (mut set, _doubles) = set_of(&["enabled", "tag"]);
        set.clear();
        assert!(set.is_empty());
        assert!(set.get("enabled").is_none());
    }

    #[test]
    fn iter_handles_preserves_declaration_order() {
        let (set, _doubles) = set_of(&["c", "a", "b"]);
        let names: Vec<String> = set
            .iter_handles()
            .iter()
            .map(|h| h.borrow().property_name().to_owned())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    proptest! {
        #[test]
        fn last_declaration_wins_for_every_name(names in prop::collection::vec("[a-d]", 1..12)) {
            let doubles: Vec<RecordingBinding<i32>> = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    RecordingBinding::new(name, &format!("path{i}"), BindingMode::OneWay)
                })
                .collect();
            let mut set = BindingSet::new();
            set.declare(doubles.iter().map(|d| d.handle()).collect());

            for name in &names {
                let last = names.iter().rposition(|n| n == name).unwrap();
                let resolved = set.get(name).expect("name was declared");
                let resolved = resolved.borrow();
                prop_assert_eq!(resolved.path(), format!("path{}", last));
            }
        }
    }
}
