//! End-to-end context propagation through a two-level tree.

use bindweed_core::binding::BindingMode;
use bindweed_core::testing::RecordingBinding;
use bindweed_tree::{BindableContainer, BindableNode};

#[derive(Clone, Debug, PartialEq)]
struct Item {
    name: String,
}

fn item(name: &str) -> Item {
    Item { name: name.into() }
}

#[test]
fn root_to_child_propagation_with_manual_owner() {
    // Root R with a declared binding, child C with none of its own context.
    let root: BindableNode<Item> = BindableNode::new();
    let root_binding = RecordingBinding::new("tag", "item.name", BindingMode::OneWay);
    root.declare_bindings(vec![root_binding.handle()]);

    let child: BindableNode<Item> = BindableNode::new();
    child.set_parent(&root);
    let child_binding = RecordingBinding::new("enabled", "item.active", BindingMode::OneWay);
    child.declare_bindings(vec![child_binding.handle()]);

    root.set_context(Some(item("A")));
    assert_eq!(root_binding.applies().len(), 1);

    // Same value, no force: nothing anywhere.
    root.set_context(Some(item("A")));
    assert_eq!(root_binding.applies().len(), 1);
    assert!(child_binding.applies().is_empty());

    // New value: root bindings re-apply, then the owner walks children.
    root.set_context(Some(item("B")));
    assert_eq!(root_binding.applies().len(), 2);
    assert_eq!(root_binding.installed_context(), Some(item("B")));

    child.set_inherited_context(root.effective_context(), false);
    assert_eq!(child.effective_context(), Some(item("B")));
    assert_eq!(child_binding.applies(), vec![false]);
    assert_eq!(child_binding.installed_context(), Some(item("B")));
}

#[test]
fn container_owner_walks_children_automatically() {
    let root: BindableContainer<Item> = BindableContainer::new();
    let child: BindableNode<Item> = BindableNode::new();
    let child_binding = RecordingBinding::new("enabled", "item.active", BindingMode::OneWay);
    child.declare_bindings(vec![child_binding.handle()]);
    root.add_child(&child);

    root.node().set_context(Some(item("A")));
    assert_eq!(child_binding.applies().len(), 1);

    // Equality guard holds across the whole tree.
    root.node().set_context(Some(item("A")));
    assert_eq!(child_binding.applies().len(), 1);

    root.node().set_context(Some(item("B")));
    assert_eq!(child_binding.applies().len(), 2);
    assert_eq!(child.effective_context(), Some(item("B")));
}

#[test]
fn force_flag_pushes_an_unchanged_context_through_the_tree() {
    // After list recycling, an owner re-binds the same value and needs a
    // real pass; arming the force flag guarantees one.
    let root: BindableContainer<Item> = BindableContainer::new();
    let child: BindableNode<Item> = BindableNode::new();
    let child_binding = RecordingBinding::new("enabled", "item.active", BindingMode::OneWay);
    child.declare_bindings(vec![child_binding.handle()]);
    root.add_child(&child);

    root.node().set_context(Some(item("A")));
    assert_eq!(child_binding.applies().len(), 1);

    root.node().set_force_context_changed(true);
    root.node().set_context(Some(item("A")));

    // The root re-ran its pass; the child's inherited value was unchanged,
    // and the owner passed force=false, so the child stays quiet.
    assert_eq!(child_binding.applies().len(), 1);
    assert!(!root.node().force_context_changed());
}

#[test]
fn local_child_context_overrides_inheritance_until_cleared() {
    let root: BindableContainer<Item> = BindableContainer::new();
    let child: BindableNode<Item> = BindableNode::new();
    root.add_child(&child);

    root.node().set_context(Some(item("parent")));
    assert_eq!(child.effective_context(), Some(item("parent")));

    // Direct set wins and clears inheritance.
    child.set_context(Some(item("local")));
    assert_eq!(child.inherited_context(), None);
    assert_eq!(child.effective_context(), Some(item("local")));

    // The next ancestor propagation reinstates inheritance.
    root.node().set_context(Some(item("parent-2")));
    assert_eq!(child.effective_context(), Some(item("parent-2")));
    assert_eq!(child.context(), Some(item("local")));
}

#[test]
fn dispose_leaves_no_reachable_bindings() {
    let root: BindableContainer<Item> = BindableContainer::new();
    let child: BindableNode<Item> = BindableNode::new();
    let child_binding = RecordingBinding::new("enabled", "item.active", BindingMode::OneWay);
    child.declare_bindings(vec![child_binding.handle()]);
    root.add_child(&child);
    root.node().set_context(Some(item("A")));

    root.dispose();

    assert_eq!(child_binding.dispose_count(), 1);
    assert_eq!(child.binding_count(), 0);
    assert!(child.context().is_none());
    assert!(child.inherited_context().is_none());
    assert!(child.parent().is_none());
}
