use std::sync::Arc;

use crate::delta::{DeltaFlags, ResourceDelta};
use crate::in_memory::{InMemoryProjectConfig, InMemoryResourceTree};
use crate::model::{DeltaClassifier, UpdateOp};

struct Fixture {
    resources: Arc<InMemoryResourceTree>,
    classifier: DeltaClassifier,
}

fn fixture() -> Fixture {
    let resources = Arc::new(InMemoryResourceTree::new());
    let config = Arc::new(InMemoryProjectConfig::new());
    config.add_source_extension("src");
    let classifier = DeltaClassifier::new(resources.clone(), config);
    Fixture {
        resources,
        classifier,
    }
}

fn flags(set: impl Fn(&mut DeltaFlags)) -> DeltaFlags {
    let mut flags = DeltaFlags::default();
    set(&mut flags);
    flags
}

#[test]
fn kind_changed_child_refreshes_the_parent_and_nothing_else() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let changed = fx.resources.create_file(&folder, "a.src");
    let added = fx.resources.create_file(&folder, "b.src");

    let delta = ResourceDelta::changed(folder.clone())
        .with_child(
            ResourceDelta::changed(changed).with_flags(flags(|f| f.kind_changed = true)),
        )
        .with_child(ResourceDelta::added(added));

    // The structural additions never make it out: mapping a kind change to
    // remove-plus-add is not attempted.
    assert_eq!(
        fx.classifier.classify(&delta),
        vec![UpdateOp::refresh(folder)]
    );
}

#[test]
fn opening_an_accessible_project_updates_in_place() {
    let fx = fixture();
    let project = fx.resources.create_project("p");

    let delta = ResourceDelta::changed(project.clone()).with_flags(flags(|f| f.open = true));

    assert_eq!(
        fx.classifier.classify(&delta),
        vec![UpdateOp::update(project)]
    );
}

#[test]
fn closing_a_project_refreshes_and_stops() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let orphan = fx.resources.create_file(&project, "a.src");
    fx.resources.set_open(project.project, false);

    let delta = ResourceDelta::changed(project.clone())
        .with_flags(flags(|f| f.open = true))
        .with_child(ResourceDelta::added(orphan));

    assert_eq!(
        fx.classifier.classify(&delta),
        vec![UpdateOp::refresh(project)]
    );
}

#[test]
fn label_flags_update_then_structural_children_still_batch() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let added = fx.resources.create_file(&folder, "a.src");

    let delta = ResourceDelta::changed(folder.clone())
        .with_flags(flags(|f| f.description = true))
        .with_child(ResourceDelta::added(added.clone()));

    assert_eq!(
        fx.classifier.classify(&delta),
        vec![
            UpdateOp::update(folder.clone()),
            UpdateOp::AddRemove {
                parent: folder,
                added: vec![added],
                removed: Vec::new(),
                is_rename: false,
            },
        ]
    );
}

#[test]
fn replaced_refreshes_and_stops() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let added = fx.resources.create_file(&folder, "a.src");

    let delta = ResourceDelta::changed(folder.clone())
        .with_flags(flags(|f| f.replaced = true))
        .with_child(ResourceDelta::added(added));

    assert_eq!(
        fx.classifier.classify(&delta),
        vec![UpdateOp::refresh(folder)]
    );
}

#[test]
fn content_change_refreshes_recognized_source_files_only() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let source = fx.resources.create_file(&project, "a.src");
    let other = fx.resources.create_file(&project, "readme.txt");

    let source_delta =
        ResourceDelta::changed(source.clone()).with_flags(flags(|f| f.content = true));
    assert_eq!(
        fx.classifier.classify(&source_delta),
        vec![UpdateOp::refresh(source)]
    );

    let other_delta = ResourceDelta::changed(other).with_flags(flags(|f| f.content = true));
    assert!(fx.classifier.classify(&other_delta).is_empty());
}

#[test]
fn content_change_never_recurses_into_children() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let added = fx.resources.create_file(&folder, "a.src");

    let delta = ResourceDelta::changed(folder)
        .with_flags(flags(|f| f.changed = true))
        .with_child(ResourceDelta::added(added));

    assert!(fx.classifier.classify(&delta).is_empty());
}

#[test]
fn recursion_reaches_nested_changed_children() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let file = fx.resources.create_file(&folder, "a.src");

    let delta = ResourceDelta::changed(project).with_child(
        ResourceDelta::changed(folder).with_child(
            ResourceDelta::changed(file.clone()).with_flags(flags(|f| f.content = true)),
        ),
    );

    assert_eq!(
        fx.classifier.classify(&delta),
        vec![UpdateOp::refresh(file)]
    );
}

#[test]
fn structural_children_batch_under_their_parent() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let added = fx.resources.create_file(&folder, "a.src");
    let removed = fx.resources.create_file(&folder, "b.src");

    let delta = ResourceDelta::changed(folder.clone())
        .with_child(ResourceDelta::added(added.clone()))
        .with_child(ResourceDelta::removed(removed.clone()));

    assert_eq!(
        fx.classifier.classify(&delta),
        vec![UpdateOp::AddRemove {
            parent: folder,
            added: vec![added],
            removed: vec![removed],
            is_rename: false,
        }]
    );
}

#[test]
fn rename_heuristic_needs_a_move_marker_on_both_sides() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let added = fx.resources.create_file(&folder, "new.src");
    let removed = fx.resources.create_file(&folder, "old.src");

    let one_sided = ResourceDelta::changed(folder.clone())
        .with_child(
            ResourceDelta::added(added.clone()).with_flags(flags(|f| f.moved_from = true)),
        )
        .with_child(ResourceDelta::removed(removed.clone()));
    let ops = fx.classifier.classify(&one_sided);
    let [UpdateOp::AddRemove { is_rename, .. }] = &ops[..] else {
        panic!("expected a single add/remove batch");
    };
    assert!(!*is_rename);

    let both_sides = ResourceDelta::changed(folder)
        .with_child(ResourceDelta::added(added).with_flags(flags(|f| f.moved_from = true)))
        .with_child(
            ResourceDelta::removed(removed).with_flags(flags(|f| f.moved_to = true)),
        );
    let ops = fx.classifier.classify(&both_sides);
    let [UpdateOp::AddRemove { is_rename, .. }] = &ops[..] else {
        panic!("expected a single add/remove batch");
    };
    assert!(*is_rename);
}

#[test]
fn rename_heuristic_correlates_counts_not_pairs() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");
    let added_a = fx.resources.create_file(&folder, "a.src");
    let added_b = fx.resources.create_file(&folder, "b.src");
    let removed_c = fx.resources.create_file(&folder, "c.src");
    let removed_d = fx.resources.create_file(&folder, "d.src");

    // Only one marker on each side, on unrelated entries; the whole batch is
    // still flagged. The heuristic is deliberately not a proof.
    let delta = ResourceDelta::changed(folder)
        .with_child(ResourceDelta::added(added_a).with_flags(flags(|f| f.moved_from = true)))
        .with_child(ResourceDelta::added(added_b))
        .with_child(ResourceDelta::removed(removed_c))
        .with_child(
            ResourceDelta::removed(removed_d).with_flags(flags(|f| f.moved_to = true)),
        );

    let ops = fx.classifier.classify(&delta);
    let [UpdateOp::AddRemove {
        is_rename,
        added,
        removed,
        ..
    }] = &ops[..]
    else {
        panic!("expected a single add/remove batch");
    };
    assert!(*is_rename);
    assert_eq!(added.len(), 2);
    assert_eq!(removed.len(), 2);
}

#[test]
fn quiet_delta_produces_no_operations() {
    let fx = fixture();
    let project = fx.resources.create_project("p");
    let folder = fx.resources.create_folder(&project, "dir");

    let delta = ResourceDelta::changed(folder);
    assert!(fx.classifier.classify(&delta).is_empty());
}
