// tests/inheritance_properties.rs

use std::path::PathBuf;

use proptest::prelude::*;

use keepalive::task::Task;

/// Strategy for a task tree up to `depth` levels deep with random relative
/// directories and sometimes-empty formats.
fn task_tree_strategy(depth: u32) -> impl Strategy<Value = Task> {
    let leaf = ("[a-z]{1,6}", proptest::option::of("[a-z%]{1,8}")).prop_map(|(dir, format)| Task {
        dir: dir.into(),
        format: format.unwrap_or_default(),
        cmd: "true".into(),
        ..Task::default()
    });

    leaf.prop_recursive(depth, 32, 4, |inner| {
        (
            "[a-z]{1,6}",
            proptest::option::of("[a-z%]{1,8}"),
            proptest::collection::vec(inner, 0..4),
        )
            .prop_map(|(dir, format, tasks)| Task {
                dir: dir.into(),
                format: format.unwrap_or_default(),
                tasks,
                ..Task::default()
            })
    })
}

/// Walk the tree the way the walker does, checking each resolved node
/// against the raw values collected along its ancestry.
fn check(resolved: &Task, raw: &Task, expected_dir: PathBuf, nearest_format: &str) {
    assert_eq!(resolved.dir, expected_dir);
    let expected_format = if raw.format.is_empty() { nearest_format } else { raw.format.as_str() };
    assert_eq!(resolved.format, expected_format);

    for (child_resolved, child_raw) in resolved.resolved_children().zip(&raw.tasks) {
        check(
            &child_resolved,
            child_raw,
            expected_dir.join(&child_raw.dir),
            &resolved.format,
        );
    }
}

proptest! {
    #[test]
    fn descendants_join_dirs_and_inherit_nearest_format(root in task_tree_strategy(3)) {
        let base = Task { dir: "base".into(), ..Task::default() };
        let resolved_root = root.clone().inherit_from(&base);
        check(&resolved_root, &root, PathBuf::from("base").join(&root.dir), "");
    }

    #[test]
    fn env_is_concatenated_in_ancestor_order(
        parent_env in proptest::collection::vec("[A-Z]{1,3}=[a-z]{0,3}", 0..5),
        child_env in proptest::collection::vec("[A-Z]{1,3}=[a-z]{0,3}", 0..5),
    ) {
        let parent = Task { env: parent_env.clone(), ..Task::default() };
        let child = Task { env: child_env.clone(), ..Task::default() };

        let resolved = child.inherit_from(&parent);
        let expected: Vec<String> = parent_env.into_iter().chain(child_env).collect();
        prop_assert_eq!(resolved.env, expected);
    }
}
