// src/task/resolve.rs

//! Inheritance of settings from a parent task to its children.
//!
//! Resolution happens one level at a time: a child is resolved against its
//! immediate parent's *already-resolved* values, never against the root's
//! raw values. Each step consumes an owned clone of the child, so sibling
//! branches never observe each other's changes.

use std::path::{Component, Path, PathBuf};

use super::Task;

impl Task {
    /// Overlay this task's explicit settings on top of `parent`'s resolved
    /// settings.
    ///
    /// - `dir` is joined onto the parent's directory.
    /// - `env` is appended to the parent's environment.
    /// - `format`, `encoding`, sinks and buffer timings are inherited when
    ///   unset (empty / `None` / zero).
    pub fn inherit_from(mut self, parent: &Task) -> Task {
        self.dir = join_dir(&parent.dir, &self.dir);

        let mut env = parent.env.clone();
        env.append(&mut self.env);
        self.env = env;

        if self.format.is_empty() {
            self.format = parent.format.clone();
        }
        if self.encoding.is_empty() {
            self.encoding = parent.encoding.clone();
        }
        if self.out.is_none() {
            self.out = parent.out.clone();
        }
        if self.err.is_none() {
            self.err = parent.err.clone();
        }
        if self.merge_threshold.is_zero() {
            self.merge_threshold = parent.merge_threshold;
        }
        if self.flush_timeout.is_zero() {
            self.flush_timeout = parent.flush_timeout;
        }

        self
    }

    /// Resolved clones of this task's direct children, in order.
    pub fn resolved_children(&self) -> impl Iterator<Item = Task> + '_ {
        self.tasks.iter().map(|child| child.clone().inherit_from(self))
    }
}

/// Join `child` onto `base`, lexically.
///
/// The child never replaces the base: root and prefix components of an
/// absolute child are dropped, `.` components are skipped.
pub fn join_dir(base: &Path, child: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in child.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::ParentDir => joined.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::output::Sink;

    #[test]
    fn child_dir_is_joined_not_replaced() {
        assert_eq!(join_dir(Path::new("a"), Path::new("b")), PathBuf::from("a/b"));
        assert_eq!(join_dir(Path::new("a"), Path::new("")), PathBuf::from("a"));
        assert_eq!(join_dir(Path::new("a"), Path::new("./b/./c")), PathBuf::from("a/b/c"));
        assert_eq!(join_dir(Path::new("a"), Path::new("/abs")), PathBuf::from("a/abs"));
        assert_eq!(join_dir(Path::new(""), Path::new("b")), PathBuf::from("b"));
    }

    #[test]
    fn explicit_values_win_over_inherited() {
        let (sink, _) = Sink::memory();
        let parent = Task {
            format: "parent %s".into(),
            encoding: "gbk".into(),
            out: Some(sink),
            merge_threshold: Duration::from_millis(50),
            flush_timeout: Duration::from_secs(2),
            ..Task::default()
        };
        let child = Task {
            format: "child %s".into(),
            flush_timeout: Duration::from_secs(5),
            ..Task::default()
        };

        let resolved = child.inherit_from(&parent);
        assert_eq!(resolved.format, "child %s");
        assert_eq!(resolved.encoding, "gbk");
        assert!(resolved.out.is_some());
        assert!(resolved.err.is_none());
        assert_eq!(resolved.merge_threshold, Duration::from_millis(50));
        assert_eq!(resolved.flush_timeout, Duration::from_secs(5));
    }

    #[test]
    fn grandchild_chains_through_resolved_parent() {
        let root = Task {
            dir: "root".into(),
            env: vec!["A=1".into()],
            format: "%s".into(),
            tasks: vec![Task {
                dir: "mid".into(),
                env: vec!["B=2".into()],
                tasks: vec![Task {
                    dir: "leaf".into(),
                    env: vec!["A=3".into()],
                    ..Task::default()
                }],
                ..Task::default()
            }],
            ..Task::default()
        };

        let mid = root.resolved_children().next().unwrap();
        let leaf = mid.resolved_children().next().unwrap();

        assert_eq!(leaf.dir, PathBuf::from("root/mid/leaf"));
        assert_eq!(leaf.env, vec!["A=1", "B=2", "A=3"]);
        assert_eq!(leaf.format, "%s");
        // The unresolved subtree is untouched.
        assert_eq!(root.tasks[0].tasks[0].dir, PathBuf::from("leaf"));
    }
}
