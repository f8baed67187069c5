//! Property-based tests for bucket-sync
//!
//! These tests verify invariants that must hold for all inputs:
//! - Classification is a disjoint partition of local ∪ remote
//! - Revision naming never touches directories and increments by one
//!
//! Run with: cargo test --test property_tests

use proptest::prelude::*;

// ============================================================================
// CLASSIFICATION TESTS
// ============================================================================

mod classification_tests {
    use super::*;
    use bucket_sync::hash::hash_bytes;
    use bucket_sync::sync::{compare, FileState, ObjectInfo};
    use std::collections::{BTreeMap, BTreeSet};
    use std::fs;
    use tempfile::TempDir;

    /// name -> (local content, remote content), either side optional
    fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, (Option<u8>, Option<u8>)>> {
        prop::collection::btree_map(
            "[a-z]{1,6}(/[a-z]{1,6}){0,2}\\.f",
            (prop::option::of(0u8..3), prop::option::of(0u8..3)),
            0..24,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Invariant: the four classes are disjoint and cover local ∪ remote
        #[test]
        fn partition_is_complete_and_disjoint(tree in tree_strategy()) {
            let dir = TempDir::new().unwrap();
            let mut local = BTreeSet::new();
            let mut remote = Vec::new();

            for (name, (local_content, remote_content)) in &tree {
                if let Some(byte) = local_content {
                    let path = dir.path().join(name);
                    // A generated name may collide with a generated directory
                    if fs::create_dir_all(path.parent().unwrap()).is_err()
                        || fs::write(&path, [*byte]).is_err()
                    {
                        continue;
                    }
                    local.insert(name.clone());
                }
                if let Some(byte) = remote_content {
                    remote.push(ObjectInfo {
                        key: name.clone(),
                        integrity_tag: format!("\"{}\"", hash_bytes(&[*byte])),
                        size: 1,
                        last_modified: None,
                    });
                }
            }

            let result = compare(&remote, &local, dir.path(), None).unwrap();

            let remote_keys: BTreeSet<String> = remote.iter().map(|o| o.key.clone()).collect();
            let union: BTreeSet<String> = local.union(&remote_keys).cloned().collect();
            prop_assert_eq!(result.all_paths(), union.clone());
            prop_assert_eq!(result.len(), union.len());

            for path in &union {
                let state = result.state_of(path).unwrap();
                let in_local = local.contains(path);
                let in_remote = remote_keys.contains(path);
                match state {
                    FileState::RemoteOnly => prop_assert!(in_remote && !in_local),
                    FileState::LocalOnly => prop_assert!(in_local && !in_remote),
                    FileState::HashSame | FileState::HashDifferent => {
                        prop_assert!(in_local && in_remote);
                        let (l, r) = tree[path];
                        prop_assert_eq!(state == FileState::HashSame, l == r);
                    }
                }
            }
        }
    }
}

// ============================================================================
// REVISION NAMING TESTS
// ============================================================================

mod revision_tests {
    use super::*;
    use bucket_sync::revision::{is_revision, next_revision};

    proptest! {
        /// Invariant: everything up to the last `/` is preserved verbatim
        #[test]
        fn directories_untouched(
            dirs in prop::collection::vec("[a-z\\[\\]0-9]{1,8}", 0..4),
            base in "[a-z0-9._-]{1,12}",
            tag in "[a-z]{1,4}",
        ) {
            let parent: String = dirs.iter().map(|d| format!("{}/", d)).collect();
            let path = format!("{}{}", parent, base);
            let next = next_revision(&path, &tag);
            prop_assert!(next.starts_with(&parent));
            prop_assert_eq!(next.matches('/').count(), path.matches('/').count());
        }

        /// Invariant: a fresh name gets N=0, and each application increments N by one
        #[test]
        fn increments_by_one(base in "[a-z0-9._-]{1,12}", tag in "[a-z]{1,4}", steps in 1usize..20) {
            let mut name = base.clone();
            for _ in 0..steps {
                name = next_revision(&name, &tag);
            }
            prop_assert_eq!(name.clone(), format!("[{}{}]{}", tag, steps - 1, base));
            prop_assert!(is_revision(&name, &tag));
        }

        /// Invariant: the function is deterministic
        #[test]
        fn deterministic(path in "\\PC{1,40}", tag in "\\PC{1,6}") {
            prop_assert_eq!(next_revision(&path, &tag), next_revision(&path, &tag));
        }

        /// Invariant: a different tag's prefix is kept and a fresh one is prepended
        #[test]
        fn foreign_tag_concatenates(base in "[a-z0-9.]{1,12}", n in 0u32..1000) {
            let name = format!("[rem{}]{}", n, base);
            prop_assert_eq!(next_revision(&name, "loc"), format!("[loc0]{}", name));
        }
    }
}
