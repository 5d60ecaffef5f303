//! Reporting-hierarchy resolution over the user directory.
//!
//! The directory stores the tree as a nullable `reports_to` reference per
//! user. This module materializes it as an explicit adjacency structure so
//! ancestor chains and subtrees are bounded lookups instead of per-call
//! pointer chasing, and so cycle checks can run on every structural
//! mutation.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::entities::users;

/// Snapshot of the reporting tree, rebuilt from the persisted directory on
/// each decision so concurrent instances never rely on stale caches.
pub struct OrgTree {
    parents: HashMap<i32, Option<i32>>,
    children: HashMap<i32, Vec<i32>>,
}

impl OrgTree {
    #[must_use]
    pub fn from_users(rows: &[users::Model]) -> Self {
        let mut parents = HashMap::with_capacity(rows.len());
        let mut children: HashMap<i32, Vec<i32>> = HashMap::new();

        for user in rows {
            parents.insert(user.id, user.reports_to);
            if let Some(manager) = user.reports_to {
                children.entry(manager).or_default().push(user.id);
            }
        }

        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        Self { parents, children }
    }

    #[must_use]
    pub fn contains(&self, id: i32) -> bool {
        self.parents.contains_key(&id)
    }

    /// Ordered ancestors of `id`, from direct manager to root.
    ///
    /// The visited set guarantees termination and no repeated ids even if
    /// the stored tree is corrupt.
    #[must_use]
    pub fn manager_chain(&self, id: i32) -> Vec<i32> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.parents.get(&id).copied().flatten();

        while let Some(manager) = current {
            if !seen.insert(manager) {
                break;
            }
            chain.push(manager);
            current = self.parents.get(&manager).copied().flatten();
        }

        chain
    }

    /// Every user reporting to `id`, directly or transitively, inclusive
    /// of `id` itself. No duplicates.
    #[must_use]
    pub fn subtree(&self, id: i32) -> Vec<i32> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            result.push(current);
            if let Some(kids) = self.children.get(&current) {
                queue.extend(kids.iter().copied());
            }
        }

        result
    }

    /// Whether `manager` appears in `user`'s chain of ancestors.
    #[must_use]
    pub fn is_ancestor_of(&self, manager: i32, user: i32) -> bool {
        self.manager_chain(user).contains(&manager)
    }

    /// Whether re-pointing `id` at `new_manager` would close a loop. A user
    /// can never report to itself, directly or transitively.
    #[must_use]
    pub fn would_create_cycle(&self, id: i32, new_manager: i32) -> bool {
        if id == new_manager {
            return true;
        }
        self.manager_chain(new_manager).contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::users::Role;

    fn user(id: i32, reports_to: Option<i32>) -> users::Model {
        users::Model {
            id,
            name: format!("user-{id}"),
            email: format!("user-{id}@example.com"),
            role: Role::Vendedor,
            reports_to,
            active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    // 1 manages 2 and 3; 2 manages 4.
    fn sample_tree() -> OrgTree {
        OrgTree::from_users(&[
            user(1, None),
            user(2, Some(1)),
            user(3, Some(1)),
            user(4, Some(2)),
        ])
    }

    #[test]
    fn manager_chain_walks_to_root() {
        let tree = sample_tree();
        assert_eq!(tree.manager_chain(4), vec![2, 1]);
        assert_eq!(tree.manager_chain(2), vec![1]);
        assert!(tree.manager_chain(1).is_empty());
    }

    #[test]
    fn manager_chain_has_no_repeats() {
        let tree = sample_tree();
        for id in [1, 2, 3, 4] {
            let chain = tree.manager_chain(id);
            let unique: HashSet<_> = chain.iter().collect();
            assert_eq!(unique.len(), chain.len());
        }
    }

    #[test]
    fn manager_chain_terminates_on_corrupt_loop() {
        // 5 and 6 point at each other; resolution must still terminate.
        let tree = OrgTree::from_users(&[user(5, Some(6)), user(6, Some(5))]);
        assert_eq!(tree.manager_chain(5), vec![6]);
        assert_eq!(tree.manager_chain(6), vec![5]);
    }

    #[test]
    fn subtree_is_inclusive_and_duplicate_free() {
        let tree = sample_tree();
        let mut subtree = tree.subtree(1);
        subtree.sort_unstable();
        assert_eq!(subtree, vec![1, 2, 3, 4]);

        assert_eq!(tree.subtree(2), vec![2, 4]);
        assert_eq!(tree.subtree(4), vec![4]);
    }

    #[test]
    fn ancestor_checks() {
        let tree = sample_tree();
        assert!(tree.is_ancestor_of(1, 4));
        assert!(tree.is_ancestor_of(2, 4));
        assert!(!tree.is_ancestor_of(3, 4));
        assert!(!tree.is_ancestor_of(4, 2));
    }

    #[test]
    fn cycle_detection() {
        let tree = sample_tree();
        assert!(tree.would_create_cycle(1, 1));
        assert!(tree.would_create_cycle(1, 4));
        assert!(tree.would_create_cycle(2, 4));
        assert!(!tree.would_create_cycle(4, 3));
        assert!(!tree.would_create_cycle(3, 2));
    }
}
