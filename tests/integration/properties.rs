//! Property tests: moves keep sibling order, deletes cascade.

use nextnode::store::{PageRepository, SledStore};
use nextnode::PageTree;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn tree_with_parents(children_per_parent: usize) -> (PageTree, Arc<SledStore>, Vec<String>, Vec<Vec<String>>) {
    let store = Arc::new(SledStore::temporary().unwrap());
    let mut tree = PageTree::new(store.clone(), store.clone());
    let mut parents = Vec::new();
    let mut children = Vec::new();
    for p in 0..2 {
        let parent = tree.create_page(format!("P{}", p), None).unwrap();
        let mut kids = Vec::new();
        for c in 0..children_per_parent {
            kids.push(tree.create_page(format!("P{}C{}", p, c), Some(&parent.id)).unwrap().id);
        }
        parents.push(parent.id);
        children.push(kids);
    }
    (tree, store, parents, children)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn move_preserves_relative_order(
        count in 1usize..6,
        pick in 0usize..6,
        index in 0usize..8,
        same_parent in any::<bool>(),
    ) {
        let (mut tree, store, parents, children) = tree_with_parents(count);
        let moved = children[0][pick % count].clone();
        let target = if same_parent { 0 } else { 1 };

        tree.move_page(&moved, Some(&parents[target]), index).unwrap();

        let old_list = PageRepository::get(store.as_ref(), &parents[0]).unwrap().unwrap().children_ids;
        let new_list = PageRepository::get(store.as_ref(), &parents[target]).unwrap().unwrap().children_ids;

        // Every other id keeps its relative order in both lists.
        let without = |list: &[String]| -> Vec<String> {
            list.iter().filter(|id| **id != moved).cloned().collect()
        };
        let expected_old: Vec<String> = without(&children[0]);
        prop_assert_eq!(without(&old_list), expected_old);
        let expected_new: Vec<String> = if same_parent { without(&children[0]) } else { children[1].clone() };
        prop_assert_eq!(without(&new_list), expected_new);

        // The moved id sits exactly once at the clamped index of the new list.
        prop_assert_eq!(new_list.iter().filter(|id| **id == moved).count(), 1);
        let position = new_list.iter().position(|id| *id == moved).unwrap();
        prop_assert_eq!(position, index.min(new_list.len() - 1));
        if !same_parent {
            prop_assert!(!old_list.contains(&moved));
        }
    }

    #[test]
    fn delete_cascades_to_whole_subtree(depth in 1usize..5, fanout in 1usize..3) {
        let store = Arc::new(SledStore::temporary().unwrap());
        let mut tree = PageTree::new(store.clone(), store.clone());
        let keep = tree.create_page("Keep", None).unwrap();
        let root = tree.create_page("Root", None).unwrap();

        let mut doomed: HashSet<String> = HashSet::new();
        doomed.insert(root.id.clone());
        let mut frontier = vec![root.id.clone()];
        for level in 0..depth {
            let mut next = Vec::new();
            for parent in &frontier {
                for i in 0..fanout {
                    let page = tree.create_page(format!("L{}-{}", level, i), Some(parent)).unwrap();
                    doomed.insert(page.id.clone());
                    next.push(page.id);
                }
            }
            frontier = next;
        }

        tree.delete_page(&root.id).unwrap();

        let remaining = PageRepository::get_all(store.as_ref()).unwrap();
        prop_assert_eq!(remaining.len(), 1);
        prop_assert!(remaining.contains_key(&keep.id));
        for id in &doomed {
            prop_assert!(tree.get_page(id).is_none());
        }
    }
}
