use std::ops::Range;

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn insert_all<S: Balance>(keys: &[u32]) -> SearchTree<TestNode, S> {
    let mut tree: SearchTree<TestNode, S> = SearchTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    tree
}

fn insert_find_all(keys: &[u32]) {
    let tree: AvlTree<TestNode> = insert_all(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }

    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    assert!(sorted.iter().eq(tree.iter().map(|node| &node.key)));
}

fn key_of(node: Option<Pin<&TestNode>>) -> Option<u32> {
    node.map(|node| node.key)
}

fn height_at(tree: &AvlTree<TestNode>, key: u32) -> usize {
    let node = tree.get_raw(&key).expect("item not found");
    unsafe { TestNode::links(node).as_ref().height() }
}

fn edge_keys<S: Balance>(tree: &SearchTree<TestNode, S>) -> Vec<(u32, u32)> {
    tree.edges()
        .map(|(parent, child)| (parent.key, child.key))
        .collect()
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

#[test]
fn empty_tree() {
    let tree: AvlTree<TestNode> = AvlTree::new();

    assert!(tree.is_empty());
    assert!(tree.root().is_none());
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.edges().count(), 0);
    assert_eq!(tree.edge_ids().count(), 0);
    assert_eq!(tree.iter().count(), 0);
    assert!(tree.first().is_none());
    assert!(tree.last().is_none());
}

#[test]
fn ascending_three_rotates_left() {
    let tree: AvlTree<TestNode> = insert_all(&[0, 1, 2]);

    assert_eq!(key_of(tree.root()), Some(1));
    assert_eq!(edge_keys(&tree), [(1, 0), (1, 2)]);
    assert_eq!(height_at(&tree, 0), 1);
    assert_eq!(height_at(&tree, 2), 1);
    assert_eq!(tree.height(), 2);
}

#[test]
fn ascending_four_does_not_rotate_again() {
    let tree: AvlTree<TestNode> = insert_all(&[0, 1, 2, 3]);

    assert_eq!(key_of(tree.root()), Some(1));
    assert_eq!(edge_keys(&tree), [(1, 0), (1, 2), (2, 3)]);
    assert_eq!(height_at(&tree, 0), 1);
    assert_eq!(height_at(&tree, 3), 1);
    assert_eq!(height_at(&tree, 2), 2);
    assert_eq!(height_at(&tree, 1), 3);
}

#[test]
fn all_four_rotation_shapes() {
    // Left-left, right-right, left-right and right-left all settle on the median.
    for keys in [[2, 1, 0], [0, 1, 2], [2, 0, 1], [0, 2, 1]] {
        let tree: AvlTree<TestNode> = insert_all(&keys);

        assert_eq!(key_of(tree.root()), Some(1), "keys: {keys:?}");
        assert_eq!(edge_keys(&tree), [(1, 0), (1, 2)], "keys: {keys:?}");
    }
}

#[test]
fn restructure_below_root_relinks_parent() {
    // The imbalance at 4 is repaired beneath the root, whose right child becomes 5.
    let tree: AvlTree<TestNode> = insert_all(&[2, 1, 4, 0, 5, 6]);

    assert_eq!(key_of(tree.root()), Some(2));
    assert_eq!(
        edge_keys(&tree),
        [(2, 1), (2, 5), (1, 0), (5, 4), (5, 6)]
    );
}

#[test]
fn restructure_moves_outer_subtrees() {
    // Inserting 5 unbalances the root; the double rotation hands 5 from 4 over to 6.
    let tree: AvlTree<TestNode> = insert_all(&[2, 1, 6, 4, 7, 5]);

    assert_eq!(key_of(tree.root()), Some(4));
    assert_eq!(
        edge_keys(&tree),
        [(4, 2), (4, 6), (2, 1), (6, 5), (6, 7)]
    );
    assert_eq!(height_at(&tree, 2), 2);
    assert_eq!(height_at(&tree, 6), 2);
    assert_eq!(height_at(&tree, 4), 3);
}

#[test]
fn duplicate_insert_is_noop() {
    let mut tree: AvlTree<TestNode> = insert_all(&[5, 2, 8, 1, 3]);

    let nodes_before: Vec<*const TestNode> =
        tree.iter().map(|node| node as *const TestNode).collect();
    let edges_before = edge_keys(&tree);
    let height_before = tree.height();

    for key in [5, 1, 3] {
        let rejected = tree.insert(TestNode::new(key)).expect("duplicate accepted");
        assert_eq!(rejected.key, key);
        tree.assert_invariants();
    }

    let nodes_after: Vec<*const TestNode> =
        tree.iter().map(|node| node as *const TestNode).collect();
    assert_eq!(nodes_before, nodes_after);
    assert_eq!(edges_before, edge_keys(&tree));
    assert_eq!(height_before, tree.height());
    assert_eq!(tree.len(), 5);
}

#[test]
fn rederive_root_is_idempotent() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in 0..32 {
        tree.insert(TestNode::new(key));

        let root = tree.root;
        tree.rederive_root();
        assert_eq!(tree.root, root);
        tree.rederive_root();
        assert_eq!(tree.root, root);
    }
}

#[test]
fn ascending_inserts_stay_logarithmic() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in 0..4096 {
        tree.insert(TestNode::new(key));
    }

    tree.assert_invariants();
    assert_eq!(tree.len(), 4096);
    assert_eq!(tree.height(), 13);
    assert!(tree.iter().map(|node| node.key).eq(0..4096));
}

#[test]
fn unbalanced_tree_keeps_insertion_shape() {
    let mut tree: BstTree<TestNode> = BstTree::new();

    for key in 0..64 {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    assert_eq!(key_of(tree.root()), Some(0));
    assert_eq!(tree.height(), 64);
    assert!(edge_keys(&tree).iter().all(|&(p, c)| c == p + 1));
}

#[test]
fn edges_are_restartable() {
    let tree: AvlTree<TestNode> = insert_all(&[4, 2, 6, 1, 3, 5, 7, 0]);

    let edges = tree.edges();
    let first: Vec<_> = edges.clone().map(|(p, c)| (p.key, c.key)).collect();
    let second: Vec<_> = edges.map(|(p, c)| (p.key, c.key)).collect();

    assert_eq!(first, second);
    assert_eq!(first, edge_keys(&tree));
    assert_eq!(first.len(), tree.len() - 1);

    let ids: Vec<(String, String)> = tree.edge_ids().collect();
    assert_eq!(ids[0], ("4".to_string(), "2".to_string()));
    assert_eq!(ids.len(), first.len());
}

#[test]
fn dotgraph_lists_edges() {
    let tree: AvlTree<TestNode> = insert_all(&[0, 1, 2]);

    let mut out = String::new();
    tree.dotgraph("small", &mut out).unwrap();
    assert_eq!(
        out,
        "digraph \"small\" {\n  \"1\";\n  \"1\" -> \"0\";\n  \"1\" -> \"2\";\n}"
    );

    let empty: AvlTree<TestNode> = AvlTree::new();
    let mut out = String::new();
    empty.dotgraph("empty", &mut out).unwrap();
    assert_eq!(out, "digraph \"empty\" {}");
}

#[test]
fn scrambled_and_descending_inserts_hold_invariants() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    let mut state: u32 = 0x2545_f491;

    for _ in 0..5000 {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        tree.insert(TestNode::new(state % 20_000));
        tree.assert_invariants();
        assert_eq!(tree.edges().count(), tree.len() - 1);
    }

    for key in (20_000..21_000).rev() {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    assert!(tree.height() as f64 <= model::avl_height_bound(tree.len()));
    assert_eq!(tree.edges().count(), tree.len() - 1);
    assert!(tree.iter().zip(tree.iter().skip(1)).all(|(a, b)| a.key < b.key));
}

#[test]
fn clear_drops_everything() {
    let mut tree: AvlTree<TestNode> = insert_all(&[3, 1, 4, 0, 2]);

    tree.clear();
    assert!(tree.is_empty());
    assert!(tree.root().is_none());
    tree.assert_invariants();

    tree.insert(TestNode::new(9));
    assert_eq!(key_of(tree.first()), Some(9));
    assert_eq!(key_of(tree.last()), Some(9));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence::<Avl>(ops);
    }

    #[test]
    fn btree_equivalence_unbalanced(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence::<Unbalanced>(ops);
    }

    #[test]
    fn distinct_keys_respect_height_bounds(keys in proptest::collection::btree_set(any::<u32>(), 1..2000)) {
        let mut tree: AvlTree<TestNode> = AvlTree::new();
        let mut shuffled: Vec<u32> = keys.iter().copied().collect();
        shuffled.reverse();
        let third = shuffled.len() / 3;
        shuffled.rotate_left(third);

        for &key in &shuffled {
            prop_assert!(tree.insert(TestNode::new(key)).is_none());
        }

        tree.assert_invariants();
        let height = tree.height() as f64;
        prop_assert!(height <= model::avl_height_bound(keys.len()));
        prop_assert!(height >= model::min_height_bound(keys.len()));
        prop_assert!(keys.iter().eq(tree.iter().map(|node| &node.key)));
    }
}
