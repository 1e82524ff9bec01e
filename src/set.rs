use core::{borrow::Borrow, fmt, marker::PhantomPinned, ptr::NonNull};

use cordyceps::Linked;

use crate::{Avl, Balance, Links, SearchTree, TreeNode};

/// An ordered set based on an [AVL tree].
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlSet<K: Ord + fmt::Debug, S: Balance = Avl> {
    tree: SearchTree<SetNode<K>, S>,
}

struct SetNode<K> {
    links: Links<SetNode<K>>,
    key: K,
    _unpin: PhantomPinned,
}

unsafe impl<K> Linked<Links<SetNode<K>>> for SetNode<K> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<SetNode<K>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug> TreeNode<Links<SetNode<K>>> for SetNode<K> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K: Ord + fmt::Debug, S: Balance> AvlSet<K, S> {
    /// Creates a new, empty `AvlSet`.
    pub const fn new() -> Self {
        Self {
            tree: SearchTree::new(),
        }
    }

    /// Returns `true` if the set contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the set.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Adds a key to the set.
    ///
    /// Returns `false` if the set already contained an equal key, in which case the set is not
    /// modified.
    pub fn insert(&mut self, key: K) -> bool {
        let node = Box::new(SetNode {
            links: Links::new(),
            key,
            _unpin: PhantomPinned,
        });

        self.tree.insert(node).is_none()
    }

    /// Returns `true` if the set contains `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the key in the set equal to `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().key)
    }

    /// Returns the minimum key in the set.
    #[inline]
    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(|node| &node.get_ref().key)
    }

    /// Returns the maximum key in the set.
    #[inline]
    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(|node| &node.get_ref().key)
    }

    /// Returns an iterator over the keys of the set, in ascending order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.tree.iter().map(|node| &node.key)
    }

    /// Returns a breadth-first iterator over the `(parent, child)` edges of the underlying tree.
    pub fn edges(&self) -> impl Iterator<Item = (&K, &K)> + Clone + '_ {
        self.tree
            .edges()
            .map(|(parent, child)| (&parent.key, &child.key))
    }

    /// Writes the underlying tree as a Graphviz `digraph`.
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result
    where
        K: fmt::Display,
    {
        self.tree.dotgraph(name, w)
    }

    /// Clears the set, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

impl<K: Ord + fmt::Debug, S: Balance> Default for AvlSet<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, S: Balance> Extend<K> for AvlSet<K, S> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + fmt::Debug, S: Balance> FromIterator<K> for AvlSet<K, S> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K: Ord + fmt::Debug, S: Balance> fmt::Debug for AvlSet<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unbalanced;

    #[test]
    fn insert_rejects_duplicates() {
        let mut set: AvlSet<u32> = AvlSet::new();

        assert!(set.insert(5));
        assert!(set.insert(3));
        assert!(!set.insert(5));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [3, 5]);
        set.assert_invariants();
    }

    #[test]
    fn string_keys_borrow_as_str() {
        let set: AvlSet<String> = ["pear", "apple", "fig"]
            .into_iter()
            .map(String::from)
            .collect();

        assert!(set.contains("fig"));
        assert!(!set.contains("kiwi"));
        assert_eq!(set.get("apple").map(String::as_str), Some("apple"));
        assert_eq!(set.first().map(String::as_str), Some("apple"));
        assert_eq!(set.last().map(String::as_str), Some("pear"));
        set.assert_invariants();
    }

    #[test]
    fn unbalanced_set_degenerates() {
        let set: AvlSet<u32, Unbalanced> = (0..16).collect();

        assert_eq!(set.height(), 16);
        assert_eq!(set.edges().count(), 15);
        set.assert_invariants();

        let balanced: AvlSet<u32> = (0..16).collect();
        assert_eq!(balanced.height(), 5);
        balanced.assert_invariants();
    }

    #[test]
    fn clear_empties_set() {
        let mut set: AvlSet<u32> = (0..100).rev().collect();
        assert_eq!(set.len(), 100);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.height(), 0);
        assert_eq!(format!("{set:?}"), "{}");
        set.assert_invariants();
    }
}
