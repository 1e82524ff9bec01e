//! An intrusive AVL tree with parent back-references and cached subtree heights.
//!
//! Nodes embed a [`Links`] value and are handed to the tree as owned [`Linked`] handles. Each node
//! caches its height, where a leaf has height 1 and a missing child counts as height 0. The
//! fundamental invariants of the tree after every completed insertion are:
//!
//! 1. Keys are in binary-search-tree order.
//! 2. The heights of a node's two subtrees differ by at most 1 (for [`Avl`] trees).
//! 3. Every cached height equals `1 + max(height(left), height(right))`.
//! 4. Every child's parent pointer refers back to the node holding it.
//!
//! Rebalancing is performed by a single case-free trinode restructuring: the three nodes on the
//! imbalanced path are sorted by key and relinked together with their four outer subtrees.

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomData,
    marker::PhantomPinned, mem, ops::Not, pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

mod balance;
mod debug;
mod iter;
mod set;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use balance::{Avl, Balance, Unbalanced};
pub use iter::{Edges, Iter};
pub use set::AvlSet;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;

    /// Compares `key` against this node's key.
    #[inline]
    fn compare(&self, key: &Self::Key) -> Ordering {
        key.cmp(self.key())
    }
}

/// An intrusive binary search tree, parametrized over its insertion strategy.
///
/// With the default [`Avl`] strategy every insertion restores height balance with at most one
/// trinode restructuring. With [`Unbalanced`] the tree is a plain binary search tree.
pub struct SearchTree<T, S = Avl>
where
    T: TreeNode<Links<T>> + ?Sized,
    S: Balance,
{
    root: Link<T>,
    len: usize,
    _strategy: PhantomData<S>,
}

/// A height-balanced [`SearchTree`].
pub type AvlTree<T> = SearchTree<T, Avl>;

/// A [`SearchTree`] which never rebalances.
pub type BstTree<T> = SearchTree<T, Unbalanced>;

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: usize,
    _unpin: PhantomPinned,
}

pub(crate) type Link<T> = Option<NonNull<T>>;

impl<T, S> SearchTree<T, S>
where
    T: TreeNode<Links<T>> + ?Sized,
    S: Balance,
{
    /// Returns a new empty tree.
    pub const fn new() -> SearchTree<T, S> {
        SearchTree {
            root: None,
            len: 0,
            _strategy: PhantomData,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree, which is 0 for an empty tree and 1 for a lone root.
    pub fn height(&self) -> usize {
        unsafe { height_of(self.root) }
    }

    /// Returns a reference to the root node.
    pub fn root(&self) -> Option<Pin<&T>> {
        self.root.map(|root| unsafe { Pin::new_unchecked(root.as_ref()) })
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree must have zero length");
            return;
        };

        unsafe {
            assert_eq!(
                T::links(root).as_ref().parent(),
                None,
                "root must not have a parent"
            );

            let mut count = 0;
            self.assert_invariants_at(root, None, None, &mut count);
            assert_eq!(count, self.len, "tree length does not match node count");
        }
    }

    // Checks the subtree at `node`, whose keys must lie strictly between `lower` and `upper`.
    //
    // Returns the true height of the subtree.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<T>,
        lower: Option<&T::Key>,
        upper: Option<&T::Key>,
        count: &mut usize,
    ) -> usize {
        unsafe {
            *count += 1;

            let key = node.as_ref().key();
            if let Some(lower) = lower {
                assert!(lower < key, "{key:?} is not greater than {lower:?}");
            }
            if let Some(upper) = upper {
                assert!(key < upper, "{key:?} is not less than {upper:?}");
            }

            let mut heights = [0; 2];
            for dir in [Dir::Left, Dir::Right] {
                let Some(child) = T::links(node).as_ref().child(dir) else {
                    continue;
                };

                // Ensure child's parent link points to this node.
                let parent = T::links(child)
                    .as_ref()
                    .parent()
                    .expect("child parent pointer not set");
                assert_eq!(node, parent, "child of {key:?} has a stale parent pointer");

                let (lower, upper) = match dir {
                    Dir::Left => (lower, Some(key)),
                    Dir::Right => (Some(key), upper),
                };
                heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
            }

            let height = 1 + heights[0].max(heights[1]);
            assert_eq!(
                T::links(node).as_ref().height(),
                height,
                "cached height of {key:?} is stale"
            );

            if S::BALANCED {
                assert!(
                    heights[0].abs_diff(heights[1]) <= 1,
                    "{key:?} is unbalanced: left height {}, right height {}",
                    heights[0],
                    heights[1],
                );
            }

            height
        }
    }

    /// Returns `true` if the tree contains a node with the given key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let root = self.root?;

        unsafe {
            let (first, _) = min_in_subtree(root);
            Some(Pin::new_unchecked(first.as_ref()))
        }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let mut cur = self.root?;

        unsafe {
            while let Some(right) = T::links(cur).as_ref().right() {
                cur = right;
            }

            Some(Pin::new_unchecked(cur.as_ref()))
        }
    }

    /// Returns an in-order iterator over the elements of the tree.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.root, self.len)
    }

    /// Returns a breadth-first iterator over every `(parent, child)` edge of the tree.
    ///
    /// The iterator is lazy and can be restarted by cloning it before use or by calling this
    /// method again.
    pub fn edges(&self) -> Edges<'_, T> {
        Edges::new(self.root)
    }

    /// Returns the edges of the tree as `(parent, child)` node identifiers.
    ///
    /// A node's identifier is the [`Display`](fmt::Display) rendering of its key.
    pub fn edge_ids(&self) -> impl Iterator<Item = (String, String)> + Clone + '_
    where
        T::Key: fmt::Display,
    {
        self.edges()
            .map(|(parent, child)| (parent.key().to_string(), child.key().to_string()))
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains an item with an equal key, the tree is left untouched and
    /// `item` is handed back.
    ///
    /// This operation completes in _O(log(n))_ time for [`Avl`] trees.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe {
            let links = T::links(ptr).as_mut();
            links.set_parent(None);
            links.set_left(None);
            links.set_right(None);
            links.set_height(1);
        }

        let Some(root) = self.root else {
            // Tree is empty. Set `item` as the root and return.
            self.root = Some(ptr);
            self.len += 1;
            return None;
        };

        let key = unsafe { ptr.as_ref().key() };
        let mut cur = root;

        // Descend the tree, looking for a vacant child slot.
        let parent = loop {
            let dir = match unsafe { cur.as_ref().compare(key) } {
                Ordering::Less => Dir::Left,
                Ordering::Greater => Dir::Right,
                Ordering::Equal => {
                    tracing::trace!(?key, "duplicate key, leaving tree unchanged");
                    return Some(unsafe { T::from_ptr(ptr) });
                }
            };

            unsafe {
                let cur_links = T::links(cur).as_mut();
                match cur_links.child(dir) {
                    // Descend.
                    Some(child) => cur = child,

                    // Set `item` as child.
                    None => {
                        cur_links.set_child(dir, Some(ptr));
                        T::links(ptr).as_mut().set_parent(Some(cur));
                        break cur;
                    }
                }
            }
        };

        unsafe { S::rebalance_inserted(parent) };
        self.len += 1;

        self.rederive_root();

        None
    }

    // Restores `self.root` after a restructuring may have moved the old root down.
    //
    // Climbs parent pointers from the current root until reaching a node with no parent.
    pub(crate) fn rederive_root(&mut self) {
        let Some(mut top) = self.root else {
            return;
        };

        while let Some(parent) = unsafe { T::links(top).as_ref().parent() } {
            top = parent;
        }

        self.root = Some(top);
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    /// Clears the tree, removing and dropping all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = min_in_subtree(cur);
                let parent = parent.or_else(|| T::links(cur).as_ref().parent());

                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }
}

impl<T, S> Default for SearchTree<T, S>
where
    T: TreeNode<Links<T>> + ?Sized,
    S: Balance,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Drop for SearchTree<T, S>
where
    T: TreeNode<Links<T>> + ?Sized,
    S: Balance,
{
    fn drop(&mut self) {
        self.clear();
    }
}

// Returns the minimum node in the subtree.
//
// If the subtree root is not the minimum, also returns the minimum node's parent.
#[inline]
pub(crate) unsafe fn min_in_subtree<T>(root: NonNull<T>) -> (NonNull<T>, Link<T>)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let mut parent = None;
    let mut cur = root;

    while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
        parent = Some(cur);
        cur = left;
    }

    (cur, parent)
}

/// Returns the cached height of the pointed-to node, or 0 for a missing node.
#[inline]
pub(crate) unsafe fn height_of<T>(node: Link<T>) -> usize
where
    T: TreeNode<Links<T>> + ?Sized,
{
    node.map(|n| unsafe { T::links(n).as_ref().height() })
        .unwrap_or(0)
}

pub(crate) unsafe fn which_child<T>(parent: NonNull<T>, child: NonNull<T>) -> Dir
where
    T: TreeNode<Links<T>> + ?Sized,
{
    if unsafe { T::links(parent).as_ref().left() } == Some(child) {
        Dir::Left
    } else {
        Dir::Right
    }
}

// Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
//
// `new_child`'s parent pointer is not updated.
//
// # Safety
//
// The caller must ensure that the following conditions hold:
// - `old_child` is a child node of `parent`.
// - `new_child` is not a child node of `parent`.
pub(crate) unsafe fn replace_child<T>(
    parent: NonNull<T>,
    old_child: NonNull<T>,
    new_child: Link<T>,
)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let parent_links = T::links(parent).as_mut();
        if parent_links.left() == Some(old_child) {
            parent_links.set_left(new_child);
        } else {
            debug_assert_eq!(
                parent_links.right(),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            parent_links.set_right(new_child);
        }
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 1,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    pub(crate) fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    pub(crate) fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    pub(crate) fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    pub(crate) fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    pub(crate) fn set_height(&mut self, height: usize) {
        self.inner.get_mut().height = height;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("height", &self.height())
            .field("is_leaf", &self.is_leaf())
            .finish()
    }
}
