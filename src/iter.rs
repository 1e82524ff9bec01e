use core::{fmt, marker::PhantomData, ptr::NonNull};
use std::collections::VecDeque;

use crate::{min_in_subtree, which_child, Dir, Link, Links, TreeNode};

/// An in-order iterator over the elements of a [`SearchTree`](crate::SearchTree).
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    next: Link<T>,
    len: usize,
    _tree: PhantomData<&'tree T>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(root: Link<T>, len: usize) -> Self {
        Iter {
            next: root.map(|root| unsafe { min_in_subtree(root).0 }),
            len,
            _tree: PhantomData,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        unsafe {
            self.next = match T::links(cur).as_ref().right() {
                // The successor is the minimum of the right subtree.
                Some(right) => Some(min_in_subtree(right).0),

                // Otherwise, ascend until arriving from a left child.
                None => {
                    let mut child = cur;
                    loop {
                        match T::links(child).as_ref().parent() {
                            Some(parent) if which_child(parent, child) == Dir::Right => {
                                child = parent;
                            }
                            parent => break parent,
                        }
                    }
                }
            };

            self.len -= 1;
            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'tree, T> {}

/// A breadth-first iterator over the `(parent, child)` edges of a
/// [`SearchTree`](crate::SearchTree).
///
/// Every node except the root appears exactly once as a child.
pub struct Edges<'tree, T: TreeNode<Links<T>> + ?Sized> {
    // Nodes whose outgoing edges have not yet been yielded.
    queue: VecDeque<NonNull<T>>,
    // The node currently being expanded, and the next child slot to look at.
    cur: Option<(NonNull<T>, Dir)>,
    _tree: PhantomData<&'tree T>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Edges<'tree, T> {
    pub(crate) fn new(root: Link<T>) -> Self {
        Edges {
            queue: root.into_iter().collect(),
            cur: None,
            _tree: PhantomData,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Edges<'tree, T> {
    type Item = (&'tree T, &'tree T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (parent, dir) = match self.cur {
                Some(cur) => cur,
                None => (self.queue.pop_front()?, Dir::Left),
            };

            self.cur = match dir {
                Dir::Left => Some((parent, Dir::Right)),
                Dir::Right => None,
            };

            if let Some(child) = unsafe { T::links(parent).as_ref().child(dir) } {
                self.queue.push_back(child);
                return Some(unsafe { (parent.as_ref(), child.as_ref()) });
            }
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Clone for Edges<'tree, T> {
    fn clone(&self) -> Self {
        Edges {
            queue: self.queue.clone(),
            cur: self.cur,
            _tree: PhantomData,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> fmt::Debug for Edges<'tree, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edges")
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}
