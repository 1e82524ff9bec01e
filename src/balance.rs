//! Insertion strategies.
//!
//! Conventions used in comments:
//! - The height of a node `n` is denoted `h(n)`; a missing node has height 0.
//! - `z` is the nearest ancestor of an insertion whose children's heights differ by 2.
//! - `y` is the taller child of `z` and `x` is the taller child of `y`.
//! - `a`, `b`, `c` are `x`, `y`, `z` sorted by key.
//! - `t0`..`t3` are the four subtrees hanging off `x`, `y` and `z`, in key order.

use core::ptr::NonNull;

use crate::{height_of, replace_child, Dir, Link, Links, TreeNode};

mod private {
    pub trait Sealed {}
}

/// The insertion strategy of a [`SearchTree`](crate::SearchTree).
///
/// This trait is sealed; the only strategies are [`Avl`] and [`Unbalanced`].
pub trait Balance: private::Sealed {
    /// Whether trees using this strategy maintain height balance.
    const BALANCED: bool;

    /// Repairs the tree after a new leaf was attached as a child of `parent`.
    ///
    /// # Safety
    ///
    /// `parent` must be a node of a well-formed tree whose only defect is the newly attached leaf:
    /// the leaf's links are correct, but no heights have been updated.
    #[doc(hidden)]
    unsafe fn rebalance_inserted<T>(parent: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized;
}

/// Maintains the AVL height balance with trinode restructuring.
#[derive(Copy, Clone, Debug, Default)]
pub struct Avl;

/// Plain binary search tree insertion. Heights are kept up to date but never acted upon.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unbalanced;

impl private::Sealed for Avl {}
impl private::Sealed for Unbalanced {}

impl Balance for Unbalanced {
    const BALANCED: bool = false;

    unsafe fn rebalance_inserted<T>(parent: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        unsafe { refresh_height(parent) };
    }
}

impl Balance for Avl {
    const BALANCED: bool = true;

    // Walks upward from `parent` looking for the nearest unbalanced ancestor `z`.
    //
    // Each node's balance is checked against its cached height before that height is refreshed,
    // so when `z` is reached, the child on the insertion path already carries its new height.
    unsafe fn rebalance_inserted<T>(parent: NonNull<T>)
    where
        T: TreeNode<Links<T>> + ?Sized,
    {
        let mut opt_cur = Some(parent);

        unsafe {
            while let Some(cur) = opt_cur {
                if !is_locally_balanced(cur) {
                    let z = cur;
                    let y = taller_child(z).expect("unbalanced node must have a child");
                    let x = taller_child(y).expect("taller child of unbalanced node is a leaf");

                    restructure(x, y, z);
                    return;
                }

                update_height(cur);
                opt_cur = T::links(cur).as_ref().parent();
            }

            // Reached the root without finding an imbalance.
            refresh_height(parent);
        }
    }
}

// Recomputes the height of `node` from its children.
#[inline]
unsafe fn update_height<T>(node: NonNull<T>)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_mut();
        let height = 1 + height_of(links.left()).max(height_of(links.right()));
        links.set_height(height);
    }
}

// Recomputes the height of `node`, then of each of its ancestors in turn.
unsafe fn refresh_height<T>(node: NonNull<T>)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let mut opt_cur = Some(node);

    while let Some(cur) = opt_cur {
        unsafe {
            update_height(cur);
            opt_cur = T::links(cur).as_ref().parent();
        }
    }
}

// Returns the child of `node` with the larger height, preferring the right child on a tie.
//
// Returns `None` only if `node` is a leaf.
unsafe fn taller_child<T>(node: NonNull<T>) -> Link<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_ref();
        match (links.left(), links.right()) {
            (None, right) => right,
            (left, None) => left,
            (Some(left), Some(right)) => {
                if height_of(Some(left)) > height_of(Some(right)) {
                    Some(left)
                } else {
                    Some(right)
                }
            }
        }
    }
}

// Returns `true` if the cached heights of `node`'s children differ by at most 1.
unsafe fn is_locally_balanced<T>(node: NonNull<T>) -> bool
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_ref();
        height_of(links.left()).abs_diff(height_of(links.right())) <= 1
    }
}

// Relinks `x`, `y` and `z` so that the median of the three becomes the root of the subtree
// formerly rooted at `z`.
//
// All four rotation cases fall out of sorting by key: the sorted nodes `a < b < c` become `b`
// with children `a` and `c`, and the outer subtrees, collected in key order, become the children
// of `a` and `c`.
unsafe fn restructure<T>(x: NonNull<T>, y: NonNull<T>, z: NonNull<T>)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let mut trio = [x, y, z];
        trio.sort_by(|p, q| p.as_ref().key().cmp(q.as_ref().key()));
        let [a, b, c] = trio;

        tracing::trace!(
            a = ?a.as_ref().key(),
            b = ?b.as_ref().key(),
            c = ?c.as_ref().key(),
            "trinode restructure"
        );

        // Exactly two of the six child slots link members of the trio (z-y and y-x).
        let mut outer: [Link<T>; 4] = [None; 4];
        let mut n = 0;
        for node in trio {
            for dir in [Dir::Left, Dir::Right] {
                let child = T::links(node).as_ref().child(dir);
                if child.map_or(true, |child| !trio.contains(&child)) {
                    outer[n] = child;
                    n += 1;
                }
            }
        }
        assert_eq!(n, 4, "trinode restructure found {n} outer subtrees");
        let [t0, t1, t2, t3] = outer;

        let z_parent = T::links(z).as_ref().parent();

        // `b` takes the place of `z`.
        if let Some(p) = z_parent {
            replace_child(p, z, Some(b));
        }

        link(b, Dir::Left, Some(a));
        link(b, Dir::Right, Some(c));
        link(a, Dir::Left, t0);
        link(a, Dir::Right, t1);
        link(c, Dir::Left, t2);
        link(c, Dir::Right, t3);
        T::links(b).as_mut().set_parent(z_parent);

        refresh_height(a);
        refresh_height(c);
        refresh_height(b);
        if let Some(p) = z_parent {
            refresh_height(p);
        }
    }
}

// Sets `child` as the `dir` child of `parent`, along with its parent pointer.
#[inline]
unsafe fn link<T>(parent: NonNull<T>, dir: Dir, child: Link<T>)
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        T::links(parent).as_mut().set_child(dir, child);
        if let Some(child) = child {
            T::links(child).as_mut().set_parent(Some(parent));
        }
    }
}
