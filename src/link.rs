use alloc::boxed::Box;
use core::{cell::Cell, ptr::NonNull};

/// One node of the circular doubly linked list threaded through every
/// `LinkedPtr` that shares a resource.
///
/// `previous` and `next` never own anything and are never null: a node that
/// is alone points at itself in both directions. Every node in a cycle is
/// kept alive by the handle that allocated it, and a handle only frees its
/// node after leaving the cycle, so following either pointer from a live node
/// always lands on a live node.
pub(crate) struct Link {
    previous: Cell<NonNull<Link>>,
    next: Cell<NonNull<Link>>,
}

impl Link {
    /// Allocate a node that forms a cycle of one.
    ///
    /// The node lives behind its own allocation so that the handle owning it
    /// can be moved without invalidating the pointers its siblings hold.
    pub(crate) fn allocate() -> NonNull<Link> {
        let node = NonNull::from(Box::leak(Box::new(Link {
            previous: Cell::new(NonNull::dangling()),
            next: Cell::new(NonNull::dangling()),
        })));
        unsafe { node.as_ref() }.make_singleton();
        node
    }

    /// Release a node obtained from [`Link::allocate`].
    ///
    /// # Safety
    /// The node must be alone in its cycle and must not be used again.
    pub(crate) unsafe fn free(node: NonNull<Link>) {
        debug_assert!(node.as_ref().is_unique());
        drop(Box::from_raw(node.as_ptr()));
    }

    #[inline]
    fn this(&self) -> NonNull<Link> {
        NonNull::from(self)
    }

    #[inline]
    pub(crate) fn next(&self) -> &Link {
        unsafe { self.next.get().as_ref() }
    }

    #[inline]
    pub(crate) fn previous(&self) -> &Link {
        unsafe { self.previous.get().as_ref() }
    }

    #[inline]
    fn make_singleton(&self) {
        self.previous.set(self.this());
        self.next.set(self.this());
    }

    /// True when this node is the only member of its cycle.
    #[inline]
    pub(crate) fn is_unique(&self) -> bool {
        self.next.get() == self.this()
    }

    /// Number of nodes in this node's cycle. Walks the whole cycle.
    pub(crate) fn count(&self) -> usize {
        let mut count = 1;
        let mut current = self.next();
        while !core::ptr::eq(current, self) {
            count += 1;
            current = current.next();
        }
        count
    }

    /// Unlink this node from its cycle, leaving its neighbours joined to each
    /// other and this node alone. A no-op on a node that is already alone.
    pub(crate) fn isolate(&self) {
        if self.is_unique() {
            return;
        }
        let previous = self.previous();
        let next = self.next();
        previous.next.set(next.this());
        next.previous.set(previous.this());
        self.make_singleton();
    }

    /// Insert this node directly after `other`, joining `other`'s cycle.
    ///
    /// This node must be alone.
    pub(crate) fn splice_after(&self, other: &Link) {
        debug_assert!(self.is_unique());
        let next = other.next();
        self.next.set(next.this());
        next.previous.set(self.this());
        self.previous.set(other.this());
        other.next.set(self.this());
    }

    /// Move this node into the slot `other` holds in its cycle, leaving
    /// `other` alone.
    ///
    /// This node must be alone and `other` must not be.
    pub(crate) fn take_place_of(&self, other: &Link) {
        debug_assert!(self.is_unique());
        debug_assert!(!other.is_unique());
        let previous = other.previous();
        let next = other.next();
        self.previous.set(previous.this());
        self.next.set(next.this());
        next.previous.set(self.this());
        previous.next.set(self.this());
        other.make_singleton();
    }

    /// Trade slots with `other`: each node ends up in the cycle the other one
    /// left.
    ///
    /// Neither node may be alone, and the two must belong to different cycles.
    pub(crate) fn exchange_places(&self, other: &Link) {
        debug_assert!(!self.is_unique());
        debug_assert!(!other.is_unique());
        let (a_previous, a_next) = (self.previous(), self.next());
        let (b_previous, b_next) = (other.previous(), other.next());

        a_next.previous.set(other.this());
        a_previous.next.set(other.this());
        b_next.previous.set(self.this());
        b_previous.next.set(self.this());

        self.previous.set(b_previous.this());
        self.next.set(b_next.this());
        other.previous.set(a_previous.this());
        other.next.set(a_next.this());
    }

    /// Walk the cycle checking that `previous` and `next` are inverses.
    #[cfg(test)]
    pub(crate) fn is_well_formed(&self) -> bool {
        let mut current = self;
        loop {
            if !core::ptr::eq(current.next().previous(), current) {
                return false;
            }
            current = current.next();
            if core::ptr::eq(current, self) {
                return true;
            }
        }
    }

    /// Whether `other` is reachable from this node.
    #[cfg(test)]
    pub(crate) fn contains(&self, other: &Link) -> bool {
        let mut current = self;
        loop {
            if core::ptr::eq(current, other) {
                return true;
            }
            current = current.next();
            if core::ptr::eq(current, self) {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Link;
    use core::ptr::NonNull;

    fn nodes<const N: usize>() -> [NonNull<Link>; N] {
        [(); N].map(|_| Link::allocate())
    }

    fn release(nodes: &[NonNull<Link>]) {
        for node in nodes {
            unsafe {
                node.as_ref().isolate();
                Link::free(*node);
            }
        }
    }

    fn at<'a>(node: NonNull<Link>) -> &'a Link {
        unsafe { node.as_ref() }
    }

    #[test]
    fn fresh_node_is_alone() {
        let [a] = nodes::<1>();
        assert!(at(a).is_unique());
        assert_eq!(at(a).count(), 1);
        assert!(at(a).is_well_formed());
        release(&[a]);
    }

    #[test]
    fn splice_grows_the_cycle() {
        let [a, b, c] = nodes::<3>();
        at(b).splice_after(at(a));
        at(c).splice_after(at(b));
        for node in [a, b, c] {
            assert_eq!(at(node).count(), 3);
            assert!(!at(node).is_unique());
            assert!(at(node).is_well_formed());
        }
        assert!(core::ptr::eq(at(a).next(), at(b)));
        assert!(core::ptr::eq(at(b).next(), at(c)));
        assert!(core::ptr::eq(at(c).next(), at(a)));
        release(&[a, b, c]);
    }

    #[test]
    fn isolate_relinks_neighbours() {
        let [a, b, c] = nodes::<3>();
        at(b).splice_after(at(a));
        at(c).splice_after(at(b));

        at(b).isolate();
        assert!(at(b).is_unique());
        assert_eq!(at(a).count(), 2);
        assert!(core::ptr::eq(at(a).next(), at(c)));
        assert!(core::ptr::eq(at(c).previous(), at(a)));
        assert!(at(a).is_well_formed());

        // Isolating a lone node changes nothing.
        at(b).isolate();
        assert!(at(b).is_unique());
        release(&[a, b, c]);
    }

    #[test]
    fn take_place_of_in_pair() {
        let [a, b, lone] = nodes::<3>();
        at(b).splice_after(at(a));

        at(lone).take_place_of(at(b));
        assert!(at(b).is_unique());
        assert_eq!(at(a).count(), 2);
        assert!(core::ptr::eq(at(a).next(), at(lone)));
        assert!(core::ptr::eq(at(a).previous(), at(lone)));
        assert!(at(lone).is_well_formed());
        release(&[a, b, lone]);
    }

    #[test]
    fn exchange_places_between_cycles() {
        let [a, a2, a3, b, b2] = nodes::<5>();
        at(a2).splice_after(at(a));
        at(a3).splice_after(at(a2));
        at(b2).splice_after(at(b));

        at(a).exchange_places(at(b));

        assert_eq!(at(a).count(), 2);
        assert_eq!(at(b).count(), 3);
        assert!(at(a).contains(at(b2)));
        assert!(at(b).contains(at(a2)));
        assert!(at(b).contains(at(a3)));
        assert!(!at(a).contains(at(a2)));
        for node in [a, a2, a3, b, b2] {
            assert!(at(node).is_well_formed());
        }

        at(a).exchange_places(at(b));
        assert_eq!(at(a).count(), 3);
        assert!(at(a).contains(at(a3)));
        assert!(at(b).contains(at(b2)));
        release(&[a, a2, a3, b, b2]);
    }
}
