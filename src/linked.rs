use alloc::boxed::Box;
use core::{
    cmp::Ordering,
    fmt::{self, Debug, Pointer},
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::{self, ManuallyDrop},
    ops::Deref,
    ptr::{self, NonNull},
};

use log::trace;

use crate::{
    deleter::{DefaultDelete, Deleter},
    link::Link,
    upcast::Upcast,
};

/// `LinkedPtr` is a shared-ownership smart pointer that keeps no reference count.
///
/// Every `LinkedPtr` carries a node of a circular doubly linked list, and all
/// handles that own the same resource are linked into one cycle (a *group*).
/// Cloning a handle splices the clone into the group. Dropping or resetting a
/// handle unlinks it again; if it was the last member of its group, the
/// resource is handed to the handle's [`Deleter`].
///
/// Asking whether a handle is the last owner is O(1). Counting the owners
/// walks the group and is O(group size).
///
/// ## Clone behavior
/// A clone points at the same resource and joins the source's group. Cloning
/// an empty handle gives an independent empty handle.
///
/// ## Drop behavior
/// A dropped handle that still has siblings only relinks its two neighbours.
/// The last handle of a group releases the resource through its deleter,
/// exactly once.
///
/// ## Threads
/// There is no synchronization anywhere in the list maintenance, so
/// `LinkedPtr` is neither [`Send`] nor [`Sync`]:
/// ```compile_fail
/// use linked_ptr::LinkedPtr;
///
/// fn assert_send<T: Send>(_: T) {}
/// assert_send(LinkedPtr::new(100));
/// ```
///
/// ## [`Deref`] behavior
/// `LinkedPtr<T>` dereferences to `&T`. Dereferencing an empty handle panics;
/// use [`LinkedPtr::get`] to check first. To prevent name clashes with `T`,
/// `LinkedPtr`'s functions are associated.
///
/// ## Examples
/// ```
/// use linked_ptr::LinkedPtr;
///
/// let first = LinkedPtr::new(100);
/// let second = first.clone();
/// assert_eq!(*second, 100);
/// assert_eq!(LinkedPtr::use_count(&first), 2);
/// drop(second);
/// assert!(LinkedPtr::unique(&first));
/// ```
pub struct LinkedPtr<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    link: NonNull<Link>,
    stored: Option<NonNull<T>>,
    deleter: D,
    _owns: PhantomData<T>,
}

#[inline]
fn address<T: ?Sized>(ptr: Option<NonNull<T>>) -> *const () {
    ptr.map_or(ptr::null(), |p| p.as_ptr() as *const ())
}

impl<T> LinkedPtr<T> {
    /// Creates a new `LinkedPtr<T>` owning `value`, alone in its group.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let ptr = LinkedPtr::new(100);
    /// assert_eq!(*ptr, 100);
    /// ```
    #[inline]
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }

    /// Returns the inner value if this handle is the only owner.
    /// Otherwise, an [`Err`] is returned with the same `LinkedPtr` that was passed in.
    ///
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let ptr = LinkedPtr::new(100);
    /// let other = ptr.clone();
    /// let ptr = LinkedPtr::try_unwrap(ptr).unwrap_err();
    /// drop(other);
    /// assert_eq!(LinkedPtr::try_unwrap(ptr).ok(), Some(100));
    /// ```
    pub fn try_unwrap(this: Self) -> Result<T, Self> {
        let Some(ptr) = this.stored else {
            return Err(this);
        };
        if !this.link().is_unique() {
            return Err(this);
        }

        let this = ManuallyDrop::new(this);
        unsafe {
            Link::free(this.link);
            Ok(*Box::from_raw(ptr.as_ptr()))
        }
    }

    /// Returns the inner value if this handle is the only owner; otherwise the
    /// handle is dropped and [`None`] is returned.
    ///
    /// Calling `into_inner` on every member of a group hands the value to
    /// exactly one of them, the last.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let x = LinkedPtr::new(3);
    /// let y = x.clone();
    /// assert_eq!(LinkedPtr::into_inner(x), None);
    /// assert_eq!(LinkedPtr::into_inner(y), Some(3));
    /// ```
    #[inline]
    pub fn into_inner(this: Self) -> Option<T> {
        Self::try_unwrap(this).ok()
    }
}

impl<T: ?Sized> LinkedPtr<T> {
    /// Creates an empty `LinkedPtr`, alone in its group.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let ptr = LinkedPtr::<i32>::null();
    /// assert!(LinkedPtr::is_null(&ptr));
    /// assert_eq!(LinkedPtr::use_count(&ptr), 1);
    /// ```
    #[inline]
    pub fn null() -> Self {
        Self::null_in(DefaultDelete)
    }

    /// Takes ownership of a boxed resource.
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        Self::with_deleter(value, DefaultDelete)
    }

    /// Takes ownership of a raw resource. A null `ptr` gives an empty handle.
    ///
    /// Two handles built from the same raw pointer are *not* linked: sharing is
    /// only ever established by cloning or assigning from an existing handle.
    ///
    /// # Safety
    /// `ptr` must be null or come from [`Box::into_raw`], and nothing else may
    /// release it.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::from_raw_in(ptr, DefaultDelete)
    }
}

impl<T: ?Sized, D: Deleter<T>> LinkedPtr<T, D> {
    #[inline]
    fn from_parts(stored: Option<NonNull<T>>, deleter: D) -> Self {
        LinkedPtr {
            link: Link::allocate(),
            stored,
            deleter,
            _owns: PhantomData,
        }
    }

    /// Creates an empty handle that will release with `deleter` once it owns something.
    #[inline]
    pub fn null_in(deleter: D) -> Self {
        Self::from_parts(None, deleter)
    }

    /// Takes ownership of a boxed resource that `deleter` will release.
    #[inline]
    pub fn with_deleter(value: Box<T>, deleter: D) -> Self {
        Self::from_parts(Some(NonNull::from(Box::leak(value))), deleter)
    }

    /// Takes ownership of a raw resource that `deleter` will release.
    ///
    /// # Safety
    /// `ptr` must be null or valid for reads until `deleter` is called on it,
    /// and `deleter` must be able to release it.
    #[inline]
    pub unsafe fn from_raw_in(ptr: *mut T, deleter: D) -> Self {
        Self::from_parts(NonNull::new(ptr), deleter)
    }

    #[inline]
    pub(crate) fn link(&self) -> &Link {
        unsafe { self.link.as_ref() }
    }

    #[inline]
    fn address(&self) -> *const () {
        address(self.stored)
    }

    /// Leave the current group and hold `value` instead. The old resource is
    /// released only when this handle was its last owner.
    fn reset_to(&mut self, value: Option<NonNull<T>>) {
        if address(value) == self.address() {
            return;
        }
        if self.link().is_unique() {
            if let Some(old) = self.stored.take() {
                trace!(target: "linked_ptr", "releasing resource at {:p}", old);
                unsafe { self.deleter.delete(old) };
            }
        } else {
            trace!(target: "linked_ptr", "leaving shared group of {:p}", self.address());
            self.link().isolate();
        }
        self.stored = value;
    }

    /// Build a handle around `stored` (the same object as this handle's
    /// resource) and link it into this handle's group.
    fn share_as<U: ?Sized, E: Deleter<U>>(
        &self,
        stored: Option<NonNull<U>>,
        deleter: E,
    ) -> LinkedPtr<U, E> {
        let shared = LinkedPtr::from_parts(stored, deleter);
        if stored.is_some() {
            shared.link().splice_after(self.link());
        }
        shared
    }

    /// Makes `this` an owner of `other`'s resource, joining `other`'s group.
    ///
    /// Nothing happens when both already point at the same resource.
    /// Otherwise `this` first leaves its group (releasing its resource if it
    /// was the last owner). `other` may hold any resource type that can be
    /// viewed as `T`.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let a = LinkedPtr::new(1);
    /// let mut b = LinkedPtr::new(2);
    /// LinkedPtr::assign(&mut b, &a);
    /// assert_eq!(*b, 1);
    /// assert_eq!(LinkedPtr::use_count(&a), 2);
    /// ```
    pub fn assign<U, E>(this: &mut Self, other: &LinkedPtr<U, E>)
    where
        U: ?Sized + Upcast<T>,
        E: Deleter<U>,
    {
        let incoming = other.stored.map(<U as Upcast<T>>::upcast);
        if address(incoming) == this.address() {
            return;
        }
        this.reset_to(incoming);
        if incoming.is_some() {
            this.link().splice_after(other.link());
        }
    }

    /// Creates a handle of a related resource type that joins this handle's
    /// group, like a clone seen through [`Upcast`].
    #[inline]
    pub fn upcast<U>(this: &Self) -> LinkedPtr<U, D>
    where
        U: ?Sized,
        T: Upcast<U>,
        D: Deleter<U> + Clone,
    {
        this.share_as(
            this.stored.map(<T as Upcast<U>>::upcast),
            this.deleter.clone(),
        )
    }

    /// Drops this handle's ownership and leaves it empty.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let mut ptr = LinkedPtr::new(100);
    /// LinkedPtr::reset(&mut ptr);
    /// assert!(LinkedPtr::is_null(&ptr));
    /// ```
    #[inline]
    pub fn reset(this: &mut Self) {
        this.reset_to(None);
    }

    /// Drops this handle's ownership and makes it the sole owner of `value`.
    #[inline]
    pub fn reset_with(this: &mut Self, value: Box<T>) {
        this.reset_to(Some(NonNull::from(Box::leak(value))));
    }

    /// Drops this handle's ownership and makes it the sole owner of a raw
    /// resource. Nothing happens if `ptr` is the resource already held.
    ///
    /// # Safety
    /// Same contract as [`LinkedPtr::from_raw_in`] for this handle's deleter.
    #[inline]
    pub unsafe fn reset_raw(this: &mut Self, ptr: *mut T) {
        this.reset_to(NonNull::new(ptr));
    }

    /// Exchanges the resources (and deleters) of two handles while keeping
    /// both groups intact. Each handle takes over the slot the other had in
    /// its group, so siblings of `this` now share with `other` and vice versa.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let mut a = LinkedPtr::new(1);
    /// let a2 = a.clone();
    /// let mut b = LinkedPtr::new(2);
    /// LinkedPtr::swap(&mut a, &mut b);
    /// assert_eq!((*a, *b), (2, 1));
    /// assert_eq!(LinkedPtr::use_count(&b), 2);
    /// assert!(b == a2);
    /// ```
    pub fn swap(this: &mut Self, other: &mut Self) {
        if this.address() == other.address() {
            return;
        }
        match (this.link().is_unique(), other.link().is_unique()) {
            (true, true) => {}
            (true, false) => this.link().take_place_of(other.link()),
            (false, true) => other.link().take_place_of(this.link()),
            (false, false) => this.link().exchange_places(other.link()),
        }
        mem::swap(&mut this.stored, &mut other.stored);
        mem::swap(&mut this.deleter, &mut other.deleter);
    }

    /// Borrow the resource, or [`None`] for an empty handle.
    #[inline]
    pub fn get(this: &Self) -> Option<&T> {
        this.stored.map(|p| unsafe { p.as_ref() })
    }

    /// Borrow the resource without checking that there is one.
    ///
    /// # Safety
    /// The handle must not be empty.
    #[inline]
    pub unsafe fn get_unchecked(this: &Self) -> &T {
        this.stored.unwrap_unchecked().as_ref()
    }

    /// Get a `&mut` reference to the resource if no other handle owns it.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let mut ptr = LinkedPtr::new(100);
    /// *LinkedPtr::get_mut(&mut ptr).unwrap() = 300;
    /// let other = ptr.clone();
    /// assert!(LinkedPtr::get_mut(&mut ptr).is_none());
    /// assert_eq!(*other, 300);
    /// ```
    #[inline]
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if !this.link().is_unique() {
            return None;
        }
        this.stored.map(|mut p| unsafe { p.as_mut() })
    }

    /// The raw resource pointer. Ownership is unaffected.
    #[inline]
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.stored
    }

    #[inline]
    pub fn is_null(this: &Self) -> bool {
        this.stored.is_none()
    }

    #[inline]
    pub fn is_some(this: &Self) -> bool {
        this.stored.is_some()
    }

    /// Number of handles in this handle's group, itself included. An empty
    /// handle is always alone, so this is 1 for it.
    ///
    /// This walks the whole group.
    #[inline]
    pub fn use_count(this: &Self) -> usize {
        this.link().count()
    }

    /// True when no other handle shares this handle's resource.
    #[inline]
    pub fn unique(this: &Self) -> bool {
        this.link().is_unique()
    }

    /// Checks whether two handles point at the same resource.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let a = LinkedPtr::new(100);
    /// let b = a.clone();
    /// assert!(LinkedPtr::ptr_eq(&a, &b));
    /// assert!(!LinkedPtr::ptr_eq(&a, &LinkedPtr::new(100)));
    /// ```
    #[inline]
    pub fn ptr_eq<U: ?Sized, E: Deleter<U>>(this: &Self, other: &LinkedPtr<U, E>) -> bool {
        this.address() == other.address()
    }

    #[inline]
    pub fn deleter(this: &Self) -> &D {
        &this.deleter
    }
}

/// Creates a `LinkedPtr` owning `value`. Same as [`LinkedPtr::from_box`].
#[inline]
pub fn make_linked<T: ?Sized>(value: Box<T>) -> LinkedPtr<T> {
    LinkedPtr::from_box(value)
}

impl<T: ?Sized, D: Deleter<T>> Drop for LinkedPtr<T, D> {
    #[inline]
    fn drop(&mut self) {
        self.reset_to(None);
        unsafe { Link::free(self.link) };
    }
}

impl<T: ?Sized, D: Deleter<T> + Clone> Clone for LinkedPtr<T, D> {
    /// Create another owner of the same resource, linked into this handle's group.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let ptr = LinkedPtr::new(100);
    /// let ptr2 = ptr.clone();
    /// assert_eq!(LinkedPtr::use_count(&ptr), LinkedPtr::use_count(&ptr2));
    /// ```
    #[inline]
    fn clone(&self) -> Self {
        self.share_as(self.stored, self.deleter.clone())
    }

    fn clone_from(&mut self, source: &Self) {
        LinkedPtr::assign(self, source);
        self.deleter.clone_from(&source.deleter);
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for LinkedPtr<T, D> {
    type Target = T;

    /// Borrow the resource.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    #[inline]
    fn deref(&self) -> &T {
        match self.stored {
            Some(p) => unsafe { p.as_ref() },
            None => panic!("dereferenced a null LinkedPtr"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for LinkedPtr<T, D> {
    #[inline]
    fn default() -> Self {
        Self::null_in(D::default())
    }
}

impl<T: ?Sized + Debug, D: Deleter<T>> Debug for LinkedPtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match LinkedPtr::get(self) {
            Some(value) => Debug::fmt(value, f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> Pointer for LinkedPtr<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Pointer::fmt(&self.address(), f)
    }
}

impl<T: ?Sized> From<Box<T>> for LinkedPtr<T> {
    #[inline]
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: Clone> From<&[T]> for LinkedPtr<[T]> {
    /// Copies the slice into a single block owned by the new handle.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let bytes = LinkedPtr::<[u8]>::from(&b"block"[..]);
    /// assert_eq!(&*bytes, b"block");
    /// ```
    fn from(value: &[T]) -> Self {
        Self::from_box(Box::from(value))
    }
}

impl From<&str> for LinkedPtr<str> {
    fn from(value: &str) -> Self {
        Self::from_box(Box::from(value))
    }
}

impl<T, U, D, E> PartialEq<LinkedPtr<U, E>> for LinkedPtr<T, D>
where
    T: ?Sized,
    U: ?Sized,
    D: Deleter<T>,
    E: Deleter<U>,
{
    /// Identity comparison: equal when both point at the same resource.
    /// ```
    /// use linked_ptr::LinkedPtr;
    ///
    /// let a = LinkedPtr::new(100);
    /// assert!(a == a.clone());
    /// assert!(a != LinkedPtr::new(100));
    /// ```
    #[inline]
    fn eq(&self, other: &LinkedPtr<U, E>) -> bool {
        self.address() == other.address()
    }
}

impl<T: ?Sized, D: Deleter<T>> Eq for LinkedPtr<T, D> {}

impl<T, U, D, E> PartialOrd<LinkedPtr<U, E>> for LinkedPtr<T, D>
where
    T: ?Sized,
    U: ?Sized,
    D: Deleter<T>,
    E: Deleter<U>,
{
    /// Orders handles by resource address. Empty handles sort first.
    #[inline]
    fn partial_cmp(&self, other: &LinkedPtr<U, E>) -> Option<Ordering> {
        self.address().partial_cmp(&other.address())
    }
}

impl<T: ?Sized, D: Deleter<T>> Ord for LinkedPtr<T, D> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.address().cmp(&other.address())
    }
}

impl<T: ?Sized, D: Deleter<T>> Hash for LinkedPtr<T, D> {
    /// Hashes the resource address, consistent with `==`.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl<T: ?Sized, D: Deleter<T>> Unpin for LinkedPtr<T, D> {}
