use alloc::boxed::Box;
use core::ptr::NonNull;

/// The release policy of a `LinkedPtr`.
///
/// A deleter is invoked exactly once per resource, by whichever handle is the
/// last member of its group when that handle is reset or dropped.
///
/// Any `FnMut(NonNull<T>)` closure is a deleter:
/// ```
/// use std::cell::Cell;
/// use std::ptr::NonNull;
/// use linked_ptr::LinkedPtr;
///
/// let released = Cell::new(false);
/// let ptr = LinkedPtr::with_deleter(Box::new(7), |p: NonNull<i32>| {
///     released.set(true);
///     drop(unsafe { Box::from_raw(p.as_ptr()) });
/// });
/// drop(ptr);
/// assert!(released.get());
/// ```
pub trait Deleter<T: ?Sized> {
    /// Release the resource behind `ptr`.
    ///
    /// # Safety
    /// `ptr` must be the resource the owning group was built around, and no
    /// handle may refer to it afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Releases resources that were allocated as a [`Box`].
///
/// Slice and `str` resources are released as one block, which covers the
/// type-erased byte buffer case.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        drop(Box::from_raw(ptr.as_ptr()));
    }
}

/// Never releases anything. Useful for sharing `'static` or externally owned
/// data through the same handle type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoopDelete;

impl<T: ?Sized> Deleter<T> for NoopDelete {
    #[inline]
    unsafe fn delete(&mut self, _ptr: NonNull<T>) {}
}

impl<T: ?Sized, F: FnMut(NonNull<T>)> Deleter<T> for F {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}
