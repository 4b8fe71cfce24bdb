use core::ptr::NonNull;

/// Capability for a resource type to be viewed as another resource type
/// while staying the same object.
///
/// This is what lets a `LinkedPtr<Circle>` and a `LinkedPtr<dyn Shape>` be
/// owners in the same group. Implement it with the [`upcast!`](crate::upcast!)
/// macro for unsizing conversions; every type is trivially an upcast of
/// itself.
///
/// # Safety
/// `upcast` must return a pointer to the same object (same data address), and
/// releasing that pointer with the target handle's deleter must be equivalent
/// to releasing the original.
pub unsafe trait Upcast<U: ?Sized> {
    fn upcast(ptr: NonNull<Self>) -> NonNull<U>;
}

unsafe impl<T: ?Sized> Upcast<T> for T {
    #[inline(always)]
    fn upcast(ptr: NonNull<T>) -> NonNull<T> {
        ptr
    }
}

/// Declare an unsizing [`Upcast`] from a concrete type to a trait object or
/// slice type.
///
/// ```
/// use linked_ptr::{upcast, LinkedPtr};
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.0 * self.0
///     }
/// }
///
/// upcast!(Square => dyn Shape);
///
/// let square = LinkedPtr::new(Square(2.0));
/// let shape: LinkedPtr<dyn Shape> = LinkedPtr::upcast(&square);
/// assert_eq!(shape.area(), 4.0);
/// assert_eq!(LinkedPtr::use_count(&square), 2);
/// assert!(square == shape);
/// ```
#[macro_export]
macro_rules! upcast {
    ($($from:ty => $to:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::Upcast<$to> for $from {
                #[inline(always)]
                fn upcast(ptr: ::core::ptr::NonNull<Self>) -> ::core::ptr::NonNull<$to> {
                    ptr
                }
            }
        )+
    };
}
