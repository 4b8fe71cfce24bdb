//! `LinkedPtr<T>` is a shared-ownership smart pointer that keeps track of its owners without a reference count.
//!
//! Instead of a counter, every `LinkedPtr` is a node of an intrusive circular doubly linked list, and all handles
//! that own the same resource are linked into one cycle. Cloning a handle splices the clone into the cycle.
//! Dropping or resetting a handle unlinks it, and the handle that finds itself alone in its cycle releases the
//! resource. There is no shared counter allocation and no atomic operation anywhere.
//!
//! The price is that the owner count is a walk over the cycle, and that handles are strictly single-threaded.
//!
//! Handles of related resource types can share one cycle through [`Upcast`], and the way a resource is released
//! is pluggable through [`Deleter`].
//!
//! ```
//! use linked_ptr::LinkedPtr;
//!
//! let h1 = LinkedPtr::new(String::from("resource"));
//! let h2 = h1.clone();
//! let mut h3 = LinkedPtr::<String>::null();
//! LinkedPtr::assign(&mut h3, &h2);
//! assert_eq!(LinkedPtr::use_count(&h1), 3);
//!
//! drop(h2);
//! assert_eq!(LinkedPtr::use_count(&h3), 2);
//! assert_eq!(*h3, "resource");
//! ```

#![cfg_attr(all(feature = "nostd", not(test)), no_std)]

extern crate alloc;

pub mod deleter;
mod link;
pub mod linked;
pub mod upcast;

pub use crate::deleter::{DefaultDelete, Deleter, NoopDelete};
pub use crate::linked::{make_linked, LinkedPtr};
pub use crate::upcast::Upcast;
