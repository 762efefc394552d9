//! This crate provides a type-erased value container, a replacement for `Box<dyn Any>`
//! that stores small values inline without heap allocation and can be cloned.
//!
//! [`AnyContainer`] holds at most one value of any `Clone + 'static` type.
//! Whether a value is stored inline ([`StorageMode::Value`]) or boxed
//! ([`StorageMode::Referential`]) is decided at compile time from its size and alignment
//! and the container's buffer configuration.
//! How operations are dispatched to the held value is chosen by a [`Policy`](policy::Policy):
//!
//! * [`Direct`](policy::Direct) dispatches through a per-type table of function pointers.
//!   [`SmallAny`] uses it with a pointer-sized buffer.
//! * [`Driven`](policy::Driven) dispatches through a shared driver object which can also
//!   convert the value to other types by pluggable [`Conversion`](convert::Conversion) rules.
//!   [`ConvertingAny`] uses it with lossless primitive conversions.
//!
//! ## Usage
//!
//! ```
//! use inany::{SmallAny, StorageMode};
//!
//! // u32 fits inline storage, so no allocation is performed.
//! let mut a = SmallAny::new(42u32);
//! assert_eq!(a.storage_mode(), Some(StorageMode::Value));
//!
//! // Get reference to the value.
//! let r: &u32 = a.downcast_ref::<u32>().unwrap();
//!
//! // Get mutable reference to the value.
//! let r: &mut u32 = a.downcast_mut::<u32>().unwrap();
//! *r += 1;
//!
//! // Containers are cloned with their value.
//! let b = a.clone();
//! assert_eq!(b.get::<u32>(), Ok(&43));
//!
//! // Wrong type is reported.
//! assert!(a.get::<i64>().is_err());
//!
//! // Take ownership of the value.
//! let Ok(v) = a.downcast::<u32>() else {
//!     panic!();
//! };
//! assert_eq!(v, 43);
//!
//! // Larger values are boxed.
//! let big = SmallAny::new([1u64; 4]);
//! assert_eq!(big.storage_mode(), Some(StorageMode::Referential));
//! ```
//!
//! Buffer size and alignment are configured on the policy:
//!
//! ```
//! use inany::{buffer::Align16, policy::Direct, AnyContainer, StorageMode};
//!
//! type Wide = AnyContainer<Direct<32, Align16>>;
//!
//! assert_eq!(Wide::mode_for::<[u64; 4]>(), StorageMode::Value);
//! assert_eq!(Wide::mode_for::<[u64; 5]>(), StorageMode::Referential);
//! ```
//!
//! ## Features
//!
//! * `tracing` (default): emit [`tracing`](https://docs.rs/tracing) events for
//!   out-of-line allocations, allocation failures and type mismatches.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod buffer;
pub mod convert;
pub mod descriptor;
pub mod policy;
pub mod strategy;

mod container;
mod error;
mod trace;

pub use self::{
    container::{AnyContainer, ConvertingAny, SmallAny},
    error::{AllocError, TypeMismatch},
    strategy::StorageMode,
};
