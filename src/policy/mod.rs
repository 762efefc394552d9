//! Dispatch policies route container operations to the installed strategy.
//!
//! [`Direct`] keeps a reference to the payload's [`Descriptor`](crate::descriptor::Descriptor).
//! [`Driven`] keeps a reference to a shared driver object that also answers
//! conversion queries (see [`ConvertPolicy`]).
//! Both keep the payload in an [`InlineBuffer`](crate::buffer::InlineBuffer) of the configured size and alignment.

use core::any::{Any, TypeId};

use crate::{
    buffer::RawBuffer,
    error::AllocError,
    strategy::{StorageMode, Strategy},
};

mod direct;
mod driven;

pub use self::{direct::Direct, driven::Driven};

/// Storage plus dispatch state of a container.
///
/// The container front-end only talks to its payload through this trait.
/// Empty state and payload state always change together:
/// a policy is never observed with a descriptor that doesn't match its buffer.
///
/// # Safety
///
/// Implementors must dispatch every operation to the strategy last passed to
/// [`install`](Policy::install), or act as empty when none is installed.
/// Dropping the policy must drop the payload.
pub unsafe trait Policy: Sized + 'static {
    /// Inline storage the payload lives in.
    type Buffer: RawBuffer;

    /// Empty state. Doesn't allocate.
    fn empty() -> Self;

    /// Mutable storage of the payload.
    ///
    /// # Safety
    ///
    /// The caller must not invalidate a live payload.
    unsafe fn buffer_mut(&mut self) -> &mut Self::Buffer;

    /// Starts dispatching to strategy `S`.
    ///
    /// # Safety
    ///
    /// The policy must be empty and the buffer must have been initialized by `S`.
    unsafe fn install<S: Strategy<Self::Buffer>>(&mut self);

    /// Returns to the empty state without dropping anything.
    ///
    /// # Safety
    ///
    /// The payload must have been moved out of the buffer already.
    unsafe fn clear(&mut self);

    /// Storage mode of the payload, `None` if empty.
    fn mode(&self) -> Option<StorageMode>;

    /// Type id of the payload, or of [`Void`](crate::descriptor::Void) if empty.
    fn type_id(&self) -> TypeId;

    /// Type name of the payload, `"void"` if empty.
    fn type_name(&self) -> &'static str;

    /// Clones the payload into a new state.
    fn try_clone(&self) -> Result<Self, AllocError>;

    /// Moves the payload into a new state, leaving this one empty.
    fn relocate(&mut self) -> Self;

    /// Drops the payload, leaving this state empty.
    fn destroy(&mut self);

    /// Address of the payload, null if empty.
    fn as_ptr(&self) -> *const u8;

    /// Mutable address of the payload, null if empty.
    fn as_mut_ptr(&mut self) -> *mut u8;
}

/// Policy that can convert its payload to other types.
///
/// # Safety
///
/// `convert_into` must only store values of the type `target` holds.
pub unsafe trait ConvertPolicy: Policy {
    /// Writes the payload, converted, into `target`, which is an `Option<U>`
    /// for the requested `U`. Returns `true` on success.
    fn convert_into(&self, target: &mut dyn Any) -> bool;
}
