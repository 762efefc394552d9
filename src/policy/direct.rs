use core::{any::TypeId, mem};

use crate::{
    buffer::{Alignment, InlineBuffer, PointerAlign, RawBuffer, POINTER_SIZE},
    descriptor::Descriptor,
    error::AllocError,
    strategy::{StorageMode, Strategy},
};

use super::Policy;

/// Dispatch straight through the payload's descriptor.
///
/// One pointer plus `SIZE` bytes of inline storage aligned as `A`.
pub struct Direct<const SIZE: usize = { POINTER_SIZE }, A: Alignment = PointerAlign> {
    descriptor: &'static Descriptor<InlineBuffer<SIZE, A>>,
    buffer: InlineBuffer<SIZE, A>,
}

impl<const SIZE: usize, A: Alignment> Drop for Direct<SIZE, A> {
    #[inline(always)]
    fn drop(&mut self) {
        self.destroy();
    }
}

unsafe impl<const SIZE: usize, A: Alignment> Policy for Direct<SIZE, A> {
    type Buffer = InlineBuffer<SIZE, A>;

    #[inline(always)]
    fn empty() -> Self {
        Direct {
            descriptor: Descriptor::EMPTY,
            buffer: InlineBuffer::uninit(),
        }
    }

    #[inline(always)]
    unsafe fn buffer_mut(&mut self) -> &mut Self::Buffer {
        &mut self.buffer
    }

    #[inline(always)]
    unsafe fn install<S: Strategy<Self::Buffer>>(&mut self) {
        debug_assert!(self.descriptor.is_empty());
        self.descriptor = S::DESCRIPTOR;
    }

    #[inline(always)]
    unsafe fn clear(&mut self) {
        self.descriptor = Descriptor::EMPTY;
    }

    #[inline]
    fn mode(&self) -> Option<StorageMode> {
        self.descriptor.mode()
    }

    #[inline]
    fn type_id(&self) -> TypeId {
        self.descriptor.type_id()
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        self.descriptor.type_name()
    }

    fn try_clone(&self) -> Result<Self, AllocError> {
        let mut copy = Self::empty();

        // Safety: `copy.buffer` holds no value and the descriptor matches `self.buffer`.
        unsafe {
            (self.descriptor.clone)(&self.buffer, &mut copy.buffer)?;
        }
        copy.descriptor = self.descriptor;

        Ok(copy)
    }

    fn relocate(&mut self) -> Self {
        let mut moved = Self::empty();

        // Safety: `moved.buffer` holds no value and the descriptor matches `self.buffer`.
        unsafe {
            (self.descriptor.relocate)(&mut self.buffer, &mut moved.buffer);
        }
        moved.descriptor = mem::replace(&mut self.descriptor, Descriptor::EMPTY);

        moved
    }

    fn destroy(&mut self) {
        // Become empty first, so a panicking destructor can't cause a second drop.
        let descriptor = mem::replace(&mut self.descriptor, Descriptor::EMPTY);

        // Safety: The descriptor matches the buffer.
        unsafe {
            (descriptor.drop)(&mut self.buffer);
        }
    }

    #[inline]
    fn as_ptr(&self) -> *const u8 {
        // Safety: The descriptor matches the buffer.
        unsafe { (self.descriptor.as_ptr)(&self.buffer) }
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut u8 {
        // Safety: The descriptor matches the buffer.
        unsafe { (self.descriptor.as_mut)(&mut self.buffer) }
    }
}
