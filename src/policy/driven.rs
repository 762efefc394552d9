use core::{
    any::{type_name, Any, TypeId},
    marker::PhantomData,
    mem, ptr,
};

use crate::{
    buffer::{Alignment, InlineBuffer, PointerAlign, RawBuffer, POINTER_SIZE},
    convert::{Conversion, Widening},
    descriptor::Void,
    error::AllocError,
    strategy::{StorageMode, Strategy},
};

use super::{ConvertPolicy, Policy};

/// Shared, address-stable object that operates on one payload type.
///
/// Every method that takes a buffer requires it to have been initialized by the
/// driver's strategy.
trait Driver<B>: 'static {
    fn mode(&self) -> Option<StorageMode>;
    fn payload_type_id(&self) -> TypeId;
    fn payload_type_name(&self) -> &'static str;
    unsafe fn clone_into(&self, src: &B, dst: &mut B) -> Result<(), AllocError>;
    unsafe fn relocate(&self, src: &mut B, dst: &mut B);
    unsafe fn destroy(&self, buffer: &mut B);
    unsafe fn as_ptr(&self, buffer: &B) -> *const u8;
    unsafe fn as_mut(&self, buffer: &mut B) -> *mut u8;
    unsafe fn convert_into(&self, buffer: &B, target: &mut dyn Any) -> bool;
}

/// Driver of an empty container.
struct Idle;

impl<B: RawBuffer> Driver<B> for Idle {
    fn mode(&self) -> Option<StorageMode> {
        None
    }

    fn payload_type_id(&self) -> TypeId {
        TypeId::of::<Void>()
    }

    fn payload_type_name(&self) -> &'static str {
        "void"
    }

    unsafe fn clone_into(&self, _src: &B, _dst: &mut B) -> Result<(), AllocError> {
        Ok(())
    }

    unsafe fn relocate(&self, _src: &mut B, _dst: &mut B) {}

    unsafe fn destroy(&self, _buffer: &mut B) {}

    unsafe fn as_ptr(&self, _buffer: &B) -> *const u8 {
        ptr::null()
    }

    unsafe fn as_mut(&self, _buffer: &mut B) -> *mut u8 {
        ptr::null_mut()
    }

    unsafe fn convert_into(&self, _buffer: &B, _target: &mut dyn Any) -> bool {
        false
    }
}

#[inline(always)]
fn idle<B: RawBuffer>() -> &'static dyn Driver<B> {
    &Idle
}

/// Driver delegating to strategy `S`, converting with rules `C`.
struct Driving<B, S, C>(PhantomData<fn() -> (B, S, C)>);

impl<B, S, C> Driving<B, S, C>
where
    B: RawBuffer,
    S: Strategy<B>,
    C: Conversion,
{
    const DRIVER: &'static dyn Driver<B> = &Driving::<B, S, C>(PhantomData);
}

impl<B, S, C> Driver<B> for Driving<B, S, C>
where
    B: RawBuffer,
    S: Strategy<B>,
    C: Conversion,
{
    fn mode(&self) -> Option<StorageMode> {
        Some(S::MODE)
    }

    fn payload_type_id(&self) -> TypeId {
        TypeId::of::<S::Payload>()
    }

    fn payload_type_name(&self) -> &'static str {
        type_name::<S::Payload>()
    }

    unsafe fn clone_into(&self, src: &B, dst: &mut B) -> Result<(), AllocError> {
        unsafe { S::clone_into(src, dst) }
    }

    unsafe fn relocate(&self, src: &mut B, dst: &mut B) {
        unsafe { S::relocate(src, dst) }
    }

    unsafe fn destroy(&self, buffer: &mut B) {
        unsafe { S::drop(buffer) }
    }

    unsafe fn as_ptr(&self, buffer: &B) -> *const u8 {
        unsafe { S::as_ptr(buffer) }
    }

    unsafe fn as_mut(&self, buffer: &mut B) -> *mut u8 {
        unsafe { S::as_mut(buffer) }
    }

    unsafe fn convert_into(&self, buffer: &B, target: &mut dyn Any) -> bool {
        // Safety: The buffer was initialized by `S`.
        let value: &S::Payload = unsafe { &*S::as_ptr(buffer).cast() };

        // Exact type is always retrievable.
        if let Some(slot) = target.downcast_mut::<Option<S::Payload>>() {
            *slot = Some(value.clone());
            return true;
        }

        C::convert(value, target)
    }
}

/// Dispatch through a shared driver object that also converts the payload.
///
/// One fat pointer plus `SIZE` bytes of inline storage aligned as `A`,
/// regardless of which conversion rules `C` are plugged in.
pub struct Driven<const SIZE: usize = { POINTER_SIZE }, A: Alignment = PointerAlign, C: Conversion = Widening> {
    driver: &'static dyn Driver<InlineBuffer<SIZE, A>>,
    buffer: InlineBuffer<SIZE, A>,
    conversion: PhantomData<fn() -> C>,
}

impl<const SIZE: usize, A: Alignment, C: Conversion> Drop for Driven<SIZE, A, C> {
    #[inline(always)]
    fn drop(&mut self) {
        self.destroy();
    }
}

unsafe impl<const SIZE: usize, A: Alignment, C: Conversion> Policy for Driven<SIZE, A, C> {
    type Buffer = InlineBuffer<SIZE, A>;

    #[inline(always)]
    fn empty() -> Self {
        Driven {
            driver: idle(),
            buffer: InlineBuffer::uninit(),
            conversion: PhantomData,
        }
    }

    #[inline(always)]
    unsafe fn buffer_mut(&mut self) -> &mut Self::Buffer {
        &mut self.buffer
    }

    #[inline(always)]
    unsafe fn install<S: Strategy<Self::Buffer>>(&mut self) {
        debug_assert!(self.driver.mode().is_none());
        self.driver = Driving::<Self::Buffer, S, C>::DRIVER;
    }

    #[inline(always)]
    unsafe fn clear(&mut self) {
        self.driver = idle();
    }

    #[inline]
    fn mode(&self) -> Option<StorageMode> {
        self.driver.mode()
    }

    #[inline]
    fn type_id(&self) -> TypeId {
        self.driver.payload_type_id()
    }

    #[inline]
    fn type_name(&self) -> &'static str {
        self.driver.payload_type_name()
    }

    fn try_clone(&self) -> Result<Self, AllocError> {
        let mut copy = Self::empty();

        // Safety: `copy.buffer` holds no value and the driver matches `self.buffer`.
        unsafe {
            self.driver.clone_into(&self.buffer, &mut copy.buffer)?;
        }
        copy.driver = self.driver;

        Ok(copy)
    }

    fn relocate(&mut self) -> Self {
        let mut moved = Self::empty();

        // Safety: `moved.buffer` holds no value and the driver matches `self.buffer`.
        unsafe {
            self.driver.relocate(&mut self.buffer, &mut moved.buffer);
        }
        moved.driver = mem::replace(&mut self.driver, idle());

        moved
    }

    fn destroy(&mut self) {
        let driver = mem::replace(&mut self.driver, idle());

        // Safety: The driver matches the buffer.
        unsafe {
            driver.destroy(&mut self.buffer);
        }
    }

    #[inline]
    fn as_ptr(&self) -> *const u8 {
        // Safety: The driver matches the buffer.
        unsafe { self.driver.as_ptr(&self.buffer) }
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut u8 {
        // Safety: The driver matches the buffer.
        unsafe { self.driver.as_mut(&mut self.buffer) }
    }
}

unsafe impl<const SIZE: usize, A: Alignment, C: Conversion> ConvertPolicy for Driven<SIZE, A, C> {
    #[inline]
    fn convert_into(&self, target: &mut dyn Any) -> bool {
        // Safety: The driver matches the buffer.
        unsafe { self.driver.convert_into(&self.buffer, target) }
    }
}
