//! The two ways a payload can be stored in an [`InlineBuffer`](crate::buffer::InlineBuffer).
//!
//! [`Value`] places the payload directly into the buffer.
//! [`Referential`] allocates it on the heap and keeps the owning `Box` inline.
//! Which one is used for a type is decided by [`StorageMode::of`] at compile time.

use core::{
    alloc::Layout,
    any::{type_name, TypeId},
    marker::PhantomData,
    ptr::{self, NonNull},
};

use alloc::boxed::Box;

use crate::{
    buffer::{fits, RawBuffer},
    descriptor::Descriptor,
    error::AllocError,
};

/// How a payload is kept by a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// Inline, without allocation.
    Value,

    /// Heap allocated, with the owning handle inline.
    Referential,
}

impl StorageMode {
    /// Storage mode used for `T` in buffer `B`.
    ///
    /// Every Rust move is a bitwise copy that can't fail,
    /// so only size and alignment take part in the decision.
    #[inline]
    pub const fn of<T, B: RawBuffer>() -> Self {
        if fits::<T, B>() {
            StorageMode::Value
        } else {
            StorageMode::Referential
        }
    }
}

/// Backing implementation of the payload lifecycle for one type and mode.
///
/// # Safety
///
/// Every function taking a buffer requires that the buffer was initialized by the
/// same strategy (or, for `init`, that it holds no live value).
/// `DESCRIPTOR` must describe exactly these functions.
pub unsafe trait Strategy<B: RawBuffer>: 'static {
    /// Type of the held value.
    type Payload: Clone + 'static;

    /// Mode this strategy implements.
    const MODE: StorageMode;

    /// Capability descriptor dispatching to this strategy.
    const DESCRIPTOR: &'static Descriptor<B>;

    /// Writes `value` into the buffer.
    unsafe fn init(buffer: &mut B, value: Self::Payload) -> Result<(), AllocError>;

    /// Writes an already boxed value into the buffer, reusing the allocation if possible.
    unsafe fn init_boxed(buffer: &mut B, boxed: Box<Self::Payload>);

    /// Clones the payload of `src` into the uninitialized `dst`.
    unsafe fn clone_into(src: &B, dst: &mut B) -> Result<(), AllocError>;

    /// Moves the payload of `src` into the uninitialized `dst`.
    /// `src` holds no live value afterwards.
    unsafe fn relocate(src: &mut B, dst: &mut B);

    /// Drops the payload.
    unsafe fn drop(buffer: &mut B);

    /// Reads the payload out, releasing its storage.
    /// The buffer holds no live value afterwards.
    unsafe fn take(buffer: &mut B) -> Self::Payload;

    /// Address of the payload.
    unsafe fn as_ptr(buffer: &B) -> *const u8;

    /// Mutable address of the payload.
    unsafe fn as_mut(buffer: &mut B) -> *mut u8;
}

/// Stores `T` inside the buffer.
pub struct Value<T>(PhantomData<fn() -> T>);

/// Stores `T` in a heap allocation owned through the buffer.
pub struct Referential<T>(PhantomData<fn() -> T>);

unsafe impl<T, B> Strategy<B> for Value<T>
where
    T: Clone + 'static,
    B: RawBuffer,
{
    type Payload = T;

    const MODE: StorageMode = StorageMode::Value;

    const DESCRIPTOR: &'static Descriptor<B> = &Descriptor {
        mode: Some(StorageMode::Value),
        type_id: TypeId::of::<T>,
        type_name: type_name::<T>,
        clone: <Self as Strategy<B>>::clone_into,
        relocate: <Self as Strategy<B>>::relocate,
        drop: <Self as Strategy<B>>::drop,
        as_ptr: <Self as Strategy<B>>::as_ptr,
        as_mut: <Self as Strategy<B>>::as_mut,
    };

    #[inline]
    unsafe fn init(buffer: &mut B, value: T) -> Result<(), AllocError> {
        buffer.slot_mut::<T>().write(value);
        Ok(())
    }

    #[inline]
    unsafe fn init_boxed(buffer: &mut B, boxed: Box<T>) {
        buffer.slot_mut::<T>().write(*boxed);
    }

    unsafe fn clone_into(src: &B, dst: &mut B) -> Result<(), AllocError> {
        // Safety: It was initialized as `T`.
        let value = unsafe { src.slot::<T>().assume_init_ref() }.clone();
        dst.slot_mut::<T>().write(value);
        Ok(())
    }

    unsafe fn relocate(src: &mut B, dst: &mut B) {
        // Safety: It was initialized as `T`, and is left logically uninitialized.
        let value = unsafe { src.slot::<T>().assume_init_read() };
        dst.slot_mut::<T>().write(value);
    }

    unsafe fn drop(buffer: &mut B) {
        // Safety: It was initialized as `T`.
        unsafe {
            buffer.slot_mut::<T>().assume_init_drop();
        }
    }

    unsafe fn take(buffer: &mut B) -> T {
        // Safety: It was initialized as `T`.
        unsafe { buffer.slot::<T>().assume_init_read() }
    }

    unsafe fn as_ptr(buffer: &B) -> *const u8 {
        // Safety: It was initialized as `T`.
        let r: &T = unsafe { buffer.slot::<T>().assume_init_ref() };
        ptr::from_ref(r).cast()
    }

    unsafe fn as_mut(buffer: &mut B) -> *mut u8 {
        // Safety: It was initialized as `T`.
        let r: &mut T = unsafe { buffer.slot_mut::<T>().assume_init_mut() };
        ptr::from_mut(r).cast()
    }
}

unsafe impl<T, B> Strategy<B> for Referential<T>
where
    T: Clone + 'static,
    B: RawBuffer,
{
    type Payload = T;

    const MODE: StorageMode = StorageMode::Referential;

    const DESCRIPTOR: &'static Descriptor<B> = &Descriptor {
        mode: Some(StorageMode::Referential),
        type_id: TypeId::of::<T>,
        type_name: type_name::<T>,
        clone: <Self as Strategy<B>>::clone_into,
        relocate: <Self as Strategy<B>>::relocate,
        drop: <Self as Strategy<B>>::drop,
        as_ptr: <Self as Strategy<B>>::as_ptr,
        as_mut: <Self as Strategy<B>>::as_mut,
    };

    #[inline]
    unsafe fn init(buffer: &mut B, value: T) -> Result<(), AllocError> {
        let boxed = try_box(value)?;
        buffer.slot_mut::<Box<T>>().write(boxed);
        Ok(())
    }

    #[inline]
    unsafe fn init_boxed(buffer: &mut B, boxed: Box<T>) {
        buffer.slot_mut::<Box<T>>().write(boxed);
    }

    unsafe fn clone_into(src: &B, dst: &mut B) -> Result<(), AllocError> {
        // Safety: It was initialized as `Box<T>`.
        let value = T::clone(unsafe { src.slot::<Box<T>>().assume_init_ref() });
        let boxed = try_box(value)?;
        dst.slot_mut::<Box<T>>().write(boxed);
        Ok(())
    }

    unsafe fn relocate(src: &mut B, dst: &mut B) {
        // Only the handle moves, the allocation stays where it is.
        // Safety: It was initialized as `Box<T>`.
        let boxed = unsafe { src.slot::<Box<T>>().assume_init_read() };
        dst.slot_mut::<Box<T>>().write(boxed);
    }

    unsafe fn drop(buffer: &mut B) {
        // Safety: It was initialized as `Box<T>`.
        unsafe {
            buffer.slot_mut::<Box<T>>().assume_init_drop();
        }
    }

    unsafe fn take(buffer: &mut B) -> T {
        // Safety: It was initialized as `Box<T>`.
        let boxed = unsafe { buffer.slot::<Box<T>>().assume_init_read() };
        *boxed
    }

    unsafe fn as_ptr(buffer: &B) -> *const u8 {
        // Safety: It was initialized as `Box<T>`.
        let r: &T = &**unsafe { buffer.slot::<Box<T>>().assume_init_ref() };
        ptr::from_ref(r).cast()
    }

    unsafe fn as_mut(buffer: &mut B) -> *mut u8 {
        // Safety: It was initialized as `Box<T>`.
        let r: &mut T = &mut **unsafe { buffer.slot_mut::<Box<T>>().assume_init_mut() };
        ptr::from_mut(r).cast()
    }
}

/// `Box::new` that reports allocation failure instead of aborting.
fn try_box<T>(value: T) -> Result<Box<T>, AllocError> {
    let layout = Layout::new::<T>();

    if layout.size() == 0 {
        // Zero-sized boxes don't allocate.
        return Ok(Box::new(value));
    }

    // Safety: `layout` has non-zero size.
    let raw_ptr = unsafe { alloc::alloc::alloc(layout) };

    // `alloc::alloc` returns a null pointer if allocation failed, handle it
    match NonNull::new(raw_ptr.cast::<T>()) {
        Some(ptr) => {
            crate::trace::trace!(size = layout.size(), align = layout.align(), "payload allocated out of line");

            // Safety: `ptr` is valid for writes of `T` and was allocated by the global allocator
            // with the layout of `T`, which is what `Box` expects.
            unsafe {
                ptr.as_ptr().write(value);
                Ok(Box::from_raw(ptr.as_ptr()))
            }
        }
        None => {
            crate::trace::warning!(size = layout.size(), align = layout.align(), "payload allocation failed");
            Err(AllocError::new(layout))
        }
    }
}
