//! Fixed-size inline storage the containers embed.

use core::mem::{align_of, size_of, MaybeUninit};

/// Size of the default inline buffer: one pointer.
pub const POINTER_SIZE: usize = size_of::<*const ()>();

/// Zero-sized marker that carries an alignment requirement.
///
/// # Safety
///
/// Implementors must be zero-sized.
pub unsafe trait Alignment: Copy + 'static {}

macro_rules! alignments {
    ($($(#[$meta:meta])* $name:ident = $align:literal,)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
            #[repr(align($align))]
            pub struct $name;

            unsafe impl Alignment for $name {}
        )*
    };
}

alignments! {
    /// Byte alignment.
    Align1 = 1,
    /// 2-byte alignment.
    Align2 = 2,
    /// 4-byte alignment.
    Align4 = 4,
    /// 8-byte alignment.
    Align8 = 8,
    /// 16-byte alignment.
    Align16 = 16,
    /// 32-byte alignment.
    Align32 = 32,
    /// 64-byte alignment.
    Align64 = 64,
}

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        /// Alignment of a pointer on the target.
        pub type PointerAlign = Align8;
    } else if #[cfg(target_pointer_width = "32")] {
        /// Alignment of a pointer on the target.
        pub type PointerAlign = Align4;
    } else {
        /// Alignment of a pointer on the target.
        pub type PointerAlign = Align2;
    }
}

static_assertions::const_assert_eq!(align_of::<PointerAlign>(), align_of::<*const ()>());

/// Raw storage a [`Strategy`](crate::strategy::Strategy) writes payloads into.
///
/// # Safety
///
/// `as_ptr` and `as_mut_ptr` must point to at least `SIZE` bytes aligned to `ALIGN`,
/// and the storage must be movable by a bitwise copy.
pub unsafe trait RawBuffer: 'static {
    /// Number of bytes available.
    const SIZE: usize;

    /// Alignment of the first byte.
    const ALIGN: usize;

    /// Construct new storage without initializing any value in it.
    fn uninit() -> Self;

    /// Pointer to the first byte.
    fn as_ptr(&self) -> *const u8;

    /// Mutable pointer to the first byte.
    fn as_mut_ptr(&mut self) -> *mut u8;

    /// Returns reference to the potentially uninitialized value.
    /// Type must fit, see [`fits`].
    ///
    /// The caller is responsible to ensure that the type is correct and the value is initialized before accessing it.
    #[inline]
    fn slot<T>(&self) -> &MaybeUninit<T> {
        // This can't be const, because then it'll be checked in branches that are not taken.
        assert!(fits::<T, Self>());

        // Safety: This cast is safe due to the size and alignment constraints.
        unsafe { &*self.as_ptr().cast() }
    }

    /// Returns mutable reference to the potentially uninitialized value.
    /// Type must fit, see [`fits`].
    ///
    /// The caller is responsible to ensure that the type is correct and the value is initialized before accessing it.
    #[inline]
    fn slot_mut<T>(&mut self) -> &mut MaybeUninit<T> {
        assert!(fits::<T, Self>());

        // Safety: This cast is safe due to the size and alignment constraints.
        unsafe { &mut *self.as_mut_ptr().cast() }
    }
}

/// Returns `true` if a `T` can be placed directly into buffer `B`.
#[inline]
pub const fn fits<T, B: RawBuffer + ?Sized>() -> bool {
    size_of::<T>() <= B::SIZE && align_of::<T>() <= B::ALIGN
}

/// `SIZE` bytes of storage aligned as `A`.
///
/// The buffer must be able to hold at least one pointer,
/// since out-of-line payloads keep their owning handle inline.
#[repr(C)]
pub struct InlineBuffer<const SIZE: usize, A: Alignment> {
    _align: [A; 0],
    bytes: MaybeUninit<[u8; SIZE]>,
}

impl<const SIZE: usize, A: Alignment> InlineBuffer<SIZE, A> {
    const HOLDS_HANDLE: () = assert!(
        SIZE >= size_of::<*const ()>() && align_of::<A>() >= align_of::<*const ()>(),
        "inline buffer must be able to hold a pointer"
    );
}

unsafe impl<const SIZE: usize, A: Alignment> RawBuffer for InlineBuffer<SIZE, A> {
    const SIZE: usize = SIZE;
    const ALIGN: usize = align_of::<A>();

    #[inline(always)]
    fn uninit() -> Self {
        let () = Self::HOLDS_HANDLE;

        InlineBuffer {
            _align: [],
            bytes: MaybeUninit::uninit(),
        }
    }

    #[inline(always)]
    fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr().cast()
    }

    #[inline(always)]
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr().cast()
    }
}
