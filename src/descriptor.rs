//! Capability descriptors: per-type tables of lifecycle operations.

use core::{
    any::TypeId,
    fmt,
    ptr,
};

use crate::{error::AllocError, strategy::StorageMode};

/// Uninhabited type reported as the type of an empty container.
///
/// No payload can ever have this type, so comparing against it never
/// confuses an empty container with one holding `()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Void {}

/// Table of operations for one payload type in one [`StorageMode`].
///
/// Descriptors are `'static` and shared by every container holding that type.
/// They are resolved once when a payload is installed and never looked up again.
pub struct Descriptor<B> {
    pub(crate) mode: Option<StorageMode>,
    pub(crate) type_id: fn() -> TypeId,
    pub(crate) type_name: fn() -> &'static str,
    pub(crate) clone: unsafe fn(&B, &mut B) -> Result<(), AllocError>,
    pub(crate) relocate: unsafe fn(&mut B, &mut B),
    pub(crate) drop: unsafe fn(&mut B),
    pub(crate) as_ptr: unsafe fn(&B) -> *const u8,
    pub(crate) as_mut: unsafe fn(&mut B) -> *mut u8,
}

unsafe fn clone_empty<B>(_src: &B, _dst: &mut B) -> Result<(), AllocError> {
    Ok(())
}

unsafe fn relocate_empty<B>(_src: &mut B, _dst: &mut B) {}

unsafe fn drop_empty<B>(_buffer: &mut B) {}

unsafe fn as_ptr_empty<B>(_buffer: &B) -> *const u8 {
    ptr::null()
}

unsafe fn as_mut_empty<B>(_buffer: &mut B) -> *mut u8 {
    ptr::null_mut()
}

fn void_name() -> &'static str {
    "void"
}

impl<B: 'static> Descriptor<B> {
    /// Descriptor of a container holding nothing.
    pub const EMPTY: &'static Self = &Descriptor {
        mode: None,
        type_id: TypeId::of::<Void>,
        type_name: void_name,
        clone: clone_empty::<B>,
        relocate: relocate_empty::<B>,
        drop: drop_empty::<B>,
        as_ptr: as_ptr_empty::<B>,
        as_mut: as_mut_empty::<B>,
    };
}

impl<B> Descriptor<B> {
    /// Storage mode of the described payload, `None` for the empty descriptor.
    #[inline]
    pub fn mode(&self) -> Option<StorageMode> {
        self.mode
    }

    /// Returns `true` for the empty descriptor.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
    }

    /// Type id of the described payload.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Type name of the described payload.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }
}

impl<B> fmt::Debug for Descriptor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("type", &self.type_name())
            .field("mode", &self.mode)
            .finish()
    }
}
