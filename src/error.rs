use core::{alloc::Layout, fmt};

/// Out-of-line storage for a payload could not be allocated.
///
/// Returned by the fallible constructors and [`try_clone`](crate::AnyContainer::try_clone).
/// The infallible forms pass the layout to [`handle_alloc_error`](alloc::alloc::handle_alloc_error) instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    pub(crate) fn new(layout: Layout) -> Self {
        AllocError { layout }
    }

    /// Layout of the allocation that failed.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate {} bytes aligned to {} for payload",
            self.layout.size(),
            self.layout.align()
        )
    }
}

impl core::error::Error for AllocError {}

/// The container does not hold a value of the requested type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Name of the requested type.
    pub expected: &'static str,

    /// Name of the held type, `None` if the container is empty.
    pub found: Option<&'static str>,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(found) => write!(f, "expected value of type `{}`, found `{}`", self.expected, found),
            None => write!(f, "expected value of type `{}`, container is empty", self.expected),
        }
    }
}

impl core::error::Error for TypeMismatch {}
