use core::{
    any::{type_name, Any, TypeId},
    fmt,
    marker::PhantomData,
    mem,
};

use alloc::{alloc::handle_alloc_error, boxed::Box};

use crate::{
    buffer,
    error::{AllocError, TypeMismatch},
    policy::{ConvertPolicy, Direct, Driven, Policy},
    strategy::{Referential, StorageMode, Strategy, Value},
};

/// Type-erased value with fixed-size inline storage.
///
/// Holds at most one value of any `Clone + 'static` type.
/// Types that fit the policy's buffer are stored without allocation,
/// larger or over-aligned types are boxed.
/// How operations reach the payload is decided by the [`Policy`] `P`.
///
/// The container is neither `Send` nor `Sync`, since the held value may not be.
pub struct AnyContainer<P: Policy = Direct> {
    state: P,
    unsend: PhantomData<*mut u8>,
}

/// [`AnyContainer`] with a pointer-sized buffer and direct dispatch.
pub type SmallAny = AnyContainer<Direct>;

/// [`AnyContainer`] with a pointer-sized buffer and lossless primitive conversions.
pub type ConvertingAny = AnyContainer<Driven>;

static_assertions::assert_eq_size!(SmallAny, [usize; 2]);
static_assertions::assert_eq_size!(ConvertingAny, [usize; 3]);
static_assertions::assert_eq_align!(SmallAny, usize);

impl<P: Policy> Default for AnyContainer<P> {
    #[inline(always)]
    fn default() -> Self {
        AnyContainer::empty()
    }
}

impl<P: Policy> Clone for AnyContainer<P> {
    /// Clones the held value.
    ///
    /// Aborts through [`handle_alloc_error`] if a boxed value can't be allocated.
    /// See [`AnyContainer::try_clone`] for the fallible version.
    #[inline]
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|err| handle_alloc_error(err.layout()))
    }

    /// Clones `source` aside first, so a failing clone leaves `self` untouched.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        let mut copy = source.clone();
        self.swap(&mut copy);
    }
}

impl<P: Policy> fmt::Debug for AnyContainer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyContainer")
            .field("type", &self.type_name())
            .field("mode", &self.storage_mode())
            .finish()
    }
}

impl<P: Policy> AnyContainer<P> {
    #[inline(always)]
    fn from_state(state: P) -> Self {
        AnyContainer {
            state,
            unsend: PhantomData,
        }
    }

    /// Initializes the buffer through `S` and installs it.
    /// On failure `state` stays empty.
    #[inline(always)]
    unsafe fn emplace<S: Strategy<P::Buffer>>(state: &mut P, value: S::Payload) -> Result<(), AllocError> {
        unsafe {
            S::init(state.buffer_mut(), value)?;
            state.install::<S>();
        }
        Ok(())
    }

    /// Returns `true` if the type `T` fits and can be stored without allocation.
    /// If `true`, then `AnyContainer::new::<T>` is guaranteed to not allocate.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// if SmallAny::fits::<u32>() {
    ///   // Guaranteed to not allocate.
    ///   SmallAny::new(42u32);
    /// }
    /// ```
    #[inline(always)]
    pub const fn fits<T>() -> bool {
        buffer::fits::<T, P::Buffer>()
    }

    /// Storage mode a `T` gets in this container.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::{SmallAny, StorageMode};
    /// assert_eq!(SmallAny::mode_for::<u8>(), StorageMode::Value);
    /// assert_eq!(SmallAny::mode_for::<[u8; 64]>(), StorageMode::Referential);
    /// ```
    #[inline(always)]
    pub const fn mode_for<T>() -> StorageMode {
        StorageMode::of::<T, P::Buffer>()
    }

    /// Construct an empty container. Doesn't allocate.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let a = SmallAny::empty();
    /// assert!(!a.has_value());
    /// ```
    #[inline(always)]
    pub fn empty() -> Self {
        Self::from_state(P::empty())
    }

    /// Construct new container with the given value.
    ///
    /// If the type `T` fits in the storage, it is stored without allocation.
    /// Otherwise, it will be boxed.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let a = SmallAny::new(42u32);
    ///
    /// assert_eq!(a.downcast_ref::<u32>(), Some(&42));
    /// ```
    #[inline]
    pub fn new<T>(value: T) -> Self
    where
        T: Clone + 'static,
    {
        Self::try_new(value).unwrap_or_else(|err| handle_alloc_error(err.layout()))
    }

    /// Construct new container with the given value,
    /// reporting allocation failure instead of aborting.
    #[inline]
    pub fn try_new<T>(value: T) -> Result<Self, AllocError>
    where
        T: Clone + 'static,
    {
        Self::try_with(move || value)
    }

    /// Construct new container with the value returned by `f`.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let a = SmallAny::with(|| vec![1, 2, 3]);
    ///
    /// assert_eq!(a.downcast_ref::<Vec<i32>>().map(Vec::len), Some(3));
    /// ```
    #[inline]
    pub fn with<T, F>(f: F) -> Self
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        Self::try_with(f).unwrap_or_else(|err| handle_alloc_error(err.layout()))
    }

    /// Construct new container with the value returned by `f`,
    /// reporting allocation failure instead of aborting.
    ///
    /// If `f` panics no container is created.
    pub fn try_with<T, F>(f: F) -> Result<Self, AllocError>
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        let mut state = P::empty();

        // Safety: `state` is empty.
        unsafe {
            match const { StorageMode::of::<T, P::Buffer>() } {
                StorageMode::Value => Self::emplace::<Value<T>>(&mut state, f())?,
                StorageMode::Referential => Self::emplace::<Referential<T>>(&mut state, f())?,
            }
        }

        Ok(Self::from_state(state))
    }

    /// Construct a `T` from the argument tuple `args` directly in the container.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// #[derive(Clone)]
    /// struct Span {
    ///     len: usize,
    ///     scale: f64,
    /// }
    ///
    /// impl From<(&[i32], f64)> for Span {
    ///     fn from((items, scale): (&[i32], f64)) -> Self {
    ///         Span { len: items.len(), scale }
    ///     }
    /// }
    ///
    /// let a = SmallAny::in_place::<Span, _>((&[9, 8, 7][..], 2.5));
    /// let span = a.downcast_ref::<Span>().unwrap();
    /// assert_eq!((span.len, span.scale), (3, 2.5));
    /// ```
    #[inline]
    pub fn in_place<T, Args>(args: Args) -> Self
    where
        T: From<Args> + Clone + 'static,
    {
        Self::with(move || T::from(args))
    }

    /// Construct new container from the given boxed value.
    ///
    /// If type fits in the storage, value will be unboxed.
    /// Otherwise it will be stored as boxed, but no allocation will be performed.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let boxed = Box::new([1u32; 42]);
    ///
    /// // No additional allocation is performed.
    /// let a = SmallAny::from_box(boxed);
    ///
    /// assert_eq!(a.downcast_ref::<[u32; 42]>(), Some(&[1u32; 42]));
    /// ```
    pub fn from_box<T>(boxed: Box<T>) -> Self
    where
        T: Clone + 'static,
    {
        let mut state = P::empty();

        // Safety: `state` is empty.
        unsafe {
            match const { StorageMode::of::<T, P::Buffer>() } {
                StorageMode::Value => {
                    Value::<T>::init_boxed(state.buffer_mut(), boxed);
                    state.install::<Value<T>>();
                }
                StorageMode::Referential => {
                    Referential::<T>::init_boxed(state.buffer_mut(), boxed);
                    state.install::<Referential<T>>();
                }
            }
        }

        Self::from_state(state)
    }

    /// Clones the held value, reporting allocation failure instead of aborting.
    /// `self` is left untouched either way.
    #[inline]
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        Ok(Self::from_state(self.state.try_clone()?))
    }

    /// Moves the held value into a new container, leaving this one empty.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let mut a = SmallAny::new(1u8);
    /// let b = a.take();
    ///
    /// assert!(!a.has_value());
    /// assert!(b.is::<u8>());
    /// ```
    #[inline]
    pub fn take(&mut self) -> Self {
        Self::from_state(self.state.relocate())
    }

    /// Replaces the content with `other`'s, returning the previous content.
    #[inline]
    pub fn replace(&mut self, other: Self) -> Self {
        mem::replace(self, other)
    }

    /// Replaces the held value with `value`.
    ///
    /// If a `T` is already held it is assigned in place,
    /// otherwise the new value is stored first and the old one dropped after.
    #[inline]
    pub fn set<T>(&mut self, value: T)
    where
        T: Clone + 'static,
    {
        if let Err(err) = self.try_set(value) {
            handle_alloc_error(err.layout())
        }
    }

    /// Replaces the held value with `value`, reporting allocation failure instead of aborting.
    /// On failure the previous value is kept.
    pub fn try_set<T>(&mut self, value: T) -> Result<(), AllocError>
    where
        T: Clone + 'static,
    {
        if let Some(held) = self.downcast_mut::<T>() {
            *held = value;
            return Ok(());
        }

        *self = Self::try_new(value)?;
        Ok(())
    }

    /// Drops the held value, if any.
    #[inline]
    pub fn reset(&mut self) {
        self.state.destroy();
    }

    /// Exchanges contents with `other`. Never allocates.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.state, &mut other.state);
    }

    /// Returns `true` if a value is held.
    #[inline]
    pub fn has_value(&self) -> bool {
        self.state.mode().is_some()
    }

    /// How the held value is stored, `None` if empty.
    #[inline]
    pub fn storage_mode(&self) -> Option<StorageMode> {
        self.state.mode()
    }

    /// Returns the type id of the stored value.
    /// For an empty container this is the id of [`Void`](crate::descriptor::Void).
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// use core::any::TypeId;
    ///
    /// let a = SmallAny::new(42u32);
    ///
    /// assert_eq!(a.type_id(), TypeId::of::<u32>());
    /// ```
    #[inline]
    pub fn type_id(&self) -> TypeId {
        // Not `self.state.type_id()`, that is ambiguous with `Any::type_id`.
        Policy::type_id(&self.state)
    }

    /// Name of the stored type, `"void"` if empty.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.state.type_name()
    }

    /// Returns `true` if the stored value is of type `T`.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let a = SmallAny::new(42u32);
    /// assert!(a.is::<u32>());
    /// ```
    #[inline]
    pub fn is<T>(&self) -> bool
    where
        T: 'static,
    {
        self.type_id() == TypeId::of::<T>()
    }

    /// Returns some reference to the stored value if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Some(unsafe { self.downcast_ref_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns some mutable reference to the stored value if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Some(unsafe { self.downcast_mut_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns reference to the stored value if it is of type `T`.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let a = SmallAny::new(42u32);
    ///
    /// assert_eq!(a.get::<u32>(), Ok(&42));
    /// assert_eq!(a.get::<i64>().unwrap_err().found, Some("u32"));
    /// ```
    #[inline]
    pub fn get<T>(&self) -> Result<&T, TypeMismatch>
    where
        T: 'static,
    {
        self.downcast_ref::<T>().ok_or_else(|| self.mismatch::<T>())
    }

    /// Returns mutable reference to the stored value if it is of type `T`.
    #[inline]
    pub fn get_mut<T>(&mut self) -> Result<&mut T, TypeMismatch>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Ok(unsafe { self.downcast_mut_unchecked::<T>() })
        } else {
            Err(self.mismatch::<T>())
        }
    }

    /// Returns a clone of the stored value if it is of type `T`.
    #[inline]
    pub fn cast<T>(&self) -> Result<T, TypeMismatch>
    where
        T: Clone + 'static,
    {
        self.get::<T>().cloned()
    }

    /// Returns the stored value if it is of type `T`.
    /// Otherwise return self back.
    ///
    /// This will unbox the value if it was stored as boxed.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::SmallAny;
    /// let a = SmallAny::new(42u32);
    ///
    /// let Ok(v) = a.downcast::<u32>() else {
    ///    panic!();
    /// };
    /// assert_eq!(v, 42);
    /// ```
    #[inline]
    pub fn downcast<T>(self) -> Result<T, Self>
    where
        T: Clone + 'static,
    {
        if self.is::<T>() {
            Ok(unsafe { self.downcast_unchecked() })
        } else {
            Err(self)
        }
    }

    /// Returns reference to the stored value without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_ref_unchecked<T>(&self) -> &T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        let ptr = self.state.as_ptr();
        unsafe { &*ptr.cast() }
    }

    /// Returns mutable reference to the stored value without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_mut_unchecked<T>(&mut self) -> &mut T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        let ptr = self.state.as_mut_ptr();
        unsafe { &mut *ptr.cast() }
    }

    /// Returns the stored value without type checking.
    ///
    /// This will unbox the value if it was stored as boxed.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    pub unsafe fn downcast_unchecked<T>(mut self) -> T
    where
        T: Clone + 'static,
    {
        debug_assert!(self.is::<T>());

        // Safety: The held value is a `T`, so it was stored with the mode `T` maps to.
        // The state is cleared right after reading the value out.
        unsafe {
            let buffer = self.state.buffer_mut();
            let value = match const { StorageMode::of::<T, P::Buffer>() } {
                StorageMode::Value => Value::<T>::take(buffer),
                StorageMode::Referential => Referential::<T>::take(buffer),
            };
            self.state.clear();
            value
        }
    }

    #[cold]
    fn mismatch<T>(&self) -> TypeMismatch {
        let mismatch = TypeMismatch {
            expected: type_name::<T>(),
            found: self.has_value().then(|| self.type_name()),
        };
        crate::trace::debug!(expected = mismatch.expected, found = ?mismatch.found, "type mismatch");
        mismatch
    }
}

impl<P: ConvertPolicy> AnyContainer<P> {
    /// Returns the stored value converted to `U`.
    ///
    /// A held `U` is cloned. Other types go through the policy's conversion rules.
    /// Returns `None` if the container is empty or no rule applies.
    ///
    /// # Example
    ///
    /// ```
    /// # use inany::ConvertingAny;
    /// let a = ConvertingAny::new(7u8);
    ///
    /// assert_eq!(a.convert::<u8>(), Some(7));
    /// assert_eq!(a.convert::<u64>(), Some(7));
    /// assert_eq!(a.convert::<i8>(), None);
    /// ```
    #[inline]
    pub fn convert<U>(&self) -> Option<U>
    where
        U: 'static,
    {
        let mut slot: Option<U> = None;
        let converted = self.state.convert_into(&mut slot as &mut dyn Any);
        debug_assert_eq!(converted, slot.is_some());
        slot
    }
}
