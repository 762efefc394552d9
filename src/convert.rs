//! Conversion rules consulted by [`Driven`](crate::policy::Driven) containers.
//!
//! A rule set is asked to produce a value of some requested type `U` from the
//! held payload. The request arrives as `&mut dyn Any` that is an `Option<U>`;
//! a rule that knows how to build a `U` stores it there and returns `true`.
//!
//! ```
//! use core::any::Any;
//! use inany::{convert::Conversion, policy::Driven, AnyContainer};
//!
//! struct Stringify;
//!
//! impl Conversion for Stringify {
//!     fn convert<T: 'static>(value: &T, target: &mut dyn Any) -> bool {
//!         let value: &dyn Any = value;
//!         match (value.downcast_ref::<u32>(), target.downcast_mut::<Option<String>>()) {
//!             (Some(v), Some(slot)) => {
//!                 *slot = Some(v.to_string());
//!                 true
//!             }
//!             _ => false,
//!         }
//!     }
//! }
//!
//! let a: AnyContainer<Driven<8, inany::buffer::Align8, Stringify>> = AnyContainer::new(42u32);
//! assert_eq!(a.convert::<String>().as_deref(), Some("42"));
//! ```

use core::any::Any;

use alloc::string::String;

/// Pluggable set of cross-type conversions.
pub trait Conversion: 'static {
    /// Tries to write `value` converted to the requested type into `target`.
    ///
    /// `target` is an `Option<U>` for the requested `U`.
    /// Returns `true` if the conversion was performed.
    fn convert<T: 'static>(value: &T, target: &mut dyn Any) -> bool;
}

/// Converts nothing; only the exact held type can be retrieved.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoConversion;

impl Conversion for NoConversion {
    #[inline(always)]
    fn convert<T: 'static>(_value: &T, _target: &mut dyn Any) -> bool {
        false
    }
}

/// Lossless conversions between primitives, through their `From` impls.
///
/// Covers integer and float widening, `bool` and `char` to integers,
/// and `&'static str` to `String`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Widening;

/// Writes `U::from(*value)` if `value` is an `S` and `target` asks for one of the `U`s.
macro_rules! widen {
    ($value:ident, $target:ident; $($from:ty => [$($to:ty),*];)*) => {
        $(
            if let Some(v) = $value.downcast_ref::<$from>() {
                $(
                    if let Some(slot) = $target.downcast_mut::<Option<$to>>() {
                        *slot = Some(<$to>::from(*v));
                        return true;
                    }
                )*
                return false;
            }
        )*
    };
}

impl Conversion for Widening {
    fn convert<T: 'static>(value: &T, target: &mut dyn Any) -> bool {
        let value: &dyn Any = value;

        widen! { value, target;
            bool => [u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize];
            char => [u32, u64, u128, String];
            u8 => [u16, u32, u64, u128, usize, i16, i32, i64, i128, isize, f32, f64, char];
            u16 => [u32, u64, u128, usize, i32, i64, i128, f32, f64];
            u32 => [u64, u128, i64, i128, f64];
            u64 => [u128, i128];
            i8 => [i16, i32, i64, i128, isize, f32, f64];
            i16 => [i32, i64, i128, isize, f32, f64];
            i32 => [i64, i128, f64];
            i64 => [i128];
            f32 => [f64];
            &'static str => [String];
        }

        false
    }
}
