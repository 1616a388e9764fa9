use std::fmt;

use half::f16;
use num_complex::Complex;
use num_traits::{NumCast, ToPrimitive};

/// Element types an operator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    U8,
    U32,
    U64,
    I32,
    I64,
    /// 16-bit floating point (IEEE 754 half-precision, via the `half` crate).
    F16,
    F32,
    F64,
    /// Complex with `f32` parts.
    C32,
    /// Complex with `f64` parts.
    C64,
}

impl DType {
    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::Bool | DType::U8 => 1,
            DType::F16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::U64 | DType::I64 | DType::F64 | DType::C32 => 8,
            DType::C64 => 16,
        }
    }

    /// Returns true for floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    /// Returns true for integer types (bool excluded).
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            DType::U8 | DType::U32 | DType::U64 | DType::I32 | DType::I64
        )
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, DType::C32 | DType::C64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::U8 => "u8",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::C32 => "c32",
            DType::C64 => "c64",
        };
        write!(f, "{}", name)
    }
}

/// A value type that can flow through an operator tree.
///
/// Heavyweight transforms hand data to numeric collaborators as `f64`, so every
/// scalar converts to and from `f64`. Converting back is fallible: NaN or an
/// out-of-range value has no integer representation, and callers turn `None`
/// into an error. Integral types also round-trip exactly through `i128`.
pub trait Scalar: Copy + Send + Sync + fmt::Debug + PartialEq + Default + 'static {
    const DTYPE: DType;

    /// Complex values yield their real part.
    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Option<Self>;

    /// The exact value of an integral scalar.
    fn to_i128(self) -> Option<i128> {
        None
    }

    fn from_i128(_value: i128) -> Option<Self> {
        None
    }

    /// Complex conjugate. Real types return themselves.
    fn conj(self) -> Self {
        self
    }
}

/// Integral scalars usable as coordinates by index-driven operators such as remap.
pub trait IndexScalar: Scalar {
    /// Converts to a coordinate, or `None` for negative values.
    fn to_index(self) -> Option<usize>;
}

macro_rules! float_scalar {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DTYPE: DType = DType::$dtype;

                fn to_f64(self) -> f64 {
                    ToPrimitive::to_f64(&self).unwrap_or(f64::NAN)
                }

                fn from_f64(value: f64) -> Option<Self> {
                    <$ty as NumCast>::from(value)
                }
            }
        )*
    };
}

float_scalar!(f32 => F32, f64 => F64);

macro_rules! integral_scalar {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DTYPE: DType = DType::$dtype;

                fn to_f64(self) -> f64 {
                    ToPrimitive::to_f64(&self).unwrap_or(f64::NAN)
                }

                fn from_f64(value: f64) -> Option<Self> {
                    <$ty as NumCast>::from(value)
                }

                fn to_i128(self) -> Option<i128> {
                    Some(<i128 as From<$ty>>::from(self))
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }

            impl IndexScalar for $ty {
                fn to_index(self) -> Option<usize> {
                    usize::try_from(self).ok()
                }
            }
        )*
    };
}

integral_scalar!(
    u8 => U8,
    u32 => U32,
    u64 => U64,
    i32 => I32,
    i64 => I64,
);

macro_rules! complex_scalar {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Scalar for Complex<$ty> {
                const DTYPE: DType = DType::$dtype;

                fn to_f64(self) -> f64 {
                    Scalar::to_f64(self.re)
                }

                fn from_f64(value: f64) -> Option<Self> {
                    <$ty as Scalar>::from_f64(value).map(|re| Complex::new(re, 0.0))
                }

                fn conj(self) -> Self {
                    Complex::conj(&self)
                }
            }
        )*
    };
}

complex_scalar!(f32 => C32, f64 => C64);

impl Scalar for f16 {
    const DTYPE: DType = DType::F16;

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    fn from_f64(value: f64) -> Option<Self> {
        Some(f16::from_f64(value))
    }
}

impl Scalar for bool {
    const DTYPE: DType = DType::Bool;

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    fn from_f64(value: f64) -> Option<Self> {
        (!value.is_nan()).then_some(value != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(DType::F32.size_in_bytes(), 4);
        assert_eq!(DType::F16.size_in_bytes(), 2);
        assert_eq!(DType::I64.size_in_bytes(), 8);
        assert_eq!(DType::Bool.size_in_bytes(), 1);
        assert_eq!(DType::C64.size_in_bytes(), 16);
    }

    #[test]
    fn test_scalar_dtype() {
        assert_eq!(<f32 as Scalar>::DTYPE, DType::F32);
        assert_eq!(<f16 as Scalar>::DTYPE, DType::F16);
        assert_eq!(<i64 as Scalar>::DTYPE, DType::I64);
        assert_eq!(<Complex<f32> as Scalar>::DTYPE, DType::C32);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(<i32 as Scalar>::from_f64(3.0), Some(3));
        assert!(<bool as Scalar>::from_f64(2.0).unwrap());
        assert_eq!(Scalar::to_f64(true), 1.0);
        assert_eq!(Scalar::to_f64(f16::from_f32(1.5)), 1.5);
        assert_eq!(<f64 as Scalar>::from_f64(0.25), Some(0.25));
    }

    #[test]
    fn test_unrepresentable_values_are_rejected() {
        assert_eq!(<u8 as Scalar>::from_f64(-1.0), None);
        assert_eq!(<u8 as Scalar>::from_f64(400.0), None);
        assert_eq!(<i64 as Scalar>::from_f64(f64::NAN), None);
        assert_eq!(<bool as Scalar>::from_f64(f64::NAN), None);
    }

    #[test]
    fn test_exact_integers() {
        let big = 9_007_199_254_740_993i64;
        assert_eq!(Scalar::to_i128(big), Some(9_007_199_254_740_993));
        assert_eq!(<i64 as Scalar>::from_i128(9_007_199_254_740_993), Some(big));
        assert_eq!(<u8 as Scalar>::from_i128(400), None);
        assert_eq!(Scalar::to_i128(1.0f64), None);
    }

    #[test]
    fn test_complex() {
        let z = Complex::new(1.0f64, -2.0);
        assert_eq!(Scalar::to_f64(z), 1.0);
        assert_eq!(Scalar::conj(z), Complex::new(1.0, 2.0));
        assert_eq!(Scalar::conj(3.0f32), 3.0);
        assert_eq!(
            <Complex<f32> as Scalar>::from_f64(2.0),
            Some(Complex::new(2.0, 0.0))
        );
        assert!(DType::C32.is_complex());
        assert_eq!(DType::C64.to_string(), "c64");
    }

    #[test]
    fn test_index_scalar() {
        assert_eq!(IndexScalar::to_index(4i32), Some(4));
        assert_eq!(IndexScalar::to_index(-1i64), None);
        assert_eq!(IndexScalar::to_index(7u64), Some(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(DType::F16.to_string(), "f16");
        assert_eq!(DType::U32.to_string(), "u32");
        assert!(DType::F64.is_float());
        assert!(DType::I32.is_integral());
        assert!(!DType::Bool.is_integral());
    }
}
