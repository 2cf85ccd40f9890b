use num::{Float, NumCast, Zero};
use std::{
    fmt::{Debug, Display, LowerExp},
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

/// Floating point types a worker's partition can be stored in.
///
/// Everything that crosses the coordination store travels as `f64`; the local
/// assignment kernel runs in `T` and partial sums are widened before publishing.
pub trait Primitive: Add + AddAssign + Sum + Sub + SubAssign + Zero + Float + NumCast + FromStr
                + PartialOrd + Copy + Default + Display + Debug + Sync + Send + LowerExp + 'static
                + for<'a> AddAssign<&'a Self> + for<'a> Sub<&'a Self> {}
impl Primitive for f32 {}
impl Primitive for f64 {}

/// Converts a row-major `f64` matrix (as read from the store) into `T`.
pub(crate) fn narrow<T: Primitive>(src: &[f64]) -> Vec<T> {
    src.iter().map(|&v| T::from(v).unwrap_or_else(T::nan)).collect()
}

/// Widens a single value of `T` for publishing.
#[inline(always)]
pub(crate) fn widen<T: Primitive>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_and_widen_f32() {
        let src = vec![0.5f64, -1.25, 3.0];
        let narrowed: Vec<f32> = narrow(&src);
        assert_eq!(narrowed, vec![0.5f32, -1.25, 3.0]);
        assert_eq!(widen(narrowed[1]), -1.25f64);
    }
}
