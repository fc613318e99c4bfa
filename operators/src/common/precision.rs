use super::{type_not_support, SchemeError};
use digit_layout::{types as ty, DigitLayout};
use half::f16;
use num_traits::{Float, NumCast, ToPrimitive};

/// 计算精度。
///
/// 决定张量的存储类型和逐元素计算使用的类型。
/// 归约总是以 `f64` 累加，与精度无关。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Precision {
    /// 以 f32 存储，以 f32 计算。
    F32,
    /// 以 f16 存储，以 f32 计算。
    F32F16,
    /// 以 f16 存储，以 f16 计算。
    F16,
}

impl Precision {
    pub const ALL: [Self; 3] = [Self::F32, Self::F32F16, Self::F16];

    /// 精度对应的张量存储类型。
    pub fn storage_type(self) -> DigitLayout {
        match self {
            Self::F32 => ty::F32,
            Self::F32F16 | Self::F16 => ty::F16,
        }
    }
}

/// 可以存储在张量中的数字类型。
pub(crate) trait Digit: Float + Send + Sync + 'static {}

impl Digit for f32 {}
impl Digit for f16 {}

/// 存储类型的字节数。
pub(crate) fn digit_size(dt: DigitLayout) -> Result<usize, SchemeError> {
    if dt == ty::F32 {
        Ok(size_of::<f32>())
    } else if dt == ty::F16 {
        Ok(size_of::<f16>())
    } else {
        Err(type_not_support(format!("{dt:?} not supported")))
    }
}

#[inline]
pub(crate) fn cast<T: Float, U: ToPrimitive>(val: U) -> T {
    <T as NumCast>::from(val).unwrap_or_else(T::nan)
}

#[test]
fn test_storage_type() {
    assert_eq!(Precision::F32.storage_type(), ty::F32);
    assert_eq!(Precision::F32F16.storage_type(), ty::F16);
    assert_eq!(Precision::F16.storage_type(), ty::F16);

    assert_eq!(digit_size(ty::F32).unwrap(), 4);
    assert_eq!(digit_size(ty::F16).unwrap(), 2);
    assert!(digit_size(ty::F64).is_err());
}
