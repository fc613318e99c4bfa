use super::{dyn_not_support, SchemeError};
use std::fmt;

/// 以保留值表示“规划时尚未确定”的标量。
pub trait DynVal: Copy {
    const DYNAMIC: Self;
}

macro_rules! dyn_val {
    ($($ty:ty)+) => {
        $( impl DynVal for $ty { const DYNAMIC: Self = <$ty>::MAX; } )+
    };
}

dyn_val!(usize isize);

/// 可能是动态的形状或步长。
///
/// 动态值在 [Operator::scheme](crate::Operator::scheme) 中被跳过，
/// 在 [Operator::launch](crate::Operator::launch) 中被拒绝。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct MaybeDyn<T>(pub T);

impl<T> From<T> for MaybeDyn<T> {
    #[inline]
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T: DynVal + PartialEq> MaybeDyn<T> {
    #[inline]
    pub fn dynamic() -> Self {
        Self(T::DYNAMIC)
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.0 == T::DYNAMIC
    }

    #[inline]
    pub fn get_static(&self) -> Option<&T> {
        (!self.is_dynamic()).then_some(&self.0)
    }

    /// 合并若干应当相等的值：动态值与任何值相容，静态值之间必须相等。
    pub fn merge<'a>(iter: impl IntoIterator<Item = &'a Self>) -> Result<&'a Self, MergeError> {
        let mut iter = iter.into_iter();
        let first = iter.next().ok_or(MergeError::EmptyIter)?;
        iter.try_fold(first, |acc, it| match (acc.get_static(), it.get_static()) {
            (_, None) => Ok(acc),
            (None, Some(_)) => Ok(it),
            (Some(a), Some(b)) if a == b => Ok(acc),
            _ => Err(MergeError::NotMatch),
        })
    }
}

impl<T: DynVal + PartialEq + fmt::Display> fmt::Display for MaybeDyn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_static() {
            Some(val) => write!(f, "{val}"),
            None => write!(f, "?"),
        }
    }
}

#[inline(always)]
pub fn dyn_<T: DynVal + PartialEq>() -> MaybeDyn<T> {
    MaybeDyn::dynamic()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MergeError {
    EmptyIter,
    NotMatch,
}

#[inline]
pub(crate) fn static_from<T: DynVal + PartialEq>(arg: &MaybeDyn<T>) -> Result<&T, SchemeError> {
    arg.get_static()
        .ok_or_else(|| dyn_not_support("all dimensions must be static at launch"))
}

/// 把同名的 [MaybeDyn] 变量替换为其静态值，动态时提前返回错误。
macro_rules! get_static {
    ($($name:ident)*) => {
        $( let $name = *$crate::static_from(&$name)?; )*
    };
}

pub(crate) use get_static;

#[test]
fn test_merge() {
    let args = [dyn_(), MaybeDyn(4usize), dyn_(), MaybeDyn(4)];
    assert_eq!(MaybeDyn::merge(&args), Ok(&MaybeDyn(4)));

    let args = [dyn_::<usize>(), dyn_()];
    assert!(MaybeDyn::merge(&args).unwrap().is_dynamic());

    let args = [MaybeDyn(4usize), MaybeDyn(5)];
    assert_eq!(MaybeDyn::merge(&args), Err(MergeError::NotMatch));

    let args: [MaybeDyn<usize>; 0] = [];
    assert_eq!(MaybeDyn::merge(&args), Err(MergeError::EmptyIter));
}

#[test]
fn test_display() {
    assert_eq!(MaybeDyn(8usize).to_string(), "8");
    assert_eq!(dyn_::<isize>().to_string(), "?");
}
