use super::{
    digit_size, get_static, storage_not_support, strides_not_support, SchemeError, TensorLayout,
};

/// 张量的存储方式。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StorageType {
    /// 线性存储，按字节步长寻址，支持任意 BHWC 维度顺序。
    Buffer,
    /// RGBA 二维纹理，宽 `W·B`，高 `H·S`。
    Texture2D,
    /// RGBA 三维纹理，尺寸 `(W·B, H, S)`。
    Texture3D,
}

impl StorageType {
    pub const ALL: [Self; 3] = [Self::Buffer, Self::Texture2D, Self::Texture3D];
}

/// 纹理每个像素的分量数，也是每个通道切片的通道数。
pub const SLICE: usize = 4;

/// 逻辑下标 `(b, h, w, c)` 到元素偏移（以元素为单位）的映射。
pub(crate) trait Addressing: Copy + Send + Sync {
    fn offset(&self, b: usize, h: usize, w: usize, c: usize) -> isize;
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Linear {
    strides: [isize; 4],
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Texture2D {
    batch: usize,
    width: usize,
    slices: usize,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Texture3D {
    batch: usize,
    width: usize,
    height: usize,
}

impl Addressing for Linear {
    #[inline(always)]
    fn offset(&self, b: usize, h: usize, w: usize, c: usize) -> isize {
        let [sb, sh, sw, sc] = self.strides;
        b as isize * sb + h as isize * sh + w as isize * sw + c as isize * sc
    }
}

impl Addressing for Texture2D {
    #[inline(always)]
    fn offset(&self, b: usize, h: usize, w: usize, c: usize) -> isize {
        let x = w * self.batch + b;
        let y = h * self.slices + c / SLICE;
        ((y * self.width * self.batch + x) * SLICE + c % SLICE) as isize
    }
}

impl Addressing for Texture3D {
    #[inline(always)]
    fn offset(&self, b: usize, h: usize, w: usize, c: usize) -> isize {
        let x = w * self.batch + b;
        let z = c / SLICE;
        (((z * self.height + h) * self.width * self.batch + x) * SLICE + c % SLICE) as isize
    }
}

/// 由张量布局解析出的寻址方式。
#[derive(Clone, Copy, Debug)]
pub(crate) enum Address {
    Linear(Linear),
    Texture2D(Texture2D),
    Texture3D(Texture3D),
}

impl Address {
    /// 解析静态形状下的寻址方式，同时返回存储区域所需的字节数。
    pub fn new(layout: &TensorLayout, shape: [usize; 4]) -> Result<(Self, usize), SchemeError> {
        let unit = digit_size(layout.dt)?;
        let [b, h, w, c] = shape;
        let slices = c.div_ceil(SLICE);
        let texels = b * h * w * slices;
        match layout.storage {
            StorageType::Buffer => {
                let [sb, sh, sw, sc] = *layout.strides();
                get_static!(sb sh sw sc);
                let mut strides = [0; 4];
                let mut end = 0;
                for (i, (&s, &d)) in [sb, sh, sw, sc].iter().zip(&shape).enumerate() {
                    if s < 0 || s % unit as isize != 0 {
                        return Err(strides_not_support(format!(
                            "stride {s} of axis {i} is not a non-negative multiple of {unit}"
                        )));
                    }
                    strides[i] = s / unit as isize;
                    end += d.saturating_sub(1) * s as usize;
                }
                let size = if shape.contains(&0) { 0 } else { end + unit };
                Ok((Self::Linear(Linear { strides }), size))
            }
            StorageType::Texture2D => Ok((
                Self::Texture2D(Texture2D {
                    batch: b,
                    width: w,
                    slices,
                }),
                texels * SLICE * unit,
            )),
            StorageType::Texture3D => Ok((
                Self::Texture3D(Texture3D {
                    batch: b,
                    width: w,
                    height: h,
                }),
                texels * SLICE * unit,
            )),
        }
    }
}

impl Address {
    /// 解析将被写入的张量的寻址方式，要求不同逻辑下标映射到不同元素。
    ///
    /// 线性存储中长度大于 1 的维度按步长从小到大排列后，
    /// 每个步长必须跨过前一维度的全部元素。
    pub fn new_disjoint(layout: &TensorLayout, shape: [usize; 4]) -> Result<(Self, usize), SchemeError> {
        let ans = Self::new(layout, shape)?;
        if let (Self::Linear(Linear { strides }), _) = ans {
            let mut axes = (0..4).filter(|&i| shape[i] > 1).collect::<Vec<_>>();
            axes.sort_by_key(|&i| strides[i]);
            let mut span = 1;
            for i in axes {
                if strides[i] < span {
                    return Err(strides_not_support(format!(
                        "axis {i} of the destination overlaps, strides {strides:?} shape {shape:?}"
                    )));
                }
                span = strides[i] * shape[i] as isize;
            }
        }
        Ok(ans)
    }
}

impl Addressing for Address {
    #[inline]
    fn offset(&self, b: usize, h: usize, w: usize, c: usize) -> isize {
        match self {
            Self::Linear(a) => a.offset(b, h, w, c),
            Self::Texture2D(a) => a.offset(b, h, w, c),
            Self::Texture3D(a) => a.offset(b, h, w, c),
        }
    }
}

/// 将 [Address] 展开为具体的寻址类型，每种存储方式单独实例化 `$body`。
macro_rules! with_addressing {
    ($addr:expr, $name:ident => $body:expr) => {
        match $addr {
            $crate::common::Address::Linear($name) => $body,
            $crate::common::Address::Texture2D($name) => $body,
            $crate::common::Address::Texture3D($name) => $body,
        }
    };
}

pub(crate) use with_addressing;

/// 检查设备支持的存储方式。
pub(crate) fn check_storage(supported: &[StorageType], storage: StorageType) -> Result<(), SchemeError> {
    if supported.contains(&storage) {
        Ok(())
    } else {
        Err(storage_not_support(format!("{storage:?} not in {supported:?}")))
    }
}
