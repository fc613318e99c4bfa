use super::{
    cast, digit_size, dyn_, get_static, shape_mismatch, type_not_support, Address, Addressing,
    Blob, Digit, MaybeDyn, SchemeError, StorageType,
};
use digit_layout::{types as ty, DigitLayout};
use half::f16;
use ndarray_layout::{ArrayLayout, Endian::BigEndian};
use std::ops::{Deref, DerefMut};

/// BHWC 张量布局。
///
/// 形状总是 4 维的，任何一维都可以是动态的。
/// 步长以字节为单位，只对 [StorageType::Buffer] 有意义，纹理的寻址由形状决定。
#[derive(Clone, Debug)]
pub struct TensorLayout {
    pub dt: DigitLayout,
    pub storage: StorageType,
    shape: [MaybeDyn<usize>; 4],
    strides: [MaybeDyn<isize>; 4],
}

impl TensorLayout {
    /// 静态形状的布局，线性存储时元素连续排布。
    pub fn new(dt: DigitLayout, storage: StorageType, shape: [usize; 4]) -> Self {
        let strides = match digit_size(dt) {
            Ok(unit) => {
                let layout = ArrayLayout::<4>::new_contiguous(&shape, BigEndian, unit);
                let mut strides = [dyn_(); 4];
                for (dst, &src) in strides.iter_mut().zip(layout.strides()) {
                    *dst = src.into()
                }
                strides
            }
            Err(_) => [dyn_(); 4],
        };
        Self {
            dt,
            storage,
            shape: shape.map(MaybeDyn),
            strides,
        }
    }

    /// 任意步长的线性存储布局。
    pub fn new_strided(dt: DigitLayout, shape: [usize; 4], strides: [isize; 4]) -> Self {
        Self {
            dt,
            storage: StorageType::Buffer,
            shape: shape.map(MaybeDyn),
            strides: strides.map(MaybeDyn),
        }
    }

    /// 形状或步长中可以有动态值的布局，用于规划。
    pub fn new_dyn(
        dt: DigitLayout,
        storage: StorageType,
        shape: [MaybeDyn<usize>; 4],
        strides: [MaybeDyn<isize>; 4],
    ) -> Self {
        Self {
            dt,
            storage,
            shape,
            strides,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[MaybeDyn<usize>; 4] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[MaybeDyn<isize>; 4] {
        &self.strides
    }

    pub fn static_shape(&self) -> Result<[usize; 4], SchemeError> {
        let [b, h, w, c] = self.shape;
        get_static!(b h w c);
        Ok([b, h, w, c])
    }

    /// 存储区域的字节数，纹理包括末尾切片的填充分量。
    pub fn nbytes(&self) -> Result<usize, SchemeError> {
        Address::new(self, self.static_shape()?).map(|(_, size)| size)
    }
}

/// 布局和存储区域。
pub struct Tensor<M> {
    pub layout: TensorLayout,
    pub mem: M,
}

impl Tensor<Blob> {
    /// 将 BHWC 顺序的逻辑数据按布局写入新的存储区域，未用到的填充元素为 0。
    pub fn from_f32(layout: TensorLayout, data: &[f32]) -> Result<Self, SchemeError> {
        let shape = layout.static_shape()?;
        let (addr, size) = Address::new(&layout, shape)?;
        check_len(shape, data.len())?;

        let mut mem = Blob::new(size);
        if layout.dt == ty::F32 {
            store::<f32>(&mut mem, addr, shape, data)
        } else if layout.dt == ty::F16 {
            store::<f16>(&mut mem, addr, shape, data)
        } else {
            return Err(type_not_support(format!("{:?} not supported", layout.dt)));
        }
        Ok(Self { layout, mem })
    }
}

impl<M: Deref<Target = [u8]>> Tensor<M> {
    /// 按 BHWC 顺序读出逻辑数据。
    pub fn to_f32(&self) -> Result<Vec<f32>, SchemeError> {
        let shape = self.layout.static_shape()?;
        let (addr, size) = Address::new(&self.layout, shape)?;
        if self.mem.len() < size {
            return Err(shape_mismatch(format!(
                "memory of {} bytes is too small for {size} bytes",
                self.mem.len()
            )));
        }
        let dt = self.layout.dt;
        if dt == ty::F32 {
            Ok(load::<f32>(&self.mem, addr, shape))
        } else if dt == ty::F16 {
            Ok(load::<f16>(&self.mem, addr, shape))
        } else {
            Err(type_not_support(format!("{dt:?} not supported")))
        }
    }
}

impl<M: DerefMut<Target = [u8]>> Tensor<M> {
    #[inline]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.mem
    }
}

fn check_len(shape: [usize; 4], len: usize) -> Result<(), SchemeError> {
    let count = shape.iter().product::<usize>();
    if count == len {
        Ok(())
    } else {
        Err(shape_mismatch(format!("{shape:?} holds {count} elements, got {len}")))
    }
}

fn indices([b, h, w, c]: [usize; 4]) -> impl Iterator<Item = [usize; 4]> {
    (0..b).flat_map(move |ib| {
        (0..h).flat_map(move |ih| (0..w).flat_map(move |iw| (0..c).map(move |ic| [ib, ih, iw, ic])))
    })
}

fn store<T: Digit>(mem: &mut [u8], addr: Address, shape: [usize; 4], data: &[f32]) {
    let base = mem.as_mut_ptr().cast::<T>();
    for ([b, h, w, c], &val) in indices(shape).zip(data) {
        unsafe { base.offset(addr.offset(b, h, w, c)).write_unaligned(cast(val)) }
    }
}

fn load<T: Digit>(mem: &[u8], addr: Address, shape: [usize; 4]) -> Vec<f32> {
    let base = mem.as_ptr().cast::<T>();
    indices(shape)
        .map(|[b, h, w, c]| cast(unsafe { base.offset(addr.offset(b, h, w, c)).read_unaligned() }))
        .collect()
}

#[test]
fn test_round_trip_storages() {
    let shape = [2, 2, 3, 5];
    let data = (0..60).map(|i| i as f32 * 0.5 - 7.).collect::<Vec<_>>();
    for storage in StorageType::ALL {
        for dt in [ty::F32, ty::F16] {
            let tensor = Tensor::from_f32(TensorLayout::new(dt, storage, shape), &data).unwrap();
            assert_eq!(tensor.to_f32().unwrap(), data, "{storage:?} {dt:?}");
        }
    }
}

#[test]
fn test_len_mismatch() {
    let layout = TensorLayout::new(ty::F32, StorageType::Buffer, [1, 1, 1, 4]);
    let e = Tensor::from_f32(layout, &[0.; 3]).err().unwrap();
    assert_eq!(e.kind, super::SchemeErrorKind::ShapeMismatch);
}
