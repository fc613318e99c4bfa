use crate::{
    args_not_support, dyn_, shape_mismatch, storage_mismatch, type_mismatch, utils::dim_distinct,
    ConstPtr, Hardware, MaybeDyn, MutPtr, Precision, SchemeError, StorageType, TensorLayout,
};
use digit_layout::DigitLayout;

/// 张量描述：数据类型、存储方式和（可能动态的）通道数。
#[derive(Clone, Debug)]
pub struct TensorDesc {
    pub dt: DigitLayout,
    pub storage: StorageType,
    pub channels: MaybeDyn<usize>,
}

impl TensorDesc {
    /// 数据类型由精度推导，通道数动态。
    pub fn new(precision: Precision, storage: StorageType) -> Self {
        Self {
            dt: precision.storage_type(),
            storage,
            channels: dyn_(),
        }
    }

    pub fn with_channels(self, channels: usize) -> Self {
        Self {
            channels: channels.into(),
            ..self
        }
    }

    fn check(&self, name: &str, layout: &TensorLayout) -> Result<(), SchemeError> {
        if layout.dt != self.dt {
            return Err(type_mismatch(format!(
                "{name}.dt = {:?}, {:?} expected",
                layout.dt, self.dt
            )));
        }
        if layout.storage != self.storage {
            return Err(storage_mismatch(format!(
                "{name}.storage = {:?}, {:?} expected",
                layout.storage, self.storage
            )));
        }
        Ok(())
    }
}

/// 算子配置，构造算子时确定。
#[derive(Clone, Debug)]
pub struct OperationDef {
    pub precision: Precision,
    pub src: TensorDesc,
    pub dst: TensorDesc,
}

impl OperationDef {
    /// 源和目标使用相同存储方式的配置。
    pub fn new(precision: Precision, storage: StorageType) -> Self {
        Self {
            precision,
            src: TensorDesc::new(precision, storage),
            dst: TensorDesc::new(precision, storage),
        }
    }

    /// 检查配置自身的一致性，返回合并后的通道数。
    pub(super) fn check(&self) -> Result<MaybeDyn<usize>, SchemeError> {
        let dt = self.precision.storage_type();
        for (name, desc) in [("src", &self.src), ("dst", &self.dst)] {
            if desc.dt != dt {
                return Err(type_mismatch(format!(
                    "{name}.dt = {:?}, {:?} deduced from {:?}",
                    desc.dt, dt, self.precision
                )));
            }
        }
        dim_distinct(&[self.src.channels, self.dst.channels])
    }
}

pub struct Args<H: Hardware> {
    pub y_layout: TensorLayout,
    pub y_base: MutPtr<H>,
    pub x_layout: TensorLayout,
    pub x_base: ConstPtr<H>,
    /// 加在方差上，方差恰为 0 时不起作用。
    pub epsilon: f32,
}

pub(super) struct Meta {
    pub b: MaybeDyn<usize>,
    pub h: MaybeDyn<usize>,
    pub w: MaybeDyn<usize>,
    pub c: MaybeDyn<usize>,
}

impl<H: Hardware> Args<H> {
    pub(super) fn meta(&self, def: &OperationDef) -> Result<Meta, SchemeError> {
        let Self {
            y_layout: y,
            x_layout: x,
            epsilon,
            ..
        } = self;

        def.src.check("x", x)?;
        def.dst.check("y", y)?;
        if !(epsilon.is_finite() && *epsilon >= 0.) {
            return Err(args_not_support(format!("epsilon = {epsilon}")));
        }

        let &[bx, hx, wx, cx] = x.shape();
        let &[by, hy, wy, cy] = y.shape();
        Ok(Meta {
            b: dim_distinct(&[bx, by])?,
            h: dim_distinct(&[hx, hy])?,
            w: dim_distinct(&[wx, wy])?,
            c: dim_distinct(&[cx, cy, def.src.channels, def.dst.channels])
                .map_err(|e| shape_mismatch(format!("channels: {}", e.info)))?,
        })
    }
}
