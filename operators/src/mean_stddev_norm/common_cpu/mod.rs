use super::{
    args::Meta,
    reduce::{lane_channels, moments, Moments},
    Args, MeanStdDevNorm, OperationDef,
};
use crate::{
    cast, common_cpu::Cpu, get_static, utils::last_power_of_two, with_addressing, Address,
    Addressing, Digit, LaunchError, Precision, QueueAlloc, SchemeCache,
    SchemeDiversity::Low as LowDiversity,
    SchemeError, SLICE,
};
use half::f16;
use log::{debug, info, trace};
use num_traits::Float;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::marker::PhantomData;

pub struct Operator {
    def: OperationDef,
    max_group_size: usize,
    schemes: SchemeCache<usize, Plan>,
}

/// 工作组规划，只与通道数有关。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Plan {
    group_size: usize,
}

impl MeanStdDevNorm<Cpu> for Operator {
    #[inline]
    fn op_def(&self) -> &OperationDef {
        &self.def
    }
}

impl crate::Operator for Operator {
    type Hardware = Cpu;
    type Config = OperationDef;
    type Args = Args<Cpu>;

    fn build(node: &Self::Hardware, config: &Self::Config) -> Result<Self, SchemeError> {
        let channels = node
            .check(config.precision, &[config.src.storage, config.dst.storage])
            .and_then(|()| config.check())
            .inspect_err(|e| info!("mean_stddev_norm rejected {config:?}: {e}"))?;

        let op = Self {
            def: config.clone(),
            max_group_size: node.max_group_size(),
            schemes: node.new_cache(LowDiversity),
        };
        if let Some(&c) = channels.get_static() {
            op.plan(c);
        }
        Ok(op)
    }

    fn scheme(&mut self, args: &Self::Args) -> Result<(), SchemeError> {
        let Meta { c, .. } = args.meta(&self.def)?;
        if let Some(&c) = c.get_static() {
            self.plan(c);
        }
        Ok(())
    }

    fn launch<QA>(&self, args: &Self::Args, _queue_alloc: &QA) -> Result<(), LaunchError>
    where
        QA: QueueAlloc<Hardware = Self::Hardware>,
    {
        let Meta { b, h, w, c } = args.meta(&self.def)?;
        let Args {
            y_layout,
            y_base,
            x_layout,
            x_base,
            epsilon,
        } = args;
        get_static! {
            b h w c
        }

        let shape = [b, h, w, c];
        let (x, _) = Address::new(x_layout, shape)?;
        let (y, _) = Address::new_disjoint(y_layout, shape)?;
        if shape.contains(&0) {
            return Ok(());
        }

        let Plan { group_size } = self.plan(c);
        trace!(
            "mean_stddev_norm {:?} {shape:?} with {group_size} lanes per group",
            self.def.precision
        );

        macro_rules! calculate {
            ($s:ty, $t:ty) => {
                with_addressing!(x, x => with_addressing!(y, y => Scheme::<$s, $t, _, _> {
                    shape,
                    group_size,
                    epsilon: *epsilon as f64,
                    x_base: x_base.cast(),
                    x,
                    y_base: y_base.cast(),
                    y,
                    compute: PhantomData,
                }
                .calculate()))
            };
        }

        match self.def.precision {
            Precision::F32 => calculate!(f32, f32),
            Precision::F32F16 => calculate!(f16, f32),
            Precision::F16 => calculate!(f16, f16),
        }
        Ok(())
    }
}

impl Operator {
    fn plan(&self, c: usize) -> Plan {
        self.schemes.get_or_insert(c, || {
            // group_size 是不大于切片数且不大于 max_group_size 的 2 的幂
            let slices = c.div_ceil(SLICE).max(1);
            let plan = Plan {
                group_size: last_power_of_two(slices.min(self.max_group_size)),
            };
            debug!("mean_stddev_norm plan for {c} channels: {plan:?}");
            plan
        })
    }
}

/// 按精度和存储方式静态特化的计算方案。
///
/// `S` 是存储类型，`T` 是逐元素计算的类型，`X`、`Y` 是源和目标的寻址方式。
struct Scheme<S, T, X, Y> {
    shape: [usize; 4],
    group_size: usize,
    epsilon: f64,
    x_base: *const S,
    x: X,
    y_base: *mut S,
    y: Y,
    compute: PhantomData<T>,
}

// 各行读写的元素互不重叠，可以并行执行。
unsafe impl<S, T, X: Sync, Y: Sync> Sync for Scheme<S, T, X, Y> {}

impl<S, T, X, Y> Scheme<S, T, X, Y>
where
    S: Digit,
    T: Float,
    X: Addressing,
    Y: Addressing,
{
    fn calculate(&self) {
        let [b, h, w, _] = self.shape;
        (0..b * h * w).into_par_iter().for_each_init(
            || vec![0.; self.group_size],
            |local, row| {
                let iw = row % w;
                let ih = row / w % h;
                let ib = row / w / h;
                self.normalize_row(local, ib, ih, iw)
            },
        )
    }

    fn normalize_row(&self, local: &mut [f64], b: usize, h: usize, w: usize) {
        let channels = self.shape[3];
        // 外部内存不保证按元素类型对齐
        let load = |c: usize| -> S {
            unsafe { self.x_base.offset(self.x.offset(b, h, w, c)).read_unaligned() }
        };

        let Moments { mean, inv_std } = moments(local, channels, self.epsilon, |c| cast(load(c)));

        // 统计量对所有线程可见后才开始逐元素计算
        let mean = cast::<T, _>(mean);
        // 方差极小时标准差倒数可能超出计算类型的表示范围
        let k = cast::<T, _>(inv_std.min(cast::<f64, _>(T::max_value())));
        for lane in 0..self.group_size {
            for c in lane_channels(self.group_size, lane, channels) {
                let x = cast::<T, _>(load(c));
                let y = (x - mean) * k;
                unsafe {
                    self.y_base
                        .offset(self.y.offset(b, h, w, c))
                        .write_unaligned(cast::<S, _>(y))
                }
            }
        }
    }
}
