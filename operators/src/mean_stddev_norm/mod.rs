//! 均值-标准差归一化。
//!
//! 对 BHWC 张量的每个通道向量计算均值和标准差，输出 `(x - mean) / stddev`。
//! 只做前向计算，不保存任何跨调用的统计量。

#[cfg(use_cpu)]
pub mod common_cpu;

mod args;
mod reduce;

pub use args::{Args, OperationDef, TensorDesc};

use crate::{
    execution_failed, ByteOf, Hardware, LaunchError, Operator, QueueAlloc, Tensor, TensorLayout,
};
use std::ops::Deref;

/// [execute](MeanStdDevNorm::execute) 使用的方差修正量。
pub const DEFAULT_EPSILON: f32 = 1e-8;

pub trait MeanStdDevNorm<H: Hardware>:
    Operator<Hardware = H, Config = OperationDef, Args = Args<H>>
{
    /// 构造算子时的配置。
    fn op_def(&self) -> &OperationDef;

    /// 归一化 `x`，在配置的目标存储方式下分配并返回结果张量。
    ///
    /// 失败时结果存储区域已被释放，不会返回部分结果。
    fn execute<QA, M>(&self, x: &Tensor<M>, queue_alloc: &QA) -> Result<Tensor<QA::DevMem>, LaunchError>
    where
        QA: QueueAlloc<Hardware = H>,
        M: Deref<Target = [ByteOf<H>]>,
    {
        let dst = &self.op_def().dst;
        let y_layout = TensorLayout::new(dst.dt, dst.storage, x.layout.static_shape()?);

        let x_size = x.layout.nbytes()?;
        if x.mem.len() < x_size {
            return Err(execution_failed(format!(
                "x holds {} bytes, {x_size} expected",
                x.mem.len()
            )));
        }
        let y_size = y_layout.nbytes()?;
        let Some(mut mem) = queue_alloc.alloc(y_size) else {
            return Err(execution_failed(format!("failed to allocate {y_size} bytes")));
        };

        let args = Args {
            y_layout: y_layout.clone(),
            y_base: mem.as_mut_ptr(),
            x_layout: x.layout.clone(),
            x_base: x.mem.as_ptr(),
            epsilon: DEFAULT_EPSILON,
        };
        match self.launch(&args, queue_alloc) {
            Ok(()) => Ok(Tensor {
                layout: y_layout,
                mem,
            }),
            Err(e) => {
                queue_alloc.free(mem);
                Err(e)
            }
        }
    }
}
