// #![deny(warnings)]

mod common;
mod handle;

pub mod mean_stddev_norm;

pub use common::*;
pub(crate) use common::{get_static, static_from};

#[cfg(use_cpu)]
pub use handle::common_cpu;

use std::ops::DerefMut;

/// 算力硬件抽象。
///
/// 约定硬件如何存储和运行。
/// 这个特质应该由管理硬件的基本单元的映射类型实现，通常是**硬件上下文**。
pub trait Hardware {
    /// 硬件的存储单元类型。
    type Byte;
    /// 硬件的任务队列类型。
    type Queue<'ctx>;
}

pub type ByteOf<H> = <H as Hardware>::Byte;
pub type QueueOf<'ctx, H> = <H as Hardware>::Queue<'ctx>;
pub type ArgsOf<O> = <O as Operator>::Args;
pub type ConfigOf<O> = <O as Operator>::Config;
pub(crate) type MutPtr<H> = *mut <H as Hardware>::Byte;
pub(crate) type ConstPtr<H> = *const <H as Hardware>::Byte;

pub trait Alloc<M> {
    /// 分配 `size` 个存储单元，资源不足时返回 [None]。
    fn alloc(&self, size: usize) -> Option<M>;
    fn free(&self, mem: M);
}

/// 绑定到队列的分配器。
pub trait QueueAlloc: Alloc<Self::DevMem> {
    /// 队列分配器对应的硬件。
    type Hardware: Hardware;
    /// 分配器分配和回收的对象，表示对某块存储区域的所有权。
    type DevMem: DerefMut<Target = [ByteOf<Self::Hardware>]>;
    /// 分配器对应的队列。
    fn queue(&self) -> &QueueOf<Self::Hardware>;
}

/// 算子。
pub trait Operator {
    /// 执行算子的硬件。
    type Hardware: Hardware;
    /// 算子的构造配置，构造后不可变。
    type Config;
    /// 算子的参数类型。
    type Args;

    /// 在指定硬件上按配置构造算子实例。
    ///
    /// 硬件不支持的精度或存储方式、相互矛盾的配置在此时报告，不会产生半成品实例。
    fn build(node: &Self::Hardware, config: &Self::Config) -> Result<Self, SchemeError>
    where
        Self: Sized;

    /// 规划执行方案。
    ///
    /// 参数中的形状和步长可以是动态的（[MaybeDyn::dynamic]），此时只检查静态部分，
    /// 静态的部分足以确定执行方案时，方案将被缓存以供 [launch](Operator::launch) 复用。
    fn scheme(&mut self, args: &Self::Args) -> Result<(), SchemeError>;

    /// 发射算子到任务队列。
    ///
    /// 发射时所有形状和步长必须是静态的。
    fn launch<QA>(&self, args: &Self::Args, queue_alloc: &QA) -> Result<(), LaunchError>
    where
        QA: QueueAlloc<Hardware = Self::Hardware>;
}
