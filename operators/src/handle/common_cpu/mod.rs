use crate::{
    check_storage, precision_not_support, Alloc, Blob, Hardware, Precision, QueueAlloc, QueueOf,
    SchemeCache, SchemeCacheSize, SchemeDiversity, SchemeError, StorageType,
};
use std::hash::Hash;

/// 以 CPU 模拟的计算设备。
///
/// 每个工作组由一个 rayon 任务执行，组内各线程按阶段依次执行，阶段之间即为组内同步点。
#[derive(Clone, Debug, Default)]
pub struct Cpu {
    capabilities: Capabilities,
    cache_size: SchemeCacheSize,
}

/// 设备能力。
#[derive(Clone, Debug)]
pub struct Capabilities {
    pub storages: Vec<StorageType>,
    pub precisions: Vec<Precision>,
    /// 工作组最大线程数。
    pub max_group_size: usize,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            storages: StorageType::ALL.to_vec(),
            precisions: Precision::ALL.to_vec(),
            max_group_size: 256,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ThisThread;

impl Hardware for Cpu {
    type Byte = u8;
    type Queue<'ctx> = ThisThread;
}

impl Cpu {
    #[inline]
    pub fn new(capabilities: Capabilities, cache_size: SchemeCacheSize) -> Self {
        Self {
            capabilities,
            cache_size,
        }
    }

    #[inline]
    pub fn supported_storages(&self) -> &[StorageType] {
        &self.capabilities.storages
    }

    #[inline]
    pub fn supported_precisions(&self) -> &[Precision] {
        &self.capabilities.precisions
    }

    #[inline]
    pub fn max_group_size(&self) -> usize {
        self.capabilities.max_group_size.max(1)
    }

    /// 检查设备是否支持指定的精度和存储方式。
    pub fn check(&self, precision: Precision, storages: &[StorageType]) -> Result<(), SchemeError> {
        if !self.supported_precisions().contains(&precision) {
            return Err(precision_not_support(format!(
                "{precision:?} not in {:?}",
                self.supported_precisions()
            )));
        }
        for &storage in storages {
            check_storage(self.supported_storages(), storage)?
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn new_cache<K: Hash + Eq, V: Copy>(&self, level: SchemeDiversity) -> SchemeCache<K, V> {
        self.cache_size.new_cache(level)
    }
}

impl Alloc<Blob> for ThisThread {
    #[inline]
    fn alloc(&self, size: usize) -> Option<Blob> {
        Blob::try_new(size)
    }

    #[inline]
    fn free(&self, _mem: Blob) {}
}

impl QueueAlloc for ThisThread {
    type Hardware = Cpu;
    type DevMem = Blob;
    #[inline]
    fn queue(&self) -> &QueueOf<Self::Hardware> {
        self
    }
}

#[test]
fn test_capabilities() {
    use crate::SchemeErrorKind;

    let cpu = Cpu::default();
    for precision in Precision::ALL {
        assert!(cpu.check(precision, &StorageType::ALL).is_ok());
    }

    let cpu = Cpu::new(
        Capabilities {
            storages: vec![StorageType::Buffer],
            precisions: vec![Precision::F32],
            max_group_size: 0,
        },
        Default::default(),
    );
    assert_eq!(cpu.max_group_size(), 1);
    assert_eq!(
        cpu.check(Precision::F16, &[StorageType::Buffer]).unwrap_err().kind,
        SchemeErrorKind::PrecisionNotSupport
    );
    assert_eq!(
        cpu.check(Precision::F32, &[StorageType::Buffer, StorageType::Texture2D])
            .unwrap_err()
            .kind,
        SchemeErrorKind::StorageNotSupport
    );
}
