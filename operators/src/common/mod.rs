mod blob;
mod diversity;
mod error;
mod maybe_dyn;
mod precision;
mod storage;
mod tensor;

pub use blob::Blob;
pub use diversity::{SchemeCacheSize, SchemeDiversity};
pub(crate) use diversity::SchemeCache;
pub use error::{functions::*, LaunchError, LaunchErrorKind, SchemeError, SchemeErrorKind};
pub use maybe_dyn::{dyn_, DynVal, MaybeDyn, MergeError};
pub use precision::Precision;
pub use storage::{StorageType, SLICE};
pub use tensor::{Tensor, TensorLayout};

pub(crate) use maybe_dyn::{get_static, static_from};
pub(crate) use precision::{cast, digit_size, Digit};
pub(crate) use storage::{check_storage, with_addressing, Address, Addressing};

pub(crate) mod utils {
    use super::{shape_mismatch, MaybeDyn, SchemeError};

    #[inline]
    pub(crate) fn dim_distinct(args: &[MaybeDyn<usize>]) -> Result<MaybeDyn<usize>, SchemeError> {
        MaybeDyn::merge(args)
            .copied()
            .map_err(|_| {
                let dims = args.iter().map(|d| d.to_string()).collect::<Vec<_>>();
                shape_mismatch(format!("[{}] are not distinct", dims.join(", ")))
            })
    }

    #[inline(always)]
    pub(crate) const fn last_power_of_two(n: usize) -> usize {
        1 << (usize::BITS - n.leading_zeros() - 1)
    }
}
