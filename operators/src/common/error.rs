use std::{error::Error, fmt};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SchemeErrorKind {
    TypeNotSupport,
    TypeMismatch,
    PrecisionNotSupport,
    StorageNotSupport,
    StorageMismatch,
    ShapeMismatch,
    StridesNotSupport,
    ArgsNotSupport,
    DynamicNotSupport,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LaunchErrorKind {
    Scheme(SchemeErrorKind),
    ExecutionFailed,
}

#[derive(Clone, Debug)]
pub struct SchemeError {
    pub kind: SchemeErrorKind,
    pub info: String,
}

#[derive(Clone, Debug)]
pub struct LaunchError {
    pub kind: LaunchErrorKind,
    pub info: String,
}

impl From<SchemeError> for LaunchError {
    fn from(value: SchemeError) -> Self {
        Self {
            kind: LaunchErrorKind::Scheme(value.kind),
            info: value.info,
        }
    }
}

impl fmt::Display for SchemeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.info)
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            LaunchErrorKind::Scheme(kind) => write!(f, "{kind:?}: {}", self.info),
            LaunchErrorKind::ExecutionFailed => write!(f, "ExecutionFailed: {}", self.info),
        }
    }
}

impl Error for SchemeError {}
impl Error for LaunchError {}

pub(super) mod functions {
    use super::{LaunchError, LaunchErrorKind::*, SchemeError, SchemeErrorKind::*};

    macro_rules! builder {
        ($ty:ident: $name:ident $kind:expr) => {
            #[inline]
            pub fn $name(info: impl Into<String>) -> $ty {
                $ty {
                    kind: $kind,
                    info: info.into(),
                }
            }
        };
    }

    builder!(SchemeError: type_not_support      TypeNotSupport     );
    builder!(SchemeError: type_mismatch         TypeMismatch       );
    builder!(SchemeError: precision_not_support PrecisionNotSupport);
    builder!(SchemeError: storage_not_support   StorageNotSupport  );
    builder!(SchemeError: storage_mismatch      StorageMismatch    );
    builder!(SchemeError: shape_mismatch        ShapeMismatch      );
    builder!(SchemeError: strides_not_support   StridesNotSupport  );
    builder!(SchemeError: args_not_support      ArgsNotSupport     );
    builder!(SchemeError: dyn_not_support       DynamicNotSupport  );

    builder!(LaunchError: execution_failed      ExecutionFailed    );
}

#[test]
fn test_scheme_into_launch() {
    use functions::{execution_failed, shape_mismatch};

    let e: LaunchError = shape_mismatch("x.c = 4, y.c = 5").into();
    assert_eq!(e.kind, LaunchErrorKind::Scheme(SchemeErrorKind::ShapeMismatch));
    assert_eq!(e.to_string(), "ShapeMismatch: x.c = 4, y.c = 5");

    let e = execution_failed("out of memory");
    assert_eq!(e.kind, LaunchErrorKind::ExecutionFailed);
    assert_eq!(e.to_string(), "ExecutionFailed: out of memory");
}
