use thiserror::Error;

use crate::mapping::{Role, Side};

/// Failures raised by the reconciliation core before any row is read.
/// Row-level problems are never errors; they surface as result statuses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{side} list has no usable column mapped for required role '{role}'")]
    MissingMapping { side: Side, role: Role },
}
