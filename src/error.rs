use thiserror::Error;

/// Everything that can go wrong in an allocator call.
///
/// Variants fall into three groups: invalid input (`ZeroSize`, `Overflow`),
/// resource failure (`Exhausted`) and caller contract violations (the rest).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AllocError {
  #[error("zero-sized allocation request")]
  ZeroSize,

  #[error("{count} elements of {size} bytes overflow usize")]
  Overflow { count: usize, size: usize },

  #[error("heap exhausted while requesting {requested} bytes")]
  Exhausted { requested: usize },

  #[error("block {index} freed twice")]
  DoubleFree { index: usize },

  #[error("block {index} used after being freed")]
  UseAfterFree { index: usize },

  #[error("allocation does not belong to this allocator")]
  ForeignHandle,
}

impl AllocError {
  /// True for errors caused by misuse of a handle rather than by the request.
  pub fn is_contract_violation(&self) -> bool {
    matches!(
      self,
      AllocError::DoubleFree { .. } | AllocError::UseAfterFree { .. } | AllocError::ForeignHandle
    )
  }
}
