//! Error types for `lumbung-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("program not found: {0}")]
  ProgramNotFound(Uuid),

  #[error("item not found: {0}")]
  ItemNotFound(Uuid),

  #[error("program item not found: {0}")]
  ProgramItemNotFound(Uuid),

  #[error("recipient not found: {0}")]
  RecipientNotFound(Uuid),

  #[error("family not found: {0}")]
  FamilyNotFound(Uuid),

  #[error("resident not found: {0}")]
  ResidentNotFound(Uuid),

  /// A live program-item line already exists for this (program, item) pair.
  #[error("item {item_id} is already attached to program {program_id}")]
  DuplicateAttachment { program_id: Uuid, item_id: Uuid },

  /// A live recipient row already exists for this (program, beneficiary) pair.
  #[error("beneficiary {beneficiary_id} is already enrolled in program {program_id}")]
  DuplicateEnrollment {
    program_id:     Uuid,
    beneficiary_id: Uuid,
  },

  /// The beneficiary kind does not match the program's fixed target mode.
  #[error("program {program_id} targets {expected}, got a {got} beneficiary")]
  TargetModeMismatch {
    program_id: Uuid,
    expected:   crate::program::TargetMode,
    got:        crate::program::TargetMode,
  },

  /// A status update violates a delivery-status invariant.
  #[error("invalid transition: {0}")]
  InvalidTransition(String),

  /// An item cannot be soft-deleted while a live program-item references it.
  #[error("item {0} is still attached to a program")]
  ItemInUse(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
