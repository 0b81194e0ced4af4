//! Programs and program-item lines.
//!
//! A program is one assistance campaign (e.g. "Rice 2025 Q1") with a fixed
//! beneficiary kind. Its catalog lines say what is handed out and how much
//! per beneficiary; its recipients (see [`crate::recipient`]) say to whom.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Target mode ─────────────────────────────────────────────────────────────

/// The beneficiary kind a program targets. Fixed at creation: every
/// recipient row of the program carries a matching beneficiary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
  Family,
  Individual,
}

impl fmt::Display for TargetMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Family => write!(f, "family"),
      Self::Individual => write!(f, "individual"),
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Program lifecycle status.
///
/// `InProgress` is the initial state. The transition to `Completed` happens
/// either explicitly (an administrator closes the program, sweeping every
/// pending recipient to arrived) or automatically when the last pending
/// recipient is resolved. There is no automatic transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
  InProgress,
  Completed,
}

// ─── Program ─────────────────────────────────────────────────────────────────

/// An assistance campaign for a given year/period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistanceProgram {
  pub program_id:  Uuid,
  pub name:        String,
  pub year:        i32,
  /// Free-text period, e.g. "Q1" or "January".
  pub period:      String,
  pub target_mode: TargetMode,
  pub status:      ProgramStatus,
  pub notes:       Option<String>,
  pub created_at:  DateTime<Utc>,
  pub created_by:  Uuid,
  pub updated_by:  Option<Uuid>,
}

/// Input to [`crate::store::AssistanceStore::create_program`].
/// Status always starts as [`ProgramStatus::InProgress`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgram {
  pub name:        String,
  pub year:        i32,
  pub period:      String,
  pub target_mode: TargetMode,
  pub notes:       Option<String>,
}

/// Partial update for an existing program. `None` fields are left unchanged.
///
/// Setting `status` to `Completed` on an in-progress program triggers the
/// completion sweep (see [`crate::store::AssistanceStore::complete_program`]).
/// Changing `target_mode` is rejected while the program has live recipients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramUpdate {
  pub name:        Option<String>,
  pub year:        Option<i32>,
  pub period:      Option<String>,
  pub target_mode: Option<TargetMode>,
  pub status:      Option<ProgramStatus>,
  pub notes:       Option<Option<String>>,
}

// ─── Program items ───────────────────────────────────────────────────────────

/// A catalog line attached to a program: which item, and how much of it.
/// At most one live line exists per (program, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramItem {
  pub program_item_id: Uuid,
  pub program_id:      Uuid,
  pub item_id:         Uuid,
  pub quantity:        f64,
  pub created_at:      DateTime<Utc>,
}
