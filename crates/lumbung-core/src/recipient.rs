//! Recipients — enrollments of a beneficiary into a program.
//!
//! A recipient row carries delivery state: pending until the beneficiary
//! shows up (or definitively does not), plus the derived household head and
//! an optional stand-in representative for pickup.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::program::TargetMode;

// ─── Beneficiary key ─────────────────────────────────────────────────────────

/// The beneficiary of an enrollment — a whole family or a single resident,
/// matching the program's target mode. Exactly one key is ever populated;
/// the variant itself is the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum BeneficiaryRef {
  Family(Uuid),
  Individual(Uuid),
}

impl BeneficiaryRef {
  /// The target mode this reference belongs to.
  pub fn target_mode(&self) -> TargetMode {
    match self {
      Self::Family(_) => TargetMode::Family,
      Self::Individual(_) => TargetMode::Individual,
    }
  }

  /// The raw id, whichever kind it is.
  pub fn id(&self) -> Uuid {
    match self {
      Self::Family(id) | Self::Individual(id) => *id,
    }
  }
}

// ─── Delivery status ─────────────────────────────────────────────────────────

/// Whether the beneficiary has collected their assistance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
  Pending,
  Arrived,
  NotArrived,
}

impl DeliveryStatus {
  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending) }
}

// ─── Recipient ───────────────────────────────────────────────────────────────

/// One beneficiary's enrollment in one program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
  pub recipient_id:            Uuid,
  pub program_id:              Uuid,
  pub beneficiary:             BeneficiaryRef,
  /// Head of the beneficiary's family, derived at enrollment from the
  /// registry. Null when an individual beneficiary has no family on record.
  pub household_head_id:       Option<Uuid>,
  /// A household member collecting on the head's behalf. Always null while
  /// status is `NotArrived`.
  pub field_representative_id: Option<Uuid>,
  pub status:                  DeliveryStatus,
  /// Set whenever status is `Arrived`; null otherwise unless recorded.
  pub distribution_date:       Option<NaiveDate>,
  pub notes:                   Option<String>,
  pub created_at:              DateTime<Utc>,
  pub created_by:              Uuid,
  pub updated_by:              Option<Uuid>,
}

// ─── Distribution update ─────────────────────────────────────────────────────

/// Input to [`crate::store::AssistanceStore::update_distribution`].
///
/// Validation: `Arrived` requires `distribution_date`; `NotArrived` clears
/// `field_representative_id` silently (the row is stored with a null
/// representative regardless of what is passed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionUpdate {
  pub status:                  DeliveryStatus,
  pub distribution_date:       Option<NaiveDate>,
  pub field_representative_id: Option<Uuid>,
  pub notes:                   Option<String>,
}

// ─── Batch enrollment ────────────────────────────────────────────────────────

/// One beneficiary that could not be enrolled during a batch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentFailure {
  pub beneficiary: BeneficiaryRef,
  /// Human-readable reason, rendered from the underlying typed error.
  pub reason:      String,
}

/// Outcome of [`crate::store::AssistanceStore::enroll_batch`]: best-effort,
/// per-beneficiary. One bad reference never aborts the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchEnrollment {
  pub enrolled: Vec<Recipient>,
  pub failures: Vec<EnrollmentFailure>,
}

// ─── Available beneficiaries ─────────────────────────────────────────────────

/// A registry entry eligible for enrollment into a program: no live
/// recipient row for that program yet. Annotated with whether the
/// beneficiary has ever received assistance from any program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeneficiaryCandidate {
  pub beneficiary:         BeneficiaryRef,
  /// Family number or resident name, for display.
  pub name:                String,
  pub area:                Option<String>,
  pub has_received_before: bool,
}
