//! The resident/family registry interface the core consumes.
//!
//! The registry itself is maintained elsewhere in the village portal; the
//! assistance core only reads it to validate beneficiaries, derive household
//! heads, and list enrollment candidates. Backends keep a local mirror so
//! those lookups stay inside the store's transactions.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered family (the family-card unit of the civil registry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
  pub family_id:        Uuid,
  /// The family-card number, used as the display name.
  pub number:           String,
  /// The designated household head, if one is recorded.
  pub head_resident_id: Option<Uuid>,
  /// Administrative area (hamlet/ward), used for geographic filtering.
  pub area:             Option<String>,
}

/// A registered resident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
  pub resident_id: Uuid,
  pub name:        String,
  /// The family the resident belongs to, if any.
  pub family_id:   Option<Uuid>,
  pub area:        Option<String>,
}

/// Read access to the registry mirror, plus the upsert hooks the enclosing
/// portal uses to keep the mirror in sync.
pub trait BeneficiaryRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up a family by id. Returns `None` if not registered.
  fn get_family(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Family>, Self::Error>> + Send + '_;

  /// Look up a resident by id. Returns `None` if not registered.
  fn get_resident(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Resident>, Self::Error>> + Send + '_;

  /// Insert or replace a family in the mirror.
  fn upsert_family(
    &self,
    family: Family,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or replace a resident in the mirror.
  fn upsert_resident(
    &self,
    resident: Resident,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
