//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, enums
//! are their lowercase/snake_case discriminants, UUIDs are hyphenated
//! lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use lumbung_core::{
  item::{AssistanceItem, ItemKind},
  program::{AssistanceProgram, ProgramItem, ProgramStatus, TargetMode},
  recipient::{BeneficiaryRef, DeliveryStatus, Recipient},
  registry::{Family, Resident},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_uuid_opt(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_item_kind(k: ItemKind) -> &'static str {
  match k {
    ItemKind::Money => "money",
    ItemKind::Goods => "goods",
  }
}

pub fn decode_item_kind(s: &str) -> Result<ItemKind> {
  match s {
    "money" => Ok(ItemKind::Money),
    "goods" => Ok(ItemKind::Goods),
    other => Err(Error::Decode(format!("unknown item kind: {other:?}"))),
  }
}

pub fn encode_target_mode(m: TargetMode) -> &'static str {
  match m {
    TargetMode::Family => "family",
    TargetMode::Individual => "individual",
  }
}

pub fn decode_target_mode(s: &str) -> Result<TargetMode> {
  match s {
    "family" => Ok(TargetMode::Family),
    "individual" => Ok(TargetMode::Individual),
    other => Err(Error::Decode(format!("unknown target mode: {other:?}"))),
  }
}

pub fn encode_program_status(s: ProgramStatus) -> &'static str {
  match s {
    ProgramStatus::InProgress => "in_progress",
    ProgramStatus::Completed => "completed",
  }
}

pub fn decode_program_status(s: &str) -> Result<ProgramStatus> {
  match s {
    "in_progress" => Ok(ProgramStatus::InProgress),
    "completed" => Ok(ProgramStatus::Completed),
    other => Err(Error::Decode(format!("unknown program status: {other:?}"))),
  }
}

pub fn encode_delivery_status(s: DeliveryStatus) -> &'static str {
  match s {
    DeliveryStatus::Pending => "pending",
    DeliveryStatus::Arrived => "arrived",
    DeliveryStatus::NotArrived => "not_arrived",
  }
}

pub fn decode_delivery_status(s: &str) -> Result<DeliveryStatus> {
  match s {
    "pending" => Ok(DeliveryStatus::Pending),
    "arrived" => Ok(DeliveryStatus::Arrived),
    "not_arrived" => Ok(DeliveryStatus::NotArrived),
    other => Err(Error::Decode(format!("unknown delivery status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `items` row.
pub struct RawItem {
  pub item_id:    String,
  pub name:       String,
  pub kind:       String,
  pub unit:       String,
  pub created_at: String,
}

impl RawItem {
  pub fn into_item(self) -> Result<AssistanceItem> {
    Ok(AssistanceItem {
      item_id:    decode_uuid(&self.item_id)?,
      name:       self.name,
      kind:       decode_item_kind(&self.kind)?,
      unit:       self.unit,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `programs` row.
pub struct RawProgram {
  pub program_id:  String,
  pub name:        String,
  pub year:        i32,
  pub period:      String,
  pub target_mode: String,
  pub status:      String,
  pub notes:       Option<String>,
  pub created_at:  String,
  pub created_by:  String,
  pub updated_by:  Option<String>,
}

impl RawProgram {
  pub fn into_program(self) -> Result<AssistanceProgram> {
    Ok(AssistanceProgram {
      program_id:  decode_uuid(&self.program_id)?,
      name:        self.name,
      year:        self.year,
      period:      self.period,
      target_mode: decode_target_mode(&self.target_mode)?,
      status:      decode_program_status(&self.status)?,
      notes:       self.notes,
      created_at:  decode_dt(&self.created_at)?,
      created_by:  decode_uuid(&self.created_by)?,
      updated_by:  decode_uuid_opt(self.updated_by.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `program_items` row.
pub struct RawProgramItem {
  pub program_item_id: String,
  pub program_id:      String,
  pub item_id:         String,
  pub quantity:        f64,
  pub created_at:      String,
}

impl RawProgramItem {
  pub fn into_program_item(self) -> Result<ProgramItem> {
    Ok(ProgramItem {
      program_item_id: decode_uuid(&self.program_item_id)?,
      program_id:      decode_uuid(&self.program_id)?,
      item_id:         decode_uuid(&self.item_id)?,
      quantity:        self.quantity,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `recipients` row.
pub struct RawRecipient {
  pub recipient_id:            String,
  pub program_id:              String,
  pub target_type:             String,
  pub family_id:               Option<String>,
  pub resident_id:             Option<String>,
  pub household_head_id:       Option<String>,
  pub field_representative_id: Option<String>,
  pub status:                  String,
  pub distribution_date:       Option<String>,
  pub notes:                   Option<String>,
  pub created_at:              String,
  pub created_by:              String,
  pub updated_by:              Option<String>,
}

impl RawRecipient {
  pub fn into_recipient(self) -> Result<Recipient> {
    let beneficiary =
      match (decode_target_mode(&self.target_type)?, &self.family_id, &self.resident_id) {
        (TargetMode::Family, Some(fid), None) => {
          BeneficiaryRef::Family(decode_uuid(fid)?)
        }
        (TargetMode::Individual, None, Some(rid)) => {
          BeneficiaryRef::Individual(decode_uuid(rid)?)
        }
        _ => {
          return Err(Error::Decode(format!(
            "recipient {} has an inconsistent beneficiary key",
            self.recipient_id
          )));
        }
      };

    Ok(Recipient {
      recipient_id: decode_uuid(&self.recipient_id)?,
      program_id: decode_uuid(&self.program_id)?,
      beneficiary,
      household_head_id: decode_uuid_opt(self.household_head_id.as_deref())?,
      field_representative_id: decode_uuid_opt(
        self.field_representative_id.as_deref(),
      )?,
      status: decode_delivery_status(&self.status)?,
      distribution_date: self
        .distribution_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      notes: self.notes,
      created_at: decode_dt(&self.created_at)?,
      created_by: decode_uuid(&self.created_by)?,
      updated_by: decode_uuid_opt(self.updated_by.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `families` row.
pub struct RawFamily {
  pub family_id:        String,
  pub number:           String,
  pub head_resident_id: Option<String>,
  pub area:             Option<String>,
}

impl RawFamily {
  pub fn into_family(self) -> Result<Family> {
    Ok(Family {
      family_id:        decode_uuid(&self.family_id)?,
      number:           self.number,
      head_resident_id: decode_uuid_opt(self.head_resident_id.as_deref())?,
      area:             self.area,
    })
  }
}

/// Raw strings read directly from a `residents` row.
pub struct RawResident {
  pub resident_id: String,
  pub name:        String,
  pub family_id:   Option<String>,
  pub area:        Option<String>,
}

impl RawResident {
  pub fn into_resident(self) -> Result<Resident> {
    Ok(Resident {
      resident_id: decode_uuid(&self.resident_id)?,
      name:        self.name,
      family_id:   decode_uuid_opt(self.family_id.as_deref())?,
      area:        self.area,
    })
  }
}

/// One row of the available-beneficiaries query: the candidate's key column,
/// display name, area, and the history annotation.
pub struct RawCandidate {
  pub beneficiary_id: String,
  pub name:           String,
  pub area:           Option<String>,
  pub received:       bool,
}
