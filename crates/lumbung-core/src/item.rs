//! Catalog items — the things a program distributes.
//!
//! An item is a pure catalog definition (what, in which unit). Quantities
//! live on the program-item lines that reference it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an item is a cash benefit or an in-kind good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
  Money,
  Goods,
}

/// A catalog definition of something a program can hand out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistanceItem {
  pub item_id:    Uuid,
  pub name:       String,
  pub kind:       ItemKind,
  /// Free-text unit, e.g. "Rupiah" or "Kg".
  pub unit:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::AssistanceStore::create_item`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
  pub name: String,
  pub kind: ItemKind,
  pub unit: String,
}

/// Partial update for an existing item. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
  pub name: Option<String>,
  pub kind: Option<ItemKind>,
  pub unit: Option<String>,
}
