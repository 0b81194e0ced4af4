//! [`SqliteStore`] — the SQLite implementation of [`AssistanceStore`] and
//! [`BeneficiaryRegistry`].
//!
//! Every mutating operation runs inside a single `rusqlite` transaction held
//! within one [`tokio_rusqlite::Connection::call`] closure. Domain failures
//! detected mid-transaction (duplicates, mode mismatches, missing rows) are
//! returned as closure outcome values and mapped to typed errors afterwards,
//! so `?` inside a closure always means a database failure.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use lumbung_core::{
  Error as CoreError,
  item::{AssistanceItem, ItemUpdate, NewItem},
  program::{
    AssistanceProgram, NewProgram, ProgramItem, ProgramStatus, ProgramUpdate,
  },
  recipient::{
    BatchEnrollment, BeneficiaryCandidate, BeneficiaryRef, DeliveryStatus,
    DistributionUpdate, EnrollmentFailure, Recipient,
  },
  registry::{BeneficiaryRegistry, Family, Resident},
  store::{AssistanceStore, BeneficiaryFilter, RecipientFilter},
};

use crate::{
  Error, Result,
  encode::{
    RawCandidate, RawFamily, RawItem, RawProgram, RawProgramItem, RawRecipient,
    RawResident, decode_target_mode, decode_uuid, encode_date,
    encode_delivery_status, encode_dt, encode_item_kind, encode_program_status,
    encode_target_mode, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lumbung assistance store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── In-transaction helpers ──────────────────────────────────────────────────

/// True when an insert bounced off a uniqueness constraint. The caller
/// normalises this into the matching duplicate error, covering races that
/// slip past the in-transaction existence check.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
}

fn vanished(what: &str) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(
    format!("{what} disappeared mid-transaction").into(),
  )
}

fn select_program_raw(
  conn: &rusqlite::Connection,
  program_id: &str,
) -> rusqlite::Result<Option<RawProgram>> {
  conn
    .query_row(
      "SELECT program_id, name, year, period, target_mode, status, notes,
              created_at, created_by, updated_by
       FROM programs WHERE program_id = ?1",
      rusqlite::params![program_id],
      |row| {
        Ok(RawProgram {
          program_id:  row.get(0)?,
          name:        row.get(1)?,
          year:        row.get(2)?,
          period:      row.get(3)?,
          target_mode: row.get(4)?,
          status:      row.get(5)?,
          notes:       row.get(6)?,
          created_at:  row.get(7)?,
          created_by:  row.get(8)?,
          updated_by:  row.get(9)?,
        })
      },
    )
    .optional()
}

/// Select a live (non-tombstoned) recipient row.
fn select_recipient_raw(
  conn: &rusqlite::Connection,
  recipient_id: &str,
) -> rusqlite::Result<Option<RawRecipient>> {
  conn
    .query_row(
      "SELECT recipient_id, program_id, target_type, family_id, resident_id,
              household_head_id, field_representative_id, status,
              distribution_date, notes, created_at, created_by, updated_by
       FROM recipients WHERE recipient_id = ?1 AND deleted_at IS NULL",
      rusqlite::params![recipient_id],
      |row| {
        Ok(RawRecipient {
          recipient_id:            row.get(0)?,
          program_id:              row.get(1)?,
          target_type:             row.get(2)?,
          family_id:               row.get(3)?,
          resident_id:             row.get(4)?,
          household_head_id:       row.get(5)?,
          field_representative_id: row.get(6)?,
          status:                  row.get(7)?,
          distribution_date:       row.get(8)?,
          notes:                   row.get(9)?,
          created_at:              row.get(10)?,
          created_by:              row.get(11)?,
          updated_by:              row.get(12)?,
        })
      },
    )
    .optional()
}

fn count_pending(
  conn: &rusqlite::Connection,
  program_id: &str,
) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM recipients
     WHERE program_id = ?1 AND status = 'pending' AND deleted_at IS NULL",
    rusqlite::params![program_id],
    |row| row.get(0),
  )
}

/// The forward cascade's bulk update: every live pending recipient becomes
/// arrived with the given distribution date. Rows already resolved are never
/// touched, which is what makes program completion idempotent.
fn sweep_pending(
  conn: &rusqlite::Connection,
  program_id: &str,
  today: &str,
  actor: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE recipients
     SET status = 'arrived', distribution_date = ?2, updated_by = ?3
     WHERE program_id = ?1 AND status = 'pending' AND deleted_at IS NULL",
    rusqlite::params![program_id, today, actor],
  )
}

// ─── Transaction outcomes ────────────────────────────────────────────────────

enum ItemDeleteTx {
  Deleted,
  Missing,
  InUse,
}

enum ProgramUpdateTx {
  Updated(RawProgram),
  Missing,
  ModeLocked,
}

enum CompleteTx {
  Done(RawProgram),
  Missing,
}

enum AttachTx {
  Inserted,
  ProgramMissing,
  ItemMissing,
  Duplicate,
}

enum EnrollTx {
  Inserted(RawRecipient),
  ProgramMissing,
  /// Carries the program's stored target mode for the error message.
  ModeMismatch(String),
  FamilyMissing,
  ResidentMissing,
  Duplicate,
}

enum DistributionTx {
  Updated(RawRecipient),
  Missing,
}

enum CandidatesTx {
  /// The program's stored target mode plus the matching rows.
  Rows(String, Vec<RawCandidate>),
  ProgramMissing,
}

// ─── AssistanceStore impl ────────────────────────────────────────────────────

impl AssistanceStore for SqliteStore {
  type Error = Error;

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn create_item(&self, input: NewItem) -> Result<AssistanceItem> {
    let item = AssistanceItem {
      item_id:    Uuid::new_v4(),
      name:       input.name,
      kind:       input.kind,
      unit:       input.unit,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(item.item_id);
    let name     = item.name.clone();
    let kind_str = encode_item_kind(item.kind).to_owned();
    let unit     = item.unit.clone();
    let at_str   = encode_dt(item.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (item_id, name, kind, unit, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, kind_str, unit, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(item)
  }

  async fn update_item(
    &self,
    item_id: Uuid,
    update: ItemUpdate,
  ) -> Result<AssistanceItem> {
    let id_str   = encode_uuid(item_id);
    let name     = update.name;
    let kind_str = update.kind.map(encode_item_kind).map(str::to_owned);
    let unit     = update.unit;

    let raw: Option<RawItem> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<RawItem> = tx
          .query_row(
            "SELECT item_id, name, kind, unit, created_at
             FROM items WHERE item_id = ?1 AND deleted_at IS NULL",
            rusqlite::params![id_str],
            |row| {
              Ok(RawItem {
                item_id:    row.get(0)?,
                name:       row.get(1)?,
                kind:       row.get(2)?,
                unit:       row.get(3)?,
                created_at: row.get(4)?,
              })
            },
          )
          .optional()?;

        let Some(mut item) = existing else {
          return Ok(None);
        };

        item.name = name.unwrap_or(item.name);
        item.kind = kind_str.unwrap_or(item.kind);
        item.unit = unit.unwrap_or(item.unit);

        tx.execute(
          "UPDATE items SET name = ?2, kind = ?3, unit = ?4 WHERE item_id = ?1",
          rusqlite::params![id_str, item.name, item.kind, item.unit],
        )?;
        tx.commit()?;

        Ok(Some(item))
      })
      .await?;

    match raw {
      Some(raw) => raw.into_item(),
      None => Err(CoreError::ItemNotFound(item_id).into()),
    }
  }

  async fn list_items(&self) -> Result<Vec<AssistanceItem>> {
    let raws: Vec<RawItem> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT item_id, name, kind, unit, created_at
           FROM items WHERE deleted_at IS NULL ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawItem {
              item_id:    row.get(0)?,
              name:       row.get(1)?,
              kind:       row.get(2)?,
              unit:       row.get(3)?,
              created_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn delete_item(&self, item_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(item_id);
    let now    = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM items WHERE item_id = ?1 AND deleted_at IS NULL",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(ItemDeleteTx::Missing);
        }

        let referenced: bool = tx
          .query_row(
            "SELECT 1 FROM program_items
             WHERE item_id = ?1 AND deleted_at IS NULL LIMIT 1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if referenced {
          return Ok(ItemDeleteTx::InUse);
        }

        tx.execute(
          "UPDATE items SET deleted_at = ?2 WHERE item_id = ?1",
          rusqlite::params![id_str, now],
        )?;
        tx.commit()?;

        Ok(ItemDeleteTx::Deleted)
      })
      .await?;

    match outcome {
      ItemDeleteTx::Deleted => Ok(()),
      ItemDeleteTx::Missing => Err(CoreError::ItemNotFound(item_id).into()),
      ItemDeleteTx::InUse => Err(CoreError::ItemInUse(item_id).into()),
    }
  }

  // ── Programs ──────────────────────────────────────────────────────────────

  async fn create_program(
    &self,
    input: NewProgram,
    actor: Uuid,
  ) -> Result<AssistanceProgram> {
    let program = AssistanceProgram {
      program_id:  Uuid::new_v4(),
      name:        input.name,
      year:        input.year,
      period:      input.period,
      target_mode: input.target_mode,
      status:      ProgramStatus::InProgress,
      notes:       input.notes,
      created_at:  Utc::now(),
      created_by:  actor,
      updated_by:  None,
    };

    let id_str     = encode_uuid(program.program_id);
    let name       = program.name.clone();
    let year       = program.year;
    let period     = program.period.clone();
    let mode_str   = encode_target_mode(program.target_mode).to_owned();
    let status_str = encode_program_status(program.status).to_owned();
    let notes      = program.notes.clone();
    let at_str     = encode_dt(program.created_at);
    let actor_str  = encode_uuid(actor);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO programs (
             program_id, name, year, period, target_mode, status, notes,
             created_at, created_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str, name, year, period, mode_str, status_str, notes, at_str,
            actor_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(program)
  }

  async fn get_program(
    &self,
    program_id: Uuid,
  ) -> Result<Option<AssistanceProgram>> {
    let id_str = encode_uuid(program_id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_program_raw(conn, &id_str)?))
      .await?;

    raw.map(RawProgram::into_program).transpose()
  }

  async fn list_programs(&self) -> Result<Vec<AssistanceProgram>> {
    let raws: Vec<RawProgram> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT program_id, name, year, period, target_mode, status, notes,
                  created_at, created_by, updated_by
           FROM programs ORDER BY year DESC, created_at DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawProgram {
              program_id:  row.get(0)?,
              name:        row.get(1)?,
              year:        row.get(2)?,
              period:      row.get(3)?,
              target_mode: row.get(4)?,
              status:      row.get(5)?,
              notes:       row.get(6)?,
              created_at:  row.get(7)?,
              created_by:  row.get(8)?,
              updated_by:  row.get(9)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProgram::into_program).collect()
  }

  async fn update_program(
    &self,
    program_id: Uuid,
    update: ProgramUpdate,
    actor: Uuid,
  ) -> Result<AssistanceProgram> {
    let id_str     = encode_uuid(program_id);
    let actor_str  = encode_uuid(actor);
    let today_str  = encode_date(Utc::now().date_naive());
    let name       = update.name;
    let year       = update.year;
    let period     = update.period;
    let mode_str   = update.target_mode.map(encode_target_mode).map(str::to_owned);
    let status_str = update.status.map(encode_program_status).map(str::to_owned);
    let notes      = update.notes;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(existing) = select_program_raw(&tx, &id_str)? else {
          return Ok(ProgramUpdateTx::Missing);
        };

        // Target mode is frozen once the program has live recipients —
        // their beneficiary keys were written against the current mode.
        if let Some(ref new_mode) = mode_str
          && *new_mode != existing.target_mode
        {
          let live: i64 = tx.query_row(
            "SELECT COUNT(*) FROM recipients
             WHERE program_id = ?1 AND deleted_at IS NULL",
            rusqlite::params![id_str],
            |row| row.get(0),
          )?;
          if live > 0 {
            return Ok(ProgramUpdateTx::ModeLocked);
          }
        }

        let new_name   = name.unwrap_or(existing.name);
        let new_year   = year.unwrap_or(existing.year);
        let new_period = period.unwrap_or(existing.period);
        let new_mode   = mode_str.unwrap_or(existing.target_mode);
        let new_status = status_str.unwrap_or_else(|| existing.status.clone());
        let new_notes  = notes.unwrap_or(existing.notes);

        tx.execute(
          "UPDATE programs
           SET name = ?2, year = ?3, period = ?4, target_mode = ?5,
               status = ?6, notes = ?7, updated_by = ?8
           WHERE program_id = ?1",
          rusqlite::params![
            id_str, new_name, new_year, new_period, new_mode, new_status,
            new_notes, actor_str,
          ],
        )?;

        // Marking an in-progress program completed runs the forward
        // cascade in this same transaction.
        if existing.status == "in_progress" && new_status == "completed" {
          sweep_pending(&tx, &id_str, &today_str, &actor_str)?;
        }

        let raw = select_program_raw(&tx, &id_str)?
          .ok_or_else(|| vanished("program"))?;
        tx.commit()?;

        Ok(ProgramUpdateTx::Updated(raw))
      })
      .await?;

    match outcome {
      ProgramUpdateTx::Updated(raw) => raw.into_program(),
      ProgramUpdateTx::Missing => {
        Err(CoreError::ProgramNotFound(program_id).into())
      }
      ProgramUpdateTx::ModeLocked => Err(
        CoreError::InvalidTransition(
          "target mode cannot change while the program has recipients".into(),
        )
        .into(),
      ),
    }
  }

  async fn complete_program(
    &self,
    program_id: Uuid,
    actor: Uuid,
  ) -> Result<AssistanceProgram> {
    let id_str    = encode_uuid(program_id);
    let actor_str = encode_uuid(actor);
    let today_str = encode_date(Utc::now().date_naive());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if select_program_raw(&tx, &id_str)?.is_none() {
          return Ok(CompleteTx::Missing);
        }

        tx.execute(
          "UPDATE programs SET status = 'completed', updated_by = ?2
           WHERE program_id = ?1",
          rusqlite::params![id_str, actor_str],
        )?;
        sweep_pending(&tx, &id_str, &today_str, &actor_str)?;

        let raw = select_program_raw(&tx, &id_str)?
          .ok_or_else(|| vanished("program"))?;
        tx.commit()?;

        Ok(CompleteTx::Done(raw))
      })
      .await?;

    match outcome {
      CompleteTx::Done(raw) => raw.into_program(),
      CompleteTx::Missing => Err(CoreError::ProgramNotFound(program_id).into()),
    }
  }

  async fn delete_program(&self, program_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(program_id);

    let deleted: usize = self
      .conn
      .call(move |conn| {
        // Lines and recipients go with it via ON DELETE CASCADE.
        Ok(conn.execute(
          "DELETE FROM programs WHERE program_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(CoreError::ProgramNotFound(program_id).into());
    }
    Ok(())
  }

  // ── Program-item ledger ───────────────────────────────────────────────────

  async fn attach_item(
    &self,
    program_id: Uuid,
    item_id: Uuid,
    quantity: f64,
  ) -> Result<ProgramItem> {
    let line = ProgramItem {
      program_item_id: Uuid::new_v4(),
      program_id,
      item_id,
      quantity,
      created_at: Utc::now(),
    };

    let line_id_str = encode_uuid(line.program_item_id);
    let pid_str     = encode_uuid(program_id);
    let iid_str     = encode_uuid(item_id);
    let at_str      = encode_dt(line.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let program_exists: bool = tx
          .query_row(
            "SELECT 1 FROM programs WHERE program_id = ?1",
            rusqlite::params![pid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !program_exists {
          return Ok(AttachTx::ProgramMissing);
        }

        let item_exists: bool = tx
          .query_row(
            "SELECT 1 FROM items WHERE item_id = ?1 AND deleted_at IS NULL",
            rusqlite::params![iid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !item_exists {
          return Ok(AttachTx::ItemMissing);
        }

        // One live line per (program, item). A tombstoned line for the
        // same pair is purged for good and replaced by the fresh insert.
        let live: bool = tx
          .query_row(
            "SELECT 1 FROM program_items
             WHERE program_id = ?1 AND item_id = ?2 AND deleted_at IS NULL",
            rusqlite::params![pid_str, iid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if live {
          return Ok(AttachTx::Duplicate);
        }

        tx.execute(
          "DELETE FROM program_items
           WHERE program_id = ?1 AND item_id = ?2 AND deleted_at IS NOT NULL",
          rusqlite::params![pid_str, iid_str],
        )?;

        let inserted = tx.execute(
          "INSERT INTO program_items (
             program_item_id, program_id, item_id, quantity, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![line_id_str, pid_str, iid_str, quantity, at_str],
        );
        match inserted {
          Ok(_) => {}
          Err(ref e) if is_unique_violation(e) => {
            return Ok(AttachTx::Duplicate);
          }
          Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(AttachTx::Inserted)
      })
      .await?;

    match outcome {
      AttachTx::Inserted => Ok(line),
      AttachTx::ProgramMissing => {
        Err(CoreError::ProgramNotFound(program_id).into())
      }
      AttachTx::ItemMissing => Err(CoreError::ItemNotFound(item_id).into()),
      AttachTx::Duplicate => {
        Err(CoreError::DuplicateAttachment { program_id, item_id }.into())
      }
    }
  }

  async fn detach_item(&self, program_item_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(program_item_id);
    let now    = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE program_items SET deleted_at = ?2
           WHERE program_item_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, now],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::ProgramItemNotFound(program_item_id).into());
    }
    Ok(())
  }

  async fn update_quantity(
    &self,
    program_item_id: Uuid,
    quantity: f64,
  ) -> Result<ProgramItem> {
    let id_str = encode_uuid(program_item_id);

    let raw: Option<RawProgramItem> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = tx.execute(
          "UPDATE program_items SET quantity = ?2
           WHERE program_item_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, quantity],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        let raw = tx
          .query_row(
            "SELECT program_item_id, program_id, item_id, quantity, created_at
             FROM program_items WHERE program_item_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawProgramItem {
                program_item_id: row.get(0)?,
                program_id:      row.get(1)?,
                item_id:         row.get(2)?,
                quantity:        row.get(3)?,
                created_at:      row.get(4)?,
              })
            },
          )
          .optional()?;
        tx.commit()?;

        Ok(raw)
      })
      .await?;

    match raw {
      Some(raw) => raw.into_program_item(),
      None => Err(CoreError::ProgramItemNotFound(program_item_id).into()),
    }
  }

  async fn list_program_items(
    &self,
    program_id: Uuid,
  ) -> Result<Vec<ProgramItem>> {
    let pid_str = encode_uuid(program_id);

    let raws: Vec<RawProgramItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT program_item_id, program_id, item_id, quantity, created_at
           FROM program_items
           WHERE program_id = ?1 AND deleted_at IS NULL
           ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pid_str], |row| {
            Ok(RawProgramItem {
              program_item_id: row.get(0)?,
              program_id:      row.get(1)?,
              item_id:         row.get(2)?,
              quantity:        row.get(3)?,
              created_at:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawProgramItem::into_program_item)
      .collect()
  }

  // ── Recipient ledger ──────────────────────────────────────────────────────

  async fn enroll(
    &self,
    program_id: Uuid,
    beneficiary: BeneficiaryRef,
    actor: Uuid,
  ) -> Result<Recipient> {
    let recipient_id = Uuid::new_v4();

    let rid_str    = encode_uuid(recipient_id);
    let pid_str    = encode_uuid(program_id);
    let key_str    = encode_uuid(beneficiary.id());
    let mode_str   = encode_target_mode(beneficiary.target_mode()).to_owned();
    let at_str     = encode_dt(Utc::now());
    let actor_str  = encode_uuid(actor);
    let today_str  = encode_date(Utc::now().date_naive());
    let is_family  = matches!(beneficiary, BeneficiaryRef::Family(_));

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(program) = select_program_raw(&tx, &pid_str)? else {
          return Ok(EnrollTx::ProgramMissing);
        };
        if program.target_mode != mode_str {
          return Ok(EnrollTx::ModeMismatch(program.target_mode));
        }

        // Derive the household head from the registry mirror. For an
        // individual beneficiary this is best-effort: a resident without
        // a family on record gets a null head.
        let head: Option<String> = if is_family {
          let family: Option<Option<String>> = tx
            .query_row(
              "SELECT head_resident_id FROM families WHERE family_id = ?1",
              rusqlite::params![key_str],
              |row| row.get(0),
            )
            .optional()?;
          match family {
            Some(head) => head,
            None => return Ok(EnrollTx::FamilyMissing),
          }
        } else {
          let resident: Option<Option<String>> = tx
            .query_row(
              "SELECT family_id FROM residents WHERE resident_id = ?1",
              rusqlite::params![key_str],
              |row| row.get(0),
            )
            .optional()?;
          match resident {
            None => return Ok(EnrollTx::ResidentMissing),
            Some(None) => None,
            Some(Some(fid)) => tx
              .query_row(
                "SELECT head_resident_id FROM families WHERE family_id = ?1",
                rusqlite::params![fid],
                |row| row.get(0),
              )
              .optional()?
              .flatten(),
          }
        };

        // A program that is already closed has distributed to everyone;
        // anyone added afterwards is recorded as arrived immediately,
        // mirroring the completion sweep.
        let (status, distribution_date) = if program.status == "completed" {
          ("arrived", Some(today_str.clone()))
        } else {
          ("pending", None)
        };

        let key_column = if is_family { "family_id" } else { "resident_id" };

        // One live enrollment per (program, beneficiary); tombstones for
        // the pair are purged for good before the fresh insert.
        let live: bool = tx
          .query_row(
            &format!(
              "SELECT 1 FROM recipients
               WHERE program_id = ?1 AND {key_column} = ?2
                 AND deleted_at IS NULL"
            ),
            rusqlite::params![pid_str, key_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if live {
          return Ok(EnrollTx::Duplicate);
        }

        tx.execute(
          &format!(
            "DELETE FROM recipients
             WHERE program_id = ?1 AND {key_column} = ?2
               AND deleted_at IS NOT NULL"
          ),
          rusqlite::params![pid_str, key_str],
        )?;

        let (family_id, resident_id) = if is_family {
          (Some(key_str.clone()), None)
        } else {
          (None, Some(key_str.clone()))
        };

        let inserted = tx.execute(
          "INSERT INTO recipients (
             recipient_id, program_id, target_type, family_id, resident_id,
             household_head_id, status, distribution_date, created_at,
             created_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            rid_str,
            pid_str,
            mode_str,
            family_id,
            resident_id,
            head,
            status,
            distribution_date,
            at_str,
            actor_str,
          ],
        );
        match inserted {
          Ok(_) => {}
          Err(ref e) if is_unique_violation(e) => {
            return Ok(EnrollTx::Duplicate);
          }
          Err(e) => return Err(e.into()),
        }

        let raw = select_recipient_raw(&tx, &rid_str)?
          .ok_or_else(|| vanished("recipient"))?;
        tx.commit()?;

        Ok(EnrollTx::Inserted(raw))
      })
      .await?;

    match outcome {
      EnrollTx::Inserted(raw) => raw.into_recipient(),
      EnrollTx::ProgramMissing => {
        Err(CoreError::ProgramNotFound(program_id).into())
      }
      EnrollTx::ModeMismatch(expected) => Err(
        CoreError::TargetModeMismatch {
          program_id,
          expected: decode_target_mode(&expected)?,
          got: beneficiary.target_mode(),
        }
        .into(),
      ),
      EnrollTx::FamilyMissing => {
        Err(CoreError::FamilyNotFound(beneficiary.id()).into())
      }
      EnrollTx::ResidentMissing => {
        Err(CoreError::ResidentNotFound(beneficiary.id()).into())
      }
      EnrollTx::Duplicate => Err(
        CoreError::DuplicateEnrollment {
          program_id,
          beneficiary_id: beneficiary.id(),
        }
        .into(),
      ),
    }
  }

  async fn enroll_batch(
    &self,
    program_id: Uuid,
    beneficiaries: Vec<BeneficiaryRef>,
    actor: Uuid,
  ) -> Result<BatchEnrollment> {
    // The program must exist at all; individual beneficiaries then succeed
    // or fail on their own.
    if self.get_program(program_id).await?.is_none() {
      return Err(CoreError::ProgramNotFound(program_id).into());
    }

    let mut report = BatchEnrollment::default();
    for beneficiary in beneficiaries {
      match self.enroll(program_id, beneficiary, actor).await {
        Ok(recipient) => report.enrolled.push(recipient),
        Err(Error::Core(e)) => report.failures.push(EnrollmentFailure {
          beneficiary,
          reason: e.to_string(),
        }),
        Err(e) => return Err(e),
      }
    }

    Ok(report)
  }

  async fn get_recipient(
    &self,
    recipient_id: Uuid,
  ) -> Result<Option<Recipient>> {
    let id_str = encode_uuid(recipient_id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_recipient_raw(conn, &id_str)?))
      .await?;

    raw.map(RawRecipient::into_recipient).transpose()
  }

  async fn list_recipients(
    &self,
    program_id: Uuid,
    filter: &RecipientFilter,
  ) -> Result<Vec<Recipient>> {
    let pid_str    = encode_uuid(program_id);
    let status_str = filter
      .status
      .map(encode_delivery_status)
      .map(str::to_owned);
    let pattern    = filter.search.as_deref().map(|t| format!("%{t}%"));
    let limit_val  = filter.limit.unwrap_or(100) as i64;
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawRecipient> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if status_str.is_some() {
          conds.push("AND r.status = ?2");
        }
        if pattern.is_some() {
          conds.push("AND COALESCE(f.number, p.name) LIKE ?3");
        }
        let extra = conds.join(" ");

        let sql = format!(
          "SELECT r.recipient_id, r.program_id, r.target_type, r.family_id,
                  r.resident_id, r.household_head_id,
                  r.field_representative_id, r.status, r.distribution_date,
                  r.notes, r.created_at, r.created_by, r.updated_by
           FROM recipients r
           LEFT JOIN families  f ON f.family_id   = r.family_id
           LEFT JOIN residents p ON p.resident_id = r.resident_id
           WHERE r.program_id = ?1 AND r.deleted_at IS NULL
           {extra}
           ORDER BY r.created_at
           LIMIT ?4 OFFSET ?5"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              pid_str,
              status_str.as_deref(),
              pattern.as_deref(),
              limit_val,
              offset_val,
            ],
            |row| {
              Ok(RawRecipient {
                recipient_id:            row.get(0)?,
                program_id:              row.get(1)?,
                target_type:             row.get(2)?,
                family_id:               row.get(3)?,
                resident_id:             row.get(4)?,
                household_head_id:       row.get(5)?,
                field_representative_id: row.get(6)?,
                status:                  row.get(7)?,
                distribution_date:       row.get(8)?,
                notes:                   row.get(9)?,
                created_at:              row.get(10)?,
                created_by:              row.get(11)?,
                updated_by:              row.get(12)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecipient::into_recipient).collect()
  }

  async fn list_available_beneficiaries(
    &self,
    program_id: Uuid,
    filter: &BeneficiaryFilter,
  ) -> Result<Vec<BeneficiaryCandidate>> {
    let pid_str    = encode_uuid(program_id);
    let area       = filter.area.clone();
    let pattern    = filter.search.as_deref().map(|t| format!("%{t}%"));
    let limit_val  = filter.limit.unwrap_or(100) as i64;
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let outcome = self
      .conn
      .call(move |conn| {
        let mode: Option<String> = conn
          .query_row(
            "SELECT target_mode FROM programs WHERE program_id = ?1",
            rusqlite::params![pid_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(mode) = mode else {
          return Ok(CandidatesTx::ProgramMissing);
        };

        // Candidates are registry entries of the program's mode with no
        // live enrollment in it. Tombstoned enrollees are candidates
        // again. The history flag looks across every program.
        let (table, key, display) = if mode == "family" {
          ("families", "family_id", "number")
        } else {
          ("residents", "resident_id", "name")
        };

        let mut conds: Vec<String> = vec![];
        if area.is_some() {
          conds.push("AND b.area = ?2".to_owned());
        }
        if pattern.is_some() {
          conds.push(format!("AND b.{display} LIKE ?3"));
        }
        let extra = conds.join(" ");

        let sql = format!(
          "SELECT b.{key}, b.{display}, b.area,
                  EXISTS(SELECT 1 FROM recipients r
                         WHERE r.{key} = b.{key}
                           AND r.deleted_at IS NULL) AS received
           FROM {table} b
           WHERE NOT EXISTS(SELECT 1 FROM recipients r
                            WHERE r.{key} = b.{key}
                              AND r.program_id = ?1
                              AND r.deleted_at IS NULL)
           {extra}
           ORDER BY b.{display}
           LIMIT ?4 OFFSET ?5"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              pid_str,
              area.as_deref(),
              pattern.as_deref(),
              limit_val,
              offset_val,
            ],
            |row| {
              Ok(RawCandidate {
                beneficiary_id: row.get(0)?,
                name:           row.get(1)?,
                area:           row.get(2)?,
                received:       row.get(3)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(CandidatesTx::Rows(mode, rows))
      })
      .await?;

    let (mode, rows) = match outcome {
      CandidatesTx::Rows(mode, rows) => (mode, rows),
      CandidatesTx::ProgramMissing => {
        return Err(CoreError::ProgramNotFound(program_id).into());
      }
    };

    let family_mode = decode_target_mode(&mode)?
      == lumbung_core::program::TargetMode::Family;
    rows
      .into_iter()
      .map(|raw| {
        let id = decode_uuid(&raw.beneficiary_id)?;
        Ok(BeneficiaryCandidate {
          beneficiary: if family_mode {
            BeneficiaryRef::Family(id)
          } else {
            BeneficiaryRef::Individual(id)
          },
          name: raw.name,
          area: raw.area,
          has_received_before: raw.received,
        })
      })
      .collect()
  }

  async fn update_distribution(
    &self,
    recipient_id: Uuid,
    update: DistributionUpdate,
    actor: Uuid,
  ) -> Result<Recipient> {
    // Arrived must carry a distribution date. A representative passed
    // alongside not-arrived is cleared silently, not rejected.
    if update.status == DeliveryStatus::Arrived
      && update.distribution_date.is_none()
    {
      return Err(
        CoreError::InvalidTransition(
          "a distribution date is required to mark a recipient arrived".into(),
        )
        .into(),
      );
    }
    let representative = match update.status {
      DeliveryStatus::NotArrived => None,
      _ => update.field_representative_id,
    };

    let id_str     = encode_uuid(recipient_id);
    let status_str = encode_delivery_status(update.status).to_owned();
    let date_str   = update.distribution_date.map(encode_date);
    let rep_str    = representative.map(encode_uuid);
    let notes      = update.notes;
    let actor_str  = encode_uuid(actor);
    let resolved   = update.status != DeliveryStatus::Pending;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(existing) = select_recipient_raw(&tx, &id_str)? else {
          return Ok(DistributionTx::Missing);
        };
        let new_notes = notes.or(existing.notes);

        tx.execute(
          "UPDATE recipients
           SET status = ?2, distribution_date = ?3,
               field_representative_id = ?4, notes = ?5, updated_by = ?6
           WHERE recipient_id = ?1",
          rusqlite::params![
            id_str, status_str, date_str, rep_str, new_notes, actor_str,
          ],
        )?;

        // Reverse cascade: resolving the last pending recipient closes
        // the program. The count and the guarded flip share this
        // transaction, so a concurrent update cannot observe a stale
        // count, and the flip is a no-op on an already-completed program.
        if resolved && count_pending(&tx, &existing.program_id)? == 0 {
          tx.execute(
            "UPDATE programs SET status = 'completed', updated_by = ?2
             WHERE program_id = ?1 AND status = 'in_progress'",
            rusqlite::params![existing.program_id, actor_str],
          )?;
        }

        let raw = select_recipient_raw(&tx, &id_str)?
          .ok_or_else(|| vanished("recipient"))?;
        tx.commit()?;

        Ok(DistributionTx::Updated(raw))
      })
      .await?;

    match outcome {
      DistributionTx::Updated(raw) => raw.into_recipient(),
      DistributionTx::Missing => {
        Err(CoreError::RecipientNotFound(recipient_id).into())
      }
    }
  }

  async fn unenroll(&self, recipient_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(recipient_id);
    let now    = encode_dt(Utc::now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE recipients SET deleted_at = ?2
           WHERE recipient_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, now],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::RecipientNotFound(recipient_id).into());
    }
    Ok(())
  }
}

// ─── BeneficiaryRegistry impl ────────────────────────────────────────────────

impl BeneficiaryRegistry for SqliteStore {
  type Error = Error;

  async fn get_family(&self, id: Uuid) -> Result<Option<Family>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFamily> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT family_id, number, head_resident_id, area
               FROM families WHERE family_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawFamily {
                  family_id:        row.get(0)?,
                  number:           row.get(1)?,
                  head_resident_id: row.get(2)?,
                  area:             row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFamily::into_family).transpose()
  }

  async fn get_resident(&self, id: Uuid) -> Result<Option<Resident>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawResident> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT resident_id, name, family_id, area
               FROM residents WHERE resident_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawResident {
                  resident_id: row.get(0)?,
                  name:        row.get(1)?,
                  family_id:   row.get(2)?,
                  area:        row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResident::into_resident).transpose()
  }

  async fn upsert_family(&self, family: Family) -> Result<()> {
    let id_str   = encode_uuid(family.family_id);
    let number   = family.number;
    let head_str = family.head_resident_id.map(encode_uuid);
    let area     = family.area;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO families (family_id, number, head_resident_id, area)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(family_id) DO UPDATE
           SET number = ?2, head_resident_id = ?3, area = ?4",
          rusqlite::params![id_str, number, head_str, area],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn upsert_resident(&self, resident: Resident) -> Result<()> {
    let id_str     = encode_uuid(resident.resident_id);
    let name       = resident.name;
    let family_str = resident.family_id.map(encode_uuid);
    let area       = resident.area;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO residents (resident_id, name, family_id, area)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(resident_id) DO UPDATE
           SET name = ?2, family_id = ?3, area = ?4",
          rusqlite::params![id_str, name, family_str, area],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
