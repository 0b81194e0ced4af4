//! The `AssistanceStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `lumbung-store-sqlite`). Higher layers (`lumbung-api`, the server binary)
//! depend on this abstraction, not on any concrete backend.
//!
//! Every filter is an explicit parameter struct — nothing is ever read from
//! ambient request state. Every mutating method takes the acting
//! administrator's id for the audit trail.

use std::future::Future;

use uuid::Uuid;

use crate::{
  item::{AssistanceItem, ItemUpdate, NewItem},
  program::{AssistanceProgram, NewProgram, ProgramItem, ProgramUpdate},
  recipient::{
    BatchEnrollment, BeneficiaryCandidate, BeneficiaryRef, DeliveryStatus,
    DistributionUpdate, Recipient,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`AssistanceStore::list_recipients`].
#[derive(Debug, Clone, Default)]
pub struct RecipientFilter {
  pub status: Option<DeliveryStatus>,
  /// Free-text filter over the beneficiary's registry name/number.
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// Parameters for [`AssistanceStore::list_available_beneficiaries`].
#[derive(Debug, Clone, Default)]
pub struct BeneficiaryFilter {
  /// Restrict to one administrative area.
  pub area:   Option<String>,
  /// Free-text filter over the registry name/number.
  pub search: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an assistance-distribution store backend.
///
/// Soft deletes are internal to the backend: reads return live rows only,
/// and re-creating a soft-deleted (program, beneficiary) or (program, item)
/// line purges the tombstone and inserts fresh instead of failing the
/// uniqueness check.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AssistanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Create and persist a new catalog item.
  fn create_item(
    &self,
    input: NewItem,
  ) -> impl Future<Output = Result<AssistanceItem, Self::Error>> + Send + '_;

  /// Apply a partial update to an item.
  fn update_item(
    &self,
    item_id: Uuid,
    update: ItemUpdate,
  ) -> impl Future<Output = Result<AssistanceItem, Self::Error>> + Send + '_;

  /// List all live catalog items.
  fn list_items(
    &self,
  ) -> impl Future<Output = Result<Vec<AssistanceItem>, Self::Error>> + Send + '_;

  /// Soft-delete an item. Fails while any live program-item references it.
  fn delete_item(
    &self,
    item_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Programs ──────────────────────────────────────────────────────────

  /// Create a program in the `InProgress` state.
  fn create_program(
    &self,
    input: NewProgram,
    actor: Uuid,
  ) -> impl Future<Output = Result<AssistanceProgram, Self::Error>> + Send + '_;

  /// Retrieve a program by id. Returns `None` if not found.
  fn get_program(
    &self,
    program_id: Uuid,
  ) -> impl Future<Output = Result<Option<AssistanceProgram>, Self::Error>> + Send + '_;

  /// List all programs.
  fn list_programs(
    &self,
  ) -> impl Future<Output = Result<Vec<AssistanceProgram>, Self::Error>> + Send + '_;

  /// Apply a partial update. Setting status to `Completed` on an
  /// in-progress program runs the completion sweep in the same
  /// transaction. A `target_mode` change is rejected while live
  /// recipients exist.
  fn update_program(
    &self,
    program_id: Uuid,
    update: ProgramUpdate,
    actor: Uuid,
  ) -> impl Future<Output = Result<AssistanceProgram, Self::Error>> + Send + '_;

  /// Close a program: set status `Completed` and sweep every live pending
  /// recipient to `Arrived` with today's distribution date, atomically.
  /// Idempotent — closing an already-completed program changes nothing.
  fn complete_program(
    &self,
    program_id: Uuid,
    actor: Uuid,
  ) -> impl Future<Output = Result<AssistanceProgram, Self::Error>> + Send + '_;

  /// Hard-delete a program and, by cascade, its lines and recipients.
  fn delete_program(
    &self,
    program_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Program-item ledger ───────────────────────────────────────────────

  /// Attach a catalog item to a program with a quantity.
  ///
  /// Fails if a live line already exists for the pair; a tombstoned line
  /// is purged and replaced instead.
  fn attach_item(
    &self,
    program_id: Uuid,
    item_id: Uuid,
    quantity: f64,
  ) -> impl Future<Output = Result<ProgramItem, Self::Error>> + Send + '_;

  /// Soft-delete a program-item line.
  fn detach_item(
    &self,
    program_item_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Change the quantity on a live line.
  fn update_quantity(
    &self,
    program_item_id: Uuid,
    quantity: f64,
  ) -> impl Future<Output = Result<ProgramItem, Self::Error>> + Send + '_;

  /// List the live lines of a program.
  fn list_program_items(
    &self,
    program_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ProgramItem>, Self::Error>> + Send + '_;

  // ── Recipient ledger ──────────────────────────────────────────────────

  /// Enroll one beneficiary into a program.
  ///
  /// The beneficiary kind must match the program's target mode. The
  /// household head is derived from the registry. Enrolling into an
  /// already-completed program creates the row directly as `Arrived` with
  /// today's distribution date. A tombstoned row for the same pair is
  /// purged and replaced; a live one fails the call.
  fn enroll(
    &self,
    program_id: Uuid,
    beneficiary: BeneficiaryRef,
    actor: Uuid,
  ) -> impl Future<Output = Result<Recipient, Self::Error>> + Send + '_;

  /// Enroll many beneficiaries, best-effort. Each reference succeeds or
  /// fails independently; outcomes are collected, never propagated early.
  fn enroll_batch(
    &self,
    program_id: Uuid,
    beneficiaries: Vec<BeneficiaryRef>,
    actor: Uuid,
  ) -> impl Future<Output = Result<BatchEnrollment, Self::Error>> + Send + '_;

  /// Retrieve a recipient by id. Returns `None` if not found or tombstoned.
  fn get_recipient(
    &self,
    recipient_id: Uuid,
  ) -> impl Future<Output = Result<Option<Recipient>, Self::Error>> + Send + '_;

  /// List the live recipients of a program.
  fn list_recipients<'a>(
    &'a self,
    program_id: Uuid,
    filter: &'a RecipientFilter,
  ) -> impl Future<Output = Result<Vec<Recipient>, Self::Error>> + Send + 'a;

  /// List registry beneficiaries of the program's target mode that have no
  /// live enrollment in it yet, annotated with their assistance history.
  fn list_available_beneficiaries<'a>(
    &'a self,
    program_id: Uuid,
    filter: &'a BeneficiaryFilter,
  ) -> impl Future<Output = Result<Vec<BeneficiaryCandidate>, Self::Error>> + Send + 'a;

  /// Update a recipient's delivery status and related fields, then run the
  /// program auto-completion check in the same transaction.
  fn update_distribution(
    &self,
    recipient_id: Uuid,
    update: DistributionUpdate,
    actor: Uuid,
  ) -> impl Future<Output = Result<Recipient, Self::Error>> + Send + '_;

  /// Soft-delete a recipient row (recoverable by a future `enroll`).
  fn unenroll(
    &self,
    recipient_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
