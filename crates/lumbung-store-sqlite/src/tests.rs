//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, Utc};
use lumbung_core::{
  Error as CoreError,
  item::{ItemKind, ItemUpdate, NewItem},
  program::{NewProgram, ProgramStatus, ProgramUpdate, TargetMode},
  recipient::{BeneficiaryRef, DeliveryStatus, DistributionUpdate},
  registry::{BeneficiaryRegistry, Family, Resident},
  store::{AssistanceStore, BeneficiaryFilter, RecipientFilter},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn actor() -> Uuid { Uuid::new_v4() }

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed_family(
  s: &SqliteStore,
  number: &str,
  head: Option<Uuid>,
  area: Option<&str>,
) -> Uuid {
  let id = Uuid::new_v4();
  s.upsert_family(Family {
    family_id:        id,
    number:           number.into(),
    head_resident_id: head,
    area:             area.map(str::to_owned),
  })
  .await
  .unwrap();
  id
}

async fn seed_resident(
  s: &SqliteStore,
  name: &str,
  family: Option<Uuid>,
  area: Option<&str>,
) -> Uuid {
  let id = Uuid::new_v4();
  s.upsert_resident(Resident {
    resident_id: id,
    name:        name.into(),
    family_id:   family,
    area:        area.map(str::to_owned),
  })
  .await
  .unwrap();
  id
}

async fn family_program(s: &SqliteStore) -> Uuid {
  s.create_program(
    NewProgram {
      name:        "Rice 2025".into(),
      year:        2025,
      period:      "Q1".into(),
      target_mode: TargetMode::Family,
      notes:       None,
    },
    actor(),
  )
  .await
  .unwrap()
  .program_id
}

async fn individual_program(s: &SqliteStore) -> Uuid {
  s.create_program(
    NewProgram {
      name:        "Elderly cash 2025".into(),
      year:        2025,
      period:      "Q1".into(),
      target_mode: TargetMode::Individual,
      notes:       None,
    },
    actor(),
  )
  .await
  .unwrap()
  .program_id
}

fn rice() -> NewItem {
  NewItem {
    name: "Rice".into(),
    kind: ItemKind::Goods,
    unit: "Kg".into(),
  }
}

fn arrived(d: NaiveDate) -> DistributionUpdate {
  DistributionUpdate {
    status:                  DeliveryStatus::Arrived,
    distribution_date:       Some(d),
    field_representative_id: None,
    notes:                   None,
  }
}

fn not_arrived() -> DistributionUpdate {
  DistributionUpdate {
    status:                  DeliveryStatus::NotArrived,
    distribution_date:       None,
    field_representative_id: None,
    notes:                   None,
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_list_items() {
  let s = store().await;

  let item = s.create_item(rice()).await.unwrap();
  assert_eq!(item.kind, ItemKind::Goods);

  s.create_item(NewItem {
    name: "Cash aid".into(),
    kind: ItemKind::Money,
    unit: "Rupiah".into(),
  })
  .await
  .unwrap();

  let items = s.list_items().await.unwrap();
  assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn update_item_fields() {
  let s = store().await;
  let item = s.create_item(rice()).await.unwrap();

  let updated = s
    .update_item(item.item_id, ItemUpdate {
      unit: Some("Sack".into()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.name, "Rice");
  assert_eq!(updated.unit, "Sack");
}

#[tokio::test]
async fn update_missing_item_errors() {
  let s = store().await;
  let err = s
    .update_item(Uuid::new_v4(), ItemUpdate::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ItemNotFound(_))));
}

#[tokio::test]
async fn delete_item_removes_from_listing() {
  let s = store().await;
  let item = s.create_item(rice()).await.unwrap();

  s.delete_item(item.item_id).await.unwrap();
  assert!(s.list_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_item_blocked_while_attached() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();
  let line = s.attach_item(program, item.item_id, 10.0).await.unwrap();

  let err = s.delete_item(item.item_id).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ItemInUse(_))));

  // After detaching the line the item can go.
  s.detach_item(line.program_item_id).await.unwrap();
  s.delete_item(item.item_id).await.unwrap();
}

// ─── Program-item ledger ─────────────────────────────────────────────────────

#[tokio::test]
async fn attach_item_and_list() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();

  let line = s.attach_item(program, item.item_id, 10.0).await.unwrap();
  assert_eq!(line.program_id, program);
  assert_eq!(line.quantity, 10.0);

  let lines = s.list_program_items(program).await.unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].program_item_id, line.program_item_id);
}

#[tokio::test]
async fn attach_duplicate_rejected() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();

  s.attach_item(program, item.item_id, 10.0).await.unwrap();
  let err = s.attach_item(program, item.item_id, 5.0).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DuplicateAttachment { .. })
  ));
}

#[tokio::test]
async fn reattach_after_detach_purges_tombstone() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();

  let first = s.attach_item(program, item.item_id, 10.0).await.unwrap();
  s.detach_item(first.program_item_id).await.unwrap();

  let second = s.attach_item(program, item.item_id, 15.0).await.unwrap();
  assert_ne!(second.program_item_id, first.program_item_id);

  // Exactly one live line remains, carrying the new quantity.
  let lines = s.list_program_items(program).await.unwrap();
  assert_eq!(lines.len(), 1);
  assert_eq!(lines[0].quantity, 15.0);
}

#[tokio::test]
async fn attach_requires_existing_program_and_item() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();

  let err = s
    .attach_item(Uuid::new_v4(), item.item_id, 1.0)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ProgramNotFound(_))));

  let err = s
    .attach_item(program, Uuid::new_v4(), 1.0)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ItemNotFound(_))));
}

#[tokio::test]
async fn update_quantity_on_live_line() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();
  let line = s.attach_item(program, item.item_id, 10.0).await.unwrap();

  let updated = s.update_quantity(line.program_item_id, 12.5).await.unwrap();
  assert_eq!(updated.quantity, 12.5);

  s.detach_item(line.program_item_id).await.unwrap();
  let err = s
    .update_quantity(line.program_item_id, 1.0)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::ProgramItemNotFound(_))
  ));
}

// ─── Programs ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_program_starts_in_progress() {
  let s = store().await;
  let admin = actor();

  let program = s
    .create_program(
      NewProgram {
        name:        "Rice 2025".into(),
        year:        2025,
        period:      "Q1".into(),
        target_mode: TargetMode::Family,
        notes:       Some("pilot".into()),
      },
      admin,
    )
    .await
    .unwrap();

  assert_eq!(program.status, ProgramStatus::InProgress);
  assert_eq!(program.created_by, admin);

  let fetched = s.get_program(program.program_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Rice 2025");
  assert_eq!(fetched.target_mode, TargetMode::Family);
}

#[tokio::test]
async fn get_program_missing_returns_none() {
  let s = store().await;
  assert!(s.get_program(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_program_fields() {
  let s = store().await;
  let program = family_program(&s).await;
  let admin = actor();

  let updated = s
    .update_program(
      program,
      ProgramUpdate {
        period: Some("Q2".into()),
        notes: Some(Some("extended".into())),
        ..Default::default()
      },
      admin,
    )
    .await
    .unwrap();

  assert_eq!(updated.period, "Q2");
  assert_eq!(updated.notes.as_deref(), Some("extended"));
  assert_eq!(updated.updated_by, Some(admin));
}

#[tokio::test]
async fn target_mode_locked_once_recipients_exist() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;

  // No recipients yet: the mode may still change (and back).
  s.update_program(
    program,
    ProgramUpdate {
      target_mode: Some(TargetMode::Individual),
      ..Default::default()
    },
    actor(),
  )
  .await
  .unwrap();
  s.update_program(
    program,
    ProgramUpdate {
      target_mode: Some(TargetMode::Family),
      ..Default::default()
    },
    actor(),
  )
  .await
  .unwrap();

  s.enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  let err = s
    .update_program(
      program,
      ProgramUpdate {
        target_mode: Some(TargetMode::Individual),
        ..Default::default()
      },
      actor(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidTransition(_))));
}

#[tokio::test]
async fn delete_program_cascades_to_lines_and_recipients() {
  let s = store().await;
  let program = family_program(&s).await;
  let item = s.create_item(rice()).await.unwrap();
  s.attach_item(program, item.item_id, 10.0).await.unwrap();
  let family = seed_family(&s, "KK-001", None, None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  s.delete_program(program).await.unwrap();

  assert!(s.get_program(program).await.unwrap().is_none());
  assert!(
    s.get_recipient(recipient.recipient_id)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn enroll_family_derives_head_and_starts_pending() {
  let s = store().await;
  let program = family_program(&s).await;
  let head = seed_resident(&s, "Pak Budi", None, None).await;
  let family = seed_family(&s, "KK-001", Some(head), None).await;

  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  assert_eq!(recipient.status, DeliveryStatus::Pending);
  assert_eq!(recipient.household_head_id, Some(head));
  assert_eq!(recipient.beneficiary, BeneficiaryRef::Family(family));
  assert!(recipient.distribution_date.is_none());
}

#[tokio::test]
async fn enroll_individual_derives_head_from_their_family() {
  let s = store().await;
  let program = individual_program(&s).await;
  let head = seed_resident(&s, "Pak Budi", None, None).await;
  let family = seed_family(&s, "KK-001", Some(head), None).await;
  let member = seed_resident(&s, "Siti", Some(family), None).await;

  let recipient = s
    .enroll(program, BeneficiaryRef::Individual(member), actor())
    .await
    .unwrap();

  assert_eq!(recipient.household_head_id, Some(head));
}

#[tokio::test]
async fn enroll_individual_without_family_has_no_head() {
  let s = store().await;
  let program = individual_program(&s).await;
  let loner = seed_resident(&s, "Wanderer", None, None).await;

  let recipient = s
    .enroll(program, BeneficiaryRef::Individual(loner), actor())
    .await
    .unwrap();

  assert!(recipient.household_head_id.is_none());
}

#[tokio::test]
async fn enroll_rejects_mode_mismatch_both_ways() {
  let s = store().await;
  let family_prog = family_program(&s).await;
  let individual_prog = individual_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;
  let resident = seed_resident(&s, "Siti", None, None).await;

  let err = s
    .enroll(family_prog, BeneficiaryRef::Individual(resident), actor())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::TargetModeMismatch { .. })
  ));

  let err = s
    .enroll(individual_prog, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::TargetModeMismatch { .. })
  ));
}

#[tokio::test]
async fn enroll_duplicate_rejected() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;

  s.enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();
  let err = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DuplicateEnrollment { .. })
  ));
}

#[tokio::test]
async fn enroll_unknown_beneficiary_rejected() {
  let s = store().await;
  let family_prog = family_program(&s).await;
  let individual_prog = individual_program(&s).await;

  let err = s
    .enroll(family_prog, BeneficiaryRef::Family(Uuid::new_v4()), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::FamilyNotFound(_))));

  let err = s
    .enroll(
      individual_prog,
      BeneficiaryRef::Individual(Uuid::new_v4()),
      actor(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ResidentNotFound(_))));
}

#[tokio::test]
async fn reenroll_after_unenroll_leaves_single_row() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;

  let first = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();
  s.unenroll(first.recipient_id).await.unwrap();

  let second = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();
  assert_ne!(second.recipient_id, first.recipient_id);

  // The tombstone was purged: one row for the pair, live.
  let recipients = s
    .list_recipients(program, &RecipientFilter::default())
    .await
    .unwrap();
  assert_eq!(recipients.len(), 1);
  assert_eq!(recipients[0].recipient_id, second.recipient_id);
}

#[tokio::test]
async fn enroll_into_completed_program_arrives_immediately() {
  let s = store().await;
  let program = family_program(&s).await;
  s.complete_program(program, actor()).await.unwrap();

  let family = seed_family(&s, "KK-001", None, None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  assert_eq!(recipient.status, DeliveryStatus::Arrived);
  assert_eq!(recipient.distribution_date, Some(Utc::now().date_naive()));
}

#[tokio::test]
async fn enroll_batch_is_best_effort() {
  let s = store().await;
  let program = family_program(&s).await;
  let a = seed_family(&s, "KK-001", None, None).await;
  let b = seed_family(&s, "KK-002", None, None).await;
  let c = seed_family(&s, "KK-003", None, None).await;

  // b is already enrolled; the batch still lands a and c.
  s.enroll(program, BeneficiaryRef::Family(b), actor())
    .await
    .unwrap();

  let report = s
    .enroll_batch(
      program,
      vec![
        BeneficiaryRef::Family(a),
        BeneficiaryRef::Family(b),
        BeneficiaryRef::Family(c),
      ],
      actor(),
    )
    .await
    .unwrap();

  assert_eq!(report.enrolled.len(), 2);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].beneficiary, BeneficiaryRef::Family(b));

  let recipients = s
    .list_recipients(program, &RecipientFilter::default())
    .await
    .unwrap();
  assert_eq!(recipients.len(), 3);
}

#[tokio::test]
async fn enroll_batch_missing_program_errors() {
  let s = store().await;
  let err = s
    .enroll_batch(Uuid::new_v4(), vec![], actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ProgramNotFound(_))));
}

// ─── Distribution updates ────────────────────────────────────────────────────

#[tokio::test]
async fn arrived_requires_distribution_date() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  let err = s
    .update_distribution(
      recipient.recipient_id,
      DistributionUpdate {
        status:                  DeliveryStatus::Arrived,
        distribution_date:       None,
        field_representative_id: None,
        notes:                   None,
      },
      actor(),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::InvalidTransition(_))));

  let ok = s
    .update_distribution(
      recipient.recipient_id,
      arrived(date(2025, 1, 15)),
      actor(),
    )
    .await
    .unwrap();
  assert_eq!(ok.status, DeliveryStatus::Arrived);
  assert_eq!(ok.distribution_date, Some(date(2025, 1, 15)));
}

#[tokio::test]
async fn not_arrived_silently_clears_representative() {
  let s = store().await;
  let program = family_program(&s).await;
  let head = seed_resident(&s, "Pak Budi", None, None).await;
  let rep = seed_resident(&s, "Siti", None, None).await;
  let family = seed_family(&s, "KK-001", Some(head), None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  // First mark arrived with a representative standing in.
  let updated = s
    .update_distribution(
      recipient.recipient_id,
      DistributionUpdate {
        status:                  DeliveryStatus::Arrived,
        distribution_date:       Some(date(2025, 1, 15)),
        field_representative_id: Some(rep),
        notes:                   None,
      },
      actor(),
    )
    .await
    .unwrap();
  assert_eq!(updated.field_representative_id, Some(rep));

  // Flipping to not-arrived drops the representative even when passed.
  let updated = s
    .update_distribution(
      recipient.recipient_id,
      DistributionUpdate {
        status:                  DeliveryStatus::NotArrived,
        distribution_date:       None,
        field_representative_id: Some(rep),
        notes:                   None,
      },
      actor(),
    )
    .await
    .unwrap();
  assert_eq!(updated.status, DeliveryStatus::NotArrived);
  assert!(updated.field_representative_id.is_none());
}

#[tokio::test]
async fn update_distribution_missing_recipient_errors() {
  let s = store().await;
  let err = s
    .update_distribution(Uuid::new_v4(), not_arrived(), actor())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::RecipientNotFound(_))));
}

#[tokio::test]
async fn unenroll_missing_recipient_errors() {
  let s = store().await;
  let err = s.unenroll(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::RecipientNotFound(_))));
}

// ─── Forward cascade ─────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_program_sweeps_pending_to_arrived() {
  let s = store().await;
  let program = family_program(&s).await;
  for n in 0..3 {
    let family = seed_family(&s, &format!("KK-{n:03}"), None, None).await;
    s.enroll(program, BeneficiaryRef::Family(family), actor())
      .await
      .unwrap();
  }

  let completed = s.complete_program(program, actor()).await.unwrap();
  assert_eq!(completed.status, ProgramStatus::Completed);

  let recipients = s
    .list_recipients(program, &RecipientFilter::default())
    .await
    .unwrap();
  assert_eq!(recipients.len(), 3);
  for r in &recipients {
    assert_eq!(r.status, DeliveryStatus::Arrived);
    assert!(r.distribution_date.is_some());
  }
}

#[tokio::test]
async fn complete_program_is_idempotent() {
  let s = store().await;
  let program = family_program(&s).await;
  let a = seed_family(&s, "KK-001", None, None).await;
  let b = seed_family(&s, "KK-002", None, None).await;
  let ra = s
    .enroll(program, BeneficiaryRef::Family(a), actor())
    .await
    .unwrap();
  s.enroll(program, BeneficiaryRef::Family(b), actor())
    .await
    .unwrap();

  // a arrived on its own date before the sweep.
  s.update_distribution(ra.recipient_id, arrived(date(2025, 1, 15)), actor())
    .await
    .unwrap();

  s.complete_program(program, actor()).await.unwrap();
  s.complete_program(program, actor()).await.unwrap();

  let recipients = s
    .list_recipients(program, &RecipientFilter::default())
    .await
    .unwrap();
  assert!(recipients.iter().all(|r| r.status == DeliveryStatus::Arrived));

  // The sweep never touches rows that had already arrived.
  let ra_after = s.get_recipient(ra.recipient_id).await.unwrap().unwrap();
  assert_eq!(ra_after.distribution_date, Some(date(2025, 1, 15)));
}

#[tokio::test]
async fn complete_missing_program_errors() {
  let s = store().await;
  let err = s.complete_program(Uuid::new_v4(), actor()).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::ProgramNotFound(_))));
}

#[tokio::test]
async fn update_program_to_completed_runs_the_sweep() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  s.update_program(
    program,
    ProgramUpdate {
      status: Some(ProgramStatus::Completed),
      ..Default::default()
    },
    actor(),
  )
  .await
  .unwrap();

  let r = s.get_recipient(recipient.recipient_id).await.unwrap().unwrap();
  assert_eq!(r.status, DeliveryStatus::Arrived);
  assert!(r.distribution_date.is_some());
}

// ─── Reverse cascade ─────────────────────────────────────────────────────────

#[tokio::test]
async fn program_closes_exactly_when_last_pending_resolves() {
  let s = store().await;
  let program = family_program(&s).await;
  let mut recipients = vec![];
  for n in 0..3 {
    let family = seed_family(&s, &format!("KK-{n:03}"), None, None).await;
    recipients.push(
      s.enroll(program, BeneficiaryRef::Family(family), actor())
        .await
        .unwrap(),
    );
  }

  for (i, r) in recipients.iter().enumerate() {
    s.update_distribution(r.recipient_id, arrived(date(2025, 1, 15)), actor())
      .await
      .unwrap();

    let status = s.get_program(program).await.unwrap().unwrap().status;
    if i < recipients.len() - 1 {
      assert_eq!(status, ProgramStatus::InProgress);
    } else {
      assert_eq!(status, ProgramStatus::Completed);
    }
  }
}

#[tokio::test]
async fn not_arrived_also_counts_as_resolved() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  s.update_distribution(recipient.recipient_id, not_arrived(), actor())
    .await
    .unwrap();

  let program = s.get_program(program).await.unwrap().unwrap();
  assert_eq!(program.status, ProgramStatus::Completed);
}

#[tokio::test]
async fn resetting_to_pending_never_closes_the_program() {
  let s = store().await;
  let program = family_program(&s).await;
  let family = seed_family(&s, "KK-001", None, None).await;
  let recipient = s
    .enroll(program, BeneficiaryRef::Family(family), actor())
    .await
    .unwrap();

  s.update_distribution(
    recipient.recipient_id,
    DistributionUpdate {
      status:                  DeliveryStatus::Pending,
      distribution_date:       None,
      field_representative_id: None,
      notes:                   Some("rescheduled".into()),
    },
    actor(),
  )
  .await
  .unwrap();

  let program = s.get_program(program).await.unwrap().unwrap();
  assert_eq!(program.status, ProgramStatus::InProgress);
}

#[tokio::test]
async fn rice_distribution_scenario() {
  let s = store().await;
  let program = family_program(&s).await;
  let a = seed_family(&s, "KK-A", None, None).await;
  let b = seed_family(&s, "KK-B", None, None).await;
  let c = seed_family(&s, "KK-C", None, None).await;
  let ra = s
    .enroll(program, BeneficiaryRef::Family(a), actor())
    .await
    .unwrap();
  let rb = s
    .enroll(program, BeneficiaryRef::Family(b), actor())
    .await
    .unwrap();
  let rc = s
    .enroll(program, BeneficiaryRef::Family(c), actor())
    .await
    .unwrap();

  s.update_distribution(ra.recipient_id, arrived(date(2025, 2, 1)), actor())
    .await
    .unwrap();
  assert_eq!(
    s.get_program(program).await.unwrap().unwrap().status,
    ProgramStatus::InProgress
  );

  s.update_distribution(rb.recipient_id, not_arrived(), actor())
    .await
    .unwrap();
  assert_eq!(
    s.get_program(program).await.unwrap().unwrap().status,
    ProgramStatus::InProgress
  );

  s.update_distribution(rc.recipient_id, arrived(date(2025, 2, 2)), actor())
    .await
    .unwrap();
  assert_eq!(
    s.get_program(program).await.unwrap().unwrap().status,
    ProgramStatus::Completed
  );

  // b's row was only status-changed, never removed: re-enrolling fails.
  let err = s
    .enroll(program, BeneficiaryRef::Family(b), actor())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(CoreError::DuplicateEnrollment { .. })
  ));
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_recipients_filters_by_status_and_search() {
  let s = store().await;
  let program = family_program(&s).await;
  let a = seed_family(&s, "KK-ALPHA", None, None).await;
  let b = seed_family(&s, "KK-BETA", None, None).await;
  let ra = s
    .enroll(program, BeneficiaryRef::Family(a), actor())
    .await
    .unwrap();
  s.enroll(program, BeneficiaryRef::Family(b), actor())
    .await
    .unwrap();

  s.update_distribution(ra.recipient_id, arrived(date(2025, 1, 15)), actor())
    .await
    .unwrap();

  let pending = s
    .list_recipients(program, &RecipientFilter {
      status: Some(DeliveryStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].beneficiary, BeneficiaryRef::Family(b));

  let by_name = s
    .list_recipients(program, &RecipientFilter {
      search: Some("ALPHA".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_name.len(), 1);
  assert_eq!(by_name[0].beneficiary, BeneficiaryRef::Family(a));
}

#[tokio::test]
async fn available_beneficiaries_excludes_live_enrollees() {
  let s = store().await;
  let program = family_program(&s).await;
  let a = seed_family(&s, "KK-001", None, Some("North")).await;
  let b = seed_family(&s, "KK-002", None, Some("South")).await;

  let enrolled = s
    .enroll(program, BeneficiaryRef::Family(a), actor())
    .await
    .unwrap();

  let available = s
    .list_available_beneficiaries(program, &BeneficiaryFilter::default())
    .await
    .unwrap();
  assert_eq!(available.len(), 1);
  assert_eq!(available[0].beneficiary, BeneficiaryRef::Family(b));

  // A tombstoned enrollment makes the family available again.
  s.unenroll(enrolled.recipient_id).await.unwrap();
  let available = s
    .list_available_beneficiaries(program, &BeneficiaryFilter::default())
    .await
    .unwrap();
  assert_eq!(available.len(), 2);
}

#[tokio::test]
async fn available_beneficiaries_filter_by_area_and_search() {
  let s = store().await;
  let program = family_program(&s).await;
  seed_family(&s, "KK-001", None, Some("North")).await;
  seed_family(&s, "KK-002", None, Some("South")).await;

  let north = s
    .list_available_beneficiaries(program, &BeneficiaryFilter {
      area: Some("North".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(north.len(), 1);
  assert_eq!(north[0].area.as_deref(), Some("North"));

  let by_number = s
    .list_available_beneficiaries(program, &BeneficiaryFilter {
      search: Some("002".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_number.len(), 1);
  assert_eq!(by_number[0].name, "KK-002");
}

#[tokio::test]
async fn has_received_before_spans_programs() {
  let s = store().await;
  let first = family_program(&s).await;
  let second = family_program(&s).await;
  let veteran = seed_family(&s, "KK-001", None, None).await;
  let newcomer = seed_family(&s, "KK-002", None, None).await;

  s.enroll(first, BeneficiaryRef::Family(veteran), actor())
    .await
    .unwrap();

  let available = s
    .list_available_beneficiaries(second, &BeneficiaryFilter::default())
    .await
    .unwrap();
  assert_eq!(available.len(), 2);

  let veteran_row = available
    .iter()
    .find(|c| c.beneficiary == BeneficiaryRef::Family(veteran))
    .unwrap();
  assert!(veteran_row.has_received_before);

  let newcomer_row = available
    .iter()
    .find(|c| c.beneficiary == BeneficiaryRef::Family(newcomer))
    .unwrap();
  assert!(!newcomer_row.has_received_before);
}

// ─── Registry mirror ─────────────────────────────────────────────────────────

#[tokio::test]
async fn registry_upsert_and_get() {
  let s = store().await;
  let head = seed_resident(&s, "Pak Budi", None, Some("North")).await;
  let family = seed_family(&s, "KK-001", Some(head), Some("North")).await;

  let fetched = s.get_family(family).await.unwrap().unwrap();
  assert_eq!(fetched.number, "KK-001");
  assert_eq!(fetched.head_resident_id, Some(head));

  // Upsert replaces in place.
  s.upsert_family(Family {
    family_id:        family,
    number:           "KK-001".into(),
    head_resident_id: None,
    area:             Some("South".into()),
  })
  .await
  .unwrap();
  let fetched = s.get_family(family).await.unwrap().unwrap();
  assert!(fetched.head_resident_id.is_none());
  assert_eq!(fetched.area.as_deref(), Some("South"));

  assert!(s.get_resident(Uuid::new_v4()).await.unwrap().is_none());
  let budi = s.get_resident(head).await.unwrap().unwrap();
  assert_eq!(budi.name, "Pak Budi");
}
