//! SQL schema for the Lumbung SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.
//!
//! Soft deletes are a nullable `deleted_at` column; the uniqueness rules for
//! program-item lines and recipient enrollments are partial unique indexes
//! scoped to live rows, so tombstones never block a re-add.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Local mirror of the civil registry. Maintained by the enclosing portal;
-- the assistance core only reads it.
CREATE TABLE IF NOT EXISTS families (
    family_id        TEXT PRIMARY KEY,
    number           TEXT NOT NULL,
    head_resident_id TEXT,
    area             TEXT
);

CREATE TABLE IF NOT EXISTS residents (
    resident_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    family_id   TEXT REFERENCES families(family_id),
    area        TEXT
);

CREATE TABLE IF NOT EXISTS items (
    item_id    TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    kind       TEXT NOT NULL,    -- 'money' | 'goods'
    unit       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS programs (
    program_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    year        INTEGER NOT NULL,
    period      TEXT NOT NULL,
    target_mode TEXT NOT NULL,   -- 'family' | 'individual'; fixed once recipients exist
    status      TEXT NOT NULL,   -- 'in_progress' | 'completed'
    notes       TEXT,
    created_at  TEXT NOT NULL,
    created_by  TEXT NOT NULL,
    updated_by  TEXT
);

CREATE TABLE IF NOT EXISTS program_items (
    program_item_id TEXT PRIMARY KEY,
    program_id      TEXT NOT NULL REFERENCES programs(program_id) ON DELETE CASCADE,
    item_id         TEXT NOT NULL REFERENCES items(item_id) ON DELETE RESTRICT,
    quantity        REAL NOT NULL,
    created_at      TEXT NOT NULL,
    deleted_at      TEXT
);

CREATE TABLE IF NOT EXISTS recipients (
    recipient_id            TEXT PRIMARY KEY,
    program_id              TEXT NOT NULL REFERENCES programs(program_id) ON DELETE CASCADE,
    target_type             TEXT NOT NULL,   -- 'family' | 'individual'
    family_id               TEXT REFERENCES families(family_id),
    resident_id             TEXT REFERENCES residents(resident_id),
    household_head_id       TEXT,
    field_representative_id TEXT,
    status                  TEXT NOT NULL,   -- 'pending' | 'arrived' | 'not_arrived'
    distribution_date       TEXT,            -- ISO date; required when arrived
    notes                   TEXT,
    created_at              TEXT NOT NULL,
    created_by              TEXT NOT NULL,
    updated_by              TEXT,
    deleted_at              TEXT,
    CHECK ((family_id IS NULL) != (resident_id IS NULL))
);

-- Uniqueness holds among live rows only; any number of tombstones may
-- accumulate for the same natural key.
CREATE UNIQUE INDEX IF NOT EXISTS program_items_live_idx
    ON program_items(program_id, item_id)
    WHERE deleted_at IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS recipients_family_live_idx
    ON recipients(program_id, family_id)
    WHERE deleted_at IS NULL AND family_id IS NOT NULL;

CREATE UNIQUE INDEX IF NOT EXISTS recipients_resident_live_idx
    ON recipients(program_id, resident_id)
    WHERE deleted_at IS NULL AND resident_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS program_items_program_idx ON program_items(program_id);
CREATE INDEX IF NOT EXISTS recipients_program_idx    ON recipients(program_id);
CREATE INDEX IF NOT EXISTS recipients_status_idx     ON recipients(program_id, status);

PRAGMA user_version = 1;
";
