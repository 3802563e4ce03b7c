//! SQL schema for the Capitol SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Business-key columns are stored normalised (trimmed, ticker upper-cased)
-- so the unique index below matches BusinessKey equality.
CREATE TABLE IF NOT EXISTS trades (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    politician_name  TEXT NOT NULL,
    ticker           TEXT NOT NULL,
    transaction_date TEXT NOT NULL,   -- YYYY-MM-DD
    transaction_type TEXT NOT NULL,   -- TransactionType discriminant
    amount_range     TEXT NOT NULL,
    owner            TEXT NOT NULL,   -- Owner discriminant
    chamber          TEXT,
    party            TEXT,
    state            TEXT,
    disclosure_date  TEXT,
    price            REAL,
    asset_type       TEXT,
    notes            TEXT,
    session_id       TEXT REFERENCES sessions(session_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS trades_business_key_idx ON trades(
    politician_name, ticker, transaction_date, transaction_type, amount_range, owner
);
CREATE INDEX IF NOT EXISTS trades_session_idx ON trades(session_id);

-- Scraped batches land here verbatim; duplicates are allowed.
CREATE TABLE IF NOT EXISTS staged_trades (
    staging_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    politician_name  TEXT NOT NULL,
    ticker           TEXT NOT NULL,
    transaction_date TEXT NOT NULL,
    transaction_type TEXT NOT NULL,
    amount_range     TEXT NOT NULL,
    owner            TEXT NOT NULL,
    chamber          TEXT,
    party            TEXT,
    state            TEXT,
    disclosure_date  TEXT,
    price            REAL,
    asset_type       TEXT,
    notes            TEXT,
    status           TEXT NOT NULL DEFAULT 'pending',  -- 'pending' | 'promoted' | 'duplicate'
    staged_at        TEXT NOT NULL,
    resolved_at      TEXT
);

CREATE INDEX IF NOT EXISTS staged_status_idx ON staged_trades(status, staging_id);

CREATE TABLE IF NOT EXISTS sessions (
    session_id       TEXT PRIMARY KEY,
    politician_name  TEXT NOT NULL,
    start_date       TEXT NOT NULL,
    end_date         TEXT NOT NULL,
    trade_count      INTEGER NOT NULL DEFAULT 0,
    needs_reanalysis INTEGER NOT NULL DEFAULT 1,
    score            REAL,
    confidence       REAL,
    summary          TEXT,
    model            TEXT,
    analyzed_at      TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    CHECK (start_date <= end_date)
);

CREATE INDEX IF NOT EXISTS sessions_politician_idx ON sessions(politician_name, end_date);
CREATE INDEX IF NOT EXISTS sessions_dirty_idx      ON sessions(needs_reanalysis, updated_at);

-- trade_id is a weak reference. A replacement that drops a trade moves its
-- analyses to orphaned_analysis below.
CREATE TABLE IF NOT EXISTS analysis (
    analysis_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    trade_id         INTEGER,
    session_id       TEXT REFERENCES sessions(session_id),
    conflict_score   REAL,            -- NULL only after a repair run
    confidence       REAL,
    reasoning        TEXT NOT NULL,
    model_used       TEXT NOT NULL,
    analysis_version TEXT NOT NULL,
    needs_rescore    INTEGER NOT NULL DEFAULT 0,
    analyzed_at      TEXT NOT NULL,
    CHECK ((trade_id IS NULL) != (session_id IS NULL)),
    CHECK (conflict_score IS NULL OR (conflict_score >= 0.0 AND conflict_score <= 1.0))
);

CREATE UNIQUE INDEX IF NOT EXISTS analysis_trade_key_idx
    ON analysis(trade_id, model_used, analysis_version);
CREATE UNIQUE INDEX IF NOT EXISTS analysis_session_key_idx
    ON analysis(session_id, model_used, analysis_version);

-- Analyses whose trade a replacement deleted. Kept out of `analysis` so the
-- reloaded table can reuse the old id without the record re-attaching.
CREATE TABLE IF NOT EXISTS orphaned_analysis (
    analysis_id      INTEGER PRIMARY KEY,
    former_trade_id  INTEGER NOT NULL,
    conflict_score   REAL,
    confidence       REAL,
    reasoning        TEXT NOT NULL,
    model_used       TEXT NOT NULL,
    analysis_version TEXT NOT NULL,
    analyzed_at      TEXT NOT NULL,
    orphaned_at      TEXT NOT NULL
);

-- One row per score nulled by a repair run, for rollback.
CREATE TABLE IF NOT EXISTS repair_audit (
    audit_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id         TEXT NOT NULL,
    analysis_id    INTEGER NOT NULL,
    previous_score REAL,
    reasoning      TEXT NOT NULL,
    repaired_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS repair_audit_run_idx ON repair_audit(run_id);

CREATE TABLE IF NOT EXISTS politicians (
    politician_id   TEXT PRIMARY KEY,
    full_name       TEXT NOT NULL,
    normalized_name TEXT NOT NULL,
    party           TEXT,
    state           TEXT,
    chamber         TEXT
);

CREATE INDEX IF NOT EXISTS politicians_name_idx ON politicians(normalized_name);

CREATE TABLE IF NOT EXISTS politician_aliases (
    alias         TEXT PRIMARY KEY,   -- normalised
    politician_id TEXT NOT NULL REFERENCES politicians(politician_id)
);

CREATE TABLE IF NOT EXISTS committee_assignments (
    politician_id  TEXT NOT NULL REFERENCES politicians(politician_id),
    position       INTEGER NOT NULL,
    committee_name TEXT NOT NULL,
    title          TEXT,
    rank           INTEGER,
    jurisdiction   TEXT NOT NULL,
    target_sectors TEXT NOT NULL DEFAULT '[]',  -- JSON array
    PRIMARY KEY (politician_id, position)
);

CREATE TABLE IF NOT EXISTS securities (
    ticker       TEXT PRIMARY KEY,
    company_name TEXT NOT NULL,
    sector       TEXT NOT NULL
);

PRAGMA user_version = 1;
";
