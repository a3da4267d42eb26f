//! SQL schema for the Vouch SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS clients (
    client_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    tier        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cases (
    case_id       TEXT PRIMARY KEY,
    client_id     TEXT NOT NULL REFERENCES clients(client_id),
    employee_name TEXT NOT NULL,
    status        TEXT NOT NULL,   -- CaseStatus
    risk_level    TEXT,            -- Zone, NULL until a check resolves
    created_at    TEXT NOT NULL
);

-- Every mutable column is rewritten by a single UPDATE guarded on version.
CREATE TABLE IF NOT EXISTS checks (
    check_id        TEXT PRIMARY KEY,
    case_id         TEXT NOT NULL REFERENCES cases(case_id),
    check_type      TEXT NOT NULL,
    claimed         TEXT NOT NULL,             -- FactRecord JSON
    status          TEXT NOT NULL,
    zone            TEXT NOT NULL,
    risk_score      INTEGER,
    discrepancies   TEXT NOT NULL DEFAULT '[]',
    matches         TEXT NOT NULL DEFAULT '[]',
    match_rate      REAL,
    verified        TEXT,                      -- FactRecord JSON or NULL
    summary         TEXT,
    response_note   TEXT,
    failure_reason  TEXT,
    created_at      TEXT NOT NULL,
    started_at      TEXT,
    completed_at    TEXT,
    version         INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS requests (
    request_id  TEXT PRIMARY KEY,
    check_id    TEXT REFERENCES checks(check_id),
    claimed     TEXT NOT NULL,
    contact     TEXT NOT NULL,
    channel     TEXT,                          -- ResponseChannel JSON or NULL
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- Append-only. One row per (request, kind): a reminder or escalation can
-- never be recorded twice.
CREATE TABLE IF NOT EXISTS request_events (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id  TEXT NOT NULL REFERENCES requests(request_id),
    kind        TEXT NOT NULL,                 -- INITIAL | REMINDER_n | ESCALATION
    at          TEXT NOT NULL,
    message_id  TEXT,
    UNIQUE (request_id, kind)
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS activity (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id     TEXT NOT NULL UNIQUE,
    entity_type  TEXT NOT NULL,
    entity_id    TEXT NOT NULL,
    action       TEXT NOT NULL,                -- discriminant of ActivityAction
    metadata     TEXT NOT NULL,                -- JSON payload or 'null'
    note         TEXT NOT NULL DEFAULT '',
    recorded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS cases_client_idx     ON cases(client_id);
CREATE INDEX IF NOT EXISTS checks_case_idx      ON checks(case_id);
CREATE INDEX IF NOT EXISTS requests_check_idx   ON requests(check_id);
CREATE INDEX IF NOT EXISTS requests_status_idx  ON requests(status);
CREATE INDEX IF NOT EXISTS activity_entity_idx  ON activity(entity_type, entity_id);

PRAGMA user_version = 1;
";
