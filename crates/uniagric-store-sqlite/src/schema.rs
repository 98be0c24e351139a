//! SQL schema for the Uniagric SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Identity service ─────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS identities (
    uid           TEXT PRIMARY KEY,
    email         TEXT UNIQUE COLLATE NOCASE,
    password_hash TEXT,             -- argon2 PHC string; NULL for federated/phone
    display_name  TEXT,
    phone_number  TEXT UNIQUE,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS federated_links (
    provider TEXT NOT NULL,
    subject  TEXT NOT NULL,
    uid      TEXT NOT NULL REFERENCES identities(uid),
    PRIMARY KEY (provider, subject)
);

-- One-time phone codes; only the SHA-256 of the code is kept.
CREATE TABLE IF NOT EXISTS phone_challenges (
    verification_id TEXT PRIMARY KEY,
    phone_number    TEXT NOT NULL,
    code_hash       TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    consumed        INTEGER NOT NULL DEFAULT 0
);

-- Password-reset tokens; only the SHA-256 of the token is kept.
CREATE TABLE IF NOT EXISTS password_resets (
    token_hash TEXT PRIMARY KEY,
    uid        TEXT NOT NULL REFERENCES identities(uid),
    created_at TEXT NOT NULL,
    consumed   INTEGER NOT NULL DEFAULT 0
);

-- ── Documents ────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS users (
    uid        TEXT PRIMARY KEY,
    name       TEXT,
    email      TEXT,
    user_type  TEXT NOT NULL,       -- 'farmer' | 'investor'
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS farm_listings (
    id                TEXT PRIMARY KEY,
    farmer_id         TEXT NOT NULL,
    farm_name         TEXT NOT NULL,
    location          TEXT NOT NULL,
    size              REAL NOT NULL,
    investment_needed REAL NOT NULL,
    risk_category     TEXT NOT NULL,
    description       TEXT NOT NULL,
    crop_type         TEXT NOT NULL,
    expected_yield    REAL NOT NULL,
    return_rate       REAL NOT NULL,
    status            TEXT NOT NULL DEFAULT 'available'
                      CHECK (status IN ('available', 'invested')),
    created_at        TEXT NOT NULL,
    investor_id       TEXT,
    invested_at       TEXT
);

CREATE TABLE IF NOT EXISTS investments (
    id          TEXT PRIMARY KEY,
    farm_id     TEXT NOT NULL REFERENCES farm_listings(id),
    investor_id TEXT NOT NULL,
    amount      REAL NOT NULL,
    date        TEXT NOT NULL,
    status      TEXT NOT NULL,      -- 'active' | 'completed'
    returns     REAL NOT NULL DEFAULT 0,
    UNIQUE (farm_id)
);

-- Exactly one distribution per investment.
CREATE TABLE IF NOT EXISTS profit_distributions (
    id            TEXT PRIMARY KEY,
    investment_id TEXT NOT NULL UNIQUE REFERENCES investments(id),
    farm_id       TEXT NOT NULL REFERENCES farm_listings(id),
    investor_id   TEXT NOT NULL,
    amount        REAL NOT NULL DEFAULT 0,
    date          TEXT NOT NULL,
    status        TEXT NOT NULL     -- 'pending' | 'paid'
);

-- Portfolios are stored whole; allocation order lives in the JSON.
CREATE TABLE IF NOT EXISTS portfolios (
    id         TEXT PRIMARY KEY,
    doc_json   TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS farmer_registrations (
    id                TEXT PRIMARY KEY,
    registration_json TEXT NOT NULL,
    status            TEXT NOT NULL DEFAULT 'pending',
    risk_level        TEXT NOT NULL,
    risk_score        REAL NOT NULL,
    assessment_reason TEXT,
    assessment_date   TEXT NOT NULL,
    documents_json    TEXT NOT NULL DEFAULT '[]',   -- upload order
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS farm_listings_status_idx  ON farm_listings(status, created_at);
CREATE INDEX IF NOT EXISTS farm_listings_farmer_idx  ON farm_listings(farmer_id);
CREATE INDEX IF NOT EXISTS investments_investor_idx  ON investments(investor_id, date);
CREATE INDEX IF NOT EXISTS distributions_investor_idx ON profit_distributions(investor_id);

PRAGMA user_version = 2;
";
